//! Engine state shared between the review loop and the resync task.

use super::session::Session;
use crate::config::{ReviewConfig, ReviewPaths};
use crate::content::{ContentStore, ReloadOutcome};
use crate::error::Result;
use crate::fingerprint::Fingerprinter;
use crate::history::ReviewHistory;
use crate::order::{self, PolicySequence};
use crate::time::Clock;
use crate::types::{Fingerprint, ServeSource, ServedItem};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cmp::Reverse;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

pub(crate) struct ReviewState {
    pub(crate) content: ContentStore,
    pub(crate) history: ReviewHistory,
    pub(crate) session: Session,
    /// Fingerprint set the history was last synchronized against.
    live: BTreeSet<Fingerprint>,
    due: BTreeSet<Fingerprint>,
    pool: VecDeque<Fingerprint>,
    policies: PolicySequence,
    rng: StdRng,
    clock: Arc<dyn Clock>,
    minimal_distance: usize,
    checkpoint_every: usize,
    listen_all: bool,
}

impl ReviewState {
    pub(crate) fn new(
        paths: &ReviewPaths,
        config: &ReviewConfig,
        fingerprinter: Fingerprinter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            content: ContentStore::new(&paths.source, fingerprinter),
            history: ReviewHistory::new(&paths.history, &paths.pending, config.spans.clone()),
            session: Session::new(),
            live: BTreeSet::new(),
            due: BTreeSet::new(),
            pool: VecDeque::new(),
            policies: PolicySequence::parse(&config.order),
            rng: StdRng::from_entropy(),
            clock,
            minimal_distance: config.minimal_distance,
            checkpoint_every: config.checkpoint_every,
            listen_all: config.listen_all,
        }
    }

    pub(crate) fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub(crate) fn apply_config(&mut self, config: &ReviewConfig) {
        self.history.set_spans(config.spans.clone());
        self.policies = PolicySequence::parse(&config.order);
        self.minimal_distance = config.minimal_distance;
        self.checkpoint_every = config.checkpoint_every;
        self.listen_all = config.listen_all;
    }

    /// Load history, read the source and compute the first due set.
    pub(crate) fn initialize(&mut self) -> Result<()> {
        self.history.initialize()?;
        self.content.reload();
        self.refresh();
        tracing::info!(
            items = self.content.len(),
            due = self.due.len(),
            source = %self.content.path().display(),
            "review session ready"
        );
        Ok(())
    }

    pub(crate) fn due(&self) -> &BTreeSet<Fingerprint> {
        &self.due
    }

    pub(crate) fn pool(&self) -> &VecDeque<Fingerprint> {
        &self.pool
    }

    pub(crate) fn live(&self) -> &BTreeSet<Fingerprint> {
        &self.live
    }

    /// Re-read the source file and resynchronize.
    pub(crate) fn content_changed(&mut self) -> ReloadOutcome {
        let outcome = self.content.reload();
        self.refresh();
        outcome
    }

    /// Bring history in line with the content and recompute the due set.
    ///
    /// The pool is rebuilt only when the due set differs from the one it was
    /// built from, so draw progress survives idle resyncs.
    pub(crate) fn refresh(&mut self) {
        self.synchronize();

        let now = self.clock.now();
        // Records kept across a vanished source are never due.
        let current = self.content.fingerprints();
        let expired: BTreeSet<Fingerprint> = self
            .history
            .expired(now)
            .into_iter()
            .filter(|fingerprint| current.contains(fingerprint))
            .collect();
        if expired == self.due {
            return;
        }

        tracing::debug!(
            old_size = self.due.len(),
            new_size = expired.len(),
            "due set changed"
        );
        for fingerprint in expired.difference(&self.due) {
            tracing::debug!(
                round = self.history.round(*fingerprint),
                elapsed = %self.history.elapsed_string(*fingerprint, now),
                text = self.content.text(*fingerprint),
                "expired"
            );
        }

        let mut pool: Vec<Fingerprint> = expired.iter().copied().collect();
        pool.sort_by_key(|fingerprint| {
            (
                self.history.round(*fingerprint),
                Reverse(self.history.last_review_time(*fingerprint)),
                *fingerprint,
            )
        });
        self.pool = pool.into();
        self.due = expired;
    }

    fn synchronize(&mut self) {
        let current = self.content.fingerprints();
        if *current == self.live {
            return;
        }
        // A vanished or emptied source is treated as transient; pruning against
        // it would wipe the whole history.
        if current.is_empty() {
            tracing::warn!(
                source = %self.content.path().display(),
                "source has no items, keeping history"
            );
            return;
        }

        self.live = current.clone();
        match self.history.synchronize(&self.live) {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "history pruned"),
            Err(e) => tracing::warn!(error = %e, "failed to persist pruned history"),
        }

        let live = &self.live;
        self.session.retain_group(|fingerprint| live.contains(&fingerprint));
    }

    fn item(&self, fingerprint: Fingerprint, source: ServeSource) -> ServedItem {
        ServedItem {
            fingerprint,
            text: self.content.text(fingerprint).to_string(),
            round: self.history.round(fingerprint),
            source,
        }
    }

    /// Serve the next item, recording a review when it comes from the pool.
    pub(crate) fn serve_next(&mut self) -> Option<ServedItem> {
        self.session.resume_forward();

        if self.pool.is_empty() {
            self.refresh();
            if self.pool.is_empty() {
                return None;
            }
        }

        if let Some(fingerprint) = self.session.take_ready_group(self.minimal_distance) {
            self.session.record_serve(fingerprint);
            tracing::debug!(%fingerprint, "serving from group");
            return Some(self.item(fingerprint, ServeSource::Group));
        }

        let policy = self.policies.next_policy();
        let fingerprint = order::draw(&mut self.pool, policy, &mut self.rng)?;
        let item = self.item(fingerprint, ServeSource::Pool);

        self.due.remove(&fingerprint);
        self.session.record_serve(fingerprint);
        if let Err(e) = self.history.save_history(fingerprint, self.clock.now()) {
            tracing::warn!(%fingerprint, error = %e, "failed to record review");
        }

        let drained = self.due.is_empty();
        let full = self.checkpoint_every > 0
            && self.history.pending_appends() >= self.checkpoint_every;
        if drained || full {
            self.checkpoint();
        }

        Some(item)
    }

    /// Step back through items already served. Records nothing.
    pub(crate) fn serve_previous(&mut self) -> Option<ServedItem> {
        let fingerprint = self.session.step_back()?;
        Some(self.item(fingerprint, ServeSource::Backward))
    }

    pub(crate) fn disable(&mut self, fingerprint: Fingerprint) {
        self.history.disable(fingerprint);
        self.due.remove(&fingerprint);
        self.pool.retain(|fp| *fp != fingerprint);
        self.session.retain_group(|fp| fp != fingerprint);
    }

    pub(crate) fn add_to_group(&mut self, fingerprint: Fingerprint) {
        if self.history.is_disabled(fingerprint) {
            return;
        }
        self.session.add_to_group(fingerprint);
        tracing::debug!(%fingerprint, size = self.session.group().len(), "added to group");
    }

    /// Playlist for a listen pass, drawn with a fresh policy cursor. Nothing
    /// is removed from the pool and nothing is recorded.
    pub(crate) fn listen_playlist(&mut self) -> Vec<ServedItem> {
        if self.pool.is_empty() {
            self.refresh();
        }

        let mut candidates: VecDeque<Fingerprint> = if self.listen_all {
            self.live
                .iter()
                .copied()
                .filter(|fingerprint| self.history.is_reviewable(*fingerprint))
                .collect()
        } else {
            self.pool.clone()
        };

        let mut policies = self.policies.restarted();
        let mut playlist = Vec::with_capacity(candidates.len());
        while !candidates.is_empty() {
            let Some(fingerprint) =
                order::draw(&mut candidates, policies.next_policy(), &mut self.rng)
            else {
                break;
            };
            playlist.push(self.item(fingerprint, ServeSource::Listen));
        }
        playlist
    }

    /// Write the full history and drop the pending log. Failures are logged.
    pub(crate) fn checkpoint(&mut self) {
        if let Err(e) = self.history.checkpoint() {
            tracing::warn!(error = %e, "history checkpoint failed");
        }
    }

    /// `<file> - <due count>`, or `<file> - finished.` once nothing is left.
    pub(crate) fn status_line(&self) -> String {
        let name = self
            .content
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.due.is_empty() && self.history.is_finished() {
            format!("{name} - finished.")
        } else {
            format!("{name} - {}", self.due.len())
        }
    }

    /// Forget everything derived from the old fingerprints.
    pub(crate) fn reset_derived(&mut self) {
        self.live.clear();
        self.due.clear();
        self.pool.clear();
        self.session = Session::new();
    }
}
