//! Review scheduler.
//!
//! [`Scheduler`] owns the engine state behind a mutex shared with one
//! background resync task. All operations are synchronous and safe to call
//! from a blocking thread; only starting and stopping the task needs a tokio
//! runtime.

mod migrate;
mod resync;
pub mod review_loop;
mod session;
mod state;

pub use migrate::MigrationOutcome;
pub use resync::ResyncCommand;

use crate::config::{ReviewConfig, ReviewPaths};
use crate::content::ReloadOutcome;
use crate::error::{Result, ReviewError};
use crate::fingerprint::{FingerprintAlgorithm, Fingerprinter};
use crate::history::HistoryMap;
use crate::time::Clock;
use crate::types::{Fingerprint, ServedItem};
use resync::ResyncHandle;
use state::ReviewState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// A panic while holding the lock leaves the state usable; carry on with it.
pub(crate) fn lock_state(state: &Mutex<ReviewState>) -> MutexGuard<'_, ReviewState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Review session over one source file.
pub struct Scheduler {
    state: Arc<Mutex<ReviewState>>,
    passive: Arc<AtomicBool>,
    config: ReviewConfig,
    resync: Option<ResyncHandle>,
}

impl Scheduler {
    /// Create a scheduler. Nothing is read until [`initialize`](Self::initialize).
    pub fn new(
        paths: ReviewPaths,
        config: ReviewConfig,
        fingerprinter: Fingerprinter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = ReviewState::new(&paths, &config, fingerprinter, clock);
        Self {
            state: Arc::new(Mutex::new(state)),
            passive: Arc::new(AtomicBool::new(false)),
            config,
            resync: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReviewState> {
        lock_state(&self.state)
    }

    /// Fix the random source, for reproducible draws.
    pub fn seed_rng(&self, seed: u64) {
        self.lock().seed_rng(seed);
    }

    /// Settings the scheduler was built with.
    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Load and repair history, read the source and compute the due set.
    pub fn initialize(&self) -> Result<()> {
        self.lock().initialize()
    }

    /// Spawn the periodic resync task. Must be called inside a tokio runtime.
    pub fn start_resync(&mut self) {
        if self.resync.is_some() {
            return;
        }
        self.resync = Some(resync::spawn(
            Arc::clone(&self.state),
            Arc::clone(&self.passive),
            self.config.resync_interval_secs,
        ));
    }

    /// Handle for reporting source file changes to the resync task.
    pub fn notifier(&self) -> Result<ContentNotifier> {
        let handle = self.resync.as_ref().ok_or(ReviewError::TimerClosed)?;
        Ok(ContentNotifier {
            sender: handle.sender(),
        })
    }

    /// Swap configuration in place. The resync period change reaches the
    /// running task without restarting it.
    pub fn apply_config(&mut self, config: ReviewConfig) -> Result<()> {
        self.lock().apply_config(&config);
        if config.resync_interval_secs != self.config.resync_interval_secs {
            if let Some(handle) = &self.resync {
                if !handle.send(ResyncCommand::SetInterval(config.resync_interval_secs)) {
                    return Err(ReviewError::TimerClosed);
                }
            }
        }
        self.config = config;
        Ok(())
    }

    /// Recompute the due set now.
    pub fn refresh(&self) {
        self.lock().refresh();
    }

    /// Re-read the source file and resynchronize, bypassing the resync task.
    pub fn content_changed(&self) -> ReloadOutcome {
        self.lock().content_changed()
    }

    /// Next item to review, or `None` when nothing is due.
    pub fn next(&self) -> Option<ServedItem> {
        self.lock().serve_next()
    }

    /// Previously served item. Repeated calls keep walking back.
    pub fn previous(&self) -> Option<ServedItem> {
        self.lock().serve_previous()
    }

    /// Retire an item for the rest of the session.
    pub fn disable(&self, fingerprint: Fingerprint) {
        self.lock().disable(fingerprint);
    }

    /// Re-serve an item after a few other serves.
    pub fn add_to_group(&self, fingerprint: Fingerprint) {
        self.lock().add_to_group(fingerprint);
    }

    /// Source name and due count, e.g. `words.txt - 3`.
    pub fn status_line(&self) -> String {
        self.lock().status_line()
    }

    /// Number of items currently due.
    pub fn due_count(&self) -> usize {
        self.lock().due().len()
    }

    /// Due fingerprints in draw order before policies are applied.
    pub fn pool(&self) -> Vec<Fingerprint> {
        self.lock().pool().iter().copied().collect()
    }

    /// Size of the item set history was last synchronized against.
    pub fn live_count(&self) -> usize {
        self.lock().live().len()
    }

    /// Items served forward this session, oldest first.
    pub fn traversal(&self) -> Vec<Fingerprint> {
        self.lock().session.traversal().to_vec()
    }

    /// Priority group in insertion order.
    pub fn group(&self) -> Vec<Fingerprint> {
        self.lock().session.group().to_vec()
    }

    /// Forward serves this session.
    pub fn serve_count(&self) -> usize {
        self.lock().session.serve_counter()
    }

    /// True while the back cursor is set.
    pub fn is_navigating_back(&self) -> bool {
        self.lock().session.is_navigating_back()
    }

    /// Snapshot of the review records.
    pub fn history(&self) -> HistoryMap {
        self.lock().history.records().clone()
    }

    /// Display text for `fingerprint`.
    pub fn text(&self, fingerprint: Fingerprint) -> String {
        self.lock().content.text(fingerprint).to_string()
    }

    /// Hash used by the content store.
    pub fn fingerprint_algorithm(&self) -> FingerprintAlgorithm {
        self.lock().content.fingerprinter().algorithm()
    }

    /// Start a listen pass. Periodic resync is suppressed until the returned
    /// session is dropped.
    pub fn begin_listen(&self) -> ListenSession {
        self.passive.store(true, Ordering::SeqCst);
        let playlist = self.lock().listen_playlist();
        tracing::debug!(items = playlist.len(), "listen started");
        ListenSession {
            playlist,
            passive: Arc::clone(&self.passive),
        }
    }

    /// True while a listen pass is active.
    pub fn is_listening(&self) -> bool {
        self.passive.load(Ordering::SeqCst)
    }

    /// Write the full history now and drop the pending log.
    pub fn checkpoint(&self) {
        self.lock().checkpoint();
    }

    /// Re-key history under a new fingerprint function.
    ///
    /// Aborts without touching anything when a live item has no history
    /// record. On success the content store switches to the new function.
    pub fn upgrade_fingerprint_algorithm(
        &self,
        algorithm: FingerprintAlgorithm,
    ) -> Result<MigrationOutcome> {
        self.lock().upgrade_fingerprint_algorithm(algorithm)
    }

    /// Stop the resync task and write a final checkpoint.
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.resync.take() {
            handle.stop().await;
        }
        let mut state = self.lock();
        if state.history.pending_appends() > 0 {
            state.checkpoint();
        } else {
            tracing::debug!("nothing pending, final checkpoint skipped");
        }
    }
}

/// Cloneable sender for file-change notifications.
#[derive(Debug, Clone)]
pub struct ContentNotifier {
    sender: mpsc::UnboundedSender<ResyncCommand>,
}

impl ContentNotifier {
    /// Returns false once the resync task has stopped.
    pub fn content_changed(&self) -> bool {
        self.sender.send(ResyncCommand::ContentChanged).is_ok()
    }
}

/// Items for a listen pass. Dropping it resumes periodic resync.
#[derive(Debug)]
pub struct ListenSession {
    playlist: Vec<ServedItem>,
    passive: Arc<AtomicBool>,
}

impl ListenSession {
    pub fn playlist(&self) -> &[ServedItem] {
        &self.playlist
    }
}

impl Drop for ListenSession {
    fn drop(&mut self) {
        self.passive.store(false, Ordering::SeqCst);
        tracing::debug!("listen finished");
    }
}
