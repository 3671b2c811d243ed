//! Persistent review history and due computation.
//!
//! Every completion is appended to a small pending log immediately. The full
//! history file is rewritten only at checkpoints, after which the pending log
//! is removed. A crash between the two loses nothing: [`ReviewHistory::initialize`]
//! folds any leftover pending log back in.

pub mod file;

use crate::config::SpanTable;
use crate::error::Result;
use crate::time::{format_duration, format_time_list, format_timestamp};
use crate::types::{Fingerprint, Timestamp};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub use file::HistoryMap;

/// Review times per fingerprint plus the rules that turn them into rounds.
#[derive(Debug)]
pub struct ReviewHistory {
    history_path: PathBuf,
    pending_path: PathBuf,
    spans: SpanTable,
    records: HistoryMap,
    disabled: BTreeSet<Fingerprint>,
    pending_appends: usize,
}

impl ReviewHistory {
    /// Create an empty history. Nothing is read until [`initialize`](Self::initialize).
    pub fn new(
        history_path: impl Into<PathBuf>,
        pending_path: impl Into<PathBuf>,
        spans: SpanTable,
    ) -> Self {
        Self {
            history_path: history_path.into(),
            pending_path: pending_path.into(),
            spans,
            records: HistoryMap::new(),
            disabled: BTreeSet::new(),
            pending_appends: 0,
        }
    }

    /// Path of the checkpointed history file.
    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    /// Path of the append-only pending log.
    pub fn pending_path(&self) -> &Path {
        &self.pending_path
    }

    /// Review spans in use.
    pub fn spans(&self) -> &SpanTable {
        &self.spans
    }

    /// Replace the review spans; due sets change on the next recompute.
    pub fn set_spans(&mut self, spans: SpanTable) {
        self.spans = spans;
    }

    /// Review times per fingerprint.
    pub fn records(&self) -> &HistoryMap {
        &self.records
    }

    /// Completions appended since the last checkpoint.
    pub fn pending_appends(&self) -> usize {
        self.pending_appends
    }

    /// Load the history file and fold in the pending log.
    ///
    /// The stored file is replayed through [`merge`](Self::merge); if that
    /// changes anything the file was inconsistent and is rewritten. A pending
    /// log is merged, checkpointed and then deleted.
    pub fn initialize(&mut self) -> Result<()> {
        let stored = file::load(&self.history_path)?;
        self.records.clear();
        self.merge(&stored);

        let mut rewrite = false;
        if self.records != stored {
            tracing::debug!(path = %self.history_path.display(), "wrong history detected, repairing");
            rewrite = true;
        }

        let pending = file::load(&self.pending_path)?;
        if !pending.is_empty() {
            tracing::debug!(entries = pending.len(), "pending reviews detected");
            self.merge(&pending);
            rewrite = true;
        }

        if rewrite {
            self.checkpoint()?;
        }

        tracing::debug!(size = self.records.len(), "history is up to date");
        tracing::trace!("{}", self.describe());
        Ok(())
    }

    /// Append incoming times that respect the schedule.
    ///
    /// A time is taken only when it lies strictly after the previous time plus
    /// the span of the round it would complete. Anything else is dropped.
    pub fn merge(&mut self, incoming: &HistoryMap) {
        for (fingerprint, times) in incoming {
            let record = self.records.entry(*fingerprint).or_default();
            let mut last = record.last().copied().unwrap_or(0);

            for &time in times {
                let Some(span) = self.spans.get(record.len()) else {
                    break;
                };
                if time > last + span {
                    record.push(time);
                    last = time;
                }
            }
        }
    }

    /// Drop records whose fingerprint is no longer live and open empty records
    /// for new ones. Persists when anything was removed.
    pub fn synchronize(&mut self, live: &BTreeSet<Fingerprint>) -> Result<usize> {
        let before = self.records.len();
        self.records.retain(|fingerprint, times| {
            let keep = live.contains(fingerprint);
            if !keep {
                tracing::debug!(%fingerprint, times = %format_time_list(times), "erase");
            }
            keep
        });
        let removed = before - self.records.len();

        self.disabled.retain(|fingerprint| live.contains(fingerprint));
        self.track(live);

        if removed > 0 {
            self.write_history()?;
        }
        Ok(removed)
    }

    /// Open an empty record for every fingerprint not seen before.
    pub fn track(&mut self, live: &BTreeSet<Fingerprint>) {
        for fingerprint in live {
            self.records.entry(*fingerprint).or_default();
        }
    }

    /// Fingerprints due at `now`, excluding disabled and finished items.
    pub fn expired(&self, now: Timestamp) -> BTreeSet<Fingerprint> {
        self.records
            .iter()
            .filter(|(fingerprint, _)| !self.disabled.contains(fingerprint))
            .filter(|(_, times)| self.is_due(times, now))
            .map(|(fingerprint, _)| *fingerprint)
            .collect()
    }

    fn is_due(&self, times: &[Timestamp], now: Timestamp) -> bool {
        let Some(span) = self.spans.get(times.len()) else {
            return false;
        };
        let last = times.last().copied().unwrap_or(0);
        if now < last {
            tracing::warn!(last = %format_timestamp(last), "last review time is in the future");
        }
        now >= last + span
    }

    /// Number of completed reviews.
    pub fn round(&self, fingerprint: Fingerprint) -> usize {
        self.records.get(&fingerprint).map_or(0, Vec::len)
    }

    /// Latest review time, or 0 if never reviewed.
    pub fn last_review_time(&self, fingerprint: Fingerprint) -> Timestamp {
        self.records
            .get(&fingerprint)
            .and_then(|times| times.last().copied())
            .unwrap_or(0)
    }

    /// All review times, oldest first.
    pub fn times(&self, fingerprint: Fingerprint) -> &[Timestamp] {
        self.records
            .get(&fingerprint)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Record one completion: append to the pending log, then to memory.
    pub fn save_history(&mut self, fingerprint: Fingerprint, time: Timestamp) -> Result<()> {
        file::append(&self.pending_path, fingerprint, time)?;
        self.records.entry(fingerprint).or_default().push(time);
        self.pending_appends += 1;
        Ok(())
    }

    /// Rewrite the full history file from memory.
    pub fn write_history(&self) -> Result<()> {
        file::store(&self.history_path, &self.records)?;
        tracing::debug!(size = self.records.len(), "update history");
        Ok(())
    }

    /// Remove the pending log once its content is in the history file.
    pub fn clean_review_cache(&mut self) -> Result<()> {
        file::remove(&self.pending_path)?;
        self.pending_appends = 0;
        Ok(())
    }

    /// Full rewrite followed by removal of the pending log.
    pub fn checkpoint(&mut self) -> Result<()> {
        self.write_history()?;
        self.clean_review_cache()?;
        tracing::info!(size = self.records.len(), "history checkpoint written");
        Ok(())
    }

    /// Retire an item. Its history is kept but it is never due again.
    pub fn disable(&mut self, fingerprint: Fingerprint) {
        if self.disabled.insert(fingerprint) {
            tracing::debug!(%fingerprint, "disabled");
        }
    }

    /// True if disabled for this session.
    pub fn is_disabled(&self, fingerprint: Fingerprint) -> bool {
        self.disabled.contains(&fingerprint)
    }

    /// Neither disabled nor finished.
    pub fn is_reviewable(&self, fingerprint: Fingerprint) -> bool {
        !self.is_disabled(fingerprint) && !self.spans.is_finished(self.round(fingerprint))
    }

    /// True when every known, non-disabled item reached the last round.
    pub fn is_finished(&self) -> bool {
        self.records
            .iter()
            .filter(|(fingerprint, _)| !self.disabled.contains(fingerprint))
            .all(|(_, times)| self.spans.is_finished(times.len()))
    }

    /// Persist `records` as the new history, then adopt it in memory. On a
    /// write failure memory is left as it was.
    pub(crate) fn replace_records(&mut self, records: HistoryMap) -> Result<()> {
        file::store(&self.history_path, &records)?;
        self.records = records;
        self.disabled.clear();
        Ok(())
    }

    /// One line per record: round, first review date and gaps.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (fingerprint, times) in &self.records {
            out.push_str(&format!("{fingerprint} ({}) {}\n", times.len(), format_time_list(times)));
        }
        out
    }

    /// Elapsed time since the last review, formatted for logs.
    pub fn elapsed_string(&self, fingerprint: Fingerprint, now: Timestamp) -> String {
        format_duration(now - self.last_review_time(fingerprint))
    }
}
