//! Re-keying history when the fingerprint function changes.

use super::state::ReviewState;
use crate::error::{Result, ReviewError};
use crate::fingerprint::FingerprintAlgorithm;
use crate::history::HistoryMap;

/// Result of [`Scheduler::upgrade_fingerprint_algorithm`](super::Scheduler::upgrade_fingerprint_algorithm).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Every item already maps to the same fingerprint; nothing was written.
    Unchanged,
    /// History was re-keyed and persisted.
    Migrated { items: usize },
}

impl ReviewState {
    pub(crate) fn upgrade_fingerprint_algorithm(
        &mut self,
        algorithm: FingerprintAlgorithm,
    ) -> Result<MigrationOutcome> {
        self.history.initialize()?;
        self.content.reload();

        let target = self.content.fingerprinter().with_algorithm(algorithm);
        let mut migrated = HistoryMap::new();
        for (fingerprint, text) in self.content.texts() {
            let Some(times) = self.history.records().get(fingerprint) else {
                tracing::error!(%fingerprint, text = %text, "no history for item, aborting upgrade");
                let fingerprint = *fingerprint;
                // Reloading dropped the in-memory records of never-reviewed items.
                let live = self.content.fingerprints().clone();
                self.history.track(&live);
                return Err(ReviewError::MigrationAborted { fingerprint });
            };
            migrated.insert(target.fingerprint(text), times.clone());
        }

        if &migrated == self.history.records() {
            tracing::info!(algorithm = algorithm.as_str(), "fingerprints unchanged, nothing to upgrade");
            return Ok(MigrationOutcome::Unchanged);
        }

        let items = migrated.len();
        self.history.replace_records(migrated)?;
        if let Err(e) = self.history.clean_review_cache() {
            tracing::warn!(error = %e, "failed to remove pending log after upgrade");
        }

        self.content.set_fingerprinter(target);
        self.content.reload();
        self.reset_derived();
        self.refresh();

        tracing::info!(items, algorithm = algorithm.as_str(), "history upgraded");
        Ok(MigrationOutcome::Migrated { items })
    }
}
