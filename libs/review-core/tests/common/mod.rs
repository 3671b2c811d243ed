//! Common test utilities for scheduler integration tests.
//!
//! Each [`TestContext`] owns a temporary directory holding the source file,
//! its history file and the pending log, plus a manual clock shared with the
//! scheduler.

#![allow(dead_code)]

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use review_core::{
    Fingerprint, Fingerprinter, ManualClock, ReviewConfig, ReviewPaths, Scheduler, SpanTable,
};
use tempfile::TempDir;

/// 2023-11-14 22:13:20 UTC.
pub const T0: i64 = 1_700_000_000;

pub struct TestContext {
    pub dir: TempDir,
    pub paths: ReviewPaths,
    pub clock: ManualClock,
    mtime_bump: u64,
}

impl TestContext {
    /// Create a context with `content` as the source file.
    pub fn new(content: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let paths = ReviewPaths::for_source(dir.path().join("words.txt"));
        fs::write(&paths.source, content).expect("Failed to write source");
        Self {
            dir,
            paths,
            clock: ManualClock::new(T0),
            mtime_bump: 0,
        }
    }

    /// Config with a short span table, deterministic order and no dwell.
    pub fn config(&self) -> ReviewConfig {
        ReviewConfig {
            spans: SpanTable::new(vec![0, 10, 20]).expect("valid spans"),
            order: "latest".to_string(),
            minimal_dwell_ms: 0,
            minimal_distance: 2,
            ..ReviewConfig::default()
        }
    }

    pub fn scheduler(&self) -> Scheduler {
        self.scheduler_with(self.config())
    }

    pub fn scheduler_with(&self, config: ReviewConfig) -> Scheduler {
        let scheduler = Scheduler::new(
            self.paths.clone(),
            config,
            Fingerprinter::default(),
            Arc::new(self.clock.clone()),
        );
        scheduler.seed_rng(42);
        scheduler.initialize().expect("Failed to initialize scheduler");
        scheduler
    }

    /// Rewrite the source and push its mtime forward so the change is seen
    /// even on filesystems with coarse timestamps.
    pub fn rewrite_source(&mut self, content: &str) {
        fs::write(&self.paths.source, content).expect("Failed to rewrite source");
        self.mtime_bump += 10;
        set_mtime(&self.paths.source, self.mtime_bump);
    }

    pub fn history_text(&self) -> String {
        fs::read_to_string(&self.paths.history).unwrap_or_default()
    }

    pub fn write_history(&self, content: &str) {
        fs::write(&self.paths.history, content).expect("Failed to write history");
    }

    pub fn pending_exists(&self) -> bool {
        self.paths.pending.exists()
    }
}

pub fn fp(text: &str) -> Fingerprint {
    Fingerprinter::default().fingerprint(text)
}

fn set_mtime(path: &Path, seconds_ahead: u64) {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .expect("Failed to open source");
    file.set_modified(SystemTime::now() + Duration::from_secs(seconds_ahead))
        .expect("Failed to set mtime");
}
