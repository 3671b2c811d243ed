//! Per-process session bookkeeping: traversal, back cursor and priority group.

use crate::types::Fingerprint;
use std::collections::HashMap;

/// Serve history of the running session. Never persisted.
#[derive(Debug, Default)]
pub struct Session {
    traversal: Vec<Fingerprint>,
    cursor: Option<usize>,
    group: Vec<Fingerprint>,
    serve_counter: usize,
    last_served: HashMap<Fingerprint, usize>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every item served so far, oldest first.
    pub fn traversal(&self) -> &[Fingerprint] {
        &self.traversal
    }

    /// Priority group in insertion order.
    pub fn group(&self) -> &[Fingerprint] {
        &self.group
    }

    /// Forward serves so far.
    pub fn serve_counter(&self) -> usize {
        self.serve_counter
    }

    /// True while stepping back through served items.
    pub fn is_navigating_back(&self) -> bool {
        self.cursor.is_some()
    }

    /// Append a forward serve and stamp it with the serve counter.
    pub fn record_serve(&mut self, fingerprint: Fingerprint) {
        self.traversal.push(fingerprint);
        self.last_served.insert(fingerprint, self.serve_counter);
        self.serve_counter += 1;
    }

    /// Leave backward navigation; the next serve draws normally.
    pub fn resume_forward(&mut self) {
        self.cursor = None;
    }

    /// Move the cursor one item back.
    ///
    /// The first step from forward mode lands on the item before the one just
    /// served. The cursor stops at the first item.
    pub fn step_back(&mut self) -> Option<Fingerprint> {
        if self.traversal.is_empty() {
            return None;
        }
        let from = self.cursor.unwrap_or(self.traversal.len() - 1);
        let index = from.saturating_sub(1);
        self.cursor = Some(index);
        self.traversal.get(index).copied()
    }

    /// Flag an item for early re-review.
    pub fn add_to_group(&mut self, fingerprint: Fingerprint) {
        if !self.group.contains(&fingerprint) {
            self.group.push(fingerprint);
        }
    }

    /// Take the first grouped item served more than `minimal_distance` serves ago.
    pub fn take_ready_group(&mut self, minimal_distance: usize) -> Option<Fingerprint> {
        let position = self.group.iter().position(|fingerprint| {
            let last = self.last_served.get(fingerprint).copied().unwrap_or(0);
            self.serve_counter - last > minimal_distance
        })?;
        Some(self.group.remove(position))
    }

    /// Drop grouped entries that are no longer live or reviewable.
    pub fn retain_group(&mut self, mut keep: impl FnMut(Fingerprint) -> bool) {
        self.group.retain(|fingerprint| keep(*fingerprint));
    }
}
