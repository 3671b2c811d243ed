//! Source file loader.
//!
//! # Format
//! ```text
//! # comment lines and blank lines are ignored
//! [Q] capital of France [A] Paris
//! first line\nsecond line
//! ```
//!
//! One item per line. Literal `\n` and `\t` are expanded. A UTF-8 byte-order
//! mark selects UTF-8; files without one are read as UTF-8 when valid and as
//! single-byte Latin-1 otherwise.

use crate::fingerprint::Fingerprinter;
use crate::types::Fingerprint;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Returned by [`ContentStore::text`] for unknown fingerprints.
pub const NOT_FOUND: &str = "<not-found>";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// What a call to [`ContentStore::reload`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Modification time unchanged, or the item set did not change.
    Unchanged,
    /// The file does not exist; in-memory content was cleared.
    Missing,
    /// The file exists but could not be read; prior content was kept.
    Unreadable,
    /// The item set changed.
    Reloaded(ContentDiff),
}

/// Items removed and added between two parses, for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDiff {
    pub removed: Vec<(Fingerprint, String)>,
    pub added: Vec<(Fingerprint, String)>,
}

impl ContentDiff {
    /// True when nothing was added or removed.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

impl fmt::Display for ContentDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (_, text) in &self.removed {
            write!(f, "\nremove: {text}")?;
        }
        for (_, text) in &self.added {
            write!(f, "\nadd: {text}")?;
        }
        Ok(())
    }
}

/// Compare two fingerprint → text snapshots.
pub fn diff(
    old: &BTreeMap<Fingerprint, String>,
    new: &BTreeMap<Fingerprint, String>,
) -> ContentDiff {
    let removed = old
        .iter()
        .filter(|(fp, _)| !new.contains_key(fp))
        .map(|(fp, text)| (*fp, text.clone()))
        .collect();
    let added = new
        .iter()
        .filter(|(fp, _)| !old.contains_key(fp))
        .map(|(fp, text)| (*fp, text.clone()))
        .collect();
    ContentDiff { removed, added }
}

/// Fingerprinted view of the source file.
#[derive(Debug)]
pub struct ContentStore {
    path: PathBuf,
    fingerprinter: Fingerprinter,
    last_write: Option<SystemTime>,
    fingerprints: BTreeSet<Fingerprint>,
    texts: BTreeMap<Fingerprint, String>,
    lines: Vec<String>,
}

impl ContentStore {
    /// Create an empty store. Nothing is read until [`reload`](Self::reload).
    pub fn new(path: impl Into<PathBuf>, fingerprinter: Fingerprinter) -> Self {
        Self {
            path: path.into(),
            fingerprinter,
            last_write: None,
            fingerprints: BTreeSet::new(),
            texts: BTreeMap::new(),
            lines: Vec::new(),
        }
    }

    /// Path of the source file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Function used to fingerprint items.
    pub fn fingerprinter(&self) -> &Fingerprinter {
        &self.fingerprinter
    }

    /// Committed fingerprint set.
    pub fn fingerprints(&self) -> &BTreeSet<Fingerprint> {
        &self.fingerprints
    }

    /// Display text of every committed item.
    pub fn texts(&self) -> &BTreeMap<Fingerprint, String> {
        &self.texts
    }

    /// Item lines of the last successful parse, in file order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Display text, or [`NOT_FOUND`].
    pub fn text(&self, fingerprint: Fingerprint) -> &str {
        self.texts
            .get(&fingerprint)
            .map(String::as_str)
            .unwrap_or(NOT_FOUND)
    }

    /// Number of committed items.
    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    /// True when no items are committed.
    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// Swap the fingerprint function and re-derive every item on the next reload.
    pub fn set_fingerprinter(&mut self, fingerprinter: Fingerprinter) {
        self.fingerprinter = fingerprinter;
        self.last_write = None;
    }

    /// Re-read the file if its modification time moved.
    pub fn reload(&mut self) -> ReloadOutcome {
        let modified = match fs::metadata(&self.path).and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == ErrorKind::NotFound => return self.clear_missing(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot stat source file");
                return ReloadOutcome::Unreadable;
            }
        };

        if self.last_write == Some(modified) {
            return ReloadOutcome::Unchanged;
        }

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return self.clear_missing(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot open source file");
                return ReloadOutcome::Unreadable;
            }
        };

        let (lines, texts) = parse_items(&decode(&bytes), &self.fingerprinter);
        let first_load = self.last_write.is_none();
        self.last_write = Some(modified);
        self.lines = lines;

        if texts.len() == self.texts.len() && texts.keys().eq(self.texts.keys()) {
            // Same items; pick up display-only edits without signalling a change.
            self.texts = texts;
            return ReloadOutcome::Unchanged;
        }

        let change = diff(&self.texts, &texts);
        tracing::debug!(
            old_size = self.fingerprints.len(),
            new_size = texts.len(),
            "source items changed"
        );
        if !first_load {
            tracing::debug!("{change}");
        }

        self.fingerprints = texts.keys().copied().collect();
        self.texts = texts;
        ReloadOutcome::Reloaded(change)
    }

    fn clear_missing(&mut self) -> ReloadOutcome {
        if self.last_write.is_some() || !self.fingerprints.is_empty() {
            tracing::warn!(path = %self.path.display(), "cannot find source file");
        }
        self.fingerprints.clear();
        self.texts.clear();
        self.lines.clear();
        self.last_write = None;
        ReloadOutcome::Missing
    }
}

/// Decode file bytes using the byte-order mark when present.
fn decode(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Split source text into item lines and their fingerprints.
///
/// When two lines share a fingerprint the later line's text wins.
pub fn parse_items(
    content: &str,
    fingerprinter: &Fingerprinter,
) -> (Vec<String>, BTreeMap<Fingerprint, String>) {
    let mut lines = Vec::new();
    let mut texts = BTreeMap::new();

    for line in content.lines() {
        let item = line.trim().replace("\\n", "\n").replace("\\t", "\t");
        if item.is_empty() || item.starts_with('#') {
            continue;
        }

        let fingerprint = fingerprinter.fingerprint(&item);
        if fingerprint.is_none() {
            continue;
        }

        texts.insert(fingerprint, item.clone());
        lines.push(item);
    }

    (lines, texts)
}
