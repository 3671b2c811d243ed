//! History file format.
//!
//! ```text
//! 11400714819323198485 1700000000 1700000450 1700002300
//! 9223372036854775837
//! ```
//!
//! One line per fingerprint followed by its review times in epoch seconds.
//! The pending log uses the same format with one completion per line.

use crate::error::{Result, ReviewError};
use crate::types::{Fingerprint, Timestamp};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Fingerprint → review times.
pub type HistoryMap = BTreeMap<Fingerprint, Vec<Timestamp>>;

/// Parse history text. Lines without a leading fingerprint are skipped, as
/// are individual time tokens that do not parse.
pub fn parse(content: &str) -> HistoryMap {
    let mut history = HistoryMap::new();

    for (idx, line) in content.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };

        let Ok(fingerprint) = first.parse::<Fingerprint>() else {
            tracing::debug!(line = idx + 1, token = first, "skipping history line");
            continue;
        };

        let times = history.entry(fingerprint).or_default();
        for token in tokens {
            match token.parse::<Timestamp>() {
                Ok(time) => times.push(time),
                Err(_) => tracing::debug!(line = idx + 1, token, "skipping history token"),
            }
        }
    }

    history
}

/// Render a history map in file format.
pub fn render(history: &HistoryMap) -> String {
    let mut out = String::new();
    for (fingerprint, times) in history {
        out.push_str(&fingerprint.to_string());
        for time in times {
            out.push(' ');
            out.push_str(&time.to_string());
        }
        out.push('\n');
    }
    out
}

/// Load a history file. A missing file is an empty history.
pub fn load(path: &Path) -> Result<HistoryMap> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(parse(&content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(HistoryMap::new()),
        Err(e) => Err(ReviewError::io(path, e)),
    }
}

/// Replace `path` with `history` through a temporary file and a rename, so a
/// failed write never leaves a truncated file behind.
pub fn store(path: &Path, history: &HistoryMap) -> Result<()> {
    let tmp = temp_path(path);
    fs::write(&tmp, render(history)).map_err(|e| ReviewError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| ReviewError::io(path, e))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Append one completion line.
pub fn append(path: &Path, fingerprint: Fingerprint, time: Timestamp) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ReviewError::io(path, e))?;
    writeln!(file, "{fingerprint} {time}").map_err(|e| ReviewError::io(path, e))
}

/// Delete `path`; a file that is already gone is fine.
pub fn remove(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ReviewError::io(path, e)),
    }
}
