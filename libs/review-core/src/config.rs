//! Review configuration: span table, paths and session tunables.

use crate::error::{Result, ReviewError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SPANS: &[&str] = &[
    "0 seconds",
    "7 minutes", "30 minutes", "30 minutes", "30 minutes", "1 hours", "1 hours", "1 hours",
    "1 hours", "2 hours", "3 hours", "4 hours", "5 hours", "6 hours", "7 hours",
    "8 hours", "9 hours", "10 hours", "11 hours", "12 hours", "13 hours", "14 hours",
    "24 hours", "48 hours", "72 hours", "96 hours", "120 hours", "144 hours", "168 hours",
    "192 hours", "216 hours", "240 hours", "264 hours", "288 hours", "312 hours", "336 hours",
];

/// Delay before each review round, in seconds, indexed by round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<i64>")]
pub struct SpanTable(Vec<i64>);

impl SpanTable {
    /// Build a table from seconds. Rejects an empty table.
    pub fn new(spans: Vec<i64>) -> Result<Self> {
        if spans.is_empty() {
            return Err(ReviewError::EmptySpanTable);
        }
        Ok(Self(spans))
    }

    /// Parse a list of `<number> <unit>` strings.
    pub fn parse_list<S: AsRef<str>>(items: &[S]) -> Result<Self> {
        let spans = items
            .iter()
            .map(|item| parse_span(item.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(spans)
    }

    /// Parse a comma separated list, e.g. `"0 seconds, 7 minutes, 1 hours"`.
    pub fn parse(list: &str) -> Result<Self> {
        let items: Vec<&str> = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        Self::parse_list(&items)
    }

    /// Number of rounds before an item is finished.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the table has no spans.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Span for `round`, or `None` once the item is finished.
    pub fn get(&self, round: usize) -> Option<i64> {
        self.0.get(round).copied()
    }

    /// True once `round` is past the last span.
    pub fn is_finished(&self, round: usize) -> bool {
        round >= self.0.len()
    }

    /// Spans in seconds, one per round.
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }
}

impl Default for SpanTable {
    fn default() -> Self {
        Self(
            DEFAULT_SPANS
                .iter()
                .map(|s| parse_span(s).unwrap_or_default())
                .collect(),
        )
    }
}

impl TryFrom<Vec<i64>> for SpanTable {
    type Error = ReviewError;

    fn try_from(spans: Vec<i64>) -> Result<Self> {
        Self::new(spans)
    }
}

impl From<SpanTable> for Vec<i64> {
    fn from(table: SpanTable) -> Self {
        table.0
    }
}

/// Parse `<number> <unit>` into seconds. The space is optional.
pub fn parse_span(value: &str) -> Result<i64> {
    let invalid = || ReviewError::InvalidSpan {
        value: value.to_string(),
    };

    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let number: i64 = number.parse().map_err(|_| invalid())?;

    let multiplier = match unit.trim().to_lowercase().as_str() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600,
        "d" | "day" | "days" => 86_400,
        _ => return Err(invalid()),
    };

    number.checked_mul(multiplier).ok_or_else(invalid)
}

/// Files backing one review source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPaths {
    pub source: PathBuf,
    pub history: PathBuf,
    pub pending: PathBuf,
}

impl ReviewPaths {
    /// History and pending log live next to the source with `.history` and
    /// `.review` extensions.
    pub fn for_source(source: impl AsRef<Path>) -> Self {
        let source = source.as_ref().to_path_buf();
        Self {
            history: source.with_extension("history"),
            pending: source.with_extension("review"),
            source,
        }
    }
}

/// Session tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub spans: SpanTable,
    /// Seconds between background due-set recomputations; 0 pauses the timer.
    pub resync_interval_secs: u64,
    /// Order policy sequence, e.g. `"latest-random"`.
    pub order: String,
    /// Serves that must pass before a grouped item comes back.
    pub minimal_distance: usize,
    /// Items shown for less than this are shown again.
    pub minimal_dwell_ms: u64,
    /// Full rewrite after this many pending appends; 0 only when the due set drains.
    pub checkpoint_every: usize,
    /// Listen over every reviewable item instead of the due pool.
    pub listen_all: bool,
}

impl ReviewConfig {
    pub fn minimal_dwell(&self) -> Duration {
        Duration::from_millis(self.minimal_dwell_ms)
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            spans: SpanTable::default(),
            resync_interval_secs: 60,
            order: "latest".to_string(),
            minimal_distance: 10,
            minimal_dwell_ms: 500,
            checkpoint_every: 100,
            listen_all: false,
        }
    }
}
