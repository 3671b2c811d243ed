//! Spaced-repetition review engine over a plain text source file.
//!
//! Provides:
//! - Content fingerprinting so edits that only touch case, punctuation or line
//!   order keep an item's history
//! - Review history with crash-safe pending log and span-table due rules
//! - Draw order policies over the due pool
//! - A scheduler with background resync, back navigation, a priority group and
//!   fingerprint migration

pub mod config;
pub mod content;
pub mod error;
pub mod fingerprint;
pub mod history;
pub mod order;
pub mod scheduler;
pub mod time;
pub mod types;

pub use config::{parse_span, ReviewConfig, ReviewPaths, SpanTable};
pub use content::{ContentDiff, ContentStore, ReloadOutcome};
pub use error::{Result, ReviewError};
pub use fingerprint::{FingerprintAlgorithm, Fingerprinter};
pub use history::{HistoryMap, ReviewHistory};
pub use order::{OrderPolicy, PolicySequence};
pub use scheduler::review_loop::{InteractionSource, LoopSummary, Presenter, ReviewLoop};
pub use scheduler::{ContentNotifier, ListenSession, MigrationOutcome, ResyncCommand, Scheduler};
pub use time::{Clock, ManualClock, SystemClock};
pub use types::{Action, Fingerprint, ServeSource, ServedItem, Timestamp};
