//! Core types shared across the review engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Seconds since the Unix epoch.
pub type Timestamp = i64;

/// Content identity of an item, derived from its normalized text.
///
/// Zero is reserved for "normalizes to empty" and never names a real item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    pub const NONE: Self = Self(0);

    /// True for the fingerprint of an item with no significant text.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

/// Abstract user action produced by the input-mapping collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Next,
    Back,
    Quit,
    Delete,
    Speech,
    Listen,
    AddToGroup,
}

impl Action {
    /// Get the action name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Back => "back",
            Self::Quit => "quit",
            Self::Delete => "delete",
            Self::Speech => "speech",
            Self::Listen => "listen",
            Self::AddToGroup => "add-to-group",
        }
    }

    /// Parse from string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "next" => Some(Self::Next),
            "back" => Some(Self::Back),
            "quit" => Some(Self::Quit),
            "delete" => Some(Self::Delete),
            "speech" => Some(Self::Speech),
            "listen" => Some(Self::Listen),
            "add-to-group" => Some(Self::AddToGroup),
            _ => None,
        }
    }
}

/// Where a served item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeSource {
    /// Drawn from the due pool; a review timestamp was recorded.
    Pool,
    /// Re-served from the priority group; no timestamp recorded.
    Group,
    /// Reached by walking the traversal list backwards.
    Backward,
    /// Part of a listen playlist; nothing recorded.
    Listen,
}

/// An item handed to the presenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedItem {
    pub fingerprint: Fingerprint,
    pub text: String,
    pub round: usize,
    pub source: ServeSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_round_trip() {
        for action in [
            Action::Next,
            Action::Back,
            Action::Quit,
            Action::Delete,
            Action::Speech,
            Action::Listen,
            Action::AddToGroup,
        ] {
            assert_eq!(Action::from_name(action.as_str()), Some(action));
        }
        assert_eq!(Action::from_name("skip"), None);
    }

    #[test]
    fn fingerprint_parses_decimal() {
        assert_eq!("12345".parse::<Fingerprint>().unwrap(), Fingerprint(12345));
        assert!("12a".parse::<Fingerprint>().is_err());
        assert!(Fingerprint::NONE.is_none());
    }
}
