//! Session settings read from the environment.
//!
//! | variable                  | meaning                                   |
//! |---------------------------|-------------------------------------------|
//! | `REVIEW_FILE`             | source file (required)                    |
//! | `REVIEW_HISTORY_FILE`     | history file, default `<source>.history`  |
//! | `REVIEW_PENDING_FILE`     | pending log, default `<source>.review`    |
//! | `REVIEW_SPANS`            | comma separated spans, e.g. `0s,7 min,1h` |
//! | `REVIEW_RESYNC_INTERVAL`  | seconds between resyncs, 0 pauses         |
//! | `REVIEW_ORDER`            | policy sequence, e.g. `latest-random`     |
//! | `REVIEW_MINIMAL_DISTANCE` | serves before a grouped item returns      |
//! | `REVIEW_MINIMAL_DWELL_MS` | quicker answers repeat the item           |
//! | `REVIEW_CHECKPOINT_EVERY` | pending appends between full rewrites     |
//! | `REVIEW_LISTEN_ALL`       | listen over every reviewable item         |
//! | `REVIEW_FINGERPRINT`      | fingerprint algorithm in use              |
//! | `REVIEW_UPGRADE`          | migrate history to this algorithm, exit   |

use crate::error::{CliError, Result};
use review_core::{FingerprintAlgorithm, ReviewConfig, ReviewPaths, SpanTable};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Settings {
    pub paths: ReviewPaths,
    pub config: ReviewConfig,
    pub fingerprint: FingerprintAlgorithm,
    pub upgrade: Option<FingerprintAlgorithm>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any variable lookup; unset and empty are the same.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let source = get("REVIEW_FILE").ok_or(CliError::MissingSetting("REVIEW_FILE"))?;
        let mut paths = ReviewPaths::for_source(source.trim());
        if let Some(history) = get("REVIEW_HISTORY_FILE") {
            paths.history = PathBuf::from(history);
        }
        if let Some(pending) = get("REVIEW_PENDING_FILE") {
            paths.pending = PathBuf::from(pending);
        }

        let mut config = ReviewConfig::default();
        if let Some(spans) = get("REVIEW_SPANS") {
            config.spans = SpanTable::parse(&spans).map_err(|e| CliError::InvalidSetting {
                name: "REVIEW_SPANS",
                value: spans.clone(),
                reason: e.to_string(),
            })?;
        }
        if let Some(value) = get("REVIEW_RESYNC_INTERVAL") {
            config.resync_interval_secs = parse_number("REVIEW_RESYNC_INTERVAL", &value)?;
        }
        if let Some(order) = get("REVIEW_ORDER") {
            config.order = order;
        }
        if let Some(value) = get("REVIEW_MINIMAL_DISTANCE") {
            config.minimal_distance = parse_number("REVIEW_MINIMAL_DISTANCE", &value)?;
        }
        if let Some(value) = get("REVIEW_MINIMAL_DWELL_MS") {
            config.minimal_dwell_ms = parse_number("REVIEW_MINIMAL_DWELL_MS", &value)?;
        }
        if let Some(value) = get("REVIEW_CHECKPOINT_EVERY") {
            config.checkpoint_every = parse_number("REVIEW_CHECKPOINT_EVERY", &value)?;
        }
        if let Some(value) = get("REVIEW_LISTEN_ALL") {
            config.listen_all = parse_flag("REVIEW_LISTEN_ALL", &value)?;
        }

        let fingerprint = match get("REVIEW_FINGERPRINT") {
            Some(value) => parse_algorithm("REVIEW_FINGERPRINT", &value)?,
            None => FingerprintAlgorithm::default(),
        };
        let upgrade = get("REVIEW_UPGRADE")
            .map(|value| parse_algorithm("REVIEW_UPGRADE", &value))
            .transpose()?;

        Ok(Self {
            paths,
            config,
            fingerprint,
            upgrade,
        })
    }
}

fn parse_number<T>(name: &'static str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| CliError::InvalidSetting {
            name,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CliError::InvalidSetting {
            name,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

fn parse_algorithm(name: &'static str, value: &str) -> Result<FingerprintAlgorithm> {
    FingerprintAlgorithm::from_name(value).ok_or_else(|| CliError::InvalidSetting {
        name,
        value: value.to_string(),
        reason: "expected fnv1a or sha256".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::path::Path;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn source_is_required() {
        assert!(matches!(
            settings(&[]),
            Err(CliError::MissingSetting("REVIEW_FILE"))
        ));
        assert!(matches!(
            settings(&[("REVIEW_FILE", "  ")]),
            Err(CliError::MissingSetting(_))
        ));
    }

    #[test]
    fn defaults_follow_source_path() {
        let settings = settings(&[("REVIEW_FILE", "/tmp/words.txt")]).unwrap();
        assert_eq!(settings.paths.history, Path::new("/tmp/words.history"));
        assert_eq!(settings.paths.pending, Path::new("/tmp/words.review"));
        assert_eq!(settings.config.resync_interval_secs, 60);
        assert_eq!(settings.config.order, "latest");
        assert_eq!(settings.fingerprint, FingerprintAlgorithm::Fnv1a);
        assert_eq!(settings.upgrade, None);
    }

    #[test]
    fn overrides_are_applied() {
        let settings = settings(&[
            ("REVIEW_FILE", "words.txt"),
            ("REVIEW_HISTORY_FILE", "h.txt"),
            ("REVIEW_SPANS", "0s, 7 minutes, 1 hour"),
            ("REVIEW_RESYNC_INTERVAL", "0"),
            ("REVIEW_ORDER", "random|middle"),
            ("REVIEW_MINIMAL_DISTANCE", "3"),
            ("REVIEW_MINIMAL_DWELL_MS", "250"),
            ("REVIEW_CHECKPOINT_EVERY", "0"),
            ("REVIEW_LISTEN_ALL", "yes"),
            ("REVIEW_FINGERPRINT", "sha256"),
            ("REVIEW_UPGRADE", "sha256"),
        ])
        .unwrap();

        assert_eq!(settings.paths.history, Path::new("h.txt"));
        assert_eq!(settings.config.spans.as_slice(), &[0, 420, 3_600]);
        assert_eq!(settings.config.resync_interval_secs, 0);
        assert_eq!(settings.config.order, "random|middle");
        assert_eq!(settings.config.minimal_distance, 3);
        assert_eq!(settings.config.minimal_dwell_ms, 250);
        assert_eq!(settings.config.checkpoint_every, 0);
        assert!(settings.config.listen_all);
        assert_eq!(settings.fingerprint, FingerprintAlgorithm::Sha256);
        assert_eq!(settings.upgrade, Some(FingerprintAlgorithm::Sha256));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let error = settings(&[("REVIEW_FILE", "w.txt"), ("REVIEW_MINIMAL_DISTANCE", "-1")])
            .unwrap_err();
        assert!(error.to_string().contains("REVIEW_MINIMAL_DISTANCE"));

        let error = settings(&[("REVIEW_FILE", "w.txt"), ("REVIEW_UPGRADE", "md5")]).unwrap_err();
        assert!(error.to_string().contains("fnv1a or sha256"));

        assert!(settings(&[("REVIEW_FILE", "w.txt"), ("REVIEW_SPANS", "soon")]).is_err());
    }
}
