//! Content fingerprints.
//!
//! An item's identity is a hash of its normalized text: bracket tags such as
//! `[Q]` or `[a]` are removed, the text is lowercased and every configured
//! symbol and all whitespace are dropped. Two lines that normalize to the same
//! string are the same item. Distinct strings that happen to hash alike are
//! merged as well; collisions are accepted and not detected.

use crate::types::Fingerprint;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::OnceLock;

/// ASCII punctuation plus the common full-width CJK punctuation.
pub const DEFAULT_SYMBOLS: &str = concat!(
    "\"',.?:;!-/#()|<>{}[]~`@$%^&*+_=\\",
    "，。、？！；：·．“”‘’｀－＝～＠＃＄％＊＿＋｜—…《》（）【】「」『』〖〗〈〉｛｝",
);

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[[a-zA-Z0-9_ -]\]").expect("tag pattern is valid"))
}

/// Hash applied to normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintAlgorithm {
    /// 64-bit FNV-1a.
    #[default]
    Fnv1a,
    /// Leading eight bytes of SHA-256, big endian.
    Sha256,
}

impl FingerprintAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fnv1a => "fnv1a",
            Self::Sha256 => "sha256",
        }
    }

    /// Parse an algorithm name, case-insensitive.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "fnv1a" | "fnv" => Some(Self::Fnv1a),
            "sha256" | "sha-256" => Some(Self::Sha256),
            _ => None,
        }
    }

    fn hash(&self, normalized: &str) -> u64 {
        match self {
            Self::Fnv1a => normalized.bytes().fold(FNV_OFFSET, |hash, byte| {
                (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
            }),
            Self::Sha256 => {
                let digest = Sha256::digest(normalized.as_bytes());
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&digest[..8]);
                u64::from_be_bytes(bytes)
            }
        }
    }
}

/// Normalizes text and hashes it with the configured algorithm.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    algorithm: FingerprintAlgorithm,
    symbols: HashSet<char>,
}

impl Fingerprinter {
    pub fn new(algorithm: FingerprintAlgorithm) -> Self {
        Self::with_symbols(algorithm, DEFAULT_SYMBOLS)
    }

    /// Fingerprinter with a custom set of ignored symbols.
    pub fn with_symbols(algorithm: FingerprintAlgorithm, symbols: &str) -> Self {
        Self {
            algorithm,
            symbols: symbols.chars().collect(),
        }
    }

    /// Hash in use.
    pub fn algorithm(&self) -> FingerprintAlgorithm {
        self.algorithm
    }

    /// Same symbol set, different hash.
    pub fn with_algorithm(&self, algorithm: FingerprintAlgorithm) -> Self {
        Self {
            algorithm,
            symbols: self.symbols.clone(),
        }
    }

    /// Text with tags, symbols and whitespace removed, lowercased.
    pub fn normalize(&self, text: &str) -> String {
        let untagged = tag_pattern().replace_all(text, "");
        untagged
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && !self.symbols.contains(c))
            .collect()
    }

    /// Fingerprint of `text`, or [`Fingerprint::NONE`] when nothing is left
    /// after normalization.
    pub fn fingerprint(&self, text: &str) -> Fingerprint {
        let normalized = self.normalize(text);
        if normalized.is_empty() {
            return Fingerprint::NONE;
        }
        let fingerprint = Fingerprint(self.algorithm.hash(&normalized));
        tracing::trace!(%fingerprint, normalized = %normalized, "fingerprint");
        fingerprint
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(FingerprintAlgorithm::default())
    }
}
