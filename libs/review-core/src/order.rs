//! Selection policies over the due pool.

use crate::types::Fingerprint;
use rand::Rng;
use std::collections::VecDeque;

/// Characters that separate policy names in a sequence string.
const SEPARATORS: &[char] = &[',', ':', ';', '-', '/', '\\', '%', '@', '|'];

/// Which end (or interior) of the pool to take the next item from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPolicy {
    /// First element.
    Latest,
    /// Last element.
    Earliest,
    /// Uniform over the interior; the ends are never chosen once the pool
    /// holds three or more items.
    Random,
    /// Element at `len / 2`.
    Middle,
    /// Produced by an empty sequence; selects nothing.
    Invalid,
}

impl OrderPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Earliest => "earliest",
            Self::Random => "random",
            Self::Middle => "middle",
            Self::Invalid => "invalid",
        }
    }

    /// Parse a policy name, case-insensitively.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "latest" => Some(Self::Latest),
            // Older configuration files spell it without the second "e".
            "earliest" | "earlist" => Some(Self::Earliest),
            "random" => Some(Self::Random),
            "middle" => Some(Self::Middle),
            _ => None,
        }
    }
}

/// Remove and return the next fingerprint from `pool` under `policy`.
pub fn draw<R: Rng + ?Sized>(
    pool: &mut VecDeque<Fingerprint>,
    policy: OrderPolicy,
    rng: &mut R,
) -> Option<Fingerprint> {
    match policy {
        OrderPolicy::Latest => pool.pop_front(),
        OrderPolicy::Earliest => pool.pop_back(),
        OrderPolicy::Random => {
            if pool.len() < 3 {
                pool.pop_back()
            } else {
                let index = rng.gen_range(1..=pool.len() - 2);
                pool.remove(index)
            }
        }
        OrderPolicy::Middle => pool.remove(pool.len() / 2),
        OrderPolicy::Invalid => {
            tracing::warn!("no valid review order configured");
            None
        }
    }
}

/// Policies applied round-robin, one per draw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySequence {
    policies: Vec<OrderPolicy>,
    cursor: usize,
}

impl PolicySequence {
    pub fn new(policies: Vec<OrderPolicy>) -> Self {
        Self { policies, cursor: 0 }
    }

    /// Parse e.g. `"latest-random"` or `"Middle,earliest"`. Unknown names are
    /// logged and skipped.
    pub fn parse(order: &str) -> Self {
        let policies = order
            .split(SEPARATORS)
            .filter(|token| !token.trim().is_empty())
            .filter_map(|token| {
                let policy = OrderPolicy::from_name(token);
                if policy.is_none() {
                    tracing::warn!(token, "invalid review order");
                }
                policy
            })
            .collect();
        Self::new(policies)
    }

    /// Policies in rotation order.
    pub fn policies(&self) -> &[OrderPolicy] {
        &self.policies
    }

    /// Next policy, wrapping at the end. An empty sequence yields `Invalid`.
    pub fn next_policy(&mut self) -> OrderPolicy {
        if self.cursor >= self.policies.len() {
            self.cursor = 0;
        }
        let Some(policy) = self.policies.get(self.cursor).copied() else {
            return OrderPolicy::Invalid;
        };
        self.cursor += 1;
        tracing::trace!(order = policy.as_str(), "review order");
        policy
    }

    /// Same policies, cursor back at the start.
    pub fn restarted(&self) -> Self {
        Self::new(self.policies.clone())
    }
}
