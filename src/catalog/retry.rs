//! Retry policy for page fetches.

use rand::RngExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Backoff {
    /// Retry immediately.
    #[default]
    None,
    /// Same delay before every retry.
    Fixed { delay_ms: u64 },
    /// `base_ms * 2^(attempt - 1)`, capped at `max_ms`, plus random jitter.
    Exponential {
        base_ms: u64,
        max_ms: u64,
        #[serde(default)]
        jitter_ms: u64,
    },
}

impl Backoff {
    /// Delay before the retry that follows failed attempt `attempt` (1-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Backoff::Exponential { base_ms, max_ms, jitter_ms } => {
                let exp = attempt.saturating_sub(1).min(31);
                let delay = base_ms.saturating_mul(1u64 << exp).min(max_ms);

                let jitter = if jitter_ms > 0 {
                    rand::rng().random_range(0..=jitter_ms)
                } else {
                    0
                };

                Duration::from_millis(delay + jitter)
            }
        }
    }
}

/// Bounded retry strategy: total attempts plus the backoff between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub backoff: Backoff,
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: default_max_attempts(), backoff: Backoff::None }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self { max_attempts, backoff }
    }

    /// Returns true if another attempt is allowed after `attempt` failed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}
