use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

/// Retry policy for calls to unreliable collaborators.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Default: 2.
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,
    /// Base delay for exponential backoff. Default: 100ms.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound for a single delay. Default: 1000ms.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u8 {
    2
}
fn default_base_delay_ms() -> u64 {
    100
}
fn default_max_delay_ms() -> u64 {
    1000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): the base delay doubled
    /// per earlier retry plus up to a quarter of jitter, capped at
    /// `max_delay_ms`. Attempt 0 never waits.
    pub fn delay(&self, attempt: u8) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let doubled = self
            .base_delay_ms
            .saturating_mul(1u64.checked_shl(u32::from(attempt - 1)).unwrap_or(u64::MAX));
        let jitter = match doubled / 4 {
            0 => 0,
            spread => rand::rng().random_range(0..=spread),
        };
        Duration::from_millis(doubled.saturating_add(jitter).min(self.max_delay_ms))
    }

    /// Whether a call that already failed `attempt` times may be tried again.
    pub fn allows(&self, attempt: u8) -> bool {
        attempt <= self.max_retries
    }
}
