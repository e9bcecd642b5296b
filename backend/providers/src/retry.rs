//! Retry policy for backend calls.
//!
//! Defaults to a fixed delay between attempts. `backoff_factor` > 1.0 opts
//! into growth, capped at `max_delay_ms`.

use docextract_config::OcrServiceConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay_ms: 1_000,
            backoff_factor: 1.0,
            max_delay_ms: 60_000,
        }
    }
}

impl From<&OcrServiceConfig> for RetryPolicy {
    fn from(config: &OcrServiceConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
            ..Default::default()
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `retry_number` (1-indexed).
    pub fn delay_for(&self, retry_number: u32) -> Duration {
        if retry_number == 0 {
            return Duration::ZERO;
        }
        let factor = self.backoff_factor.max(1.0);
        let delay_ms = self.retry_delay_ms as f64 * factor.powi((retry_number - 1) as i32);
        Duration::from_millis(delay_ms.min(self.max_delay_ms as f64) as u64)
    }

    /// Whether another attempt is allowed after `attempts_made` attempts.
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made <= self.max_retries
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}
