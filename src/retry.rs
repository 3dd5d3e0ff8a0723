//! Bounded retries with exponential backoff for transient backend failures.

use crate::error::{PolyglotError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum retries for a single backend call.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Upper bound for a single backoff (milliseconds).
const DEFAULT_MAX_DELAY_MS: u64 = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt; a call runs at most `max_retries + 1` times.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: Some(DEFAULT_MAX_DELAY_MS),
        }
    }
}

/// A successful value and the number of attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay_ms: base_delay.as_millis() as u64,
            max_delay_ms: None,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay_ms = Some(max_delay.as_millis() as u64);
        self
    }

    /// Delay before retry number `retry_index` (0-based): `base × 2^index`, capped.
    pub fn backoff(&self, retry_index: u32) -> Duration {
        let factor = 2u64.checked_pow(retry_index).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor);
        let capped = match self.max_delay_ms {
            Some(max) => delay.min(max),
            None => delay,
        };
        Duration::from_millis(capped)
    }

    /// Run `operation` until it succeeds, fails permanently, or runs out of retries.
    ///
    /// The closure receives the 1-based attempt number. Only transient
    /// errors are retried; anything else is returned unchanged.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<Attempted<T>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation(attempt).await {
                Ok(value) => {
                    return Ok(Attempted {
                        value,
                        attempts: attempt,
                    })
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt > self.max_retries => {
                    warn!("Giving up after {} attempts: {}", attempt, e);
                    return Err(PolyglotError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.backoff(attempt - 1);
                    debug!(
                        "Attempt {} failed ({}), retrying in {}ms",
                        attempt,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
