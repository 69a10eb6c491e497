//! Bounded retry with exponential backoff.
//!
//! Used for resource acquisition at startup only. Steady-state failures are
//! recovered per event and never retried here.

use std::time::Duration;
use thiserror::Error;

/// Retry schedule: `attempts` tries, delays doubling from `base_delay`,
/// capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Backoff {
    pub fn new(attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Backoff {
            attempts,
            base_delay,
            max_delay,
        }
    }

    /// From the `[store]` section.
    pub fn from_store_config(config: &tr_config::StoreConfig) -> Self {
        Backoff::new(
            config.connect_attempts,
            Duration::from_millis(config.connect_base_delay_ms),
            Duration::from_millis(config.connect_max_delay_ms),
        )
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exp)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// All attempts failed.
#[derive(Debug, Error)]
#[error("{label}: gave up after {attempts} attempts: {last}")]
pub struct RetryError<E: std::error::Error + 'static> {
    pub label: String,
    pub attempts: u32,
    #[source]
    pub last: E,
}

/// Run `op` until it succeeds or the schedule is exhausted.
///
/// `on_retry` sees each failure that will be retried, with the upcoming delay.
/// `sleep` is injected so tests run instantly.
pub fn retry_with_backoff<T, E, Op, OnRetry, Sleep>(
    label: &str,
    backoff: &Backoff,
    mut op: Op,
    mut on_retry: OnRetry,
    mut sleep: Sleep,
) -> Result<T, RetryError<E>>
where
    E: std::error::Error + 'static,
    Op: FnMut(u32) -> Result<T, E>,
    OnRetry: FnMut(u32, &E, Duration),
    Sleep: FnMut(Duration),
{
    let attempts = backoff.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => {
                return Err(RetryError {
                    label: label.to_string(),
                    attempts,
                    last: err,
                })
            }
            Err(err) => {
                let delay = backoff.delay_for(attempt);
                on_retry(attempt, &err, delay);
                sleep(delay);
                attempt += 1;
            }
        }
    }
}
