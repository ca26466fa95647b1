//! Bounded retry with exponential backoff for network operations.
//!
//! Every provider call that touches the network runs under a [`RetryPolicy`]:
//! transient failures are retried with a doubling delay up to a cap, and only
//! an exhausted policy surfaces as a fatal error to the orchestrator.

use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// All attempts of a retried operation failed.
#[derive(Debug, Error)]
#[error("{what} failed after {attempts} attempts: {last_error}")]
pub struct RetryExhausted {
    /// Description of the operation.
    pub what: String,
    /// Number of attempts made.
    pub attempts: u32,
    /// Message of the last failure.
    pub last_error: String,
}

/// Retry schedule: bounded attempts with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Ceiling for the doubling delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Run `op` until it succeeds or all attempts are spent.
    ///
    /// The closure receives the 1-based attempt number. Every error is
    /// treated as transient; callers encode permanent outcomes (such as a
    /// tile that does not exist) as `Ok` values.
    pub fn run<T, E, F>(&self, what: &str, mut op: F) -> Result<T, RetryExhausted>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let attempts = self.max_attempts.max(1);
        let mut delay = self.initial_delay;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    last_error = err.to_string();
                    if attempt < attempts {
                        warn!(
                            what,
                            attempt,
                            max_attempts = attempts,
                            error = %last_error,
                            "transient failure, retrying"
                        );
                        if !delay.is_zero() {
                            std::thread::sleep(delay);
                        }
                        delay = std::cmp::min(delay * 2, self.max_delay);
                    }
                }
            }
        }

        Err(RetryExhausted {
            what: what.to_string(),
            attempts,
            last_error,
        })
    }
}
