//! Retry policy with exponential backoff
//!
//! Only transient failures are retried. Permanent failures and access
//! denials propagate to the caller on the first occurrence; the orchestrator
//! decides what each means for the run.

use crate::client::ClientError;
use crate::policy::CircuitBreaker;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-run retry configuration
///
/// A value object: construct once, pass by reference to every call site.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt (3 means up to 4 calls total)
    pub max_retries: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Ceiling for any single backoff sleep
    pub max_delay: Duration,

    /// Growth factor between consecutive delays
    pub multiplier: f64,

    /// Randomizes each delay into [50%, 100%] of its nominal value to keep
    /// concurrent runs from synchronizing
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Computes the backoff delay before retry number `attempt` (0-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let nominal = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = nominal.min(self.max_delay.as_secs_f64());
        let jittered = if self.jitter {
            capped * (0.5 + fastrand::f64() * 0.5)
        } else {
            capped
        };
        Duration::from_secs_f64(jittered)
    }

    /// Runs an operation under this policy and the given breaker
    ///
    /// Transient failures are retried up to `max_retries` times; the last
    /// one is returned if the budget runs out. Access denials and permanent
    /// failures return immediately. An open breaker short-circuits the call
    /// as a transient failure without touching the network.
    pub async fn execute<T, F, Fut>(
        &self,
        breaker: &mut CircuitBreaker,
        mut operation: F,
    ) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt = 0;
        loop {
            if !breaker.allow() {
                return Err(ClientError::Transient(
                    "circuit breaker open, call not attempted".to_string(),
                ));
            }

            match operation().await {
                Ok(value) => {
                    breaker.record_success();
                    return Ok(value);
                }
                Err(error) if error.is_transient() => {
                    breaker.record_failure();
                    if attempt >= self.max_retries {
                        warn!(%error, attempt, "retry budget exhausted");
                        return Err(error);
                    }
                    let delay = self.backoff_delay(attempt);
                    debug!(%error, attempt, delay_ms = delay.as_millis() as u64, "retrying after transient failure");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                // Access denied and permanent failures are never retried
                Err(error) => return Err(error),
            }
        }
    }
}
