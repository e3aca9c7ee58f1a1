//! Circuit breaker over transient gateway failures
//!
//! Repeated transient failures trip the breaker open; while open, calls are
//! short-circuited without touching the network. After a recovery window a
//! single probe call is allowed through (half-open); its outcome decides
//! whether the breaker closes again.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Breaker position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls flow normally
    Closed,

    /// Calls are short-circuited until the recovery window passes
    Open,

    /// One probe call is allowed through
    HalfOpen,
}

/// Consecutive-failure circuit breaker
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60))
    }
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            state: BreakerState::Closed,
            consecutive_failures: 0,
            opened_at: None,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    /// Decides whether a call may proceed, advancing open -> half-open when
    /// the recovery window has passed
    pub fn allow(&mut self) -> bool {
        match self.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let elapsed = self
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(self.recovery_timeout);
                if elapsed >= self.recovery_timeout {
                    info!("circuit breaker half-open, allowing a probe call");
                    self.state = BreakerState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Records a successful call, closing the breaker
    pub fn record_success(&mut self) {
        if self.state != BreakerState::Closed {
            info!("circuit breaker closed after successful call");
        }
        self.state = BreakerState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
    }

    /// Records a transient failure, possibly tripping the breaker
    pub fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        let tripped = self.state == BreakerState::HalfOpen
            || self.consecutive_failures >= self.failure_threshold;
        if tripped {
            warn!(
                failures = self.consecutive_failures,
                "circuit breaker opened"
            );
            self.state = BreakerState::Open;
            self.opened_at = Some(Instant::now());
        }
    }
}
