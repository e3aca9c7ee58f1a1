//! Retry and circuit-breaker policy module
//!
//! Wraps gateway calls with exponential backoff, attempt caps, and a
//! breaker that sheds load after repeated transient failures. Policies are
//! plain value objects constructed once per run and threaded through call
//! sites; there is no global retry state.

mod breaker;
mod retry;

pub use breaker::{BreakerState, CircuitBreaker};
pub use retry::RetryPolicy;
