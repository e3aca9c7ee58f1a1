//! Pipeline orchestrators
//!
//! This module contains the run loops that tie the other layers together:
//! - `discover`: keyword searches that feed the staging queue
//! - `ingest`: claims staged identifiers and resolves them into catalog items
//! - `prices`: reconciles stored prices against fresh search/detail data
//!
//! All orchestrators share the same shape: a single logical worker, explicit
//! pacing between paid calls, and a cooperative stop when the provider denies
//! access. Interrupting a run is safe; state lives in storage, not in memory.

mod discover;
mod ingest;
mod prices;

pub use discover::{run_discover, DiscoverOptions, DiscoverReport, KeywordReport};
pub use ingest::{run_ingest, IngestOptions, IngestReport};
pub use prices::{run_price_refresh, PriceRefreshOptions, PriceRefreshReport};

use crate::config::PipelineConfig;
use crate::policy::RetryPolicy;
use std::time::Duration;

/// Builds the per-run retry policy from pipeline configuration
fn retry_policy(config: &PipelineConfig) -> RetryPolicy {
    RetryPolicy {
        max_retries: config.max_retries,
        base_delay: Duration::from_millis(config.base_backoff_ms),
        max_delay: Duration::from_millis(config.max_backoff_ms),
        ..Default::default()
    }
}

/// Resolves the inter-call delay, preferring a CLI override
fn call_delay(config: &PipelineConfig, override_ms: Option<u64>) -> Duration {
    Duration::from_millis(override_ms.unwrap_or(config.request_delay_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_from_config() {
        let config = PipelineConfig {
            max_retries: 5,
            base_backoff_ms: 250,
            max_backoff_ms: 10_000,
            ..Default::default()
        };
        let policy = retry_policy(&config);
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.max_delay, Duration::from_millis(10_000));
    }

    #[test]
    fn test_call_delay_override() {
        let config = PipelineConfig {
            request_delay_ms: 2000,
            ..Default::default()
        };
        assert_eq!(call_delay(&config, None), Duration::from_millis(2000));
        assert_eq!(call_delay(&config, Some(10)), Duration::from_millis(10));
    }
}
