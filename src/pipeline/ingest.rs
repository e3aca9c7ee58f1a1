//! Ingestion orchestrator
//!
//! Claims staged identifiers one at a time, fetches their detail payloads,
//! and persists the parsed specification as catalog items. One item is the
//! unit of atomicity: a crash between items loses nothing, and a claimed
//! identifier that never completes stays visible as `processing`.

use crate::client::GatewayClient;
use crate::config::Config;
use crate::pipeline::{call_delay, retry_policy};
use crate::policy::CircuitBreaker;
use crate::state::RunOutcome;
use crate::storage::Storage;
use crate::SiftError;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Options for one ingest run, mostly CLI pass-through
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Overrides the configured batch size
    pub batch_size: Option<u32>,

    /// Overrides the configured inter-call delay
    pub delay_ms: Option<u64>,

    /// Only claim identifiers with priority above zero
    pub priority_only: bool,

    /// Reset eligible failed identifiers to pending before claiming
    pub retry_failed: bool,

    /// Print queue statistics and exit without any external call
    pub stats_only: bool,

    /// List what would be processed without claiming or calling
    pub dry_run: bool,
}

/// Result of one ingest run
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcome: RunOutcome,
}

/// Runs one ingest batch against the staging queue
///
/// Access denial from the provider stops the run cooperatively: the current
/// claim is released back to pending with its attempt refunded, unclaimed
/// identifiers are untouched, and the report carries `RunOutcome::Aborted`.
pub async fn run_ingest(
    config: &Config,
    storage: &mut dyn Storage,
    client: &GatewayClient,
    options: &IngestOptions,
) -> Result<IngestReport, SiftError> {
    let mut report = IngestReport::default();

    if options.retry_failed {
        let batch_size = effective_batch_size(config, options);
        let reset = storage.retry_failed(batch_size)?;
        info!(reset, "reset failed identifiers to pending");
    }

    if options.stats_only {
        let stats = storage.staging_stats()?;
        info!(total = stats.total, "staging queue");
        for (status, count) in &stats.by_status {
            info!("  {}: {}", status, count);
        }
        return Ok(report);
    }

    let batch_size = effective_batch_size(config, options);
    let batch = storage.next_batch(batch_size, options.priority_only)?;
    if batch.is_empty() {
        info!("staging queue has no pending identifiers");
        return Ok(report);
    }

    if options.dry_run {
        info!(count = batch.len(), "dry run, would process:");
        for record in &batch {
            info!(
                "  {} (priority {}, attempts {})",
                record.external_ref, record.priority, record.attempts
            );
        }
        return Ok(report);
    }

    let policy = retry_policy(&config.pipeline);
    let mut breaker = CircuitBreaker::default();
    let delay = call_delay(&config.pipeline, options.delay_ms);
    let last_index = batch.len() - 1;

    info!(count = batch.len(), "starting ingest batch");

    for (index, record) in batch.iter().enumerate() {
        if !storage.claim(record.id)? {
            debug!(external_ref = %record.external_ref, "claim lost, skipping");
            continue;
        }
        report.processed += 1;

        // The catalog may have gained this identifier since it was staged;
        // never spend a paid call on known data.
        if storage.in_catalog(&record.external_ref)? {
            storage.mark_skipped(record.id)?;
            report.skipped += 1;
            debug!(external_ref = %record.external_ref, "already cataloged, skipped");
            continue;
        }

        let started = Instant::now();
        let result = policy
            .execute(&mut breaker, || client.fetch_detail(&record.external_ref))
            .await;
        let latency_ms = started.elapsed().as_millis() as i64;

        match result {
            Ok(detail) => {
                storage.record_usage(
                    Some(&record.external_ref),
                    "detail",
                    true,
                    latency_ms,
                    None,
                )?;
                let item_id =
                    storage.insert_item(&record.external_ref, &detail.fields, &detail.missing)?;
                storage.mark_completed(record.id, item_id)?;
                if let Some(price) = detail.fields.price_usd {
                    if price > 0.0 {
                        storage.record_price_observation(
                            &record.external_ref,
                            None,
                            price,
                            crate::storage::PriceSource::Detail,
                        )?;
                    }
                }
                report.succeeded += 1;
                info!(external_ref = %record.external_ref, item_id, "ingested");
            }
            Err(error) if error.is_access_denied() => {
                storage.record_usage(
                    Some(&record.external_ref),
                    "detail",
                    false,
                    latency_ms,
                    Some(error.kind()),
                )?;
                warn!(external_ref = %record.external_ref, %error, "provider denied access, aborting run");
                storage.release_to_pending(record.id)?;
                report.processed -= 1;
                report.outcome = RunOutcome::Aborted;
                break;
            }
            Err(error) => {
                storage.record_usage(
                    Some(&record.external_ref),
                    "detail",
                    false,
                    latency_ms,
                    Some(error.kind()),
                )?;
                let status =
                    storage.mark_failed(record.id, &error.to_string(), error.is_permanent())?;
                report.failed += 1;
                warn!(external_ref = %record.external_ref, %error, %status, "ingest failed");
            }
        }

        if index < last_index && !report.outcome.is_aborted() {
            tokio::time::sleep(delay).await;
        }
    }

    info!(
        processed = report.processed,
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        aborted = report.outcome.is_aborted(),
        "ingest batch finished"
    );

    Ok(report)
}

fn effective_batch_size(config: &Config, options: &IngestOptions) -> usize {
    options.batch_size.unwrap_or(config.pipeline.batch_size) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_batch_size_prefers_override() {
        let config = Config {
            gateway: crate::config::GatewayConfig {
                api_key: "k".to_string(),
                base_url: "https://gw.example.com".to_string(),
                catalog_base_url: "https://cat.example.com".to_string(),
                country_code: "us".to_string(),
            },
            pipeline: crate::config::PipelineConfig {
                batch_size: 10,
                ..Default::default()
            },
            staging: Default::default(),
            output: crate::config::OutputConfig {
                database_path: ":memory:".to_string(),
            },
            search: vec![],
        };

        let defaults = IngestOptions::default();
        assert_eq!(effective_batch_size(&config, &defaults), 10);

        let overridden = IngestOptions {
            batch_size: Some(3),
            ..Default::default()
        };
        assert_eq!(effective_batch_size(&config, &overridden), 3);
    }
}
