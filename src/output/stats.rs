//! Statistics generation from the pipeline database
//!
//! This module provides functionality for extracting and displaying
//! queue, catalog, and usage statistics from the storage layer.

use crate::state::StageStatus;
use crate::storage::{StagingStats, Storage, UsageRecord, UsageSummary};
use crate::SiftError;

/// How many recent failed calls to surface in the statistics view
const RECENT_ERROR_LIMIT: usize = 10;

/// Pipeline statistics summary
#[derive(Debug, Clone)]
pub struct PipelineStatistics {
    /// Staging queue counts by status
    pub staging: StagingStats,

    /// Number of items in the catalog
    pub item_count: u64,

    /// Aggregate view of the external-call usage log
    pub usage: UsageSummary,

    /// Most recent failed external calls, newest first
    pub recent_errors: Vec<UsageRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(PipelineStatistics)` - Successfully loaded statistics
/// * `Err(SiftError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<PipelineStatistics, SiftError> {
    let staging = storage.staging_stats()?;
    let item_count = storage.item_count()?;
    let usage = storage.usage_summary()?;

    // The usage log mixes successes and failures; show only failures here
    let recent_errors = storage
        .recent_usage(RECENT_ERROR_LIMIT * 5)?
        .into_iter()
        .filter(|record| !record.success)
        .take(RECENT_ERROR_LIMIT)
        .collect();

    Ok(PipelineStatistics {
        staging,
        item_count,
        usage,
        recent_errors,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &PipelineStatistics) {
    println!("=== Pipeline Statistics ===\n");

    println!("Catalog:");
    println!("  Items: {}", stats.item_count);
    println!();

    println!("Staging Queue ({} total):", stats.staging.total);
    for status in StageStatus::all_statuses() {
        let count = stats.staging.by_status.get(&status).copied().unwrap_or(0);
        if count > 0 {
            let percentage = if stats.staging.total > 0 {
                (count as f64 / stats.staging.total as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", status, count, percentage);
        }
    }
    println!();

    println!("External Calls:");
    println!("  Total: {}", stats.usage.total_calls);
    println!("  Successes: {}", stats.usage.successes);
    println!("  Failures: {}", stats.usage.failures);
    println!("  Average latency: {:.0} ms", stats.usage.avg_latency_ms);

    let success_rate = if stats.usage.total_calls > 0 {
        (stats.usage.successes as f64 / stats.usage.total_calls as f64) * 100.0
    } else {
        0.0
    };
    println!("  Success rate: {:.1}%", success_rate);
    println!();

    if !stats.recent_errors.is_empty() {
        println!("Recent Failed Calls:");
        for record in &stats.recent_errors {
            println!(
                "  {} {} ({}) - {}",
                record.observed_at,
                record.operation,
                record.error_kind.as_deref().unwrap_or("unknown"),
                record.external_ref.as_deref().unwrap_or("-")
            );
        }
        println!();
    }
}
