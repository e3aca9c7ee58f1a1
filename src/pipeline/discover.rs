//! Discovery orchestrator
//!
//! Runs the configured keyword searches and feeds every identifier they
//! surface into the staging queue. Discovery is cheap relative to detail
//! ingestion, so it runs as its own phase; the queue decouples the two.

use crate::client::GatewayClient;
use crate::config::{Config, SearchEntry};
use crate::pipeline::{call_delay, retry_policy};
use crate::policy::CircuitBreaker;
use crate::state::RunOutcome;
use crate::storage::{SourceType, StageOutcome, Storage};
use crate::SiftError;
use std::time::Instant;
use tracing::{info, warn};

/// Options for one discovery run
#[derive(Debug, Clone, Default)]
pub struct DiscoverOptions {
    /// Keywords to search; empty means the configured search set
    pub keywords: Vec<String>,

    /// Pages per keyword for CLI-supplied keywords
    pub pages: Option<u32>,

    /// Priority for identifiers staged by CLI-supplied keywords
    pub priority: Option<i64>,

    /// Print queue statistics and exit without any external call
    pub stats_only: bool,

    /// Overrides the configured inter-call delay
    pub delay_ms: Option<u64>,
}

/// Staging counts for one keyword
#[derive(Debug, Clone)]
pub struct KeywordReport {
    pub keyword: String,
    pub staged: usize,
    pub duplicates: usize,
    pub already_staged: usize,
}

/// Result of one discovery run
#[derive(Debug, Clone, Default)]
pub struct DiscoverReport {
    pub keywords: Vec<KeywordReport>,
    pub outcome: RunOutcome,
}

impl DiscoverReport {
    pub fn total_staged(&self) -> usize {
        self.keywords.iter().map(|k| k.staged).sum()
    }
}

/// Runs keyword discovery against the search gateway
///
/// Every identifier a result page lists is staged; identifiers already in
/// the catalog are recorded as duplicates so wasted discovery stays visible.
/// Access denial aborts the run after the current page.
pub async fn run_discover(
    config: &Config,
    storage: &mut dyn Storage,
    client: &GatewayClient,
    options: &DiscoverOptions,
) -> Result<DiscoverReport, SiftError> {
    let mut report = DiscoverReport::default();

    if options.stats_only {
        let stats = storage.staging_stats()?;
        info!(total = stats.total, "staging queue");
        for (status, count) in &stats.by_status {
            info!("  {}: {}", status, count);
        }
        return Ok(report);
    }

    let entries = resolve_entries(config, options);
    if entries.is_empty() {
        info!("no search keywords configured, nothing to discover");
        return Ok(report);
    }

    let policy = retry_policy(&config.pipeline);
    let mut breaker = CircuitBreaker::default();
    let delay = call_delay(&config.pipeline, options.delay_ms);
    let total_calls: u32 = entries.iter().map(|e| e.pages).sum();
    let mut calls_made: u32 = 0;

    'keywords: for entry in &entries {
        let mut counts = KeywordReport {
            keyword: entry.keyword.clone(),
            staged: 0,
            duplicates: 0,
            already_staged: 0,
        };

        for page in 1..=entry.pages {
            let started = Instant::now();
            let result = policy
                .execute(&mut breaker, || client.search(&entry.keyword, page))
                .await;
            let latency_ms = started.elapsed().as_millis() as i64;
            calls_made += 1;

            match result {
                Ok(search_page) => {
                    storage.record_usage(None, "search", true, latency_ms, None)?;
                    for external_ref in &search_page.identifiers {
                        let outcome = storage.stage(
                            external_ref,
                            SourceType::Search,
                            Some(&entry.keyword),
                            entry.priority,
                        )?;
                        match outcome {
                            StageOutcome::Staged => counts.staged += 1,
                            StageOutcome::AlreadyStaged => counts.already_staged += 1,
                            StageOutcome::KnownInCatalog => counts.duplicates += 1,
                        }
                    }
                    info!(
                        keyword = %entry.keyword,
                        page,
                        found = search_page.identifiers.len(),
                        staged = counts.staged,
                        "search page processed"
                    );
                }
                Err(error) if error.is_access_denied() => {
                    storage.record_usage(None, "search", false, latency_ms, Some(error.kind()))?;
                    warn!(keyword = %entry.keyword, %error, "provider denied access, aborting discovery");
                    report.outcome = RunOutcome::Aborted;
                    report.keywords.push(counts);
                    break 'keywords;
                }
                Err(error) => {
                    storage.record_usage(None, "search", false, latency_ms, Some(error.kind()))?;
                    warn!(keyword = %entry.keyword, page, %error, "search failed, moving on");
                }
            }

            if calls_made < total_calls {
                tokio::time::sleep(delay).await;
            }
        }

        info!(
            keyword = %entry.keyword,
            staged = counts.staged,
            duplicates = counts.duplicates,
            already_staged = counts.already_staged,
            "keyword finished"
        );
        report.keywords.push(counts);
    }

    Ok(report)
}

/// CLI keywords override the configured search set
fn resolve_entries(config: &Config, options: &DiscoverOptions) -> Vec<SearchEntry> {
    if options.keywords.is_empty() {
        return config.search.clone();
    }
    options
        .keywords
        .iter()
        .map(|keyword| SearchEntry {
            keyword: keyword.clone(),
            pages: options.pages.unwrap_or(1),
            priority: options.priority.unwrap_or(0),
        })
        .collect()
}
