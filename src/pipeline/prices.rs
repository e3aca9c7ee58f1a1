//! Price reconciliation orchestrator
//!
//! Keeps stored prices current without re-ingesting whole items. Search
//! pages carry prices for many items per call, so the search phase runs
//! first; only items a search did not cover fall back to per-item detail
//! calls. Every accepted change lands in the append-only observation trail.

use crate::client::{GatewayClient, PriceTieBreak};
use crate::config::Config;
use crate::guard::{apply_update, CandidateFields, Field};
use crate::pipeline::{call_delay, retry_policy};
use crate::policy::CircuitBreaker;
use crate::state::RunOutcome;
use crate::storage::{ItemRecord, PriceSource, Storage};
use crate::units::round2;
use crate::SiftError;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Options for one price-refresh run
#[derive(Debug, Clone)]
pub struct PriceRefreshOptions {
    /// Refresh items last updated at least this many days ago
    pub days_old: i64,

    /// Maximum number of items refreshed in one run
    pub limit: usize,

    /// Skip the search phase and go straight to detail calls
    pub detail_only: bool,

    /// Explicit item references; overrides age-based selection
    pub refs: Vec<String>,

    /// Overrides the configured inter-call delay
    pub delay_ms: Option<u64>,
}

impl Default for PriceRefreshOptions {
    fn default() -> Self {
        Self {
            days_old: 7,
            limit: 100,
            detail_only: false,
            refs: Vec::new(),
            delay_ms: None,
        }
    }
}

/// Result of one price-refresh run
#[derive(Debug, Clone, Default)]
pub struct PriceRefreshReport {
    /// Items selected for refresh
    pub examined: usize,

    /// Items whose stored price changed
    pub updated: usize,

    /// Items whose fresh price matched the stored one
    pub unchanged: usize,

    /// Fresh prices rejected as zero or unparseable; prior value kept
    pub rejected: usize,

    /// Updates blocked because `price_usd` is protected
    pub protected: usize,

    /// Detail calls that failed outright
    pub failed: usize,

    pub outcome: RunOutcome,
}

/// Refreshes stored prices from search pages and detail payloads
pub async fn run_price_refresh(
    config: &Config,
    storage: &mut dyn Storage,
    client: &GatewayClient,
    options: &PriceRefreshOptions,
) -> Result<PriceRefreshReport, SiftError> {
    let mut report = PriceRefreshReport::default();

    let targets = if options.refs.is_empty() {
        storage.items_needing_refresh(options.days_old, options.limit)?
    } else {
        storage.get_items_by_refs(&options.refs)?
    };
    report.examined = targets.len();
    if targets.is_empty() {
        info!("no items need a price refresh");
        return Ok(report);
    }

    let policy = retry_policy(&config.pipeline);
    let mut breaker = CircuitBreaker::default();
    let delay = call_delay(&config.pipeline, options.delay_ms);

    // Phase one: harvest prices from the configured searches. One search
    // page prices many items, so this phase amortizes paid calls.
    let mut satisfied: Vec<ItemRecord> = Vec::new();
    let mut remainder: Vec<ItemRecord> = Vec::new();

    if options.detail_only || config.search.is_empty() {
        remainder = targets;
    } else {
        let search_prices = match harvest_search_prices(
            config,
            storage,
            client,
            &policy,
            &mut breaker,
            delay,
        )
        .await?
        {
            Some(prices) => prices,
            None => {
                report.outcome = RunOutcome::Aborted;
                return Ok(report);
            }
        };

        for item in targets {
            if search_prices.contains_key(&item.external_ref) {
                satisfied.push(item);
            } else {
                remainder.push(item);
            }
        }

        for mut item in satisfied {
            // contains_key checked above
            if let Some(price) = search_prices.get(&item.external_ref).copied() {
                apply_price(storage, &mut item, price, PriceSource::Search, &mut report)?;
            }
        }
    }

    // Phase two: per-item detail calls for whatever search did not cover.
    let last_index = remainder.len().saturating_sub(1);
    for (index, mut item) in remainder.into_iter().enumerate() {
        let started = Instant::now();
        let result = policy
            .execute(&mut breaker, || client.fetch_detail(&item.external_ref))
            .await;
        let latency_ms = started.elapsed().as_millis() as i64;

        match result {
            Ok(detail) => {
                storage.record_usage(Some(&item.external_ref), "detail", true, latency_ms, None)?;
                match detail.fields.price_usd {
                    Some(price) => {
                        apply_price(storage, &mut item, price, PriceSource::Detail, &mut report)?;
                    }
                    None => {
                        warn!(external_ref = %item.external_ref, "detail payload had no usable price");
                        report.rejected += 1;
                    }
                }
            }
            Err(error) if error.is_access_denied() => {
                storage.record_usage(
                    Some(&item.external_ref),
                    "detail",
                    false,
                    latency_ms,
                    Some(error.kind()),
                )?;
                warn!(external_ref = %item.external_ref, %error, "provider denied access, aborting refresh");
                report.outcome = RunOutcome::Aborted;
                break;
            }
            Err(error) => {
                storage.record_usage(
                    Some(&item.external_ref),
                    "detail",
                    false,
                    latency_ms,
                    Some(error.kind()),
                )?;
                warn!(external_ref = %item.external_ref, %error, "price refresh call failed");
                report.failed += 1;
            }
        }

        if index < last_index && !report.outcome.is_aborted() {
            tokio::time::sleep(delay).await;
        }
    }

    info!(
        examined = report.examined,
        updated = report.updated,
        unchanged = report.unchanged,
        rejected = report.rejected,
        protected = report.protected,
        failed = report.failed,
        aborted = report.outcome.is_aborted(),
        "price refresh finished"
    );

    Ok(report)
}

/// Runs the configured searches once, merging price maps across pages
///
/// Returns None when the provider denies access mid-harvest.
async fn harvest_search_prices(
    config: &Config,
    storage: &mut dyn Storage,
    client: &GatewayClient,
    policy: &crate::policy::RetryPolicy,
    breaker: &mut CircuitBreaker,
    delay: std::time::Duration,
) -> Result<Option<HashMap<String, f64>>, SiftError> {
    let mut merged: HashMap<String, f64> = HashMap::new();
    let tie_break = config.pipeline.price_tie_break;
    let total_calls: u32 = config.search.iter().map(|e| e.pages).sum();
    let mut calls_made: u32 = 0;

    for entry in &config.search {
        for page in 1..=entry.pages {
            let started = Instant::now();
            let result = policy
                .execute(breaker, || client.search(&entry.keyword, page))
                .await;
            let latency_ms = started.elapsed().as_millis() as i64;
            calls_made += 1;

            match result {
                Ok(search_page) => {
                    storage.record_usage(None, "search", true, latency_ms, None)?;
                    for (external_ref, price) in search_page.prices {
                        match tie_break {
                            PriceTieBreak::LastWins => {
                                merged.insert(external_ref, price);
                            }
                            PriceTieBreak::FirstWins => {
                                merged.entry(external_ref).or_insert(price);
                            }
                        }
                    }
                }
                Err(error) if error.is_access_denied() => {
                    storage.record_usage(None, "search", false, latency_ms, Some(error.kind()))?;
                    warn!(keyword = %entry.keyword, %error, "provider denied access during search harvest");
                    return Ok(None);
                }
                Err(error) => {
                    storage.record_usage(None, "search", false, latency_ms, Some(error.kind()))?;
                    warn!(keyword = %entry.keyword, page, %error, "search harvest call failed");
                }
            }

            if calls_made < total_calls {
                tokio::time::sleep(delay).await;
            }
        }
    }

    debug!(prices = merged.len(), "search harvest complete");
    Ok(Some(merged))
}

/// Applies one fresh price to one item under the validation and guard rules
fn apply_price(
    storage: &mut dyn Storage,
    item: &mut ItemRecord,
    fresh_price: f64,
    source: PriceSource,
    report: &mut PriceRefreshReport,
) -> Result<(), SiftError> {
    let fresh = round2(fresh_price);
    if fresh <= 0.0 {
        warn!(
            external_ref = %item.external_ref,
            fresh_price,
            "rejecting non-positive price, keeping prior value"
        );
        report.rejected += 1;
        return Ok(());
    }

    let unchanged = item
        .price_usd
        .map(|old| (old - fresh).abs() < 0.005)
        .unwrap_or(false);
    if unchanged {
        // Confirming a price still counts as a refresh
        storage.touch_item(&item.external_ref)?;
        report.unchanged += 1;
        return Ok(());
    }

    let old_price = item.price_usd;
    let candidates = CandidateFields {
        price_usd: Some(fresh),
        ..Default::default()
    };
    let outcome = apply_update(item, &candidates);
    if outcome.skipped.contains(&Field::PriceUsd) {
        debug!(external_ref = %item.external_ref, "price is protected, not touching");
        report.protected += 1;
        return Ok(());
    }

    storage.save_item(item)?;
    storage.record_price_observation(&item.external_ref, old_price, fresh, source)?;
    report.updated += 1;
    info!(
        external_ref = %item.external_ref,
        ?old_price,
        new_price = fresh,
        source = source.to_db_string(),
        "price updated"
    );
    Ok(())
}
