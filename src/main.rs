//! catalog-sift main entry point
//!
//! This is the command-line interface for the catalog-sift ingestion pipeline.

use catalog_sift::client::GatewayClient;
use catalog_sift::config::{load_config_with_hash, Config};
use catalog_sift::output::{load_statistics, print_statistics};
use catalog_sift::pipeline::{
    run_discover, run_ingest, run_price_refresh, DiscoverOptions, IngestOptions,
    PriceRefreshOptions,
};
use catalog_sift::state::StageStatus;
use catalog_sift::storage::{open_storage, PruneFilter, SourceType, StageOutcome, Storage};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// catalog-sift: a product catalog ingestion pipeline
///
/// catalog-sift discovers product identifiers through keyword searches,
/// resolves them into normalized specification records through a paid
/// gateway, and keeps stored prices current, all while respecting rate
/// limits and retry budgets.
#[derive(Parser, Debug)]
#[command(name = "catalog-sift")]
#[command(version)]
#[command(about = "A product catalog ingestion pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, global = true, default_value = "./catalog-sift.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run keyword searches and stage discovered identifiers
    Discover {
        /// Keyword to search; repeatable. Defaults to the configured set
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// Result pages per CLI-supplied keyword
        #[arg(long)]
        pages: Option<u32>,

        /// Priority for identifiers staged by CLI-supplied keywords
        #[arg(long)]
        priority: Option<i64>,

        /// Show queue statistics without making any external call
        #[arg(long)]
        stats_only: bool,

        /// Delay between gateway calls in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Resolve staged identifiers into catalog items
    Ingest {
        /// Identifiers to claim in this run
        #[arg(long)]
        batch_size: Option<u32>,

        /// Delay between gateway calls in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Only claim identifiers with priority above zero
        #[arg(long)]
        priority_only: bool,

        /// Reset eligible failed identifiers to pending first
        #[arg(long)]
        retry_failed: bool,

        /// Show queue statistics without making any external call
        #[arg(long, conflicts_with = "dry_run")]
        stats_only: bool,

        /// List what would be processed without claiming or calling
        #[arg(long)]
        dry_run: bool,
    },

    /// Refresh stored prices from search pages and detail payloads
    RefreshPrices {
        /// Refresh items last updated at least this many days ago
        #[arg(long, default_value_t = 7)]
        days_old: i64,

        /// Maximum items refreshed in one run
        #[arg(long, default_value_t = 100)]
        limit: usize,

        /// Skip the search phase and use detail calls only
        #[arg(long)]
        detail_only: bool,

        /// Explicit item reference; repeatable. Overrides age selection
        #[arg(long = "refs")]
        refs: Vec<String>,

        /// Delay between gateway calls in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Manually stage one identifier for ingestion
    Stage {
        /// External reference to stage
        external_ref: String,

        /// Queue priority (higher is claimed first)
        #[arg(long, default_value_t = 0)]
        priority: i64,
    },

    /// Remove staged identifiers matching a filter (dry-run by default)
    Prune {
        /// Match rows staged by this source type (search, manual, other)
        #[arg(long)]
        source_type: Option<String>,

        /// Match rows whose source keyword contains this substring
        #[arg(long)]
        keyword_like: Option<String>,

        /// Match rows with this status
        #[arg(long)]
        status: Option<String>,

        /// Remove all duplicate-status rows
        #[arg(long, conflicts_with_all = ["source_type", "keyword_like", "status"])]
        duplicates: bool,

        /// Actually delete; without this, matched rows are only listed
        #[arg(long)]
        confirm: bool,
    },

    /// Show queue, catalog, and usage statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let aborted = match cli.command {
        Command::Discover {
            keywords,
            pages,
            priority,
            stats_only,
            delay_ms,
        } => {
            let options = DiscoverOptions {
                keywords,
                pages,
                priority,
                stats_only,
                delay_ms,
            };
            handle_discover(&config, &options).await?
        }
        Command::Ingest {
            batch_size,
            delay_ms,
            priority_only,
            retry_failed,
            stats_only,
            dry_run,
        } => {
            let options = IngestOptions {
                batch_size,
                delay_ms,
                priority_only,
                retry_failed,
                stats_only,
                dry_run,
            };
            handle_ingest(&config, &options).await?
        }
        Command::RefreshPrices {
            days_old,
            limit,
            detail_only,
            refs,
            delay_ms,
        } => {
            let options = PriceRefreshOptions {
                days_old,
                limit,
                detail_only,
                refs,
                delay_ms,
            };
            handle_refresh_prices(&config, &options).await?
        }
        Command::Stage {
            external_ref,
            priority,
        } => {
            handle_stage(&config, &external_ref, priority)?;
            false
        }
        Command::Prune {
            source_type,
            keyword_like,
            status,
            duplicates,
            confirm,
        } => {
            handle_prune(&config, source_type, keyword_like, status, duplicates, confirm)?;
            false
        }
        Command::Stats => {
            handle_stats(&config)?;
            false
        }
    };

    if aborted {
        tracing::error!("Run aborted: provider denied access; staged work was released");
        std::process::exit(2);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_sift=info,warn"),
            1 => EnvFilter::new("catalog_sift=debug,info"),
            2 => EnvFilter::new("catalog_sift=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the discover subcommand; returns true if the run aborted
async fn handle_discover(
    config: &Config,
    options: &DiscoverOptions,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut storage = open_storage(std::path::Path::new(&config.output.database_path))?;
    storage.set_default_max_attempts(config.staging.max_attempts);
    let client = GatewayClient::new(&config.gateway, config.pipeline.price_tie_break)?;

    let report = run_discover(config, &mut storage, &client, options).await?;

    println!("=== Discovery Report ===\n");
    for keyword in &report.keywords {
        println!(
            "  {}: {} staged, {} duplicates, {} already queued",
            keyword.keyword, keyword.staged, keyword.duplicates, keyword.already_staged
        );
    }
    println!("\nTotal staged: {}", report.total_staged());

    Ok(report.outcome.is_aborted())
}

/// Handles the ingest subcommand; returns true if the run aborted
async fn handle_ingest(
    config: &Config,
    options: &IngestOptions,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut storage = open_storage(std::path::Path::new(&config.output.database_path))?;
    let client = GatewayClient::new(&config.gateway, config.pipeline.price_tie_break)?;

    let report = run_ingest(config, &mut storage, &client, options).await?;

    println!("=== Ingest Report ===\n");
    println!("  Processed: {}", report.processed);
    println!("  Succeeded: {}", report.succeeded);
    println!("  Failed: {}", report.failed);
    println!("  Skipped: {}", report.skipped);

    Ok(report.outcome.is_aborted())
}

/// Handles the refresh-prices subcommand; returns true if the run aborted
async fn handle_refresh_prices(
    config: &Config,
    options: &PriceRefreshOptions,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut storage = open_storage(std::path::Path::new(&config.output.database_path))?;
    let client = GatewayClient::new(&config.gateway, config.pipeline.price_tie_break)?;

    let report = run_price_refresh(config, &mut storage, &client, options).await?;

    println!("=== Price Refresh Report ===\n");
    println!("  Examined: {}", report.examined);
    println!("  Updated: {}", report.updated);
    println!("  Unchanged: {}", report.unchanged);
    println!("  Rejected: {}", report.rejected);
    println!("  Protected: {}", report.protected);
    println!("  Failed: {}", report.failed);

    Ok(report.outcome.is_aborted())
}

/// Handles the stage subcommand
fn handle_stage(
    config: &Config,
    external_ref: &str,
    priority: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut storage = open_storage(std::path::Path::new(&config.output.database_path))?;
    storage.set_default_max_attempts(config.staging.max_attempts);

    let outcome = storage.stage(external_ref, SourceType::Manual, None, priority)?;
    match outcome {
        StageOutcome::Staged => println!("✓ Staged {} (priority {})", external_ref, priority),
        StageOutcome::AlreadyStaged => println!("{} is already in the queue", external_ref),
        StageOutcome::KnownInCatalog => {
            println!("{} is already in the catalog; recorded as duplicate", external_ref)
        }
    }

    Ok(())
}

/// Handles the prune subcommand with its preview-then-confirm flow
fn handle_prune(
    config: &Config,
    source_type: Option<String>,
    keyword_like: Option<String>,
    status: Option<String>,
    duplicates: bool,
    confirm: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut storage = open_storage(std::path::Path::new(&config.output.database_path))?;

    if duplicates {
        if confirm {
            let removed = storage.clear_duplicates()?;
            println!("✓ Removed {} duplicate rows", removed);
        } else {
            let filter = PruneFilter {
                status: Some(StageStatus::Duplicate),
                ..Default::default()
            };
            let matched = storage.find_staged(&filter)?;
            println!(
                "{} duplicate rows would be removed (re-run with --confirm)",
                matched.len()
            );
        }
        return Ok(());
    }

    let filter = PruneFilter {
        source_type: source_type
            .as_deref()
            .map(|s| {
                SourceType::from_db_string(s)
                    .ok_or_else(|| format!("unknown source type '{}'", s))
            })
            .transpose()?,
        keyword_like,
        status: status
            .as_deref()
            .map(|s| {
                StageStatus::from_db_string(s).ok_or_else(|| format!("unknown status '{}'", s))
            })
            .transpose()?,
    };

    if filter.is_empty() {
        return Err("prune needs at least one filter (--source-type, --keyword-like, --status) or --duplicates".into());
    }

    let matched = storage.find_staged(&filter)?;
    if matched.is_empty() {
        println!("No staged identifiers match the filter");
        return Ok(());
    }

    if confirm {
        let removed = storage.remove_staged(&filter)?;
        println!("✓ Removed {} staged identifiers", removed);
    } else {
        println!("{} staged identifiers would be removed:", matched.len());
        for record in &matched {
            println!(
                "  {} ({}, {}{})",
                record.external_ref,
                record.status,
                record.source_type.to_db_string(),
                record
                    .source_keyword
                    .as_deref()
                    .map(|k| format!(", keyword '{}'", k))
                    .unwrap_or_default()
            );
        }
        println!("\nRe-run with --confirm to delete");
    }

    Ok(())
}

/// Handles the stats subcommand
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(std::path::Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}
