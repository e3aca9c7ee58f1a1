use crate::client::PriceTieBreak;
use serde::Deserialize;

/// Main configuration structure for catalog-sift
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub staging: StagingConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub search: Vec<SearchEntry>,
}

/// Gateway provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// API key for the gateway provider
    #[serde(rename = "api-key")]
    pub api_key: String,

    /// Gateway endpoint all calls are routed through
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Base URL of the catalog site the gateway proxies
    #[serde(rename = "catalog-base-url")]
    pub catalog_base_url: String,

    /// Two-letter country code forwarded to the provider
    #[serde(rename = "country-code", default = "default_country_code")]
    pub country_code: String,
}

/// Pipeline pacing and retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of staged identifiers claimed per ingest batch
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Delay between consecutive gateway calls (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Retries after the first attempt for transient failures
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay (milliseconds)
    #[serde(rename = "base-backoff-ms", default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Ceiling for any single backoff delay (milliseconds)
    #[serde(rename = "max-backoff-ms", default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Which price wins when a search page repeats an identifier
    #[serde(rename = "price-tie-break", default)]
    pub price_tie_break: PriceTieBreak,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            request_delay_ms: default_request_delay_ms(),
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            price_tie_break: PriceTieBreak::default(),
        }
    }
}

/// Staging queue configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StagingConfig {
    /// Attempts before a transiently failing row stays failed
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// One configured discovery search
#[derive(Debug, Clone, Deserialize)]
pub struct SearchEntry {
    /// Search keyword sent to the catalog site
    pub keyword: String,

    /// Result pages to walk for this keyword
    #[serde(default = "default_pages")]
    pub pages: u32,

    /// Priority assigned to identifiers staged from this keyword
    #[serde(default)]
    pub priority: i64,
}

fn default_country_code() -> String {
    "us".to_string()
}

fn default_batch_size() -> u32 {
    10
}

fn default_request_delay_ms() -> u64 {
    2000
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_pages() -> u32 {
    1
}
