//! Catalog-Sift: a product-data acquisition pipeline
//!
//! This crate discovers item identifiers through keyword searches against an
//! external catalog gateway, stages them in a durable queue, fetches and
//! normalizes free-text specification payloads into typed fields, and
//! reconciles prices while respecting operator-entered corrections.

pub mod client;
pub mod config;
pub mod guard;
pub mod output;
pub mod pipeline;
pub mod policy;
pub mod state;
pub mod storage;
pub mod units;

use thiserror::Error;

/// Main error type for Catalog-Sift operations
#[derive(Debug, Error)]
pub enum SiftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Gateway error: {0}")]
    Client(#[from] client::ClientError),

    #[error("Parse error: {0}")]
    Parse(#[from] units::ParseError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Catalog-Sift operations
pub type Result<T> = std::result::Result<T, SiftError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use client::{ClientError, GatewayClient, ItemDetail, SearchPage};
pub use config::Config;
pub use guard::{CandidateFields, Field, FieldSet};
pub use policy::RetryPolicy;
pub use state::{RunOutcome, StageStatus};
