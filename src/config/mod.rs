//! Configuration module for catalog-sift
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use catalog_sift::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("catalog-sift.toml")).unwrap();
//! println!("Ingest batch size: {}", config.pipeline.batch_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, GatewayConfig, OutputConfig, PipelineConfig, SearchEntry, StagingConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
