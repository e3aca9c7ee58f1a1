//! Output module for reporting on pipeline state
//!
//! This module handles:
//! - Loading queue, catalog, and usage statistics from storage
//! - Printing formatted statistics to stdout

pub mod stats;

pub use stats::{load_statistics, print_statistics, PipelineStatistics};
