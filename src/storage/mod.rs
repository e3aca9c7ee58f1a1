//! Storage module for persisting pipeline data
//!
//! This module handles all database operations for the pipeline, including:
//! - SQLite database initialization and schema management
//! - The staging queue of discovered identifiers
//! - Catalog item persistence with protected-field bookkeeping
//! - Price observation and usage audit trails

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::guard::FieldSet;
use crate::state::StageStatus;
use crate::SiftError;

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SiftError> {
    SqliteStorage::new(path)
}

/// Represents a staged identifier in the queue
#[derive(Debug, Clone)]
pub struct StagedRecord {
    pub id: i64,
    pub external_ref: String,
    pub source_type: SourceType,
    pub source_keyword: Option<String>,
    pub priority: i64,
    pub status: StageStatus,
    pub attempts: i64,
    pub max_attempts: i64,
    pub last_error: Option<String>,
    pub permanent_failure: bool,
    pub item_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Represents a catalog item's specification record
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub id: i64,
    pub external_ref: String,
    pub name: String,
    pub brand: Option<String>,
    pub length_cm: Option<f64>,
    pub width_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub power_w: Option<i64>,
    pub voltage_v: Option<f64>,
    pub price_usd: Option<f64>,
    pub protected_fields: FieldSet,
    pub missing_fields: FieldSet,
    pub created_at: String,
    pub updated_at: String,
}

/// One entry in the append-only price audit trail
#[derive(Debug, Clone)]
pub struct PriceObservation {
    pub id: i64,
    pub external_ref: String,
    pub old_price: Option<f64>,
    pub new_price: f64,
    pub source: PriceSource,
    pub observed_at: String,
}

/// One entry in the external-call usage log
#[derive(Debug, Clone)]
pub struct UsageRecord {
    pub id: i64,
    pub external_ref: Option<String>,
    pub operation: String,
    pub success: bool,
    pub latency_ms: i64,
    pub error_kind: Option<String>,
    pub observed_at: String,
}

/// How an identifier entered the staging queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Search,
    Manual,
    Other,
}

impl SourceType {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Manual => "manual",
            Self::Other => "other",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "search" => Some(Self::Search),
            "manual" => Some(Self::Manual),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Where a price observation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    Search,
    Detail,
}

impl PriceSource {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Detail => "detail",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "search" => Some(Self::Search),
            "detail" => Some(Self::Detail),
            _ => None,
        }
    }
}

/// Result of attempting to stage an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Newly queued as pending
    Staged,

    /// Already present in the queue; nothing changed
    AlreadyStaged,

    /// Already present in the catalog; recorded as a duplicate discovery
    KnownInCatalog,
}

/// Filter for bulk staged-queue management
///
/// An empty filter matches nothing; destructive callers must name at least
/// one criterion.
#[derive(Debug, Clone, Default)]
pub struct PruneFilter {
    pub source_type: Option<SourceType>,
    pub keyword_like: Option<String>,
    pub status: Option<StageStatus>,
}

impl PruneFilter {
    pub fn is_empty(&self) -> bool {
        self.source_type.is_none() && self.keyword_like.is_none() && self.status.is_none()
    }
}

/// Counts of staged identifiers by status
#[derive(Debug, Clone, Default)]
pub struct StagingStats {
    pub total: u64,
    pub by_status: std::collections::HashMap<StageStatus, u64>,
}

/// Aggregate view of the external-call usage log
#[derive(Debug, Clone, Default)]
pub struct UsageSummary {
    pub total_calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub avg_latency_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_roundtrip() {
        for source in &[SourceType::Search, SourceType::Manual, SourceType::Other] {
            assert_eq!(
                SourceType::from_db_string(source.to_db_string()),
                Some(*source)
            );
        }
        assert_eq!(SourceType::from_db_string("competitor"), None);
    }

    #[test]
    fn test_price_source_roundtrip() {
        for source in &[PriceSource::Search, PriceSource::Detail] {
            assert_eq!(
                PriceSource::from_db_string(source.to_db_string()),
                Some(*source)
            );
        }
        assert_eq!(PriceSource::from_db_string("manual"), None);
    }

    #[test]
    fn test_prune_filter_emptiness() {
        assert!(PruneFilter::default().is_empty());
        let filter = PruneFilter {
            status: Some(StageStatus::Duplicate),
            ..Default::default()
        };
        assert!(!filter.is_empty());
    }
}
