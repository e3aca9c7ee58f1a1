//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::guard::{CandidateFields, FieldSet};
use crate::state::StageStatus;
use crate::storage::{
    ItemRecord, PriceObservation, PriceSource, PruneFilter, SourceType, StageOutcome,
    StagedRecord, StagingStats, UsageRecord, UsageSummary,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Staged identifier not found: {0}")]
    StagedNotFound(String),

    #[error("Catalog item not found: {0}")]
    ItemNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the pipeline. It is
/// the system of record for both the staging queue and the catalog.
pub trait Storage {
    // ===== Staging Queue =====

    /// Checks whether an identifier is already resolved or queued
    ///
    /// Returns true if the identifier exists in the catalog or anywhere in
    /// the staging queue. Used before staging and again before fetching to
    /// avoid spending a paid call on known data.
    fn is_known(&self, external_ref: &str) -> StorageResult<bool>;

    /// Checks whether an identifier exists in the catalog
    fn in_catalog(&self, external_ref: &str) -> StorageResult<bool>;

    /// Stages an identifier for detail ingestion
    ///
    /// Idempotent: an identifier already in the queue is left untouched.
    /// An identifier already in the catalog is recorded with `duplicate`
    /// status so wasted discovery volume stays visible.
    fn stage(
        &mut self,
        external_ref: &str,
        source_type: SourceType,
        source_keyword: Option<&str>,
        priority: i64,
    ) -> StorageResult<StageOutcome>;

    /// Returns pending identifiers ordered by priority descending, then
    /// creation time ascending
    ///
    /// Identifiers in `processing` are never returned; claiming is a
    /// separate, atomic step.
    fn next_batch(&self, limit: usize, priority_only: bool) -> StorageResult<Vec<StagedRecord>>;

    /// Atomically claims a pending identifier for processing
    ///
    /// Transitions `pending -> processing` and increments the attempt
    /// counter in one conditional update. Returns false if the row was not
    /// pending anymore (another worker won the claim).
    fn claim(&mut self, id: i64) -> StorageResult<bool>;

    /// Marks a claimed identifier as successfully ingested
    fn mark_completed(&mut self, id: i64, item_id: i64) -> StorageResult<()>;

    /// Marks a claimed identifier as skipped (already resolved elsewhere)
    fn mark_skipped(&mut self, id: i64) -> StorageResult<()>;

    /// Records a failure and decides the retry-vs-terminal transition
    ///
    /// Permanent failures and exhausted attempt budgets become terminal
    /// `failed`; transient failures with budget left return to `pending`.
    /// Returns the resulting status.
    fn mark_failed(
        &mut self,
        id: i64,
        error: &str,
        is_permanent: bool,
    ) -> StorageResult<StageStatus>;

    /// Returns a claimed identifier to the pending queue
    ///
    /// Used when a run aborts on access denial: the claim's attempt
    /// increment is refunded so the outage does not consume retry budget.
    fn release_to_pending(&mut self, id: i64) -> StorageResult<()>;

    /// Resets eligible failed identifiers (attempts < max) back to pending
    ///
    /// Returns the number of identifiers reset.
    fn retry_failed(&mut self, limit: usize) -> StorageResult<usize>;

    /// Gets a staged identifier by its external reference
    fn get_staged_by_ref(&self, external_ref: &str) -> StorageResult<Option<StagedRecord>>;

    /// Lists staged identifiers matching a management filter
    fn find_staged(&self, filter: &PruneFilter) -> StorageResult<Vec<StagedRecord>>;

    /// Deletes staged identifiers matching a management filter
    ///
    /// Returns the number of rows removed. Callers are responsible for the
    /// preview-then-confirm flow; this method deletes unconditionally.
    fn remove_staged(&mut self, filter: &PruneFilter) -> StorageResult<usize>;

    /// Deletes all duplicate-status rows from the queue
    fn clear_duplicates(&mut self) -> StorageResult<usize>;

    /// Counts staged identifiers by status
    fn staging_stats(&self) -> StorageResult<StagingStats>;

    // ===== Catalog Items =====

    /// Inserts a new catalog item from parsed candidate fields
    ///
    /// Returns the new item ID. Fails on a duplicate external reference;
    /// callers check `in_catalog` first.
    fn insert_item(
        &mut self,
        external_ref: &str,
        fields: &CandidateFields,
        missing: &FieldSet,
    ) -> StorageResult<i64>;

    /// Gets a catalog item by its external reference
    fn get_item_by_ref(&self, external_ref: &str) -> StorageResult<Option<ItemRecord>>;

    /// Gets catalog items for a set of external references
    fn get_items_by_refs(&self, external_refs: &[String]) -> StorageResult<Vec<ItemRecord>>;

    /// Returns items whose `updated_at` is older than `days_old` days,
    /// oldest first, capped at `limit`
    fn items_needing_refresh(&self, days_old: i64, limit: usize)
        -> StorageResult<Vec<ItemRecord>>;

    /// Writes an item's mutable fields back, advancing `updated_at`
    fn save_item(&mut self, item: &ItemRecord) -> StorageResult<()>;

    /// Advances an item's `updated_at` without changing any field
    ///
    /// Used when a price refresh confirms the stored price is current.
    fn touch_item(&mut self, external_ref: &str) -> StorageResult<()>;

    /// Unions field names into an item's protected set (editor write path)
    ///
    /// Monotonic: names are only ever added, never removed.
    fn protect_fields(&mut self, external_ref: &str, fields: &FieldSet) -> StorageResult<()>;

    /// Counts catalog items
    fn item_count(&self) -> StorageResult<u64>;

    // ===== Price Observations =====

    /// Appends a price observation to the audit trail
    fn record_price_observation(
        &mut self,
        external_ref: &str,
        old_price: Option<f64>,
        new_price: f64,
        source: PriceSource,
    ) -> StorageResult<()>;

    /// Returns the most recent price observations, newest first
    fn recent_price_observations(&self, limit: usize) -> StorageResult<Vec<PriceObservation>>;

    // ===== Usage Records =====

    /// Appends an external-call usage record
    fn record_usage(
        &mut self,
        external_ref: Option<&str>,
        operation: &str,
        success: bool,
        latency_ms: i64,
        error_kind: Option<&str>,
    ) -> StorageResult<()>;

    /// Returns the most recent usage records, newest first
    fn recent_usage(&self, limit: usize) -> StorageResult<Vec<UsageRecord>>;

    /// Aggregates the usage log into call counts and average latency
    fn usage_summary(&self) -> StorageResult<UsageSummary>;
}
