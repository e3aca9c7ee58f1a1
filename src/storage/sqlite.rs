//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::guard::{CandidateFields, FieldSet};
use crate::state::StageStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    ItemRecord, PriceObservation, PriceSource, PruneFilter, SourceType, StageOutcome,
    StagedRecord, StagingStats, UsageRecord, UsageSummary,
};
use crate::SiftError;
use chrono::{Duration, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    default_max_attempts: i64,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SiftError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SiftError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            default_max_attempts: 3,
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, SiftError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            default_max_attempts: 3,
        })
    }

    /// Sets the attempt budget newly staged identifiers receive
    pub fn set_default_max_attempts(&mut self, max_attempts: u32) {
        self.default_max_attempts = i64::from(max_attempts.max(1));
    }

    fn read_staged_row(row: &Row<'_>) -> rusqlite::Result<StagedRecord> {
        Ok(StagedRecord {
            id: row.get(0)?,
            external_ref: row.get(1)?,
            source_type: SourceType::from_db_string(&row.get::<_, String>(2)?)
                .unwrap_or(SourceType::Other),
            source_keyword: row.get(3)?,
            priority: row.get(4)?,
            status: StageStatus::from_db_string(&row.get::<_, String>(5)?)
                .unwrap_or(StageStatus::Failed),
            attempts: row.get(6)?,
            max_attempts: row.get(7)?,
            last_error: row.get(8)?,
            permanent_failure: row.get::<_, i64>(9)? != 0,
            item_id: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn read_item_row(row: &Row<'_>) -> rusqlite::Result<ItemRecord> {
        Ok(ItemRecord {
            id: row.get(0)?,
            external_ref: row.get(1)?,
            name: row.get(2)?,
            brand: row.get(3)?,
            length_cm: row.get(4)?,
            width_cm: row.get(5)?,
            weight_kg: row.get(6)?,
            power_w: row.get(7)?,
            voltage_v: row.get(8)?,
            price_usd: row.get(9)?,
            protected_fields: FieldSet::from_db_string(&row.get::<_, String>(10)?),
            missing_fields: FieldSet::from_db_string(&row.get::<_, String>(11)?),
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}

const STAGED_COLUMNS: &str = "id, external_ref, source_type, source_keyword, priority, status, \
     attempts, max_attempts, last_error, permanent, item_id, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, external_ref, name, brand, length_cm, width_cm, weight_kg, \
     power_w, voltage_v, price_usd, protected_fields, missing_fields, created_at, updated_at";

/// Builds the WHERE clause and bind values for a management filter
fn filter_clause(filter: &PruneFilter) -> (String, Vec<String>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if let Some(source_type) = filter.source_type {
        clauses.push("source_type = ?");
        values.push(source_type.to_db_string().to_string());
    }
    if let Some(ref keyword) = filter.keyword_like {
        clauses.push("source_keyword LIKE ?");
        values.push(format!("%{}%", keyword));
    }
    if let Some(status) = filter.status {
        clauses.push("status = ?");
        values.push(status.to_db_string().to_string());
    }

    let clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (clause, values)
}

impl Storage for SqliteStorage {
    // ===== Staging Queue =====

    fn is_known(&self, external_ref: &str) -> StorageResult<bool> {
        if self.in_catalog(external_ref)? {
            return Ok(true);
        }
        let staged: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM staged_refs WHERE external_ref = ?1",
                params![external_ref],
                |row| row.get(0),
            )
            .optional()?;
        Ok(staged.is_some())
    }

    fn in_catalog(&self, external_ref: &str) -> StorageResult<bool> {
        let item: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM items WHERE external_ref = ?1",
                params![external_ref],
                |row| row.get(0),
            )
            .optional()?;
        Ok(item.is_some())
    }

    fn stage(
        &mut self,
        external_ref: &str,
        source_type: SourceType,
        source_keyword: Option<&str>,
        priority: i64,
    ) -> StorageResult<StageOutcome> {
        let already_staged: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM staged_refs WHERE external_ref = ?1",
                params![external_ref],
                |row| row.get(0),
            )
            .optional()?;
        if already_staged.is_some() {
            return Ok(StageOutcome::AlreadyStaged);
        }

        let status = if self.in_catalog(external_ref)? {
            StageStatus::Duplicate
        } else {
            StageStatus::Pending
        };

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO staged_refs \
             (external_ref, source_type, source_keyword, priority, status, max_attempts, \
              created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                external_ref,
                source_type.to_db_string(),
                source_keyword,
                priority,
                status.to_db_string(),
                self.default_max_attempts,
                now
            ],
        )?;

        match status {
            StageStatus::Duplicate => Ok(StageOutcome::KnownInCatalog),
            _ => Ok(StageOutcome::Staged),
        }
    }

    fn next_batch(&self, limit: usize, priority_only: bool) -> StorageResult<Vec<StagedRecord>> {
        let sql = if priority_only {
            format!(
                "SELECT {} FROM staged_refs WHERE status = 'pending' AND priority > 0 \
                 ORDER BY priority DESC, created_at ASC LIMIT ?1",
                STAGED_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM staged_refs WHERE status = 'pending' \
                 ORDER BY priority DESC, created_at ASC LIMIT ?1",
                STAGED_COLUMNS
            )
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![limit as i64], Self::read_staged_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn claim(&mut self, id: i64) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE staged_refs SET status = 'processing', attempts = attempts + 1, \
             updated_at = ?1 WHERE id = ?2 AND status = 'pending'",
            params![now, id],
        )?;
        Ok(changed == 1)
    }

    fn mark_completed(&mut self, id: i64, item_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE staged_refs SET status = 'completed', item_id = ?1, last_error = NULL, \
             updated_at = ?2 WHERE id = ?3",
            params![item_id, now, id],
        )?;
        Ok(())
    }

    fn mark_skipped(&mut self, id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE staged_refs SET status = 'skipped', updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        Ok(())
    }

    fn mark_failed(
        &mut self,
        id: i64,
        error: &str,
        is_permanent: bool,
    ) -> StorageResult<StageStatus> {
        let counts: Option<(i64, i64)> = self
            .conn
            .query_row(
                "SELECT attempts, max_attempts FROM staged_refs WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (attempts, max_attempts) =
            counts.ok_or_else(|| StorageError::StagedNotFound(id.to_string()))?;

        let status = if is_permanent || attempts >= max_attempts {
            StageStatus::Failed
        } else {
            StageStatus::Pending
        };

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE staged_refs SET status = ?1, last_error = ?2, permanent = MAX(permanent, ?3), \
             updated_at = ?4 WHERE id = ?5",
            params![status.to_db_string(), error, is_permanent as i64, now, id],
        )?;
        Ok(status)
    }

    fn release_to_pending(&mut self, id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE staged_refs SET status = 'pending', \
             attempts = CASE WHEN attempts > 0 THEN attempts - 1 ELSE 0 END, \
             updated_at = ?1 WHERE id = ?2 AND status = 'processing'",
            params![now, id],
        )?;
        Ok(())
    }

    fn retry_failed(&mut self, limit: usize) -> StorageResult<usize> {
        let mut stmt = self.conn.prepare(
            "SELECT id, attempts, max_attempts FROM staged_refs \
             WHERE status = 'failed' AND permanent = 0 LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);

        let now = Utc::now().to_rfc3339();
        let mut reset = 0;
        for (id, attempts, max_attempts) in rows {
            if attempts < max_attempts {
                self.conn.execute(
                    "UPDATE staged_refs SET status = 'pending', last_error = NULL, \
                     updated_at = ?1 WHERE id = ?2",
                    params![now, id],
                )?;
                reset += 1;
            }
        }
        Ok(reset)
    }

    fn get_staged_by_ref(&self, external_ref: &str) -> StorageResult<Option<StagedRecord>> {
        let sql = format!(
            "SELECT {} FROM staged_refs WHERE external_ref = ?1",
            STAGED_COLUMNS
        );
        let record = self
            .conn
            .query_row(&sql, params![external_ref], Self::read_staged_row)
            .optional()?;
        Ok(record)
    }

    fn find_staged(&self, filter: &PruneFilter) -> StorageResult<Vec<StagedRecord>> {
        let (clause, values) = filter_clause(filter);
        let sql = format!(
            "SELECT {} FROM staged_refs{} ORDER BY created_at ASC",
            STAGED_COLUMNS, clause
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values.iter()), Self::read_staged_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn remove_staged(&mut self, filter: &PruneFilter) -> StorageResult<usize> {
        if filter.is_empty() {
            return Err(StorageError::ConstraintViolation(
                "refusing to remove staged identifiers without a filter".to_string(),
            ));
        }
        let (clause, values) = filter_clause(filter);
        let sql = format!("DELETE FROM staged_refs{}", clause);
        let removed = self.conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(removed)
    }

    fn clear_duplicates(&mut self) -> StorageResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM staged_refs WHERE status = 'duplicate'", [])?;
        Ok(removed)
    }

    fn staging_stats(&self) -> StorageResult<StagingStats> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM staged_refs GROUP BY status")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stats = StagingStats::default();
        for (status_str, count) in rows {
            if let Some(status) = StageStatus::from_db_string(&status_str) {
                stats.by_status.insert(status, count as u64);
            }
            stats.total += count as u64;
        }
        Ok(stats)
    }

    // ===== Catalog Items =====

    fn insert_item(
        &mut self,
        external_ref: &str,
        fields: &CandidateFields,
        missing: &FieldSet,
    ) -> StorageResult<i64> {
        let name = fields.name.as_deref().ok_or_else(|| {
            StorageError::ConstraintViolation("item name is required".to_string())
        })?;

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO items \
             (external_ref, name, brand, length_cm, width_cm, weight_kg, power_w, voltage_v, \
              price_usd, protected_fields, missing_fields, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, '', ?10, ?11, ?11)",
            params![
                external_ref,
                name,
                fields.brand,
                fields.length_cm,
                fields.width_cm,
                fields.weight_kg,
                fields.power_w,
                fields.voltage_v,
                fields.price_usd,
                missing.to_db_string(),
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_item_by_ref(&self, external_ref: &str) -> StorageResult<Option<ItemRecord>> {
        let sql = format!("SELECT {} FROM items WHERE external_ref = ?1", ITEM_COLUMNS);
        let item = self
            .conn
            .query_row(&sql, params![external_ref], Self::read_item_row)
            .optional()?;
        Ok(item)
    }

    fn get_items_by_refs(&self, external_refs: &[String]) -> StorageResult<Vec<ItemRecord>> {
        let mut items = Vec::new();
        for external_ref in external_refs {
            if let Some(item) = self.get_item_by_ref(external_ref)? {
                items.push(item);
            }
        }
        Ok(items)
    }

    fn items_needing_refresh(
        &self,
        days_old: i64,
        limit: usize,
    ) -> StorageResult<Vec<ItemRecord>> {
        let cutoff = (Utc::now() - Duration::days(days_old)).to_rfc3339();
        let sql = format!(
            "SELECT {} FROM items WHERE updated_at < ?1 ORDER BY updated_at ASC LIMIT ?2",
            ITEM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![cutoff, limit as i64], Self::read_item_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn save_item(&mut self, item: &ItemRecord) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE items SET name = ?1, brand = ?2, length_cm = ?3, width_cm = ?4, \
             weight_kg = ?5, power_w = ?6, voltage_v = ?7, price_usd = ?8, \
             protected_fields = ?9, missing_fields = ?10, updated_at = ?11 WHERE id = ?12",
            params![
                item.name,
                item.brand,
                item.length_cm,
                item.width_cm,
                item.weight_kg,
                item.power_w,
                item.voltage_v,
                item.price_usd,
                item.protected_fields.to_db_string(),
                item.missing_fields.to_db_string(),
                now,
                item.id
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::ItemNotFound(item.external_ref.clone()));
        }
        Ok(())
    }

    fn touch_item(&mut self, external_ref: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE items SET updated_at = ?1 WHERE external_ref = ?2",
            params![now, external_ref],
        )?;
        if changed == 0 {
            return Err(StorageError::ItemNotFound(external_ref.to_string()));
        }
        Ok(())
    }

    fn protect_fields(&mut self, external_ref: &str, fields: &FieldSet) -> StorageResult<()> {
        let current: Option<String> = self
            .conn
            .query_row(
                "SELECT protected_fields FROM items WHERE external_ref = ?1",
                params![external_ref],
                |row| row.get(0),
            )
            .optional()?;
        let current = current.ok_or_else(|| StorageError::ItemNotFound(external_ref.to_string()))?;

        let mut protected = FieldSet::from_db_string(&current);
        protected.union_with(fields);

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE items SET protected_fields = ?1, updated_at = ?2 WHERE external_ref = ?3",
            params![protected.to_db_string(), now, external_ref],
        )?;
        Ok(())
    }

    fn item_count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Price Observations =====

    fn record_price_observation(
        &mut self,
        external_ref: &str,
        old_price: Option<f64>,
        new_price: f64,
        source: PriceSource,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO price_observations (external_ref, old_price, new_price, source, observed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![external_ref, old_price, new_price, source.to_db_string(), now],
        )?;
        Ok(())
    }

    fn recent_price_observations(&self, limit: usize) -> StorageResult<Vec<PriceObservation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, external_ref, old_price, new_price, source, observed_at \
             FROM price_observations ORDER BY id DESC LIMIT ?1",
        )?;
        let observations = stmt
            .query_map(params![limit as i64], |row| {
                Ok(PriceObservation {
                    id: row.get(0)?,
                    external_ref: row.get(1)?,
                    old_price: row.get(2)?,
                    new_price: row.get(3)?,
                    source: PriceSource::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(PriceSource::Detail),
                    observed_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(observations)
    }

    // ===== Usage Records =====

    fn record_usage(
        &mut self,
        external_ref: Option<&str>,
        operation: &str,
        success: bool,
        latency_ms: i64,
        error_kind: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO usage_records \
             (external_ref, operation, success, latency_ms, error_kind, observed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![external_ref, operation, success as i64, latency_ms, error_kind, now],
        )?;
        Ok(())
    }

    fn recent_usage(&self, limit: usize) -> StorageResult<Vec<UsageRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, external_ref, operation, success, latency_ms, error_kind, observed_at \
             FROM usage_records ORDER BY id DESC LIMIT ?1",
        )?;
        let records = stmt
            .query_map(params![limit as i64], |row| {
                Ok(UsageRecord {
                    id: row.get(0)?,
                    external_ref: row.get(1)?,
                    operation: row.get(2)?,
                    success: row.get::<_, i64>(3)? != 0,
                    latency_ms: row.get(4)?,
                    error_kind: row.get(5)?,
                    observed_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn usage_summary(&self) -> StorageResult<UsageSummary> {
        let (total, successes, avg_latency): (i64, i64, Option<f64>) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(success), 0), AVG(latency_ms) FROM usage_records",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(UsageSummary {
            total_calls: total as u64,
            successes: successes as u64,
            failures: (total - successes) as u64,
            avg_latency_ms: avg_latency.unwrap_or(0.0),
        })
    }
}
