//! In-memory record and blob stores for tests, demos, and embedding.
//!
//! [`InMemoryRecordStore`] keeps every table in a `HashMap` behind a single
//! `RwLock`, so each call is applied atomically. Every call first yields to
//! the scheduler, which makes concurrent callers interleave at call
//! boundaries the way they would against a remote database.
//!
//! Both stores support one-shot fault injection (`fail_next`) so failure
//! paths in the layers above can be exercised deterministically.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::query::{
    compare_values, matches_all, validate_key, Filter, OnConflict, Query, Row, RowUpdate,
    ScopeGuard, Table,
};
use crate::traits::{BlobStore, RecordStore};

/// Record store operations that can be made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
    Upsert,
    ApplyGuarded,
}

/// Serializable copy of every table, used to persist an in-memory store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tables: BTreeMap<Table, Vec<Row>>,
}

type Tables = HashMap<Table, Vec<Row>>;

/// An in-memory implementation of [`RecordStore`].
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<Tables>,
    faults: Mutex<Vec<(Operation, Table)>>,
}

impl InMemoryRecordStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a store from a [`Snapshot`].
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            tables: RwLock::new(snapshot.tables.into_iter().collect()),
            faults: Mutex::new(Vec::new()),
        }
    }

    /// Copy every table into a [`Snapshot`].
    pub fn snapshot(&self) -> StoreResult<Snapshot> {
        let tables = self.read_tables()?;
        Ok(Snapshot {
            tables: tables
                .iter()
                .map(|(table, rows)| (*table, rows.clone()))
                .collect(),
        })
    }

    /// Make the next `op` on `table` fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self, op: Operation, table: Table) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.push((op, table));
        }
    }

    /// Number of rows currently in `table`.
    pub fn row_count(&self, table: Table) -> StoreResult<usize> {
        Ok(self.read_tables()?.get(&table).map_or(0, Vec::len))
    }

    fn check_fault(&self, op: Operation, table: Table) -> StoreResult<()> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))?;
        if let Some(index) = faults.iter().position(|f| *f == (op, table)) {
            faults.remove(index);
            return Err(StoreError::Unavailable(format!(
                "injected {op:?} failure on {table}"
            )));
        }
        Ok(())
    }

    fn read_tables(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write_tables(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }
}

/// Key of `row` under `columns`, or `None` if any column is `NULL`.
fn key_of(row: &Row, columns: &[&str]) -> Option<String> {
    let mut parts = Vec::with_capacity(columns.len());
    for column in columns {
        match row.get(*column) {
            Some(value) if !value.is_null() => parts.push(value.to_string()),
            _ => return None,
        }
    }
    Some(parts.join("\u{1f}"))
}

fn check_unique(table: Table, rows: &[Row]) -> StoreResult<()> {
    for unique in table.unique_keys() {
        let mut seen = HashSet::new();
        for row in rows.iter().filter(|row| unique.applies_to(row)) {
            if let Some(key) = key_of(row, unique.columns) {
                if !seen.insert(key) {
                    return Err(StoreError::UniqueViolation {
                        table,
                        columns: unique.describe(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn merge(row: &mut Row, patch: &Row) {
    for (column, value) in patch {
        row.insert(column.clone(), value.clone());
    }
}

fn scope_row_matches(row: &Row, scope: &str) -> bool {
    row.get("scope").and_then(Value::as_str) == Some(scope)
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn select(&self, query: &Query) -> StoreResult<Vec<Row>> {
        tokio::task::yield_now().await;
        self.check_fault(Operation::Select, query.table)?;

        let tables = self.read_tables()?;
        let mut rows: Vec<Row> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(tables);

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, rows: Vec<Row>) -> StoreResult<Vec<Row>> {
        tokio::task::yield_now().await;
        self.check_fault(Operation::Insert, table)?;

        let mut tables = self.write_tables()?;
        let mut working = tables.get(&table).cloned().unwrap_or_default();
        working.extend(rows.iter().cloned());
        check_unique(table, &working)?;
        tables.insert(table, working);
        debug!(%table, count = rows.len(), "rows inserted");
        Ok(rows)
    }

    async fn update(&self, table: Table, filters: &[Filter], patch: Row) -> StoreResult<usize> {
        tokio::task::yield_now().await;
        self.check_fault(Operation::Update, table)?;

        let mut tables = self.write_tables()?;
        let mut working = tables.get(&table).cloned().unwrap_or_default();
        let mut updated = 0;
        for row in working.iter_mut().filter(|row| matches_all(row, filters)) {
            merge(row, &patch);
            updated += 1;
        }
        check_unique(table, &working)?;
        tables.insert(table, working);
        Ok(updated)
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> StoreResult<usize> {
        tokio::task::yield_now().await;
        self.check_fault(Operation::Delete, table)?;

        let mut tables = self.write_tables()?;
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|row| !matches_all(row, filters));
        let deleted = before - rows.len();
        if deleted > 0 {
            debug!(%table, deleted, "rows deleted");
        }
        Ok(deleted)
    }

    async fn upsert(
        &self,
        table: Table,
        rows: Vec<Row>,
        on_conflict: &[&str],
        action: OnConflict,
    ) -> StoreResult<Vec<Row>> {
        tokio::task::yield_now().await;
        self.check_fault(Operation::Upsert, table)?;

        let mut tables = self.write_tables()?;
        let mut working = tables.get(&table).cloned().unwrap_or_default();
        let mut written = Vec::new();
        for row in rows {
            let existing = key_of(&row, on_conflict).and_then(|key| {
                working
                    .iter()
                    .position(|r| key_of(r, on_conflict).as_deref() == Some(key.as_str()))
            });
            match (existing, action) {
                (Some(_), OnConflict::DoNothing) => {}
                (Some(index), OnConflict::Update) => {
                    merge(&mut working[index], &row);
                    written.push(working[index].clone());
                }
                (None, _) => {
                    written.push(row.clone());
                    working.push(row);
                }
            }
        }
        check_unique(table, &working)?;
        tables.insert(table, working);
        debug!(%table, affected = written.len(), ?action, "rows upserted");
        Ok(written)
    }

    async fn apply_guarded(
        &self,
        guard: &ScopeGuard,
        table: Table,
        updates: Vec<RowUpdate>,
    ) -> StoreResult<u64> {
        tokio::task::yield_now().await;
        self.check_fault(Operation::ApplyGuarded, table)?;

        let mut tables = self.write_tables()?;
        let actual = tables
            .get(&Table::OrderScopes)
            .and_then(|rows| rows.iter().find(|r| scope_row_matches(r, &guard.scope)))
            .and_then(|row| row.get("version").and_then(Value::as_u64))
            .unwrap_or(0);
        if actual != guard.expected_version {
            return Err(StoreError::GuardRejected {
                scope: guard.scope.clone(),
                expected: guard.expected_version,
                actual,
            });
        }

        let mut working = tables.get(&table).cloned().unwrap_or_default();
        for update in &updates {
            for row in working
                .iter_mut()
                .filter(|row| matches_all(row, &update.filters))
            {
                merge(row, &update.patch);
            }
        }
        check_unique(table, &working)?;
        tables.insert(table, working);

        let next = actual + 1;
        let scopes = tables.entry(Table::OrderScopes).or_default();
        match scopes.iter_mut().find(|r| scope_row_matches(r, &guard.scope)) {
            Some(row) => {
                row.insert("version".into(), Value::from(next));
            }
            None => {
                let mut row = Row::new();
                row.insert("scope".into(), Value::from(guard.scope.clone()));
                row.insert("version".into(), Value::from(next));
                scopes.push(row);
            }
        }
        debug!(
            scope = %guard.scope,
            version = next,
            updates = updates.len(),
            "guarded write applied"
        );
        Ok(next)
    }
}

/// Blob store operations that can be made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlobOperation {
    Store,
    Delete,
}

#[derive(Debug)]
struct StoredBlob {
    bytes: Bytes,
    content_type: String,
}

/// An in-memory implementation of [`BlobStore`].
#[derive(Debug)]
pub struct InMemoryBlobStore {
    base_url: String,
    blobs: RwLock<HashMap<String, StoredBlob>>,
    faults: Mutex<Vec<BlobOperation>>,
}

impl InMemoryBlobStore {
    /// Create an empty store serving URLs under `memory://media`.
    pub fn new() -> Self {
        Self::with_base_url("memory://media")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            blobs: RwLock::new(HashMap::new()),
            faults: Mutex::new(Vec::new()),
        }
    }

    /// Make the next `op` fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self, op: BlobOperation) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.push(op);
        }
    }

    /// Bytes stored at `key`, if any.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.blobs.read().ok()?.get(key).map(|b| b.bytes.clone())
    }

    /// Content type recorded for `key`, if any.
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.blobs.read().ok()?.get(key).map(|b| b.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_fault(&self, op: BlobOperation) -> StoreResult<()> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))?;
        if let Some(index) = faults.iter().position(|f| *f == op) {
            faults.remove(index);
            return Err(StoreError::Unavailable(format!("injected blob {op:?} failure")));
        }
        Ok(())
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn store(&self, key: &str, bytes: Bytes, content_type: &str) -> StoreResult<String> {
        tokio::task::yield_now().await;
        validate_key(key)?;
        self.check_fault(BlobOperation::Store)?;

        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))?;
        blobs.insert(
            key.to_string(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        tokio::task::yield_now().await;
        validate_key(key)?;
        self.check_fault(BlobOperation::Delete)?;

        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))?;
        Ok(blobs.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        tokio::task::yield_now().await;
        let blobs = self
            .blobs
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))?;
        Ok(blobs.contains_key(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}
