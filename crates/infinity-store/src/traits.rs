use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreResult;
use crate::query::{Filter, OnConflict, Query, Row, RowUpdate, ScopeGuard, Table};

/// Relational row store.
///
/// All implementations must satisfy these invariants:
/// - Every call applies completely or not at all.
/// - Declared uniqueness constraints ([`Table::unique_keys`]) hold after
///   every call; a violating `insert` fails with `UniqueViolation`.
/// - Rows matching no filter are left untouched; deleting or updating zero
///   rows is not an error.
/// - No lock or transaction is held between calls.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Rows of `query.table` matching every filter, ordered and limited.
    ///
    /// Rows with equal sort keys keep their insertion order.
    async fn select(&self, query: &Query) -> StoreResult<Vec<Row>>;

    /// Insert `rows` and return them as stored.
    async fn insert(&self, table: Table, rows: Vec<Row>) -> StoreResult<Vec<Row>>;

    /// Merge `patch` into every matching row. Returns the number of rows updated.
    async fn update(&self, table: Table, filters: &[Filter], patch: Row) -> StoreResult<usize>;

    /// Delete every matching row. Returns the number of rows deleted.
    async fn delete(&self, table: Table, filters: &[Filter]) -> StoreResult<usize>;

    /// Insert `rows`, resolving collisions on the `on_conflict` columns with
    /// `action`. Returns the rows inserted or updated, as stored.
    ///
    /// With [`OnConflict::DoNothing`] this is the conditional insert used to
    /// deduplicate concurrent writers: exactly one row survives per key, and
    /// only the caller that wrote it gets it back. A collision on any other
    /// declared key fails the whole call with `UniqueViolation`.
    async fn upsert(
        &self,
        table: Table,
        rows: Vec<Row>,
        on_conflict: &[&str],
        action: OnConflict,
    ) -> StoreResult<Vec<Row>>;

    /// Apply `updates` to `table` only if `guard.scope` is still at
    /// `guard.expected_version`, bumping the version in the same step.
    ///
    /// Returns the new version, or `GuardRejected` if another writer got
    /// there first. A scope that was never written is at version 0.
    async fn apply_guarded(
        &self,
        guard: &ScopeGuard,
        table: Table,
        updates: Vec<RowUpdate>,
    ) -> StoreResult<u64>;

    /// The first row matching `query`, if any.
    async fn select_one(&self, query: &Query) -> StoreResult<Option<Row>> {
        let query = query.clone().limit(1);
        Ok(self.select(&query).await?.into_iter().next())
    }

    /// Current version of an ordering scope (0 if never written).
    async fn scope_version(&self, scope: &str) -> StoreResult<u64> {
        let query = Query::from(Table::OrderScopes).eq("scope", scope);
        let version = self
            .select_one(&query)
            .await?
            .and_then(|row| row.get("version").and_then(|v| v.as_u64()))
            .unwrap_or(0);
        Ok(version)
    }
}

/// Keyed binary storage for photo content.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous content, and return
    /// the public retrieval URL.
    async fn store(&self, key: &str, bytes: Bytes, content_type: &str) -> StoreResult<String>;

    /// Delete the blob at `key`. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Check whether a blob exists at `key`.
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Public retrieval URL for `key`. Does not check existence.
    fn public_url(&self, key: &str) -> String;
}
