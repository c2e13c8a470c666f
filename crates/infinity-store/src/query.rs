//! Row, filter, and query model shared by every [`RecordStore`] backend.
//!
//! [`RecordStore`]: crate::traits::RecordStore

use std::cmp::Ordering;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// A stored row: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

/// The logical tables of the journal schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Entries,
    Albums,
    AlbumPhotos,
    Photos,
    /// One `(scope, version)` row per ordering scope, bumped by guarded reorders.
    OrderScopes,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Entries,
        Table::Albums,
        Table::AlbumPhotos,
        Table::Photos,
        Table::OrderScopes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Entries => "entries",
            Self::Albums => "albums",
            Self::AlbumPhotos => "album_photos",
            Self::Photos => "photos",
            Self::OrderScopes => "order_scopes",
        }
    }

    /// Declared uniqueness constraints.
    ///
    /// A row holding `NULL` in any constrained column never conflicts, which
    /// lets `entries.bucket` be unique for buckets while authored entries all
    /// carry `NULL`. Positions are unique within each ordering scope.
    pub fn unique_keys(&self) -> &'static [UniqueKey] {
        const ENTRIES: &[UniqueKey] = &[
            UniqueKey::new(&["id"]),
            UniqueKey::new(&["bucket"]),
            UniqueKey::partial(&["position"], "bucket"),
        ];
        const ALBUMS: &[UniqueKey] = &[UniqueKey::new(&["id"])];
        const ALBUM_PHOTOS: &[UniqueKey] = &[
            UniqueKey::new(&["album_id", "photo_id"]),
            UniqueKey::new(&["album_id", "position"]),
        ];
        const PHOTOS: &[UniqueKey] = &[
            UniqueKey::new(&["id"]),
            UniqueKey::new(&["entry_id", "position"]),
        ];
        const ORDER_SCOPES: &[UniqueKey] = &[UniqueKey::new(&["scope"])];

        match self {
            Self::Entries => ENTRIES,
            Self::Albums => ALBUMS,
            Self::AlbumPhotos => ALBUM_PHOTOS,
            Self::Photos => PHOTOS,
            Self::OrderScopes => ORDER_SCOPES,
        }
    }
}

/// A uniqueness constraint over one or more columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniqueKey {
    pub columns: &'static [&'static str],
    /// Only rows where this column is `NULL` are constrained.
    pub where_null: Option<&'static str>,
}

impl UniqueKey {
    pub const fn new(columns: &'static [&'static str]) -> Self {
        Self {
            columns,
            where_null: None,
        }
    }

    pub const fn partial(columns: &'static [&'static str], where_null: &'static str) -> Self {
        Self {
            columns,
            where_null: Some(where_null),
        }
    }

    /// Whether `row` falls under this constraint.
    pub fn applies_to(&self, row: &Row) -> bool {
        self.where_null
            .map_or(true, |column| row.get(column).map_or(true, Value::is_null))
    }

    /// Comma-separated column list, as reported in `UniqueViolation`.
    pub fn describe(&self) -> String {
        self.columns.join(", ")
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A row predicate. Filters in a list are combined with AND.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// `column = value`. Never matches `NULL`.
    Eq(String, Value),
    /// `column IN (values)`.
    In(String, Vec<Value>),
    /// `column IS NULL` (a missing column counts as `NULL`).
    IsNull(String),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::Eq(column.to_string(), value.into())
    }

    pub fn is_in<V, I>(column: &str, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Self::In(column.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(column: &str) -> Self {
        Self::IsNull(column.to_string())
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::Eq(column, value) => {
                !value.is_null() && row.get(column).is_some_and(|v| v == value)
            }
            Self::In(column, values) => row
                .get(column)
                .is_some_and(|v| !v.is_null() && values.contains(v)),
            Self::IsNull(column) => row.get(column).map_or(true, Value::is_null),
        }
    }
}

/// Returns `true` if `row` satisfies every filter.
pub fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|f| f.matches(row))
}

/// Sort order for a select.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

/// A select over one table.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub table: Table,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn from(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn is_in<V, I>(self, column: &str, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        self.filter(Filter::is_in(column, values))
    }

    pub fn is_null(self, column: &str) -> Self {
        self.filter(Filter::is_null(column))
    }

    pub fn order_by(mut self, column: &str) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            descending: false,
        });
        self
    }

    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            descending: true,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Behaviour of an upsert when a row collides with the conflict key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnConflict {
    /// Keep the existing row untouched.
    DoNothing,
    /// Merge the incoming columns into the existing row.
    Update,
}

/// Optimistic-concurrency guard for a batch of writes to one ordering scope.
///
/// The write applies only if the scope is still at `expected_version`, and
/// it bumps the version atomically with the write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeGuard {
    pub scope: String,
    pub expected_version: u64,
}

impl ScopeGuard {
    pub fn new(scope: impl Into<String>, expected_version: u64) -> Self {
        Self {
            scope: scope.into(),
            expected_version,
        }
    }
}

/// One patch applied to every row matching `filters`.
#[derive(Clone, Debug, PartialEq)]
pub struct RowUpdate {
    pub filters: Vec<Filter>,
    pub patch: Row,
}

impl RowUpdate {
    pub fn new(filters: Vec<Filter>, patch: Row) -> Self {
        Self { filters, patch }
    }

    /// Patch a single column.
    pub fn set(filters: Vec<Filter>, column: &str, value: impl Into<Value>) -> Self {
        let mut patch = Row::new();
        patch.insert(column.to_string(), value.into());
        Self { filters, patch }
    }
}

/// Compare two column values for ordering. `NULL` sorts first; values of
/// different kinds compare equal so the sort stays stable.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Serialize a record into a row.
pub fn encode<T: Serialize>(record: &T) -> StoreResult<Row> {
    match serde_json::to_value(record)? {
        Value::Object(row) => Ok(row),
        other => Err(StoreError::Serialization(format!(
            "record did not serialize to an object: {other}"
        ))),
    }
}

/// Deserialize a row into a record.
pub fn decode<T: DeserializeOwned>(row: Row) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// Deserialize every row.
pub fn decode_all<T: DeserializeOwned>(rows: Vec<Row>) -> StoreResult<Vec<T>> {
    rows.into_iter().map(decode).collect()
}

/// Check that a blob key is a relative path that stays inside the store.
pub fn validate_key(key: &str) -> StoreResult<()> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if invalid {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}
