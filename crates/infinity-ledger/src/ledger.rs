use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use infinity_order::{changed_positions, OrderedItem, ReorderRequest};
use infinity_store::{
    decode, encode, BlobStore, Filter, Query, RecordStore, Row, RowUpdate, ScopeGuard, StoreError,
    Table,
};
use infinity_types::{Album, AlbumId, Entry, EntryId, Membership, Photo, PhotoId};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};

/// Ordering scope of the authored journal entries.
pub const ENTRIES_SCOPE: &str = "entries";

/// Ordering scope of the photos in one album.
pub fn album_scope(album_id: AlbumId) -> String {
    format!("album:{album_id}")
}

/// How many times an append re-reads the scope after losing the race for
/// its position.
pub(crate) const APPEND_ATTEMPTS: usize = 8;

/// Whether `error` means another writer took the position we computed.
pub(crate) fn is_position_clash(error: &StoreError) -> bool {
    matches!(error, StoreError::UniqueViolation { columns, .. } if columns.ends_with("position"))
}

/// Photo/album membership, entry ordering, and gallery uploads over a
/// [`RecordStore`] and a [`BlobStore`].
///
/// The ledger holds no state of its own besides its collaborators and
/// configuration. Every operation takes the ids it acts on explicitly.
pub struct MembershipLedger<S, B> {
    pub(crate) store: Arc<S>,
    pub(crate) blobs: Arc<B>,
    pub(crate) config: LedgerConfig,
}

impl<S, B> Clone for MembershipLedger<S, B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            blobs: Arc::clone(&self.blobs),
            config: self.config.clone(),
        }
    }
}

impl<S: RecordStore, B: BlobStore> MembershipLedger<S, B> {
    pub fn new(store: Arc<S>, blobs: Arc<B>) -> Self {
        Self::with_config(store, blobs, LedgerConfig::default())
    }

    pub fn with_config(store: Arc<S>, blobs: Arc<B>, config: LedgerConfig) -> Self {
        Self {
            store,
            blobs,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn blobs(&self) -> &Arc<B> {
        &self.blobs
    }

    pub(crate) async fn find_photo(&self, photo_id: PhotoId) -> LedgerResult<Option<Photo>> {
        let query = Query::from(Table::Photos).eq("id", photo_id);
        self.store
            .select_one(&query)
            .await?
            .map(|row| decode_row(Table::Photos, row))
            .transpose()
    }

    pub(crate) async fn require_photo(&self, photo_id: PhotoId) -> LedgerResult<Photo> {
        self.find_photo(photo_id)
            .await?
            .ok_or(LedgerError::PhotoNotFound(photo_id))
    }

    pub(crate) async fn find_album(&self, album_id: AlbumId) -> LedgerResult<Option<Album>> {
        let query = Query::from(Table::Albums).eq("id", album_id);
        self.store
            .select_one(&query)
            .await?
            .map(|row| decode_row(Table::Albums, row))
            .transpose()
    }

    pub(crate) async fn require_album(&self, album_id: AlbumId) -> LedgerResult<Album> {
        self.find_album(album_id)
            .await?
            .ok_or(LedgerError::AlbumNotFound(album_id))
    }

    pub(crate) async fn find_entry(&self, entry_id: EntryId) -> LedgerResult<Option<Entry>> {
        let query = Query::from(Table::Entries).eq("id", entry_id);
        self.store
            .select_one(&query)
            .await?
            .map(|row| decode_row(Table::Entries, row))
            .transpose()
    }

    pub(crate) async fn require_entry(&self, entry_id: EntryId) -> LedgerResult<Entry> {
        self.find_entry(entry_id)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id))
    }

    /// Membership rows of one album in position order.
    pub(crate) async fn memberships(&self, album_id: AlbumId) -> LedgerResult<Vec<Membership>> {
        let query = Query::from(Table::AlbumPhotos)
            .eq("album_id", album_id)
            .order_by("position");
        decode_rows(Table::AlbumPhotos, self.store.select(&query).await?)
    }

    /// Photos of one entry in content order.
    pub(crate) async fn entry_photos(&self, entry_id: EntryId) -> LedgerResult<Vec<Photo>> {
        let query = Query::from(Table::Photos)
            .eq("entry_id", entry_id)
            .order_by("position");
        decode_rows(Table::Photos, self.store.select(&query).await?)
    }

    /// Resolve a set of photo ids. Ids with no photo row are absent from
    /// the result.
    pub(crate) async fn photos_by_id(
        &self,
        ids: impl IntoIterator<Item = PhotoId>,
    ) -> LedgerResult<HashMap<PhotoId, Photo>> {
        let ids: Vec<PhotoId> = ids.into_iter().collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let query = Query::from(Table::Photos).is_in("id", ids);
        let photos: Vec<Photo> = decode_rows(Table::Photos, self.store.select(&query).await?)?;
        Ok(photos.into_iter().map(|p| (p.id, p)).collect())
    }

    /// Titles of the given entries, keyed by id.
    pub(crate) async fn entry_titles(
        &self,
        ids: impl IntoIterator<Item = EntryId>,
    ) -> LedgerResult<HashMap<EntryId, String>> {
        let mut ids: Vec<EntryId> = ids.into_iter().collect();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let query = Query::from(Table::Entries).is_in("id", ids);
        let entries: Vec<Entry> = decode_rows(Table::Entries, self.store.select(&query).await?)?;
        Ok(entries.into_iter().map(|e| (e.id, e.title)).collect())
    }

    /// Apply `request` to `items` (read at scope `version`) and persist the
    /// changed positions through a guarded write.
    ///
    /// `key` builds the filters selecting the stored row of one item.
    pub(crate) async fn commit_reorder<T, F>(
        &self,
        scope: &str,
        version: u64,
        table: Table,
        items: Vec<T>,
        request: ReorderRequest,
        key: F,
    ) -> LedgerResult<Vec<T>>
    where
        T: OrderedItem + Clone,
        F: Fn(&T::Id) -> Vec<Filter>,
    {
        let before = items.clone();
        let after = request.apply(items)?;
        let changes = changed_positions(&before, &after);
        if changes.is_empty() {
            return Ok(after);
        }

        let updates = changes
            .iter()
            .map(|change| RowUpdate::set(key(&change.id), "position", change.position))
            .collect();
        let guard = ScopeGuard::new(scope, version);
        match self.store.apply_guarded(&guard, table, updates).await {
            Ok(version) => {
                debug!(
                    scope,
                    version,
                    from = request.from_index,
                    to = request.to_index,
                    changed = changes.len(),
                    "reorder committed"
                );
                Ok(after)
            }
            Err(StoreError::GuardRejected { actual, .. }) => {
                warn!(scope, expected = version, actual, "reorder lost to a concurrent writer");
                Err(LedgerError::ConcurrentReorder {
                    scope: scope.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

pub(crate) fn decode_row<T: DeserializeOwned>(table: Table, row: Row) -> LedgerResult<T> {
    decode(row).map_err(|e| LedgerError::Corrupt {
        table,
        reason: e.to_string(),
    })
}

pub(crate) fn decode_rows<T: DeserializeOwned>(
    table: Table,
    rows: Vec<Row>,
) -> LedgerResult<Vec<T>> {
    rows.into_iter().map(|row| decode_row(table, row)).collect()
}

pub(crate) fn encode_row<T: Serialize>(record: &T) -> LedgerResult<Row> {
    Ok(encode(record)?)
}
