//! Photo/album membership: deduplicated attach, detach, selection sync, and
//! per-album ordering.

use std::collections::HashSet;

use tracing::{debug, info};

use infinity_order::{next_position, ReorderRequest};
use infinity_store::{BlobStore, Filter, OnConflict, Query, RecordStore, Table};
use infinity_types::{Album, AlbumId, Membership, PhotoId};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{
    album_scope, decode_rows, encode_row, is_position_clash, MembershipLedger, APPEND_ATTEMPTS,
};

/// What an attach request changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddOutcome {
    /// Rows written by this call, with their assigned positions.
    pub added: Vec<Membership>,
    /// Albums that already contained the photo.
    pub already_present: Vec<AlbumId>,
}

impl AddOutcome {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty()
    }
}

/// What an album-picker save changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionChange {
    pub added: Vec<AlbumId>,
    pub removed: Vec<AlbumId>,
}

impl<S: RecordStore, B: BlobStore> MembershipLedger<S, B> {
    /// Attach a photo to every album in `album_ids` it is not already in.
    ///
    /// The photo and every album must exist; otherwise nothing is written.
    /// New rows are appended at the end of each album and written in one
    /// conditional insert, so repeating the call (or racing another caller)
    /// never produces a duplicate row or moves an existing one. Positions are
    /// unique per album; an append that loses its position to a concurrent
    /// one re-reads the album and tries again.
    pub async fn add_photo_to_albums(
        &self,
        photo_id: PhotoId,
        album_ids: &[AlbumId],
    ) -> LedgerResult<AddOutcome> {
        let mut targets: Vec<AlbumId> = Vec::with_capacity(album_ids.len());
        for id in album_ids {
            if !targets.contains(id) {
                targets.push(*id);
            }
        }
        if targets.is_empty() {
            return Ok(AddOutcome::default());
        }

        self.require_photo(photo_id).await?;
        let query = Query::from(Table::Albums).is_in("id", targets.iter().copied());
        let albums: Vec<Album> = decode_rows(Table::Albums, self.store.select(&query).await?)?;
        let found: HashSet<AlbumId> = albums.iter().map(|a| a.id).collect();
        if let Some(missing) = targets.iter().find(|id| !found.contains(id)) {
            return Err(LedgerError::AlbumNotFound(*missing));
        }

        let mut attempt = 1;
        let outcome = loop {
            match self.attach_missing(photo_id, &targets).await {
                Err(LedgerError::Store(e))
                    if is_position_clash(&e) && attempt < APPEND_ATTEMPTS =>
                {
                    debug!(photo = %photo_id, attempt, "album position taken, retrying");
                    attempt += 1;
                }
                result => break result?,
            }
        };

        debug!(
            photo = %photo_id,
            added = outcome.added.len(),
            skipped = outcome.already_present.len(),
            "photo attached to albums"
        );
        Ok(outcome)
    }

    /// Detach a photo from an album. Returns `false` if it was not attached.
    ///
    /// Remaining positions are left as they are.
    pub async fn remove_photo_from_album(
        &self,
        photo_id: PhotoId,
        album_id: AlbumId,
    ) -> LedgerResult<bool> {
        let removed = self
            .store
            .delete(
                Table::AlbumPhotos,
                &[
                    Filter::eq("album_id", album_id),
                    Filter::eq("photo_id", photo_id),
                ],
            )
            .await?;
        debug!(photo = %photo_id, album = %album_id, removed, "photo detached from album");
        Ok(removed > 0)
    }

    /// Albums currently containing the photo.
    pub async fn list_albums_for_photo(&self, photo_id: PhotoId) -> LedgerResult<HashSet<AlbumId>> {
        let query = Query::from(Table::AlbumPhotos).eq("photo_id", photo_id);
        let rows: Vec<Membership> =
            decode_rows(Table::AlbumPhotos, self.store.select(&query).await?)?;
        Ok(rows.into_iter().map(|m| m.album_id).collect())
    }

    /// Make the photo's albums exactly `selected`: attach the newly selected
    /// ones and detach the rest.
    pub async fn apply_album_selection(
        &self,
        photo_id: PhotoId,
        selected: &[AlbumId],
    ) -> LedgerResult<SelectionChange> {
        let current = self.list_albums_for_photo(photo_id).await?;
        let wanted: HashSet<AlbumId> = selected.iter().copied().collect();

        let to_add: Vec<AlbumId> = selected
            .iter()
            .copied()
            .filter(|id| !current.contains(id))
            .collect();
        let mut to_remove: Vec<AlbumId> = current.difference(&wanted).copied().collect();
        to_remove.sort();

        let outcome = self.add_photo_to_albums(photo_id, &to_add).await?;
        let mut change = SelectionChange {
            added: outcome.added.iter().map(|m| m.album_id).collect(),
            removed: Vec::new(),
        };
        for album_id in to_remove {
            if self.remove_photo_from_album(photo_id, album_id).await? {
                change.removed.push(album_id);
            }
        }

        info!(
            photo = %photo_id,
            added = change.added.len(),
            removed = change.removed.len(),
            "album selection applied"
        );
        Ok(change)
    }

    /// Move the photo at `from_index` of an album to `to_index` and renumber
    /// the album `0..N`.
    ///
    /// Fails with [`LedgerError::ConcurrentReorder`] if the album was
    /// reordered by someone else in the meantime.
    pub async fn reorder_album(
        &self,
        album_id: AlbumId,
        from_index: usize,
        to_index: usize,
    ) -> LedgerResult<Vec<Membership>> {
        self.require_album(album_id).await?;
        let scope = album_scope(album_id);
        let version = self.store.scope_version(&scope).await?;
        let members = self.memberships(album_id).await?;
        self.commit_reorder(
            &scope,
            version,
            Table::AlbumPhotos,
            members,
            ReorderRequest::new(from_index, to_index),
            |photo_id| {
                vec![
                    Filter::eq("album_id", album_id),
                    Filter::eq("photo_id", *photo_id),
                ]
            },
        )
        .await
    }

    /// One attempt at appending the photo to every target album that does
    /// not hold it yet, in a single conditional insert.
    ///
    /// Fails with a position clash if another photo was appended to one of
    /// the albums after its last position was read; nothing is written then.
    async fn attach_missing(
        &self,
        photo_id: PhotoId,
        targets: &[AlbumId],
    ) -> LedgerResult<AddOutcome> {
        let present = self.albums_containing(photo_id, targets).await?;
        let mut outcome = AddOutcome::default();
        let mut pending = Vec::new();
        let mut rows = Vec::new();
        for album_id in targets.iter().copied() {
            if present.contains(&album_id) {
                outcome.already_present.push(album_id);
                continue;
            }
            let query = Query::from(Table::AlbumPhotos)
                .eq("album_id", album_id)
                .order_by_desc("position")
                .limit(1);
            let last: Vec<Membership> =
                decode_rows(Table::AlbumPhotos, self.store.select(&query).await?)?;
            let position = next_position(last.iter().map(|m| m.position))?;
            rows.push(encode_row(&Membership::new(album_id, photo_id, position))?);
            pending.push(album_id);
        }
        if rows.is_empty() {
            return Ok(outcome);
        }

        let written = self
            .store
            .upsert(
                Table::AlbumPhotos,
                rows,
                &["album_id", "photo_id"],
                OnConflict::DoNothing,
            )
            .await?;
        outcome.added = decode_rows(Table::AlbumPhotos, written)?;

        // Rows we did not write were attached by a concurrent caller.
        for album_id in pending {
            if !outcome.added.iter().any(|m| m.album_id == album_id) {
                outcome.already_present.push(album_id);
            }
        }
        Ok(outcome)
    }

    async fn memberships_of(
        &self,
        photo_id: PhotoId,
        album_ids: &[AlbumId],
    ) -> LedgerResult<Vec<Membership>> {
        let query = Query::from(Table::AlbumPhotos)
            .eq("photo_id", photo_id)
            .is_in("album_id", album_ids.iter().copied());
        decode_rows(Table::AlbumPhotos, self.store.select(&query).await?)
    }

    async fn albums_containing(
        &self,
        photo_id: PhotoId,
        album_ids: &[AlbumId],
    ) -> LedgerResult<HashSet<AlbumId>> {
        Ok(self
            .memberships_of(photo_id, album_ids)
            .await?
            .into_iter()
            .map(|m| m.album_id)
            .collect())
    }
}
