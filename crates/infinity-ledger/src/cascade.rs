//! Deletion and its cascade policy.
//!
//! Deleting a photo removes its memberships, then its record, then its
//! blob. Deleting an album removes its memberships, then the album, and
//! never touches photos. Steps run in that order without a transaction, so
//! a crash can leave dangling rows behind; read paths skip them. A failed
//! step is returned to the caller; the steps before it stay applied.

use tracing::{info, warn};

use infinity_store::{BlobStore, Filter, RecordStore, Table};
use infinity_types::{AlbumId, PhotoId};

use crate::error::LedgerResult;
use crate::ledger::{album_scope, MembershipLedger};

impl<S: RecordStore, B: BlobStore> MembershipLedger<S, B> {
    /// Delete a photo everywhere. Returns `false` if it did not exist.
    ///
    /// If the blob cannot be removed the error is returned, with the
    /// memberships and the record already gone.
    pub async fn delete_photo(&self, photo_id: PhotoId) -> LedgerResult<bool> {
        let photo = self.find_photo(photo_id).await?;

        let memberships = self
            .store
            .delete(Table::AlbumPhotos, &[Filter::eq("photo_id", photo_id)])
            .await?;

        let Some(photo) = photo else {
            if memberships > 0 {
                warn!(photo = %photo_id, memberships, "removed memberships of a missing photo");
            }
            return Ok(false);
        };

        self.store
            .delete(Table::Photos, &[Filter::eq("id", photo_id)])
            .await?;

        if let Err(e) = self.blobs.delete(&photo.storage_key).await {
            warn!(
                photo = %photo_id,
                key = %photo.storage_key,
                error = %e,
                "photo blob not removed"
            );
            return Err(e.into());
        }

        info!(photo = %photo_id, memberships, "photo deleted");
        Ok(true)
    }

    /// Delete an album and its memberships. Returns `false` if it did not
    /// exist.
    pub async fn delete_album(&self, album_id: AlbumId) -> LedgerResult<bool> {
        let memberships = self
            .store
            .delete(Table::AlbumPhotos, &[Filter::eq("album_id", album_id)])
            .await?;
        let deleted = self
            .store
            .delete(Table::Albums, &[Filter::eq("id", album_id)])
            .await?;
        self.store
            .delete(
                Table::OrderScopes,
                &[Filter::eq("scope", album_scope(album_id))],
            )
            .await?;

        if deleted > 0 {
            info!(album = %album_id, memberships, "album deleted");
        }
        Ok(deleted > 0)
    }
}
