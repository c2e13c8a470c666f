use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use infinity_ledger::{
    AddOutcome, BatchUpload, LedgerConfig, MembershipLedger, SelectionChange, UploadReceipt,
};
use infinity_store::{BlobStore, FsBlobStore, InMemoryBlobStore, InMemoryRecordStore, Snapshot};
use infinity_types::{
    Album, AlbumId, AlbumSummary, AlbumUpdate, AlbumWithPhotos, Entry, EntryId, Membership,
    PhotoId, PhotoOwner, PhotoUpload, PhotoView, StandaloneBucket,
};

use crate::config::JournalConfig;
use crate::error::SdkResult;

/// High-level journal API.
///
/// Records live in an [`InMemoryRecordStore`] that a persisted journal
/// loads from and saves to `records.json`; media goes to the blob store `B`.
pub struct Journal<B = FsBlobStore> {
    ledger: MembershipLedger<InMemoryRecordStore, B>,
    author: String,
    records_path: Option<PathBuf>,
}

impl Journal<InMemoryBlobStore> {
    /// A throwaway journal with nothing persisted.
    pub fn in_memory() -> Self {
        Self::in_memory_with(LedgerConfig::default())
    }

    pub fn in_memory_with(config: LedgerConfig) -> Self {
        let ledger = MembershipLedger::with_config(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryBlobStore::new()),
            config,
        );
        Self {
            ledger,
            author: JournalConfig::default().author,
            records_path: None,
        }
    }
}

impl Journal<FsBlobStore> {
    /// Open (or start) the journal under `config.data_dir`.
    pub async fn open(config: JournalConfig) -> SdkResult<Self> {
        let records_path = config.records_path();
        let store = match tokio::fs::read(&records_path).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
                InMemoryRecordStore::from_snapshot(snapshot)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => InMemoryRecordStore::new(),
            Err(e) => return Err(e.into()),
        };

        let mut blobs = FsBlobStore::open(config.media_dir()).await?;
        if let Some(base) = &config.media_base_url {
            blobs = blobs.with_base_url(base.clone());
        }

        info!(data_dir = %config.data_dir.display(), "journal opened");
        Ok(Self {
            ledger: MembershipLedger::with_config(Arc::new(store), Arc::new(blobs), config.ledger),
            author: config.author,
            records_path: Some(records_path),
        })
    }
}

impl<B: BlobStore> Journal<B> {
    /// The underlying ledger.
    pub fn ledger(&self) -> &MembershipLedger<InMemoryRecordStore, B> {
        &self.ledger
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// Write the records to `records.json`. A no-op for in-memory journals.
    pub async fn save(&self) -> SdkResult<()> {
        let Some(path) = &self.records_path else {
            return Ok(());
        };
        let snapshot = self.ledger.store().snapshot()?;
        let json = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), bytes = json.len(), "journal saved");
        Ok(())
    }

    // ---- Entries ----

    pub async fn create_entry(&self, title: &str, description: Option<&str>) -> SdkResult<Entry> {
        Ok(self
            .ledger
            .create_entry(title, description, &self.author)
            .await?)
    }

    pub async fn entries(&self) -> SdkResult<Vec<Entry>> {
        Ok(self.ledger.list_entries().await?)
    }

    pub async fn move_entry(&self, from_index: usize, to_index: usize) -> SdkResult<Vec<Entry>> {
        Ok(self.ledger.reorder_entries(from_index, to_index).await?)
    }

    pub async fn delete_entry(&self, entry_id: EntryId) -> SdkResult<bool> {
        Ok(self.ledger.delete_entry(entry_id).await?)
    }

    // ---- Albums ----

    pub async fn create_album(&self, name: &str, description: Option<&str>) -> SdkResult<Album> {
        Ok(self.ledger.create_album(name, description).await?)
    }

    pub async fn update_album(&self, album_id: AlbumId, update: AlbumUpdate) -> SdkResult<Album> {
        Ok(self.ledger.update_album(album_id, update).await?)
    }

    pub async fn albums(&self) -> SdkResult<Vec<AlbumSummary>> {
        Ok(self.ledger.list_albums().await?)
    }

    pub async fn album(&self, album_id: AlbumId) -> SdkResult<AlbumWithPhotos> {
        Ok(self.ledger.get_album(album_id).await?)
    }

    pub async fn move_in_album(
        &self,
        album_id: AlbumId,
        from_index: usize,
        to_index: usize,
    ) -> SdkResult<Vec<Membership>> {
        Ok(self
            .ledger
            .reorder_album(album_id, from_index, to_index)
            .await?)
    }

    pub async fn delete_album(&self, album_id: AlbumId) -> SdkResult<bool> {
        Ok(self.ledger.delete_album(album_id).await?)
    }

    // ---- Photos ----

    pub async fn gallery(&self) -> SdkResult<StandaloneBucket> {
        Ok(self.ledger.ensure_standalone_bucket().await?)
    }

    pub async fn upload(
        &self,
        upload: PhotoUpload,
        owner: PhotoOwner,
        album: Option<AlbumId>,
    ) -> SdkResult<UploadReceipt> {
        Ok(self.ledger.upload_photo(upload, owner, album).await?)
    }

    pub async fn upload_all(
        &self,
        uploads: Vec<PhotoUpload>,
        owner: PhotoOwner,
        album: Option<AlbumId>,
    ) -> BatchUpload {
        self.ledger.upload_photos(uploads, owner, album).await
    }

    pub async fn photos(&self) -> SdkResult<Vec<PhotoView>> {
        Ok(self.ledger.list_photos().await?)
    }

    pub async fn delete_photo(&self, photo_id: PhotoId) -> SdkResult<bool> {
        Ok(self.ledger.delete_photo(photo_id).await?)
    }

    // ---- Membership ----

    pub async fn add_to_albums(
        &self,
        photo_id: PhotoId,
        albums: &[AlbumId],
    ) -> SdkResult<AddOutcome> {
        Ok(self.ledger.add_photo_to_albums(photo_id, albums).await?)
    }

    pub async fn remove_from_album(&self, photo_id: PhotoId, album_id: AlbumId) -> SdkResult<bool> {
        Ok(self
            .ledger
            .remove_photo_from_album(photo_id, album_id)
            .await?)
    }

    pub async fn albums_of(&self, photo_id: PhotoId) -> SdkResult<HashSet<AlbumId>> {
        Ok(self.ledger.list_albums_for_photo(photo_id).await?)
    }

    pub async fn set_albums(
        &self,
        photo_id: PhotoId,
        albums: &[AlbumId],
    ) -> SdkResult<SelectionChange> {
        Ok(self.ledger.apply_album_selection(photo_id, albums).await?)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::error::SdkError;
    use infinity_ledger::{AttachStatus, LedgerError};

    fn jpeg(name: &str) -> PhotoUpload {
        PhotoUpload::new(name, "image/jpeg", Bytes::from_static(b"\xff\xd8\xff\xe0"))
    }

    #[tokio::test]
    async fn in_memory_journal_end_to_end() {
        let journal = Journal::in_memory();
        let entry = journal.create_entry("Lisbon", Some("first day")).await.unwrap();
        assert_eq!(entry.created_by, "me");
        let album = journal.create_album("Portugal", None).await.unwrap();

        let receipt = journal
            .upload(jpeg("tram.jpg"), PhotoOwner::Entry(entry.id), Some(album.id))
            .await
            .unwrap();
        assert_eq!(receipt.attached, AttachStatus::Attached(album.id));

        let view = journal.album(album.id).await.unwrap();
        assert_eq!(view.photos.len(), 1);
        assert_eq!(view.photos[0].entry_title, "Lisbon");

        journal.save().await.unwrap();
    }

    #[tokio::test]
    async fn persisted_journal_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = JournalConfig {
            author: "ana".into(),
            ..JournalConfig::for_data_dir(dir.path())
        };

        let (album_id, photo) = {
            let journal = Journal::open(config.clone()).await.unwrap();
            journal.create_entry("Day one", None).await.unwrap();
            let album = journal.create_album("Best of", None).await.unwrap();
            let receipt = journal
                .upload(jpeg("sunset.jpg"), PhotoOwner::Gallery, Some(album.id))
                .await
                .unwrap();
            journal.save().await.unwrap();
            (album.id, receipt.photo)
        };

        assert!(dir.path().join("media").join(&photo.storage_key).exists());

        let journal = Journal::open(config).await.unwrap();
        let entries = journal.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].created_by, "ana");
        let albums = journal.albums_of(photo.id).await.unwrap();
        assert!(albums.contains(&album_id));
        let view = journal.album(album_id).await.unwrap();
        assert_eq!(view.photos[0].photo, photo);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = JournalConfig::for_data_dir(dir.path());
        std::fs::write(config.records_path(), b"{ not json").unwrap();

        let err = Journal::open(config).await.err().unwrap();
        assert!(matches!(err, SdkError::Snapshot(_)));
    }

    #[tokio::test]
    async fn ledger_errors_pass_through() {
        let journal = Journal::in_memory();
        let err = journal.album(AlbumId::new()).await.unwrap_err();
        assert!(matches!(err, SdkError::Ledger(LedgerError::AlbumNotFound(_))));
    }
}
