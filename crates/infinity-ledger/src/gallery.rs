//! The standalone bucket and photo uploads.

use tracing::{debug, info, warn};

use infinity_order::next_position;
use infinity_store::{BlobStore, Query, RecordStore, StoreError, Table};
use infinity_types::{
    AlbumId, BucketKind, Entry, EntryId, Photo, PhotoId, PhotoOwner, PhotoUpload, PhotoView,
    StandaloneBucket,
};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{decode_rows, encode_row, is_position_clash, MembershipLedger, APPEND_ATTEMPTS};

/// Outcome of the album attach step of an upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachStatus {
    NotRequested,
    Attached(AlbumId),
    /// The photo was stored but could not be attached. The upload stands.
    Failed { album_id: AlbumId, reason: String },
}

/// A stored photo and the result of attaching it to its target album.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadReceipt {
    pub photo: Photo,
    pub attached: AttachStatus,
}

/// Per-file results of [`MembershipLedger::upload_photos`].
#[derive(Debug, Default)]
pub struct BatchUpload {
    pub uploaded: Vec<UploadReceipt>,
    /// Names of files skipped for not being images.
    pub skipped: Vec<String>,
    pub failed: Vec<(String, LedgerError)>,
}

impl<S: RecordStore, B: BlobStore> MembershipLedger<S, B> {
    /// Return the entry owning standalone gallery photos, creating it on
    /// first use.
    ///
    /// Safe to call concurrently: the bucket marker is unique, so a losing
    /// insert re-reads the winner's bucket.
    pub async fn ensure_standalone_bucket(&self) -> LedgerResult<StandaloneBucket> {
        if let Some(bucket) = self.find_bucket(BucketKind::Gallery).await? {
            return Ok(bucket);
        }

        let entry = Entry::bucket(BucketKind::Gallery, &self.config.bucket_title);
        match self.store.insert(Table::Entries, vec![encode_row(&entry)?]).await {
            Ok(_) => {
                info!(entry = %entry.id, "standalone bucket created");
                StandaloneBucket::from_entry(&entry).ok_or_else(|| LedgerError::Corrupt {
                    table: Table::Entries,
                    reason: format!("entry {} lost its bucket marker", entry.id),
                })
            }
            Err(StoreError::UniqueViolation { .. }) => {
                debug!("standalone bucket created by a concurrent caller");
                self.find_bucket(BucketKind::Gallery)
                    .await?
                    .ok_or_else(|| LedgerError::Corrupt {
                        table: Table::Entries,
                        reason: "bucket conflict reported but no bucket found".into(),
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Validate, store, and record one photo, then attach it to
    /// `target_album` if given.
    ///
    /// Nothing is written if validation fails or the owner cannot be
    /// resolved. If the record cannot be written the blob is removed again.
    /// An attach failure is reported in the receipt and does not undo the
    /// upload.
    pub async fn upload_photo(
        &self,
        upload: PhotoUpload,
        owner: PhotoOwner,
        target_album: Option<AlbumId>,
    ) -> LedgerResult<UploadReceipt> {
        upload.validate(
            &self.config.accepted_content_prefix,
            self.config.max_upload_bytes,
        )?;

        let entry_id = match owner {
            PhotoOwner::Gallery => self.ensure_standalone_bucket().await?.entry_id(),
            PhotoOwner::Entry(id) => self.require_entry(id).await?.id,
        };

        let photo_id = PhotoId::new();
        let storage_key = format!(
            "{}/{}.{}",
            self.config.media_prefix.trim_matches('/'),
            photo_id,
            upload.extension()
        );
        let content = self
            .blobs
            .store(&storage_key, upload.bytes.clone(), &upload.content_type)
            .await?;

        let photo = match self
            .record_photo(photo_id, entry_id, &upload, &storage_key, content)
            .await
        {
            Ok(photo) => photo,
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&storage_key).await {
                    warn!(
                        key = %storage_key,
                        error = %cleanup,
                        "orphaned blob left by failed upload"
                    );
                }
                return Err(e);
            }
        };
        info!(photo = %photo.id, entry = %entry_id, key = %storage_key, "photo uploaded");

        let attached = match target_album {
            None => AttachStatus::NotRequested,
            Some(album_id) => match self.add_photo_to_albums(photo.id, &[album_id]).await {
                Ok(_) => AttachStatus::Attached(album_id),
                Err(e) => {
                    warn!(
                        photo = %photo.id,
                        album = %album_id,
                        error = %e,
                        "uploaded photo not attached"
                    );
                    AttachStatus::Failed {
                        album_id,
                        reason: e.to_string(),
                    }
                }
            },
        };

        Ok(UploadReceipt { photo, attached })
    }

    /// Upload several files in order. Files that are not images are skipped;
    /// a failed file does not stop the rest.
    pub async fn upload_photos(
        &self,
        uploads: Vec<PhotoUpload>,
        owner: PhotoOwner,
        target_album: Option<AlbumId>,
    ) -> BatchUpload {
        let mut batch = BatchUpload::default();
        for upload in uploads {
            if !upload
                .content_type
                .starts_with(&self.config.accepted_content_prefix)
            {
                debug!(
                    name = %upload.name,
                    content_type = %upload.content_type,
                    "skipping non-image upload"
                );
                batch.skipped.push(upload.name);
                continue;
            }
            let name = upload.name.clone();
            match self.upload_photo(upload, owner, target_album).await {
                Ok(receipt) => batch.uploaded.push(receipt),
                Err(e) => batch.failed.push((name, e)),
            }
        }
        batch
    }

    /// Every photo, newest first, with the title of its owning entry.
    ///
    /// Photos whose entry no longer exists are left out.
    pub async fn list_photos(&self) -> LedgerResult<Vec<PhotoView>> {
        let query = Query::from(Table::Photos).order_by_desc("created_at");
        let photos: Vec<Photo> = decode_rows(Table::Photos, self.store.select(&query).await?)?;
        self.photo_views(photos).await
    }

    /// Join photos with their entry titles, dropping those whose entry is
    /// missing. Order is preserved.
    pub(crate) async fn photo_views(&self, photos: Vec<Photo>) -> LedgerResult<Vec<PhotoView>> {
        let titles = self.entry_titles(photos.iter().map(|p| p.entry_id)).await?;
        Ok(photos
            .into_iter()
            .filter_map(|photo| {
                let entry_title = titles.get(&photo.entry_id)?.clone();
                Some(PhotoView { photo, entry_title })
            })
            .collect())
    }

    async fn find_bucket(&self, kind: BucketKind) -> LedgerResult<Option<StandaloneBucket>> {
        let query = Query::from(Table::Entries).eq("bucket", kind);
        let entries: Vec<Entry> = decode_rows(Table::Entries, self.store.select(&query).await?)?;
        Ok(entries.iter().find_map(StandaloneBucket::from_entry))
    }

    async fn record_photo(
        &self,
        photo_id: PhotoId,
        entry_id: EntryId,
        upload: &PhotoUpload,
        storage_key: &str,
        content: String,
    ) -> LedgerResult<Photo> {
        let mut photo = Photo {
            id: photo_id,
            entry_id,
            content,
            name: upload.display_name(),
            storage_key: storage_key.to_string(),
            checksum: upload.checksum(),
            content_type: upload.content_type.clone(),
            position: 0,
            created_at: infinity_types::time::now(),
        };

        let query = Query::from(Table::Photos)
            .eq("entry_id", entry_id)
            .order_by_desc("position")
            .limit(1);
        let mut attempt = 1;
        loop {
            let last: Vec<Photo> = decode_rows(Table::Photos, self.store.select(&query).await?)?;
            photo.position = next_position(last.iter().map(|p| p.position))?;
            match self
                .store
                .insert(Table::Photos, vec![encode_row(&photo)?])
                .await
            {
                Ok(_) => return Ok(photo),
                Err(e) if is_position_clash(&e) && attempt < APPEND_ATTEMPTS => {
                    debug!(entry = %entry_id, attempt, "photo position taken, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use infinity_store::{BlobOperation, Operation};

    use super::*;
    use crate::testing::{album_positions, image, seed_album, Fixture};

    #[tokio::test]
    async fn bucket_is_created_once() {
        let fx = Fixture::new();
        let first = fx.ledger.ensure_standalone_bucket().await.unwrap();
        let second = fx.ledger.ensure_standalone_bucket().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fx.store.row_count(Table::Entries).unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_first_use_yields_one_bucket() {
        let fx = Fixture::new();
        let (a, b, c) = tokio::join!(
            fx.ledger.ensure_standalone_bucket(),
            fx.ledger.ensure_standalone_bucket(),
            fx.ledger.ensure_standalone_bucket(),
        );
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(fx.store.row_count(Table::Entries).unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_first_gallery_uploads_share_one_bucket() {
        let fx = Fixture::new();
        let album = seed_album(&fx, "A").await;

        let (first, second) = tokio::join!(
            fx.ledger
                .upload_photo(image("a.jpg"), PhotoOwner::Gallery, Some(album)),
            fx.ledger
                .upload_photo(image("b.jpg"), PhotoOwner::Gallery, Some(album)),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(fx.store.row_count(Table::Entries).unwrap(), 1);
        assert_eq!(first.photo.entry_id, second.photo.entry_id);
        let mut positions = vec![first.photo.position, second.photo.position];
        positions.sort();
        assert_eq!(positions, vec![0, 1]);

        assert_eq!(first.attached, AttachStatus::Attached(album));
        assert_eq!(second.attached, AttachStatus::Attached(album));
        let mut in_album: Vec<u32> = album_positions(&fx, album)
            .await
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        in_album.sort();
        assert_eq!(in_album, vec![0, 1]);
    }

    #[tokio::test]
    async fn gallery_upload_appends_to_bucket() {
        let fx = Fixture::new();
        let first = fx
            .ledger
            .upload_photo(image("a.jpg"), PhotoOwner::Gallery, None)
            .await
            .unwrap();
        let second = fx
            .ledger
            .upload_photo(image("b.PNG"), PhotoOwner::Gallery, None)
            .await
            .unwrap();

        assert_eq!(first.attached, AttachStatus::NotRequested);
        assert_eq!(first.photo.position, 0);
        assert_eq!(second.photo.position, 1);
        assert_eq!(first.photo.entry_id, second.photo.entry_id);
        assert_eq!(second.photo.storage_key, format!("gallery/{}.png", second.photo.id));
        assert_eq!(
            second.photo.content,
            format!("memory://media/gallery/{}.png", second.photo.id)
        );
        assert!(fx.blobs.get(&first.photo.storage_key).is_some());
    }

    #[tokio::test]
    async fn validation_happens_before_any_write() {
        let fx = Fixture::new();
        let bad = PhotoUpload::new("notes.txt", "text/plain", Bytes::from_static(b"hi"));
        let err = fx
            .ledger
            .upload_photo(bad, PhotoOwner::Gallery, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Invalid(_)));
        assert_eq!(fx.store.row_count(Table::Entries).unwrap(), 0);
        assert!(fx.blobs.is_empty());
    }

    #[tokio::test]
    async fn unknown_entry_owner_is_rejected() {
        let fx = Fixture::new();
        let err = fx
            .ledger
            .upload_photo(image("a.jpg"), PhotoOwner::Entry(EntryId::new()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::EntryNotFound(_)));
        assert!(fx.blobs.is_empty());
    }

    #[tokio::test]
    async fn blob_failure_writes_no_record() {
        let fx = Fixture::new();
        fx.blobs.fail_next(BlobOperation::Store);
        let err = fx
            .ledger
            .upload_photo(image("a.jpg"), PhotoOwner::Gallery, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Store(_)));
        assert_eq!(fx.store.row_count(Table::Photos).unwrap(), 0);
    }

    #[tokio::test]
    async fn record_failure_removes_the_blob() {
        let fx = Fixture::new();
        fx.store.fail_next(Operation::Insert, Table::Photos);
        let err = fx
            .ledger
            .upload_photo(image("a.jpg"), PhotoOwner::Gallery, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Store(_)));
        assert!(fx.blobs.is_empty());
    }

    #[tokio::test]
    async fn attach_failure_is_reported_not_rolled_back() {
        let fx = Fixture::new();
        let album = seed_album(&fx, "Trips").await;
        fx.store.fail_next(Operation::Upsert, Table::AlbumPhotos);

        let receipt = fx
            .ledger
            .upload_photo(image("a.jpg"), PhotoOwner::Gallery, Some(album))
            .await
            .unwrap();
        assert!(matches!(
            receipt.attached,
            AttachStatus::Failed { album_id, .. } if album_id == album
        ));
        assert!(fx.ledger.find_photo(receipt.photo.id).await.unwrap().is_some());
        assert_eq!(fx.store.row_count(Table::AlbumPhotos).unwrap(), 0);
    }

    #[tokio::test]
    async fn upload_into_album() {
        let fx = Fixture::new();
        let album = seed_album(&fx, "Trips").await;
        let receipt = fx
            .ledger
            .upload_photo(image("a.jpg"), PhotoOwner::Gallery, Some(album))
            .await
            .unwrap();
        assert_eq!(receipt.attached, AttachStatus::Attached(album));
        let albums = fx.ledger.list_albums_for_photo(receipt.photo.id).await.unwrap();
        assert!(albums.contains(&album));
    }

    #[tokio::test]
    async fn batch_skips_non_images() {
        let fx = Fixture::new();
        let batch = fx
            .ledger
            .upload_photos(
                vec![
                    image("a.jpg"),
                    PhotoUpload::new("notes.txt", "text/plain", Bytes::from_static(b"hi")),
                    PhotoUpload::new("empty.png", "image/png", Bytes::new()),
                    image("b.jpg"),
                ],
                PhotoOwner::Gallery,
                None,
            )
            .await;
        assert_eq!(batch.uploaded.len(), 2);
        assert_eq!(batch.skipped, vec!["notes.txt".to_string()]);
        assert_eq!(batch.failed.len(), 1);
        assert_eq!(batch.failed[0].0, "empty.png");
        let positions: Vec<_> = batch.uploaded.iter().map(|r| r.photo.position).collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[tokio::test]
    async fn list_photos_joins_entry_titles() {
        let fx = Fixture::new();
        let entry = fx.ledger.create_entry("Road trip", None, "ana").await.unwrap();
        fx.ledger
            .upload_photo(image("a.jpg"), PhotoOwner::Entry(entry.id), None)
            .await
            .unwrap();
        fx.ledger
            .upload_photo(image("b.jpg"), PhotoOwner::Gallery, None)
            .await
            .unwrap();

        let mut titles: Vec<String> = fx
            .ledger
            .list_photos()
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.entry_title)
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["Gallery".to_string(), "Road trip".to_string()]);
    }
}
