//! Album records and their read models.

use std::collections::HashMap;

use tracing::info;

use infinity_store::{BlobStore, Filter, Query, RecordStore, Table};
use infinity_types::{
    Album, AlbumId, AlbumSummary, AlbumUpdate, AlbumWithPhotos, Membership, Photo, PhotoId,
};

use crate::error::LedgerResult;
use crate::ledger::{decode_rows, encode_row, MembershipLedger};

impl<S: RecordStore, B: BlobStore> MembershipLedger<S, B> {
    /// Create an album. The name is trimmed and must not be empty.
    pub async fn create_album(&self, name: &str, description: Option<&str>) -> LedgerResult<Album> {
        let album = Album::new(name, description)?;
        self.store
            .insert(Table::Albums, vec![encode_row(&album)?])
            .await?;
        info!(album = %album.id, name = %album.name, "album created");
        Ok(album)
    }

    /// Apply a partial update. A new cover must be an existing photo.
    pub async fn update_album(
        &self,
        album_id: AlbumId,
        update: AlbumUpdate,
    ) -> LedgerResult<Album> {
        let mut album = self.require_album(album_id).await?;
        if update.is_empty() {
            return Ok(album);
        }
        if let Some(Some(cover)) = update.cover_photo_id {
            self.require_photo(cover).await?;
        }
        update.apply_to(&mut album)?;
        self.store
            .update(
                Table::Albums,
                &[Filter::eq("id", album_id)],
                encode_row(&album)?,
            )
            .await?;
        Ok(album)
    }

    /// Every album, newest first, with its photo count and cover URL.
    ///
    /// Memberships pointing at photos that no longer exist are not counted,
    /// and a cover that no longer exists is reported as absent.
    pub async fn list_albums(&self) -> LedgerResult<Vec<AlbumSummary>> {
        let query = Query::from(Table::Albums).order_by_desc("created_at");
        let albums: Vec<Album> = decode_rows(Table::Albums, self.store.select(&query).await?)?;
        if albums.is_empty() {
            return Ok(Vec::new());
        }

        let query = Query::from(Table::AlbumPhotos).is_in("album_id", albums.iter().map(|a| a.id));
        let memberships: Vec<Membership> =
            decode_rows(Table::AlbumPhotos, self.store.select(&query).await?)?;

        let mut wanted: Vec<PhotoId> = memberships.iter().map(|m| m.photo_id).collect();
        wanted.extend(albums.iter().filter_map(|a| a.cover_photo_id));
        wanted.sort();
        wanted.dedup();
        let photos = self.photos_by_id(wanted).await?;

        let mut counts: HashMap<AlbumId, usize> = HashMap::new();
        for m in memberships.iter().filter(|m| photos.contains_key(&m.photo_id)) {
            *counts.entry(m.album_id).or_default() += 1;
        }

        Ok(albums
            .into_iter()
            .map(|album| {
                let photo_count = counts.get(&album.id).copied().unwrap_or(0);
                summarize(album, photo_count, &photos)
            })
            .collect())
    }

    /// One album with its photos in album order.
    pub async fn get_album(&self, album_id: AlbumId) -> LedgerResult<AlbumWithPhotos> {
        let album = self.require_album(album_id).await?;
        let memberships = self.memberships(album_id).await?;

        let mut wanted: Vec<PhotoId> = memberships.iter().map(|m| m.photo_id).collect();
        wanted.extend(album.cover_photo_id);
        let mut photos = self.photos_by_id(wanted).await?;

        let ordered: Vec<Photo> = memberships
            .iter()
            .filter_map(|m| photos.get(&m.photo_id).cloned())
            .collect();
        let views = self.photo_views(ordered).await?;

        let cover = album
            .cover_photo_id
            .and_then(|id| photos.remove(&id))
            .map(|p| (p.id, p));
        let summary = summarize(album, views.len(), &cover.into_iter().collect());
        Ok(AlbumWithPhotos {
            summary,
            photos: views,
        })
    }
}

fn summarize(album: Album, photo_count: usize, photos: &HashMap<PhotoId, Photo>) -> AlbumSummary {
    let cover_photo_url = album
        .cover_photo_id
        .and_then(|id| photos.get(&id))
        .map(|p| p.content.clone());
    AlbumSummary {
        album,
        cover_photo_url,
        photo_count,
    }
}

#[cfg(test)]
mod tests {
    use infinity_types::{PhotoOwner, TypeError};

    use super::*;
    use crate::error::LedgerError;
    use crate::testing::{image, seed_photo, Fixture};

    #[tokio::test]
    async fn create_trims_and_validates() {
        let fx = Fixture::new();
        let album = fx.ledger.create_album("  Summer ", Some("beach")).await.unwrap();
        assert_eq!(album.name, "Summer");

        let err = fx.ledger.create_album("   ", None).await.unwrap_err();
        assert!(matches!(err, LedgerError::Invalid(TypeError::EmptyAlbumName)));
        assert_eq!(fx.store.row_count(Table::Albums).unwrap(), 1);
    }

    #[tokio::test]
    async fn update_cover_requires_photo() {
        let fx = Fixture::new();
        let album = fx.ledger.create_album("Summer", None).await.unwrap();

        let err = fx
            .ledger
            .update_album(album.id, AlbumUpdate::default().cover(Some(PhotoId::new())))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::PhotoNotFound(_)));

        let photo = seed_photo(&fx).await;
        let updated = fx
            .ledger
            .update_album(
                album.id,
                AlbumUpdate::default().rename("Summer '24").cover(Some(photo)),
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Summer '24");
        assert_eq!(updated.cover_photo_id, Some(photo));

        let stored = fx.ledger.require_album(album.id).await.unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn update_missing_album() {
        let fx = Fixture::new();
        let err = fx
            .ledger
            .update_album(AlbumId::new(), AlbumUpdate::default().rename("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlbumNotFound(_)));
    }

    #[tokio::test]
    async fn list_counts_only_resolvable_photos() {
        let fx = Fixture::new();
        let album = fx.ledger.create_album("Summer", None).await.unwrap();
        let empty = fx.ledger.create_album("Winter", None).await.unwrap();
        let kept = seed_photo(&fx).await;
        let gone = seed_photo(&fx).await;
        fx.ledger
            .add_photo_to_albums(kept, &[album.id])
            .await
            .unwrap();
        fx.ledger
            .add_photo_to_albums(gone, &[album.id])
            .await
            .unwrap();
        fx.ledger
            .update_album(album.id, AlbumUpdate::default().cover(Some(gone)))
            .await
            .unwrap();

        // Drop the photo record behind the ledger's back, leaving its
        // membership row and the cover pointing at nothing.
        fx.store
            .delete(Table::Photos, &[Filter::eq("id", gone)])
            .await
            .unwrap();

        let summaries = fx.ledger.list_albums().await.unwrap();
        let summer = summaries.iter().find(|s| s.album.id == album.id).unwrap();
        assert_eq!(summer.photo_count, 1);
        assert_eq!(summer.cover_photo_url, None);
        let winter = summaries.iter().find(|s| s.album.id == empty.id).unwrap();
        assert_eq!(winter.photo_count, 0);
    }

    #[tokio::test]
    async fn get_album_returns_photos_in_album_order() {
        let fx = Fixture::new();
        let album = fx.ledger.create_album("Summer", None).await.unwrap();
        let mut ids = Vec::new();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            let receipt = fx
                .ledger
                .upload_photo(image(name), PhotoOwner::Gallery, Some(album.id))
                .await
                .unwrap();
            ids.push(receipt.photo.id);
        }
        fx.ledger.reorder_album(album.id, 0, 2).await.unwrap();
        fx.ledger
            .update_album(album.id, AlbumUpdate::default().cover(Some(ids[1])))
            .await
            .unwrap();

        let view = fx.ledger.get_album(album.id).await.unwrap();
        let order: Vec<PhotoId> = view.photos.iter().map(|v| v.photo.id).collect();
        assert_eq!(order, vec![ids[1], ids[2], ids[0]]);
        assert_eq!(view.summary.photo_count, 3);
        assert_eq!(view.photos[0].entry_title, "Gallery");
        assert_eq!(
            view.summary.cover_photo_url.as_deref(),
            Some(view.photos[0].photo.content.as_str())
        );
    }

    #[tokio::test]
    async fn get_missing_album_is_an_error() {
        let fx = Fixture::new();
        let err = fx.ledger.get_album(AlbumId::new()).await.unwrap_err();
        assert!(matches!(err, LedgerError::AlbumNotFound(_)));
    }
}
