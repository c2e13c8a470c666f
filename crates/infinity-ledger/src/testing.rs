//! Shared fixtures for the ledger's unit tests.

use std::sync::Arc;

use bytes::Bytes;

use infinity_store::{encode, InMemoryBlobStore, InMemoryRecordStore, RecordStore, Table};
use infinity_types::{time, AlbumId, EntryId, Membership, Photo, PhotoId, PhotoUpload, Position};

use crate::ledger::MembershipLedger;

pub(crate) struct Fixture {
    pub ledger: MembershipLedger<InMemoryRecordStore, InMemoryBlobStore>,
    pub store: Arc<InMemoryRecordStore>,
    pub blobs: Arc<InMemoryBlobStore>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryRecordStore::new());
        let blobs = Arc::new(InMemoryBlobStore::new());
        let ledger = MembershipLedger::new(Arc::clone(&store), Arc::clone(&blobs));
        Self {
            ledger,
            store,
            blobs,
        }
    }
}

pub(crate) fn image(name: &str) -> PhotoUpload {
    PhotoUpload::new(name, "image/jpeg", Bytes::from(name.as_bytes().to_vec()))
}

/// Insert a bare photo record (owned by an entry that does not exist).
pub(crate) async fn seed_photo(fx: &Fixture) -> PhotoId {
    let id = PhotoId::new();
    let photo = Photo {
        id,
        entry_id: EntryId::new(),
        content: format!("memory://media/seed/{id}.jpg"),
        name: "seed.jpg".into(),
        storage_key: format!("seed/{id}.jpg"),
        checksum: String::new(),
        content_type: "image/jpeg".into(),
        position: 0,
        created_at: time::now(),
    };
    fx.store
        .insert(Table::Photos, vec![encode(&photo).unwrap()])
        .await
        .unwrap();
    id
}

pub(crate) async fn seed_album(fx: &Fixture, name: &str) -> AlbumId {
    fx.ledger.create_album(name, None).await.unwrap().id
}

/// `(photo, position)` pairs of an album in position order.
pub(crate) async fn album_positions(fx: &Fixture, album: AlbumId) -> Vec<(PhotoId, Position)> {
    let rows: Vec<Membership> = fx.ledger.memberships(album).await.unwrap();
    rows.into_iter().map(|m| (m.photo_id, m.position)).collect()
}
