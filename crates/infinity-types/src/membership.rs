use serde::{Deserialize, Serialize};

use infinity_order::{OrderedItem, Position};

use crate::id::{AlbumId, PhotoId};

/// One row of the `album_photos` relation.
///
/// `(album_id, photo_id)` is unique; `position` is scoped to the album.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Membership {
    pub album_id: AlbumId,
    pub photo_id: PhotoId,
    pub position: Position,
}

impl Membership {
    pub fn new(album_id: AlbumId, photo_id: PhotoId, position: Position) -> Self {
        Self {
            album_id,
            photo_id,
            position,
        }
    }
}

/// Within one album's scope a membership is identified by its photo.
impl OrderedItem for Membership {
    type Id = PhotoId;

    fn item_id(&self) -> PhotoId {
        self.photo_id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}
