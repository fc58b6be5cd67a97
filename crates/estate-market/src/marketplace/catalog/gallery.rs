//! Photo galleries shared by complexes, flats, and announcements.
//!
//! Every gallery row carries an explicit owner discriminator so photo
//! permission checks never have to walk reverse relations.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::domain::{ComplexId, FlatId};
use crate::marketplace::announcements::AnnouncementId;

/// Identifier of a gallery.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GalleryId(pub u64);

/// Identifier of a single photo inside a gallery.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PhotoId(pub u64);

static GALLERY_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static PHOTO_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub fn next_gallery_id() -> GalleryId {
    GalleryId(GALLERY_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

pub fn next_photo_id() -> PhotoId {
    PhotoId(PHOTO_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

/// The single entity a gallery belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "id")]
pub enum GalleryOwner {
    Complex(ComplexId),
    Flat(FlatId),
    Announcement(AnnouncementId),
}

/// One stored photo. Images are opaque strings (URL or base64 blob);
/// real file storage lives outside this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    pub photo: String,
    pub sequence_number: u32,
}

/// An ordered photo collection with its owner discriminator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gallery {
    pub id: GalleryId,
    pub owner: GalleryOwner,
    pub photos: Vec<Photo>,
}

impl Gallery {
    pub fn new(owner: GalleryOwner) -> Self {
        Self {
            id: next_gallery_id(),
            owner,
            photos: Vec::new(),
        }
    }

    /// Photos in display order.
    pub fn ordered_photos(&self) -> Vec<Photo> {
        let mut photos = self.photos.clone();
        photos.sort_by_key(|photo| photo.sequence_number);
        photos
    }
}

/// Inbound gallery item: a new upload has no `id`, an existing slot
/// carries the photo's `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoPayload {
    #[serde(default)]
    pub id: Option<PhotoId>,
    pub photo: String,
}

/// Photo view in responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoView {
    pub id: PhotoId,
    pub photo: String,
}

impl From<&Photo> for PhotoView {
    fn from(photo: &Photo) -> Self {
        Self {
            id: photo.id,
            photo: photo.photo.clone(),
        }
    }
}

/// Reconcile a gallery against an inbound photo list.
///
/// Items without an `id` are appended at the position they occupy in the
/// payload; items with a known `id` are updated in place (content and
/// sequence); photos present in the gallery but absent from the payload
/// are left untouched, and unknown ids are ignored. Clients rely on the
/// never-delete behavior, so it must not be "fixed" into a full replace.
pub fn reconcile_photos(gallery: &mut Gallery, incoming: &[PhotoPayload]) {
    for (index, item) in incoming.iter().enumerate() {
        let sequence = (index + 1) as u32;
        match item.id {
            None => gallery.photos.push(Photo {
                id: next_photo_id(),
                photo: item.photo.clone(),
                sequence_number: sequence,
            }),
            Some(id) => {
                if let Some(existing) = gallery.photos.iter_mut().find(|photo| photo.id == id) {
                    existing.photo = item.photo.clone();
                    existing.sequence_number = sequence;
                }
            }
        }
    }
}

/// Persist submission-order photos into a fresh gallery.
pub fn seed_photos(gallery: &mut Gallery, incoming: &[PhotoPayload]) {
    for (index, item) in incoming.iter().enumerate() {
        gallery.photos.push(Photo {
            id: next_photo_id(),
            photo: item.photo.clone(),
            sequence_number: (index + 1) as u32,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gallery_with(photos: &[(&str, u32)]) -> Gallery {
        let mut gallery = Gallery::new(GalleryOwner::Complex(ComplexId(1)));
        for (content, sequence) in photos {
            gallery.photos.push(Photo {
                id: next_photo_id(),
                photo: content.to_string(),
                sequence_number: *sequence,
            });
        }
        gallery
    }

    #[test]
    fn new_items_are_appended_in_payload_order() {
        let mut gallery = gallery_with(&[]);
        reconcile_photos(
            &mut gallery,
            &[
                PhotoPayload {
                    id: None,
                    photo: "a".into(),
                },
                PhotoPayload {
                    id: None,
                    photo: "b".into(),
                },
            ],
        );
        let ordered = gallery.ordered_photos();
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0].photo, "a");
        assert_eq!(ordered[0].sequence_number, 1);
        assert_eq!(ordered[1].photo, "b");
        assert_eq!(ordered[1].sequence_number, 2);
    }

    #[test]
    fn known_ids_are_updated_in_place() {
        let mut gallery = gallery_with(&[("old", 1)]);
        let id = gallery.photos[0].id;
        reconcile_photos(
            &mut gallery,
            &[PhotoPayload {
                id: Some(id),
                photo: "new".into(),
            }],
        );
        assert_eq!(gallery.photos.len(), 1);
        assert_eq!(gallery.photos[0].photo, "new");
    }

    #[test]
    fn absent_ids_are_left_untouched() {
        let mut gallery = gallery_with(&[("keep", 1)]);
        reconcile_photos(
            &mut gallery,
            &[PhotoPayload {
                id: None,
                photo: "added".into(),
            }],
        );
        assert_eq!(gallery.photos.len(), 2);
        assert!(gallery.photos.iter().any(|photo| photo.photo == "keep"));
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut gallery = gallery_with(&[("keep", 1)]);
        reconcile_photos(
            &mut gallery,
            &[PhotoPayload {
                id: Some(PhotoId(999_999)),
                photo: "ghost".into(),
            }],
        );
        assert_eq!(gallery.photos.len(), 1);
        assert_eq!(gallery.photos[0].photo, "keep");
    }
}
