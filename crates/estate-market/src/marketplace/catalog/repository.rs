use super::domain::{
    ComplexId, Corps, CorpsId, Flat, FlatId, Floor, FloorId, ResidentialComplex, Section,
    SectionId,
};
use super::gallery::{Gallery, GalleryId, PhotoId};
use crate::marketplace::users::UserId;

/// Storage abstraction over the builder inventory so the service layer
/// can be exercised against an in-memory store.
///
/// Referential protection (a complex with flats, a corps/section/floor
/// with flats, a flat bound to an announcement) is enforced by the
/// implementation and surfaces as [`CatalogError::Protected`].
pub trait CatalogRepository: Send + Sync {
    fn insert_complex(&self, complex: ResidentialComplex) -> Result<(), CatalogError>;
    fn complex(&self, id: ComplexId) -> Result<Option<ResidentialComplex>, CatalogError>;
    fn complex_by_owner(&self, owner: UserId) -> Result<Option<ResidentialComplex>, CatalogError>;
    fn complexes(&self) -> Result<Vec<ResidentialComplex>, CatalogError>;
    fn update_complex(&self, complex: ResidentialComplex) -> Result<(), CatalogError>;
    fn delete_complex(&self, id: ComplexId) -> Result<(), CatalogError>;

    fn insert_corps(&self, corps: Corps) -> Result<(), CatalogError>;
    fn corps(&self, id: CorpsId) -> Result<Option<Corps>, CatalogError>;
    fn corps_by_complex(&self, complex: ComplexId) -> Result<Vec<Corps>, CatalogError>;
    fn delete_corps(&self, id: CorpsId) -> Result<(), CatalogError>;

    fn insert_section(&self, section: Section) -> Result<(), CatalogError>;
    fn section(&self, id: SectionId) -> Result<Option<Section>, CatalogError>;
    fn sections_by_complex(&self, complex: ComplexId) -> Result<Vec<Section>, CatalogError>;
    fn delete_section(&self, id: SectionId) -> Result<(), CatalogError>;

    fn insert_floor(&self, floor: Floor) -> Result<(), CatalogError>;
    fn floor(&self, id: FloorId) -> Result<Option<Floor>, CatalogError>;
    fn floors_by_complex(&self, complex: ComplexId) -> Result<Vec<Floor>, CatalogError>;
    fn delete_floor(&self, id: FloorId) -> Result<(), CatalogError>;

    fn insert_flat(&self, flat: Flat) -> Result<(), CatalogError>;
    fn flat(&self, id: FlatId) -> Result<Option<Flat>, CatalogError>;
    fn flats(&self) -> Result<Vec<Flat>, CatalogError>;
    fn flats_by_complex(&self, complex: ComplexId) -> Result<Vec<Flat>, CatalogError>;
    fn update_flat(&self, flat: Flat) -> Result<(), CatalogError>;
    fn delete_flat(&self, id: FlatId) -> Result<(), CatalogError>;

    fn insert_gallery(&self, gallery: Gallery) -> Result<(), CatalogError>;
    fn gallery(&self, id: GalleryId) -> Result<Option<Gallery>, CatalogError>;
    fn update_gallery(&self, gallery: Gallery) -> Result<(), CatalogError>;
    /// Gallery holding the given photo, if any.
    fn gallery_of_photo(&self, photo: PhotoId) -> Result<Option<Gallery>, CatalogError>;
    fn remove_photo(&self, photo: PhotoId) -> Result<(), CatalogError>;
}

/// Error enumeration for catalog storage failures.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("{0} are still bound to this record, deletion is impossible")]
    Protected(&'static str),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
