//! Builder inventory: residential complexes, their corps/section/floor
//! subdivisions, concrete flats, and the shared photo galleries.

pub mod domain;
pub mod gallery;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    ComplexId, ComplexPayload, ComplexUpdate, ComplexView, Corps, CorpsId, FlatCondition, Flat,
    FlatId, FlatPayload, FlatUpdate, FlatView, Floor, FloorId, HouseClass, HouseStatus,
    ResidentialComplex, Section, SectionId, SubdivisionView, TerritoryType,
};
pub use gallery::{
    next_gallery_id, next_photo_id, reconcile_photos, Gallery, GalleryId, GalleryOwner, Photo,
    PhotoId, PhotoPayload, PhotoView,
};
pub use repository::{CatalogError, CatalogRepository};
pub use router::catalog_router;
pub use service::{CatalogService, CatalogServiceError};
