use std::sync::Arc;

use chrono::Utc;

use super::domain::{
    next_complex_id, next_corps_id, next_flat_id, next_floor_id, next_section_id, ComplexId,
    ComplexPayload, ComplexUpdate, ComplexView, Corps, CorpsId, Flat, FlatId, FlatPayload,
    FlatUpdate, FlatView, FlatsInformation, Floor, FloorId, ResidentialComplex, Section, SectionId,
    SubdivisionView,
};
use super::gallery::{reconcile_photos, seed_photos, Gallery, GalleryOwner, PhotoId, PhotoView};
use super::repository::{CatalogError, CatalogRepository};
use crate::marketplace::announcements::{AnnouncementRepository, RepositoryError};
use crate::marketplace::users::{Principal, Role, UserDirectory, UserView};

/// Orchestrates the builder inventory on top of the catalog and
/// announcement repositories.
pub struct CatalogService<C, A> {
    catalog: Arc<C>,
    announcements: Arc<A>,
    users: Arc<dyn UserDirectory>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogServiceError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("builder has no residential complex yet")]
    NoComplex,
    #[error("{0} does not exist")]
    MissingEntity(&'static str),
    #[error("permission denied")]
    Forbidden,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("announcement storage failed: {0}")]
    Announcements(#[from] RepositoryError),
}

impl<C, A> CatalogService<C, A>
where
    C: CatalogRepository,
    A: AnnouncementRepository,
{
    pub fn new(catalog: Arc<C>, announcements: Arc<A>, users: Arc<dyn UserDirectory>) -> Self {
        Self {
            catalog,
            announcements,
            users,
        }
    }

    pub fn create_complex(
        &self,
        principal: &Principal,
        payload: ComplexPayload,
    ) -> Result<ComplexView, CatalogServiceError> {
        if principal.role != Role::Builder {
            return Err(CatalogServiceError::Forbidden);
        }
        if self
            .catalog
            .complex_by_owner(principal.user_id)?
            .is_some()
        {
            return Err(CatalogServiceError::Validation {
                field: "owner",
                message: "builder already owns a residential complex".into(),
            });
        }
        if payload.name.trim().is_empty() {
            return Err(CatalogServiceError::Validation {
                field: "name",
                message: "name must not be empty".into(),
            });
        }
        let id = next_complex_id();
        let mut gallery = Gallery::new(GalleryOwner::Complex(id));
        seed_photos(&mut gallery, &payload.gallery_photos);
        let complex = ResidentialComplex {
            id,
            owner: principal.user_id,
            name: payload.name,
            address: payload.address,
            description: payload.description,
            house_status: payload.house_status,
            house_class: payload.house_class,
            territory_type: payload.territory_type,
            price_for_meter: payload.price_for_meter,
            min_price: payload.min_price,
            main_photo: payload.main_photo,
            gallery: gallery.id,
        };
        self.catalog.insert_gallery(gallery)?;
        self.catalog.insert_complex(complex.clone())?;
        tracing::info!(complex = complex.id.0, owner = principal.user_id.0, "residential complex registered");
        self.complex_view(&complex)
    }

    pub fn list_complexes(&self) -> Result<Vec<ComplexView>, CatalogServiceError> {
        let mut views = Vec::new();
        for complex in self.catalog.complexes()? {
            views.push(self.complex_view(&complex)?);
        }
        Ok(views)
    }

    pub fn complex_detail(&self, id: ComplexId) -> Result<ComplexView, CatalogServiceError> {
        let complex = self
            .catalog
            .complex(id)?
            .ok_or(CatalogServiceError::MissingEntity("residential complex"))?;
        self.complex_view(&complex)
    }

    pub fn my_complex(&self, principal: &Principal) -> Result<ComplexView, CatalogServiceError> {
        let complex = self.owned_complex(principal)?;
        self.complex_view(&complex)
    }

    pub fn update_my_complex(
        &self,
        principal: &Principal,
        update: ComplexUpdate,
    ) -> Result<ComplexView, CatalogServiceError> {
        let mut complex = self.owned_complex(principal)?;
        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(CatalogServiceError::Validation {
                    field: "name",
                    message: "name must not be empty".into(),
                });
            }
            complex.name = name;
        }
        if let Some(address) = update.address {
            complex.address = address;
        }
        if let Some(description) = update.description {
            complex.description = description;
        }
        if let Some(house_status) = update.house_status {
            complex.house_status = house_status;
        }
        if let Some(house_class) = update.house_class {
            complex.house_class = house_class;
        }
        if let Some(territory_type) = update.territory_type {
            complex.territory_type = territory_type;
        }
        if let Some(price_for_meter) = update.price_for_meter {
            complex.price_for_meter = price_for_meter;
        }
        if let Some(min_price) = update.min_price {
            complex.min_price = min_price;
        }
        if let Some(main_photo) = update.main_photo {
            complex.main_photo = main_photo;
        }
        if let Some(items) = update.gallery_photos {
            let mut gallery = self
                .catalog
                .gallery(complex.gallery)?
                .ok_or(CatalogServiceError::MissingEntity("gallery"))?;
            reconcile_photos(&mut gallery, &items);
            self.catalog.update_gallery(gallery)?;
        }
        self.catalog.update_complex(complex.clone())?;
        self.complex_view(&complex)
    }

    pub fn delete_my_complex(&self, principal: &Principal) -> Result<(), CatalogServiceError> {
        let complex = self.owned_complex(principal)?;
        self.catalog.delete_complex(complex.id)?;
        Ok(())
    }

    pub fn delete_complex(&self, id: ComplexId) -> Result<(), CatalogServiceError> {
        self.catalog.delete_complex(id)?;
        Ok(())
    }

    pub fn my_corps(&self, principal: &Principal) -> Result<Vec<SubdivisionView>, CatalogServiceError> {
        let complex = self.owned_complex(principal)?;
        self.corps_of_complex(complex.id)
    }

    pub fn corps_of_complex(
        &self,
        complex: ComplexId,
    ) -> Result<Vec<SubdivisionView>, CatalogServiceError> {
        let flats = self.catalog.flats_by_complex(complex)?;
        let mut rows: Vec<SubdivisionView> = self
            .catalog
            .corps_by_complex(complex)?
            .into_iter()
            .map(|corps| SubdivisionView {
                id: corps.id.0,
                name: corps.name,
                flat_amount: flats.iter().filter(|flat| flat.corps == corps.id).count(),
            })
            .collect();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    /// Appends an auto-numbered corps to the builder's complex.
    pub fn create_corps(&self, principal: &Principal) -> Result<SubdivisionView, CatalogServiceError> {
        let complex = self.owned_complex(principal)?;
        let existing = self.catalog.corps_by_complex(complex.id)?.len();
        let corps = Corps {
            id: next_corps_id(),
            residential_complex: complex.id,
            name: format!("Corps {}", existing + 1),
            created_at: Utc::now(),
        };
        self.catalog.insert_corps(corps.clone())?;
        Ok(SubdivisionView {
            id: corps.id.0,
            name: corps.name,
            flat_amount: 0,
        })
    }

    pub fn delete_corps(
        &self,
        principal: &Principal,
        id: CorpsId,
    ) -> Result<(), CatalogServiceError> {
        let complex = self.owned_complex(principal)?;
        let corps = self
            .catalog
            .corps(id)?
            .ok_or(CatalogServiceError::MissingEntity("corps"))?;
        if corps.residential_complex != complex.id {
            return Err(CatalogServiceError::Forbidden);
        }
        self.catalog.delete_corps(id)?;
        Ok(())
    }

    pub fn my_sections(
        &self,
        principal: &Principal,
    ) -> Result<Vec<SubdivisionView>, CatalogServiceError> {
        let complex = self.owned_complex(principal)?;
        self.sections_of_complex(complex.id)
    }

    pub fn sections_of_complex(
        &self,
        complex: ComplexId,
    ) -> Result<Vec<SubdivisionView>, CatalogServiceError> {
        let flats = self.catalog.flats_by_complex(complex)?;
        let mut rows: Vec<SubdivisionView> = self
            .catalog
            .sections_by_complex(complex)?
            .into_iter()
            .map(|section| SubdivisionView {
                id: section.id.0,
                name: section.name,
                flat_amount: flats
                    .iter()
                    .filter(|flat| flat.section == section.id)
                    .count(),
            })
            .collect();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    pub fn create_section(
        &self,
        principal: &Principal,
    ) -> Result<SubdivisionView, CatalogServiceError> {
        let complex = self.owned_complex(principal)?;
        let existing = self.catalog.sections_by_complex(complex.id)?.len();
        let section = Section {
            id: next_section_id(),
            residential_complex: complex.id,
            name: format!("Section {}", existing + 1),
        };
        self.catalog.insert_section(section.clone())?;
        Ok(SubdivisionView {
            id: section.id.0,
            name: section.name,
            flat_amount: 0,
        })
    }

    pub fn delete_section(
        &self,
        principal: &Principal,
        id: SectionId,
    ) -> Result<(), CatalogServiceError> {
        let complex = self.owned_complex(principal)?;
        let section = self
            .catalog
            .section(id)?
            .ok_or(CatalogServiceError::MissingEntity("section"))?;
        if section.residential_complex != complex.id {
            return Err(CatalogServiceError::Forbidden);
        }
        self.catalog.delete_section(id)?;
        Ok(())
    }

    pub fn my_floors(
        &self,
        principal: &Principal,
    ) -> Result<Vec<SubdivisionView>, CatalogServiceError> {
        let complex = self.owned_complex(principal)?;
        self.floors_of_complex(complex.id)
    }

    pub fn floors_of_complex(
        &self,
        complex: ComplexId,
    ) -> Result<Vec<SubdivisionView>, CatalogServiceError> {
        let flats = self.catalog.flats_by_complex(complex)?;
        let mut rows: Vec<SubdivisionView> = self
            .catalog
            .floors_by_complex(complex)?
            .into_iter()
            .map(|floor| SubdivisionView {
                id: floor.id.0,
                name: floor.name,
                flat_amount: flats.iter().filter(|flat| flat.floor == floor.id).count(),
            })
            .collect();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    pub fn create_floor(
        &self,
        principal: &Principal,
    ) -> Result<SubdivisionView, CatalogServiceError> {
        let complex = self.owned_complex(principal)?;
        let existing = self.catalog.floors_by_complex(complex.id)?.len();
        let floor = Floor {
            id: next_floor_id(),
            residential_complex: complex.id,
            name: format!("Floor {}", existing + 1),
        };
        self.catalog.insert_floor(floor.clone())?;
        Ok(SubdivisionView {
            id: floor.id.0,
            name: floor.name,
            flat_amount: 0,
        })
    }

    pub fn delete_floor(
        &self,
        principal: &Principal,
        id: FloorId,
    ) -> Result<(), CatalogServiceError> {
        let complex = self.owned_complex(principal)?;
        let floor = self
            .catalog
            .floor(id)?
            .ok_or(CatalogServiceError::MissingEntity("floor"))?;
        if floor.residential_complex != complex.id {
            return Err(CatalogServiceError::Forbidden);
        }
        self.catalog.delete_floor(id)?;
        Ok(())
    }

    pub fn create_flat(
        &self,
        principal: &Principal,
        payload: FlatPayload,
    ) -> Result<FlatView, CatalogServiceError> {
        let complex = self.owned_complex(principal)?;
        let corps = self
            .catalog
            .corps(payload.corps)?
            .ok_or(CatalogServiceError::MissingEntity("corps"))?;
        let section = self
            .catalog
            .section(payload.section)?
            .ok_or(CatalogServiceError::MissingEntity("section"))?;
        let floor = self
            .catalog
            .floor(payload.floor)?
            .ok_or(CatalogServiceError::MissingEntity("floor"))?;
        for (field, owner) in [
            ("corps", corps.residential_complex),
            ("section", section.residential_complex),
            ("floor", floor.residential_complex),
        ] {
            if owner != complex.id {
                return Err(CatalogServiceError::Validation {
                    field,
                    message: "belongs to another residential complex".into(),
                });
            }
        }
        if !(1..=6).contains(&payload.room_amount) {
            return Err(CatalogServiceError::Validation {
                field: "room_amount",
                message: "room amount must be between 1 and 6".into(),
            });
        }
        if payload.square == 0 {
            return Err(CatalogServiceError::Validation {
                field: "square",
                message: "square must be positive".into(),
            });
        }
        if payload.price == 0 {
            return Err(CatalogServiceError::Validation {
                field: "price",
                message: "price must be positive".into(),
            });
        }
        let id = next_flat_id();
        let mut gallery = Gallery::new(GalleryOwner::Flat(id));
        seed_photos(&mut gallery, &payload.gallery_photos);
        let flat = Flat {
            id,
            residential_complex: complex.id,
            corps: corps.id,
            section: section.id,
            floor: floor.id,
            district: payload.district,
            micro_district: payload.micro_district,
            room_amount: payload.room_amount,
            scheme: payload.scheme,
            square: payload.square,
            price: payload.price,
            condition: payload.condition,
            gallery: gallery.id,
            created_at: Utc::now(),
        };
        self.catalog.insert_gallery(gallery)?;
        self.catalog.insert_flat(flat.clone())?;
        self.flat_view(&flat)
    }

    pub fn list_flats(&self) -> Result<Vec<FlatView>, CatalogServiceError> {
        let mut views = Vec::new();
        for flat in self.catalog.flats()? {
            views.push(self.flat_view(&flat)?);
        }
        Ok(views)
    }

    pub fn flat_detail(&self, id: FlatId) -> Result<FlatView, CatalogServiceError> {
        let flat = self
            .catalog
            .flat(id)?
            .ok_or(CatalogServiceError::MissingEntity("flat"))?;
        self.flat_view(&flat)
    }

    pub fn my_flats(&self, principal: &Principal) -> Result<Vec<FlatView>, CatalogServiceError> {
        let complex = self.owned_complex(principal)?;
        let mut views = Vec::new();
        for flat in self.catalog.flats_by_complex(complex.id)? {
            views.push(self.flat_view(&flat)?);
        }
        Ok(views)
    }

    /// Flats of the builder's complex not yet attached to any chessboard.
    pub fn not_bounded_flats(
        &self,
        principal: &Principal,
    ) -> Result<Vec<FlatView>, CatalogServiceError> {
        let complex = self.owned_complex(principal)?;
        let mut views = Vec::new();
        for flat in self.catalog.flats_by_complex(complex.id)? {
            if !self.announcements.is_flat_bound(flat.id)? {
                views.push(self.flat_view(&flat)?);
            }
        }
        Ok(views)
    }

    pub fn update_my_flat(
        &self,
        principal: &Principal,
        id: FlatId,
        update: FlatUpdate,
    ) -> Result<FlatView, CatalogServiceError> {
        let complex = self.owned_complex(principal)?;
        let mut flat = self
            .catalog
            .flat(id)?
            .ok_or(CatalogServiceError::MissingEntity("flat"))?;
        if flat.residential_complex != complex.id {
            return Err(CatalogServiceError::Forbidden);
        }
        if let Some(district) = update.district {
            flat.district = district;
        }
        if let Some(micro_district) = update.micro_district {
            flat.micro_district = micro_district;
        }
        if let Some(room_amount) = update.room_amount {
            if !(1..=6).contains(&room_amount) {
                return Err(CatalogServiceError::Validation {
                    field: "room_amount",
                    message: "room amount must be between 1 and 6".into(),
                });
            }
            flat.room_amount = room_amount;
        }
        if let Some(scheme) = update.scheme {
            flat.scheme = scheme;
        }
        if let Some(square) = update.square {
            if square == 0 {
                return Err(CatalogServiceError::Validation {
                    field: "square",
                    message: "square must be positive".into(),
                });
            }
            flat.square = square;
        }
        if let Some(price) = update.price {
            if price == 0 {
                return Err(CatalogServiceError::Validation {
                    field: "price",
                    message: "price must be positive".into(),
                });
            }
            flat.price = price;
        }
        if let Some(condition) = update.condition {
            flat.condition = condition;
        }
        if let Some(items) = update.gallery_photos {
            let mut gallery = self
                .catalog
                .gallery(flat.gallery)?
                .ok_or(CatalogServiceError::MissingEntity("gallery"))?;
            reconcile_photos(&mut gallery, &items);
            self.catalog.update_gallery(gallery)?;
        }
        self.catalog.update_flat(flat.clone())?;
        self.flat_view(&flat)
    }

    pub fn delete_my_flat(
        &self,
        principal: &Principal,
        id: FlatId,
    ) -> Result<(), CatalogServiceError> {
        let complex = self.owned_complex(principal)?;
        let flat = self
            .catalog
            .flat(id)?
            .ok_or(CatalogServiceError::MissingEntity("flat"))?;
        if flat.residential_complex != complex.id {
            return Err(CatalogServiceError::Forbidden);
        }
        self.catalog.delete_flat(id)?;
        Ok(())
    }

    /// Removes one photo after resolving the owning gallery's entity and
    /// checking the caller may edit it.
    pub fn delete_photo(
        &self,
        principal: &Principal,
        photo: PhotoId,
    ) -> Result<(), CatalogServiceError> {
        let gallery = self
            .catalog
            .gallery_of_photo(photo)?
            .ok_or(CatalogServiceError::MissingEntity("photo"))?;
        let allowed = match gallery.owner {
            GalleryOwner::Complex(id) => {
                let complex = self
                    .catalog
                    .complex(id)?
                    .ok_or(CatalogServiceError::MissingEntity("residential complex"))?;
                complex.owner == principal.user_id || principal.role.is_moderator()
            }
            GalleryOwner::Flat(id) => {
                let flat = self
                    .catalog
                    .flat(id)?
                    .ok_or(CatalogServiceError::MissingEntity("flat"))?;
                let complex = self
                    .catalog
                    .complex(flat.residential_complex)?
                    .ok_or(CatalogServiceError::MissingEntity("residential complex"))?;
                complex.owner == principal.user_id || principal.role.is_moderator()
            }
            GalleryOwner::Announcement(id) => {
                let record = self
                    .announcements
                    .fetch(id)?
                    .ok_or(CatalogServiceError::MissingEntity("announcement"))?;
                record.announcement.author == principal.user_id
                    || principal.role.is_moderator()
            }
        };
        if !allowed {
            return Err(CatalogServiceError::Forbidden);
        }
        self.catalog.remove_photo(photo)?;
        Ok(())
    }

    fn owned_complex(
        &self,
        principal: &Principal,
    ) -> Result<ResidentialComplex, CatalogServiceError> {
        if principal.role != Role::Builder {
            return Err(CatalogServiceError::Forbidden);
        }
        self.catalog
            .complex_by_owner(principal.user_id)?
            .ok_or(CatalogServiceError::NoComplex)
    }

    fn complex_view(
        &self,
        complex: &ResidentialComplex,
    ) -> Result<ComplexView, CatalogServiceError> {
        let owner = self
            .users
            .fetch(complex.owner)
            .ok_or(CatalogServiceError::MissingEntity("owner"))?;
        let flats = self.catalog.flats_by_complex(complex.id)?;
        let gallery = self
            .catalog
            .gallery(complex.gallery)?
            .ok_or(CatalogServiceError::MissingEntity("gallery"))?;
        Ok(ComplexView {
            id: complex.id,
            owner: UserView::from(&owner),
            name: complex.name.clone(),
            address: complex.address.clone(),
            description: complex.description.clone(),
            house_status: complex.house_status,
            house_class: complex.house_class,
            territory_type: complex.territory_type,
            price_for_meter: complex.price_for_meter,
            min_price: complex.min_price,
            main_photo: complex.main_photo.clone(),
            flats_information: FlatsInformation {
                maximal_square: flats.iter().map(|flat| flat.square).max(),
                minimal_square: flats.iter().map(|flat| flat.square).min(),
                minimal_price: flats.iter().map(|flat| flat.price).min(),
            },
            gallery_photos: gallery.ordered_photos().iter().map(PhotoView::from).collect(),
        })
    }

    fn flat_view(&self, flat: &Flat) -> Result<FlatView, CatalogServiceError> {
        let corps = self
            .catalog
            .corps(flat.corps)?
            .ok_or(CatalogServiceError::MissingEntity("corps"))?;
        let section = self
            .catalog
            .section(flat.section)?
            .ok_or(CatalogServiceError::MissingEntity("section"))?;
        let floor = self
            .catalog
            .floor(flat.floor)?
            .ok_or(CatalogServiceError::MissingEntity("floor"))?;
        let gallery = self
            .catalog
            .gallery(flat.gallery)?
            .ok_or(CatalogServiceError::MissingEntity("gallery"))?;
        Ok(FlatView {
            id: flat.id,
            residential_complex: flat.residential_complex,
            corps: corps.name,
            section: section.name,
            floor: floor.name,
            district: flat.district.clone(),
            micro_district: flat.micro_district.clone(),
            room_amount: flat.room_amount,
            scheme: flat.scheme.clone(),
            square: flat.square,
            price: flat.price,
            condition: flat.condition,
            gallery_photos: gallery.ordered_photos().iter().map(PhotoView::from).collect(),
        })
    }
}
