use std::sync::Arc;

use chrono::Utc;

use super::domain::{
    next_announcement_id, Announcement, AnnouncementId, ApprovalPayload, CallOffPayload,
    ChessBoardKey, ChessBoardView, DetailView, ModerationRowView, PublicCardView,
    SubmissionPayload, UpdatePayload,
};
use super::filters::AnnouncementFilter;
use super::repository::{AnnouncementRecord, AnnouncementRepository, RepositoryError};
use crate::marketplace::catalog::gallery::{
    reconcile_photos, seed_photos, Gallery, GalleryOwner, PhotoView,
};
use crate::marketplace::catalog::repository::{CatalogError, CatalogRepository};
use crate::marketplace::catalog::domain::ComplexId;
use crate::marketplace::promotions::PromotionView;
use crate::marketplace::users::{Principal, UserDirectory, UserView};

/// Orchestrates the announcement lifecycle: submission by end users,
/// approval by the complex owner, call-off by moderation, and the
/// promotion-ordered public feed.
pub struct AnnouncementService<R, C> {
    announcements: Arc<R>,
    catalog: Arc<C>,
    users: Arc<dyn UserDirectory>,
}

#[derive(Debug, thiserror::Error)]
pub enum AnnouncementServiceError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("{0} does not exist")]
    MissingEntity(&'static str),
    #[error("permission denied")]
    Forbidden,
    #[error("announcement storage failed: {0}")]
    Repository(#[from] RepositoryError),
    #[error("catalog storage failed: {0}")]
    Catalog(#[from] CatalogError),
}

fn validation(field: &'static str, message: impl Into<String>) -> AnnouncementServiceError {
    AnnouncementServiceError::Validation {
        field,
        message: message.into(),
    }
}

impl<R, C> AnnouncementService<R, C>
where
    R: AnnouncementRepository,
    C: CatalogRepository,
{
    pub fn new(announcements: Arc<R>, catalog: Arc<C>, users: Arc<dyn UserDirectory>) -> Self {
        Self {
            announcements,
            catalog,
            users,
        }
    }

    pub fn submit(
        &self,
        principal: &Principal,
        payload: SubmissionPayload,
    ) -> Result<DetailView, AnnouncementServiceError> {
        if let Err(failure) = payload.validate() {
            return Err(AnnouncementServiceError::Validation {
                field: failure.field,
                message: failure.message,
            });
        }
        if self.catalog.complex(payload.residential_complex)?.is_none() {
            return Err(AnnouncementServiceError::MissingEntity("residential complex"));
        }
        let id = next_announcement_id();
        let mut gallery = Gallery::new(GalleryOwner::Announcement(id));
        seed_photos(&mut gallery, &payload.gallery_photos);
        let announcement = Announcement {
            id,
            author: principal.user_id,
            residential_complex: payload.residential_complex,
            address: payload.address,
            purpose: payload.purpose,
            room_amount: payload.room_amount,
            planning: payload.planning,
            condition: payload.condition,
            square: payload.square,
            kitchen_square: payload.kitchen_square,
            balcony: payload.balcony,
            heating: payload.heating,
            payment_option: payload.payment_option,
            agent_commission: payload.agent_commission,
            communication_method: payload.communication_method,
            description: payload.description,
            price: payload.price,
            main_photo: payload.main_photo,
            district: payload.district,
            micro_district: payload.micro_district,
            gallery: gallery.id,
            accepted: false,
            called_off: false,
            rejection_reason: None,
            flat: None,
            created_at: Utc::now(),
        };
        self.catalog.insert_gallery(gallery)?;
        let record = AnnouncementRecord {
            announcement,
            promotion: None,
        };
        self.announcements.insert(record.clone())?;
        tracing::info!(
            announcement = record.announcement.id.0,
            author = principal.user_id.0,
            "announcement submitted"
        );
        self.detail_view(&record)
    }

    /// Approval decision by the owner of the targeted complex.
    ///
    /// Binding a flat checks it is free (or already bound to this very
    /// announcement) and belongs to the announcement's complex, then
    /// lands the listing on the (complex, corps, section) chessboard.
    /// Accepting requires a bound flat, either from this payload or from
    /// an earlier one.
    pub fn approve(
        &self,
        principal: &Principal,
        id: AnnouncementId,
        payload: ApprovalPayload,
    ) -> Result<DetailView, AnnouncementServiceError> {
        let mut record = self.fetch_record(id)?;
        let complex = self
            .catalog
            .complex(record.announcement.residential_complex)?
            .ok_or(AnnouncementServiceError::MissingEntity("residential complex"))?;
        if complex.owner != principal.user_id {
            return Err(AnnouncementServiceError::Forbidden);
        }

        if let Some(flat_id) = payload.flat {
            let flat = self
                .catalog
                .flat(flat_id)?
                .ok_or_else(|| validation("flat", "flat does not exist"))?;
            match self.announcements.flat_binding(flat_id)? {
                Some(bound) if bound != id => {
                    return Err(validation("flat", "flat is already bound to another announcement"));
                }
                _ => {}
            }
            if flat.residential_complex != record.announcement.residential_complex {
                return Err(validation(
                    "flat",
                    "flat belongs to another residential complex",
                ));
            }
            self.announcements.get_or_create_chessboard(ChessBoardKey {
                residential_complex: flat.residential_complex,
                corps: flat.corps,
                section: flat.section,
            })?;
            record.announcement.flat = Some(flat_id);
        }

        self.apply_listing_update(&mut record, payload.fields)?;

        let accepted = payload.accepted.unwrap_or(record.announcement.accepted);
        if accepted && record.announcement.flat.is_none() {
            return Err(validation(
                "flat",
                "accepting an announcement requires a bound flat",
            ));
        }
        record.announcement.accepted = accepted;
        self.announcements.update(record.clone())?;
        tracing::info!(
            announcement = id.0,
            accepted,
            "announcement approval recorded"
        );
        self.detail_view(&record)
    }

    /// Moderation takedown; a second call-off on the same listing is
    /// rejected.
    pub fn call_off(
        &self,
        id: AnnouncementId,
        payload: CallOffPayload,
    ) -> Result<DetailView, AnnouncementServiceError> {
        let mut record = self.fetch_record(id)?;
        if record.announcement.called_off {
            return Err(validation(
                "called_off",
                "announcement is already called off",
            ));
        }
        record.announcement.called_off = true;
        record.announcement.rejection_reason = Some(payload.rejection_reason);
        self.announcements.update(record.clone())?;
        tracing::warn!(
            announcement = id.0,
            reason = ?payload.rejection_reason,
            "announcement called off"
        );
        self.detail_view(&record)
    }

    /// Lifts an earlier call-off and clears the recorded reason.
    pub fn allow(&self, id: AnnouncementId) -> Result<DetailView, AnnouncementServiceError> {
        let mut record = self.fetch_record(id)?;
        if !record.announcement.called_off {
            return Err(validation("called_off", "announcement is not called off"));
        }
        record.announcement.called_off = false;
        record.announcement.rejection_reason = None;
        self.announcements.update(record.clone())?;
        self.detail_view(&record)
    }

    /// Public feed: accepted, not called off, filter applied, promoted
    /// listings first (higher efficiency wins), newest first within a
    /// tier.
    pub fn public_cards(
        &self,
        filter: &AnnouncementFilter,
    ) -> Result<Vec<PublicCardView>, AnnouncementServiceError> {
        let mut records: Vec<AnnouncementRecord> = Vec::new();
        for record in self.announcements.list()? {
            if !record.announcement.accepted || record.announcement.called_off {
                continue;
            }
            let complex = self
                .catalog
                .complex(record.announcement.residential_complex)?
                .ok_or(AnnouncementServiceError::MissingEntity("residential complex"))?;
            if filter.matches(&record.announcement, complex.house_status) {
                records.push(record);
            }
        }
        records.sort_by(|a, b| {
            let efficiency = |record: &AnnouncementRecord| {
                record
                    .promotion
                    .as_ref()
                    .map(|promotion| promotion.promotion_type.efficiency)
                    .unwrap_or(0)
            };
            efficiency(b)
                .cmp(&efficiency(a))
                .then(b.announcement.created_at.cmp(&a.announcement.created_at))
        });
        Ok(filter.paginate(records.iter().map(card_view).collect()))
    }

    /// Moderator listing covering every record regardless of state.
    pub fn moderation_rows(&self) -> Result<Vec<ModerationRowView>, AnnouncementServiceError> {
        let mut rows = Vec::new();
        for record in self.announcements.list()? {
            rows.push(self.moderation_row(&record)?);
        }
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    pub fn called_off_rows(&self) -> Result<Vec<ModerationRowView>, AnnouncementServiceError> {
        let mut rows = Vec::new();
        for record in self.announcements.list()? {
            if record.announcement.called_off {
                rows.push(self.moderation_row(&record)?);
            }
        }
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    /// Approval queue for the builder: pending listings targeting their
    /// complex.
    pub fn approval_requests(
        &self,
        principal: &Principal,
    ) -> Result<Vec<DetailView>, AnnouncementServiceError> {
        let complex = self.owned_complex(principal)?;
        let mut views = Vec::new();
        for record in self.announcements.list()? {
            if record.announcement.residential_complex == complex
                && !record.announcement.accepted
                && !record.announcement.called_off
            {
                views.push(self.detail_view(&record)?);
            }
        }
        Ok(views)
    }

    /// Already accepted listings of the builder's complex.
    pub fn accepted_list(
        &self,
        principal: &Principal,
    ) -> Result<Vec<DetailView>, AnnouncementServiceError> {
        let complex = self.owned_complex(principal)?;
        let mut views = Vec::new();
        for record in self.announcements.list()? {
            if record.announcement.residential_complex == complex && record.announcement.accepted {
                views.push(self.detail_view(&record)?);
            }
        }
        Ok(views)
    }

    pub fn my_announcements(
        &self,
        principal: &Principal,
    ) -> Result<Vec<DetailView>, AnnouncementServiceError> {
        let mut views = Vec::new();
        for record in self.announcements.list()? {
            if record.announcement.author == principal.user_id {
                views.push(self.detail_view(&record)?);
            }
        }
        Ok(views)
    }

    pub fn detail(&self, id: AnnouncementId) -> Result<DetailView, AnnouncementServiceError> {
        let record = self.fetch_record(id)?;
        self.detail_view(&record)
    }

    pub fn update_own(
        &self,
        principal: &Principal,
        id: AnnouncementId,
        update: UpdatePayload,
    ) -> Result<DetailView, AnnouncementServiceError> {
        let mut record = self.fetch_record(id)?;
        if record.announcement.author != principal.user_id {
            return Err(AnnouncementServiceError::Forbidden);
        }
        self.apply_listing_update(&mut record, update)?;
        self.announcements.update(record.clone())?;
        self.detail_view(&record)
    }

    /// Partial-update application shared by the author-side update and
    /// builder approval: validated field overwrites plus gallery
    /// reconciliation.
    fn apply_listing_update(
        &self,
        record: &mut AnnouncementRecord,
        update: UpdatePayload,
    ) -> Result<(), AnnouncementServiceError> {
        let announcement = &mut record.announcement;
        if let Some(address) = update.address {
            announcement.address = address;
        }
        if let Some(purpose) = update.purpose {
            announcement.purpose = purpose;
        }
        if let Some(room_amount) = update.room_amount {
            if !(1..=5).contains(&room_amount) {
                return Err(validation("room_amount", "room amount must be between 1 and 5"));
            }
            announcement.room_amount = room_amount;
        }
        if let Some(planning) = update.planning {
            announcement.planning = planning;
        }
        if let Some(condition) = update.condition {
            announcement.condition = condition;
        }
        if let Some(square) = update.square {
            if square == 0 {
                return Err(validation("square", "square must be positive"));
            }
            announcement.square = square;
        }
        if let Some(kitchen_square) = update.kitchen_square {
            if kitchen_square == 0 {
                return Err(validation("kitchen_square", "kitchen square must be positive"));
            }
            announcement.kitchen_square = kitchen_square;
        }
        if let Some(balcony) = update.balcony {
            announcement.balcony = balcony;
        }
        if let Some(heating) = update.heating {
            announcement.heating = heating;
        }
        if let Some(payment_option) = update.payment_option {
            announcement.payment_option = payment_option;
        }
        if let Some(agent_commission) = update.agent_commission {
            announcement.agent_commission = agent_commission;
        }
        if let Some(communication_method) = update.communication_method {
            announcement.communication_method = communication_method;
        }
        if let Some(description) = update.description {
            announcement.description = description;
        }
        if let Some(price) = update.price {
            if price == 0 {
                return Err(validation("price", "price must be positive"));
            }
            announcement.price = price;
        }
        if let Some(main_photo) = update.main_photo {
            announcement.main_photo = main_photo;
        }
        if let Some(district) = update.district {
            announcement.district = district;
        }
        if let Some(micro_district) = update.micro_district {
            announcement.micro_district = micro_district;
        }
        if let Some(items) = update.gallery_photos {
            let mut gallery = self
                .catalog
                .gallery(announcement.gallery)?
                .ok_or(AnnouncementServiceError::MissingEntity("gallery"))?;
            reconcile_photos(&mut gallery, &items);
            self.catalog.update_gallery(gallery)?;
        }
        Ok(())
    }

    pub fn delete_own(
        &self,
        principal: &Principal,
        id: AnnouncementId,
    ) -> Result<(), AnnouncementServiceError> {
        let record = self.fetch_record(id)?;
        if record.announcement.author != principal.user_id {
            return Err(AnnouncementServiceError::Forbidden);
        }
        self.announcements.delete(id)?;
        Ok(())
    }

    /// Builder-side removal of an unwanted request targeting their
    /// complex.
    pub fn reject_request(
        &self,
        principal: &Principal,
        id: AnnouncementId,
    ) -> Result<(), AnnouncementServiceError> {
        let complex = self.owned_complex(principal)?;
        let record = self.fetch_record(id)?;
        if record.announcement.residential_complex != complex {
            return Err(AnnouncementServiceError::Forbidden);
        }
        self.announcements.delete(id)?;
        Ok(())
    }

    pub fn delete(&self, id: AnnouncementId) -> Result<(), AnnouncementServiceError> {
        self.fetch_record(id)?;
        self.announcements.delete(id)?;
        Ok(())
    }

    /// Grids of a complex with their bound listings, for the shopper
    /// floor-plan view.
    pub fn chessboards(
        &self,
        complex: ComplexId,
    ) -> Result<Vec<ChessBoardView>, AnnouncementServiceError> {
        let records = self.announcements.list()?;
        let mut views = Vec::new();
        for board in self.announcements.chessboards_by_complex(complex)? {
            let corps = self
                .catalog
                .corps(board.corps)?
                .ok_or(AnnouncementServiceError::MissingEntity("corps"))?;
            let section = self
                .catalog
                .section(board.section)?
                .ok_or(AnnouncementServiceError::MissingEntity("section"))?;
            let mut bound: Vec<&AnnouncementRecord> = Vec::new();
            for record in &records {
                if !record.announcement.accepted
                    || record.announcement.called_off
                    || record.announcement.residential_complex != complex
                {
                    continue;
                }
                let Some(flat_id) = record.announcement.flat else {
                    continue;
                };
                let Some(flat) = self.catalog.flat(flat_id)? else {
                    continue;
                };
                if flat.corps == board.corps && flat.section == board.section {
                    bound.push(record);
                }
            }
            bound.sort_by_key(|record| record.announcement.id);
            views.push(ChessBoardView {
                id: board.id,
                corps: corps.name,
                section: section.name,
                announcements: bound.into_iter().map(card_view).collect(),
            });
        }
        views.sort_by_key(|view| view.id);
        Ok(views)
    }

    fn owned_complex(
        &self,
        principal: &Principal,
    ) -> Result<ComplexId, AnnouncementServiceError> {
        self.catalog
            .complex_by_owner(principal.user_id)?
            .map(|complex| complex.id)
            .ok_or(AnnouncementServiceError::MissingEntity("residential complex"))
    }

    fn fetch_record(
        &self,
        id: AnnouncementId,
    ) -> Result<AnnouncementRecord, AnnouncementServiceError> {
        self.announcements
            .fetch(id)?
            .ok_or(AnnouncementServiceError::MissingEntity("announcement"))
    }

    fn moderation_row(
        &self,
        record: &AnnouncementRecord,
    ) -> Result<ModerationRowView, AnnouncementServiceError> {
        let author = self
            .users
            .fetch(record.announcement.author)
            .ok_or(AnnouncementServiceError::MissingEntity("author"))?;
        Ok(ModerationRowView {
            id: record.announcement.id,
            author: UserView::from(&author),
            price: record.announcement.price,
            accepted: record.announcement.accepted,
            called_off: record.announcement.called_off,
            rejection_reason: record.announcement.rejection_reason,
            created_at: record.announcement.created_at,
        })
    }

    fn detail_view(
        &self,
        record: &AnnouncementRecord,
    ) -> Result<DetailView, AnnouncementServiceError> {
        let announcement = &record.announcement;
        let author = self
            .users
            .fetch(announcement.author)
            .ok_or(AnnouncementServiceError::MissingEntity("author"))?;
        let gallery = self
            .catalog
            .gallery(announcement.gallery)?
            .ok_or(AnnouncementServiceError::MissingEntity("gallery"))?;
        Ok(DetailView {
            id: announcement.id,
            author: UserView::from(&author),
            residential_complex: announcement.residential_complex,
            address: announcement.address.clone(),
            purpose: announcement.purpose,
            room_amount: announcement.room_amount,
            planning: announcement.planning,
            condition: announcement.condition,
            square: announcement.square,
            kitchen_square: announcement.kitchen_square,
            balcony: announcement.balcony,
            heating: announcement.heating,
            payment_option: announcement.payment_option,
            agent_commission: announcement.agent_commission,
            communication_method: announcement.communication_method,
            description: announcement.description.clone(),
            price: announcement.price,
            main_photo: announcement.main_photo.clone(),
            district: announcement.district.clone(),
            micro_district: announcement.micro_district.clone(),
            accepted: announcement.accepted,
            called_off: announcement.called_off,
            rejection_reason: announcement.rejection_reason,
            flat: announcement.flat,
            gallery_photos: gallery.ordered_photos().iter().map(PhotoView::from).collect(),
            promotion: record.promotion.as_ref().map(PromotionView::from),
            created_at: announcement.created_at,
        })
    }
}

fn card_view(record: &AnnouncementRecord) -> PublicCardView {
    let announcement = &record.announcement;
    PublicCardView {
        id: announcement.id,
        main_photo: announcement.main_photo.clone(),
        price: announcement.price,
        payment_option: announcement.payment_option,
        condition: announcement.condition,
        district: announcement.district.clone(),
        micro_district: announcement.micro_district.clone(),
        room_amount: announcement.room_amount,
        square: announcement.square,
        promotion: record.promotion.as_ref().map(PromotionView::from),
        created_at: announcement.created_at,
    }
}
