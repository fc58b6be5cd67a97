use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::marketplace::catalog::domain::{ComplexId, CorpsId, FlatId, SectionId};
use crate::marketplace::catalog::gallery::{GalleryId, PhotoPayload, PhotoView};
use crate::marketplace::promotions::PromotionView;
use crate::marketplace::users::{UserId, UserView};

/// Identifier of an announcement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AnnouncementId(pub u64);

/// Identifier of a chessboard grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChessBoardId(pub u64);

static ANNOUNCEMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static CHESSBOARD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub fn next_announcement_id() -> AnnouncementId {
    AnnouncementId(ANNOUNCEMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

pub fn next_chessboard_id() -> ChessBoardId {
    ChessBoardId(CHESSBOARD_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Purpose {
    Apartments,
    House,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Planning {
    Studio,
    StudioBathroom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HouseCondition {
    RepairRequired,
    Good,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeatingType {
    Gas,
    Centralized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentOption {
    Mortgage,
    ParentCapital,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommunicationMethod {
    PhoneMessages,
    Phone,
    Messages,
}

/// Moderator-facing reason recorded when an announcement is called off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    IncorrectPrice,
    IncorrectPhoto,
    IncorrectDescription,
}

/// A secondary-market listing submitted by an end user.
///
/// `accepted` flips when the complex owner approves the listing and binds
/// it to a flat; `called_off` is the moderation kill switch and always
/// carries a [`RejectionReason`] while set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub author: UserId,
    pub residential_complex: ComplexId,
    pub address: String,
    pub purpose: Purpose,
    pub room_amount: u8,
    pub planning: Planning,
    pub condition: HouseCondition,
    pub square: u32,
    pub kitchen_square: u32,
    pub balcony: bool,
    pub heating: HeatingType,
    pub payment_option: PaymentOption,
    pub agent_commission: u64,
    pub communication_method: CommunicationMethod,
    pub description: String,
    pub price: u64,
    pub main_photo: String,
    pub district: String,
    pub micro_district: String,
    pub gallery: GalleryId,
    pub accepted: bool,
    pub called_off: bool,
    pub rejection_reason: Option<RejectionReason>,
    pub flat: Option<FlatId>,
    pub created_at: DateTime<Utc>,
}

/// One grid per (complex, corps, section); created lazily on the first
/// approval that lands in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChessBoard {
    pub id: ChessBoardId,
    pub residential_complex: ComplexId,
    pub corps: CorpsId,
    pub section: SectionId,
    pub created_at: DateTime<Utc>,
}

/// Lookup key identifying the grid an approved flat lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChessBoardKey {
    pub residential_complex: ComplexId,
    pub corps: CorpsId,
    pub section: SectionId,
}

/// Inbound payload for submitting an announcement.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionPayload {
    pub residential_complex: ComplexId,
    pub address: String,
    pub purpose: Purpose,
    pub room_amount: u8,
    pub planning: Planning,
    pub condition: HouseCondition,
    pub square: u32,
    pub kitchen_square: u32,
    #[serde(default)]
    pub balcony: bool,
    pub heating: HeatingType,
    pub payment_option: PaymentOption,
    #[serde(default)]
    pub agent_commission: u64,
    pub communication_method: CommunicationMethod,
    pub description: String,
    pub price: u64,
    pub main_photo: String,
    pub district: String,
    pub micro_district: String,
    #[serde(default)]
    pub gallery_photos: Vec<PhotoPayload>,
}

impl SubmissionPayload {
    /// Field-level validation before anything touches storage.
    pub fn validate(&self) -> Result<(), ValidationFailure> {
        if !(1..=5).contains(&self.room_amount) {
            return Err(ValidationFailure {
                field: "room_amount",
                message: "room amount must be between 1 and 5".into(),
            });
        }
        if self.price == 0 {
            return Err(ValidationFailure {
                field: "price",
                message: "price must be positive".into(),
            });
        }
        if self.square == 0 {
            return Err(ValidationFailure {
                field: "square",
                message: "square must be positive".into(),
            });
        }
        if self.kitchen_square == 0 {
            return Err(ValidationFailure {
                field: "kitchen_square",
                message: "kitchen square must be positive".into(),
            });
        }
        if self.kitchen_square >= self.square {
            return Err(ValidationFailure {
                field: "kitchen_square",
                message: "kitchen square must be smaller than total square".into(),
            });
        }
        Ok(())
    }
}

/// One failed field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub field: &'static str,
    pub message: String,
}

/// Builder's approval decision; `flat` may be omitted when the
/// announcement is already bound. Listing fields ride along and are
/// applied with the same semantics as the author-side update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApprovalPayload {
    pub accepted: Option<bool>,
    pub flat: Option<FlatId>,
    #[serde(flatten)]
    pub fields: UpdatePayload,
}

/// Moderation call-off always names its reason.
#[derive(Debug, Clone, Deserialize)]
pub struct CallOffPayload {
    pub rejection_reason: RejectionReason,
}

/// Author-side partial update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePayload {
    pub address: Option<String>,
    pub purpose: Option<Purpose>,
    pub room_amount: Option<u8>,
    pub planning: Option<Planning>,
    pub condition: Option<HouseCondition>,
    pub square: Option<u32>,
    pub kitchen_square: Option<u32>,
    pub balcony: Option<bool>,
    pub heating: Option<HeatingType>,
    pub payment_option: Option<PaymentOption>,
    pub agent_commission: Option<u64>,
    pub communication_method: Option<CommunicationMethod>,
    pub description: Option<String>,
    pub price: Option<u64>,
    pub main_photo: Option<String>,
    pub district: Option<String>,
    pub micro_district: Option<String>,
    pub gallery_photos: Option<Vec<PhotoPayload>>,
}

/// Card shown in the public feed.
#[derive(Debug, Clone, Serialize)]
pub struct PublicCardView {
    pub id: AnnouncementId,
    pub main_photo: String,
    pub price: u64,
    pub payment_option: PaymentOption,
    pub condition: HouseCondition,
    pub district: String,
    pub micro_district: String,
    pub room_amount: u8,
    pub square: u32,
    pub promotion: Option<PromotionView>,
    pub created_at: DateTime<Utc>,
}

/// Row shown to moderators in the shared listing.
#[derive(Debug, Clone, Serialize)]
pub struct ModerationRowView {
    pub id: AnnouncementId,
    pub author: UserView,
    pub price: u64,
    pub accepted: bool,
    pub called_off: bool,
    pub rejection_reason: Option<RejectionReason>,
    pub created_at: DateTime<Utc>,
}

/// Full announcement view with gallery and promotion.
#[derive(Debug, Clone, Serialize)]
pub struct DetailView {
    pub id: AnnouncementId,
    pub author: UserView,
    pub residential_complex: ComplexId,
    pub address: String,
    pub purpose: Purpose,
    pub room_amount: u8,
    pub planning: Planning,
    pub condition: HouseCondition,
    pub square: u32,
    pub kitchen_square: u32,
    pub balcony: bool,
    pub heating: HeatingType,
    pub payment_option: PaymentOption,
    pub agent_commission: u64,
    pub communication_method: CommunicationMethod,
    pub description: String,
    pub price: u64,
    pub main_photo: String,
    pub district: String,
    pub micro_district: String,
    pub accepted: bool,
    pub called_off: bool,
    pub rejection_reason: Option<RejectionReason>,
    pub flat: Option<FlatId>,
    pub gallery_photos: Vec<PhotoView>,
    pub promotion: Option<PromotionView>,
    pub created_at: DateTime<Utc>,
}

/// Grid view with resolved subdivision names and its bound listings.
#[derive(Debug, Clone, Serialize)]
pub struct ChessBoardView {
    pub id: ChessBoardId,
    pub corps: String,
    pub section: String,
    pub announcements: Vec<PublicCardView>,
}
