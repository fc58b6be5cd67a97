//! Secondary-market announcements: submission, builder approval with
//! chessboard placement, moderation call-off, and the public feed.

pub mod domain;
pub mod filters;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    next_announcement_id, next_chessboard_id, Announcement, AnnouncementId, ApprovalPayload,
    CallOffPayload, ChessBoard, ChessBoardId, ChessBoardKey, ChessBoardView,
    CommunicationMethod, DetailView, HeatingType, HouseCondition, ModerationRowView,
    PaymentOption, Planning, PublicCardView, Purpose, RejectionReason, SubmissionPayload,
    UpdatePayload, ValidationFailure,
};
pub use filters::AnnouncementFilter;
pub use repository::{AnnouncementRecord, AnnouncementRepository, RepositoryError};
pub use router::{announcement_router, approval_router};
pub use service::{AnnouncementService, AnnouncementServiceError};
