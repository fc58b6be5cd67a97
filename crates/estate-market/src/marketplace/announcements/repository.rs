use super::domain::{Announcement, AnnouncementId, ChessBoard, ChessBoardKey};
use crate::marketplace::catalog::domain::{ComplexId, FlatId};
use crate::marketplace::promotions::Promotion;

/// Stored announcement together with its attached promotion, if any.
/// The 1:1 promotion constraint is a property of the record itself.
#[derive(Debug, Clone)]
pub struct AnnouncementRecord {
    pub announcement: Announcement,
    pub promotion: Option<Promotion>,
}

/// Storage abstraction over announcements and chessboard grids.
pub trait AnnouncementRepository: Send + Sync {
    fn insert(&self, record: AnnouncementRecord) -> Result<(), RepositoryError>;
    fn update(&self, record: AnnouncementRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: AnnouncementId) -> Result<Option<AnnouncementRecord>, RepositoryError>;
    fn list(&self) -> Result<Vec<AnnouncementRecord>, RepositoryError>;
    fn delete(&self, id: AnnouncementId) -> Result<(), RepositoryError>;

    /// Announcement currently bound to the flat, if any.
    fn flat_binding(&self, flat: FlatId) -> Result<Option<AnnouncementId>, RepositoryError>;

    fn is_flat_bound(&self, flat: FlatId) -> Result<bool, RepositoryError> {
        Ok(self.flat_binding(flat)?.is_some())
    }

    /// Idempotent grid lookup keyed by (complex, corps, section).
    fn get_or_create_chessboard(&self, key: ChessBoardKey) -> Result<ChessBoard, RepositoryError>;

    fn chessboards_by_complex(
        &self,
        complex: ComplexId,
    ) -> Result<Vec<ChessBoard>, RepositoryError>;
}

/// Error enumeration for announcement storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
