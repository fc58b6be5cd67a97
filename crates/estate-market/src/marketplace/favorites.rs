//! Per-user favorite lists over announcements and residential
//! complexes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::announcements::{AnnouncementId, AnnouncementRepository, RepositoryError};
use super::catalog::domain::ComplexId;
use super::catalog::repository::CatalogRepository;
use super::users::{authenticate, AuthError, Principal, UserDirectory, UserId};

/// Identifier of one favorite row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FavoriteId(pub u64);

static FAVORITE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub fn next_favorite_id() -> FavoriteId {
    FavoriteId(FAVORITE_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

/// What the favorite points at. A row references exactly one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "id")]
pub enum FavoriteTarget {
    Announcement(AnnouncementId),
    Complex(ComplexId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub id: FavoriteId,
    pub user: UserId,
    pub target: FavoriteTarget,
}

/// Storage abstraction over favorites. Duplicate (user, target) pairs
/// are a conflict.
pub trait FavoriteRepository: Send + Sync {
    fn insert(&self, favorite: Favorite) -> Result<(), RepositoryError>;
    fn fetch(&self, id: FavoriteId) -> Result<Option<Favorite>, RepositoryError>;
    fn list_by_user(&self, user: UserId) -> Result<Vec<Favorite>, RepositoryError>;
    fn delete(&self, id: FavoriteId) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteAnnouncementPayload {
    pub announcement: AnnouncementId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteComplexPayload {
    pub residential_complex: ComplexId,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteAnnouncementView {
    pub id: FavoriteId,
    pub announcement: AnnouncementId,
    pub main_photo: String,
    pub price: u64,
    pub district: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteComplexView {
    pub id: FavoriteId,
    pub residential_complex: ComplexId,
    pub name: String,
    pub address: String,
    pub main_photo: String,
}

pub struct FavoriteService<F, R, C> {
    favorites: Arc<F>,
    announcements: Arc<R>,
    catalog: Arc<C>,
}

#[derive(Debug, thiserror::Error)]
pub enum FavoriteServiceError {
    #[error("{0} does not exist")]
    MissingEntity(&'static str),
    #[error("already in favorites")]
    Duplicate,
    #[error("permission denied")]
    Forbidden,
    #[error("storage failed: {0}")]
    Repository(RepositoryError),
    #[error("catalog storage failed: {0}")]
    Catalog(#[from] super::catalog::repository::CatalogError),
}

impl From<RepositoryError> for FavoriteServiceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict => Self::Duplicate,
            other => Self::Repository(other),
        }
    }
}

impl<F, R, C> FavoriteService<F, R, C>
where
    F: FavoriteRepository,
    R: AnnouncementRepository,
    C: CatalogRepository,
{
    pub fn new(favorites: Arc<F>, announcements: Arc<R>, catalog: Arc<C>) -> Self {
        Self {
            favorites,
            announcements,
            catalog,
        }
    }

    pub fn add_announcement(
        &self,
        principal: &Principal,
        payload: FavoriteAnnouncementPayload,
    ) -> Result<FavoriteAnnouncementView, FavoriteServiceError> {
        let record = self
            .announcements
            .fetch(payload.announcement)
            .map_err(FavoriteServiceError::Repository)?
            .ok_or(FavoriteServiceError::MissingEntity("announcement"))?;
        let favorite = Favorite {
            id: next_favorite_id(),
            user: principal.user_id,
            target: FavoriteTarget::Announcement(payload.announcement),
        };
        self.favorites.insert(favorite.clone())?;
        Ok(FavoriteAnnouncementView {
            id: favorite.id,
            announcement: record.announcement.id,
            main_photo: record.announcement.main_photo,
            price: record.announcement.price,
            district: record.announcement.district,
        })
    }

    pub fn add_complex(
        &self,
        principal: &Principal,
        payload: FavoriteComplexPayload,
    ) -> Result<FavoriteComplexView, FavoriteServiceError> {
        let complex = self
            .catalog
            .complex(payload.residential_complex)?
            .ok_or(FavoriteServiceError::MissingEntity("residential complex"))?;
        let favorite = Favorite {
            id: next_favorite_id(),
            user: principal.user_id,
            target: FavoriteTarget::Complex(payload.residential_complex),
        };
        self.favorites.insert(favorite.clone())?;
        Ok(FavoriteComplexView {
            id: favorite.id,
            residential_complex: complex.id,
            name: complex.name,
            address: complex.address,
            main_photo: complex.main_photo,
        })
    }

    pub fn my_announcements(
        &self,
        principal: &Principal,
    ) -> Result<Vec<FavoriteAnnouncementView>, FavoriteServiceError> {
        let mut views = Vec::new();
        for favorite in self
            .favorites
            .list_by_user(principal.user_id)
            .map_err(FavoriteServiceError::Repository)?
        {
            let FavoriteTarget::Announcement(id) = favorite.target else {
                continue;
            };
            // A stale row pointing at a deleted announcement is skipped,
            // not an error.
            if let Some(record) = self
                .announcements
                .fetch(id)
                .map_err(FavoriteServiceError::Repository)?
            {
                views.push(FavoriteAnnouncementView {
                    id: favorite.id,
                    announcement: record.announcement.id,
                    main_photo: record.announcement.main_photo,
                    price: record.announcement.price,
                    district: record.announcement.district,
                });
            }
        }
        Ok(views)
    }

    pub fn my_complexes(
        &self,
        principal: &Principal,
    ) -> Result<Vec<FavoriteComplexView>, FavoriteServiceError> {
        let mut views = Vec::new();
        for favorite in self
            .favorites
            .list_by_user(principal.user_id)
            .map_err(FavoriteServiceError::Repository)?
        {
            let FavoriteTarget::Complex(id) = favorite.target else {
                continue;
            };
            if let Some(complex) = self.catalog.complex(id)? {
                views.push(FavoriteComplexView {
                    id: favorite.id,
                    residential_complex: complex.id,
                    name: complex.name,
                    address: complex.address,
                    main_photo: complex.main_photo,
                });
            }
        }
        Ok(views)
    }

    pub fn remove(
        &self,
        principal: &Principal,
        id: FavoriteId,
    ) -> Result<(), FavoriteServiceError> {
        let favorite = self
            .favorites
            .fetch(id)
            .map_err(FavoriteServiceError::Repository)?
            .ok_or(FavoriteServiceError::MissingEntity("favorite"))?;
        if favorite.user != principal.user_id {
            return Err(FavoriteServiceError::Forbidden);
        }
        self.favorites
            .delete(id)
            .map_err(FavoriteServiceError::Repository)?;
        Ok(())
    }
}

/// Shared state for favorite endpoints.
pub struct FavoriteRoutes<F, R, C> {
    pub service: Arc<FavoriteService<F, R, C>>,
    pub users: Arc<dyn UserDirectory>,
}

impl<F, R, C> Clone for FavoriteRoutes<F, R, C> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            users: Arc::clone(&self.users),
        }
    }
}

/// Router builder for favorite lists.
pub fn favorite_router<F, R, C>(
    service: Arc<FavoriteService<F, R, C>>,
    users: Arc<dyn UserDirectory>,
) -> Router
where
    F: FavoriteRepository + 'static,
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let state = FavoriteRoutes { service, users };
    Router::new()
        .route(
            "/api/v1/favorite-announcements",
            get(my_favorite_announcements_handler::<F, R, C>)
                .post(add_favorite_announcement_handler::<F, R, C>),
        )
        .route(
            "/api/v1/favorite-announcements/:favorite_id",
            axum::routing::delete(remove_favorite_handler::<F, R, C>),
        )
        .route(
            "/api/v1/favorite-complexes",
            get(my_favorite_complexes_handler::<F, R, C>)
                .post(add_favorite_complex_handler::<F, R, C>),
        )
        .route(
            "/api/v1/favorite-complexes/:favorite_id",
            axum::routing::delete(remove_favorite_handler::<F, R, C>),
        )
        .with_state(state)
}

fn auth_failure(error: AuthError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

fn failure(error: FavoriteServiceError) -> Response {
    let status = match &error {
        FavoriteServiceError::MissingEntity(_) => StatusCode::BAD_REQUEST,
        FavoriteServiceError::Duplicate => StatusCode::CONFLICT,
        FavoriteServiceError::Forbidden => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn principal_of<F, R, C>(
    state: &FavoriteRoutes<F, R, C>,
    headers: &HeaderMap,
) -> Result<Principal, Response> {
    authenticate(state.users.as_ref(), headers).map_err(auth_failure)
}

pub(crate) async fn my_favorite_announcements_handler<F, R, C>(
    State(state): State<FavoriteRoutes<F, R, C>>,
    headers: HeaderMap,
) -> Response
where
    F: FavoriteRepository + 'static,
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let principal = match principal_of(&state, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.my_announcements(&principal) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn add_favorite_announcement_handler<F, R, C>(
    State(state): State<FavoriteRoutes<F, R, C>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<FavoriteAnnouncementPayload>,
) -> Response
where
    F: FavoriteRepository + 'static,
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let principal = match principal_of(&state, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.add_announcement(&principal, payload) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn my_favorite_complexes_handler<F, R, C>(
    State(state): State<FavoriteRoutes<F, R, C>>,
    headers: HeaderMap,
) -> Response
where
    F: FavoriteRepository + 'static,
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let principal = match principal_of(&state, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.my_complexes(&principal) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn add_favorite_complex_handler<F, R, C>(
    State(state): State<FavoriteRoutes<F, R, C>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<FavoriteComplexPayload>,
) -> Response
where
    F: FavoriteRepository + 'static,
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let principal = match principal_of(&state, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.add_complex(&principal, payload) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn remove_favorite_handler<F, R, C>(
    State(state): State<FavoriteRoutes<F, R, C>>,
    headers: HeaderMap,
    Path(favorite_id): Path<u64>,
) -> Response
where
    F: FavoriteRepository + 'static,
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let principal = match principal_of(&state, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.remove(&principal, FavoriteId(favorite_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}
