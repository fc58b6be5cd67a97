//! Paid promotions: the moderator-managed tariff catalog and the 1:1
//! attachment of a promotion to an accepted announcement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::access::{self, Action};
use super::announcements::{AnnouncementId, AnnouncementRepository, RepositoryError};
use super::users::{authenticate, AuthError, Principal, UserDirectory};

/// Identifier of a promotion tariff.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PromotionTypeId(pub u64);

static PROMOTION_TYPE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub fn next_promotion_type_id() -> PromotionTypeId {
    PromotionTypeId(PROMOTION_TYPE_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

/// A purchasable tariff. Higher `efficiency` ranks promoted listings
/// earlier in the public feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionType {
    pub id: PromotionTypeId,
    pub name: String,
    pub price: f64,
    pub efficiency: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromotionColor {
    Green,
    Red,
}

/// Promotion attached to one announcement. The tariff is embedded as a
/// snapshot, so later tariff edits do not retroactively reorder the
/// feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promotion {
    pub promotion_type: PromotionType,
    pub logo: String,
    pub header: Option<String>,
    pub color: Option<PromotionColor>,
}

/// Promotion fields surfaced on cards and detail views.
#[derive(Debug, Clone, Serialize)]
pub struct PromotionView {
    pub name: String,
    pub efficiency: u8,
    pub logo: String,
    pub header: Option<String>,
    pub color: Option<PromotionColor>,
}

impl From<&Promotion> for PromotionView {
    fn from(promotion: &Promotion) -> Self {
        Self {
            name: promotion.promotion_type.name.clone(),
            efficiency: promotion.promotion_type.efficiency,
            logo: promotion.logo.clone(),
            header: promotion.header.clone(),
            color: promotion.color,
        }
    }
}

/// Storage abstraction over the tariff catalog.
pub trait PromotionCatalog: Send + Sync {
    fn insert_type(&self, tariff: PromotionType) -> Result<(), RepositoryError>;
    fn update_type(&self, tariff: PromotionType) -> Result<(), RepositoryError>;
    fn promotion_type(&self, id: PromotionTypeId)
        -> Result<Option<PromotionType>, RepositoryError>;
    fn promotion_types(&self) -> Result<Vec<PromotionType>, RepositoryError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromotionTypePayload {
    pub name: String,
    pub price: f64,
    pub efficiency: u8,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromotionTypeUpdate {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub efficiency: Option<u8>,
}

/// Decorations chosen by the buyer when attaching a promotion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachPayload {
    #[serde(default)]
    pub logo: String,
    pub header: Option<String>,
    pub color: Option<PromotionColor>,
}

pub struct PromotionService<R, P> {
    announcements: Arc<R>,
    tariffs: Arc<P>,
}

#[derive(Debug, thiserror::Error)]
pub enum PromotionServiceError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("{0} does not exist")]
    MissingEntity(&'static str),
    #[error("permission denied")]
    Forbidden,
    #[error("only accepted announcements can be promoted")]
    NotPromotable,
    #[error("announcement already carries a promotion")]
    AlreadyPromoted,
    #[error("storage failed: {0}")]
    Repository(#[from] RepositoryError),
}

impl<R, P> PromotionService<R, P>
where
    R: AnnouncementRepository,
    P: PromotionCatalog,
{
    pub fn new(announcements: Arc<R>, tariffs: Arc<P>) -> Self {
        Self {
            announcements,
            tariffs,
        }
    }

    pub fn list_types(&self) -> Result<Vec<PromotionType>, PromotionServiceError> {
        let mut types = self.tariffs.promotion_types()?;
        types.sort_by_key(|tariff| tariff.id);
        Ok(types)
    }

    pub fn create_type(
        &self,
        payload: PromotionTypePayload,
    ) -> Result<PromotionType, PromotionServiceError> {
        if payload.name.trim().is_empty() {
            return Err(PromotionServiceError::Validation {
                field: "name",
                message: "name must not be empty".into(),
            });
        }
        let tariff = PromotionType {
            id: next_promotion_type_id(),
            name: payload.name,
            price: payload.price,
            efficiency: payload.efficiency,
        };
        self.tariffs.insert_type(tariff.clone())?;
        Ok(tariff)
    }

    pub fn update_type(
        &self,
        id: PromotionTypeId,
        update: PromotionTypeUpdate,
    ) -> Result<PromotionType, PromotionServiceError> {
        let mut tariff = self
            .tariffs
            .promotion_type(id)?
            .ok_or(PromotionServiceError::MissingEntity("promotion type"))?;
        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(PromotionServiceError::Validation {
                    field: "name",
                    message: "name must not be empty".into(),
                });
            }
            tariff.name = name;
        }
        if let Some(price) = update.price {
            tariff.price = price;
        }
        if let Some(efficiency) = update.efficiency {
            tariff.efficiency = efficiency;
        }
        self.tariffs.update_type(tariff.clone())?;
        Ok(tariff)
    }

    /// Attaches a promotion to the caller's accepted announcement. A
    /// second attach is a conflict until the first one is cleared.
    pub fn attach(
        &self,
        principal: &Principal,
        announcement: AnnouncementId,
        promotion_type: PromotionTypeId,
        payload: AttachPayload,
    ) -> Result<PromotionView, PromotionServiceError> {
        let mut record = self
            .announcements
            .fetch(announcement)?
            .ok_or(PromotionServiceError::MissingEntity("announcement"))?;
        if record.announcement.author != principal.user_id {
            return Err(PromotionServiceError::Forbidden);
        }
        if !record.announcement.accepted || record.announcement.called_off {
            return Err(PromotionServiceError::NotPromotable);
        }
        if record.promotion.is_some() {
            return Err(PromotionServiceError::AlreadyPromoted);
        }
        let tariff = self
            .tariffs
            .promotion_type(promotion_type)?
            .ok_or(PromotionServiceError::MissingEntity("promotion type"))?;
        let promotion = Promotion {
            promotion_type: tariff,
            logo: payload.logo,
            header: payload.header,
            color: payload.color,
        };
        let view = PromotionView::from(&promotion);
        record.promotion = Some(promotion);
        self.announcements.update(record)?;
        tracing::info!(
            announcement = announcement.0,
            tariff = promotion_type.0,
            "promotion attached"
        );
        Ok(view)
    }

    pub fn clear(
        &self,
        principal: &Principal,
        announcement: AnnouncementId,
    ) -> Result<(), PromotionServiceError> {
        let mut record = self
            .announcements
            .fetch(announcement)?
            .ok_or(PromotionServiceError::MissingEntity("announcement"))?;
        if record.announcement.author != principal.user_id && !principal.role.is_moderator() {
            return Err(PromotionServiceError::Forbidden);
        }
        if record.promotion.is_none() {
            return Err(PromotionServiceError::MissingEntity("promotion"));
        }
        record.promotion = None;
        self.announcements.update(record)?;
        Ok(())
    }
}

/// Shared state for promotion endpoints.
pub struct PromotionRoutes<R, P> {
    pub service: Arc<PromotionService<R, P>>,
    pub users: Arc<dyn UserDirectory>,
}

impl<R, P> Clone for PromotionRoutes<R, P> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            users: Arc::clone(&self.users),
        }
    }
}

/// Router builder for tariffs and promotion attachment.
pub fn promotion_router<R, P>(
    service: Arc<PromotionService<R, P>>,
    users: Arc<dyn UserDirectory>,
) -> Router
where
    R: AnnouncementRepository + 'static,
    P: PromotionCatalog + 'static,
{
    let state = PromotionRoutes { service, users };
    Router::new()
        .route(
            "/api/v1/promotion-types",
            get(list_types_handler::<R, P>).post(create_type_handler::<R, P>),
        )
        .route(
            "/api/v1/promotion-types/:promotion_type_id",
            axum::routing::patch(update_type_handler::<R, P>),
        )
        .route(
            "/api/v1/announcement-promotion",
            post(attach_handler::<R, P>),
        )
        .route(
            "/api/v1/announcement-promotion/clear",
            delete(clear_handler::<R, P>),
        )
        .with_state(state)
}

fn auth_failure(error: AuthError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

fn denied() -> Response {
    let payload = json!({ "error": "permission denied" });
    (StatusCode::FORBIDDEN, axum::Json(payload)).into_response()
}

fn guard<R, P>(
    state: &PromotionRoutes<R, P>,
    headers: &HeaderMap,
    action: Action,
) -> Result<Principal, Response> {
    let principal = authenticate(state.users.as_ref(), headers).map_err(auth_failure)?;
    if access::resolve(action, principal.role).is_none() {
        return Err(denied());
    }
    Ok(principal)
}

fn failure(error: PromotionServiceError) -> Response {
    let (status, message) = match &error {
        PromotionServiceError::Validation { field, message } => {
            let payload = json!({ "error": message, "field": field });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
        PromotionServiceError::MissingEntity(_) => (StatusCode::BAD_REQUEST, error.to_string()),
        PromotionServiceError::Forbidden => (StatusCode::FORBIDDEN, error.to_string()),
        PromotionServiceError::NotPromotable => (StatusCode::BAD_REQUEST, error.to_string()),
        PromotionServiceError::AlreadyPromoted => (StatusCode::CONFLICT, error.to_string()),
        PromotionServiceError::Repository(RepositoryError::Conflict) => {
            (StatusCode::CONFLICT, error.to_string())
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    };
    let payload = json!({ "error": message });
    (status, axum::Json(payload)).into_response()
}

/// Query pair selecting the announcement and the tariff to attach.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachQuery {
    pub announcement: u64,
    pub promotion_type: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClearQuery {
    pub announcement: u64,
}

pub(crate) async fn list_types_handler<R, P>(
    State(state): State<PromotionRoutes<R, P>>,
    headers: HeaderMap,
) -> Response
where
    R: AnnouncementRepository + 'static,
    P: PromotionCatalog + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::ListPromotionTypes) {
        return response;
    }
    match state.service.list_types() {
        Ok(types) => (StatusCode::OK, axum::Json(types)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn create_type_handler<R, P>(
    State(state): State<PromotionRoutes<R, P>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<PromotionTypePayload>,
) -> Response
where
    R: AnnouncementRepository + 'static,
    P: PromotionCatalog + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::ManagePromotionTypes) {
        return response;
    }
    match state.service.create_type(payload) {
        Ok(tariff) => (StatusCode::CREATED, axum::Json(tariff)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn update_type_handler<R, P>(
    State(state): State<PromotionRoutes<R, P>>,
    headers: HeaderMap,
    Path(promotion_type_id): Path<u64>,
    axum::Json(update): axum::Json<PromotionTypeUpdate>,
) -> Response
where
    R: AnnouncementRepository + 'static,
    P: PromotionCatalog + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::ManagePromotionTypes) {
        return response;
    }
    match state
        .service
        .update_type(PromotionTypeId(promotion_type_id), update)
    {
        Ok(tariff) => (StatusCode::OK, axum::Json(tariff)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn attach_handler<R, P>(
    State(state): State<PromotionRoutes<R, P>>,
    headers: HeaderMap,
    Query(query): Query<AttachQuery>,
    axum::Json(payload): axum::Json<AttachPayload>,
) -> Response
where
    R: AnnouncementRepository + 'static,
    P: PromotionCatalog + 'static,
{
    let principal = match guard(&state, &headers, Action::AttachPromotion) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.attach(
        &principal,
        AnnouncementId(query.announcement),
        PromotionTypeId(query.promotion_type),
        payload,
    ) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn clear_handler<R, P>(
    State(state): State<PromotionRoutes<R, P>>,
    headers: HeaderMap,
    Query(query): Query<ClearQuery>,
) -> Response
where
    R: AnnouncementRepository + 'static,
    P: PromotionCatalog + 'static,
{
    let principal = match authenticate(state.users.as_ref(), &headers) {
        Ok(principal) => principal,
        Err(error) => return auth_failure(error),
    };
    match state
        .service
        .clear(&principal, AnnouncementId(query.announcement))
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}
