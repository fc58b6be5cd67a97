use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Router,
};
use serde_json::json;

use super::domain::{AnnouncementId, ApprovalPayload, CallOffPayload, SubmissionPayload, UpdatePayload};
use super::filters::AnnouncementFilter;
use super::repository::{AnnouncementRepository, RepositoryError};
use super::service::{AnnouncementService, AnnouncementServiceError};
use crate::marketplace::access::{self, Action, ResponseShape};
use crate::marketplace::catalog::domain::ComplexId;
use crate::marketplace::catalog::repository::{CatalogError, CatalogRepository};
use crate::marketplace::users::{authenticate, AuthError, Principal, UserDirectory};

/// Shared state for announcement endpoints.
pub struct AnnouncementRoutes<R, C> {
    pub service: Arc<AnnouncementService<R, C>>,
    pub users: Arc<dyn UserDirectory>,
}

impl<R, C> Clone for AnnouncementRoutes<R, C> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            users: Arc::clone(&self.users),
        }
    }
}

/// Router builder for the announcement feed, lifecycle, and grids.
pub fn announcement_router<R, C>(
    service: Arc<AnnouncementService<R, C>>,
    users: Arc<dyn UserDirectory>,
) -> Router
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let state = AnnouncementRoutes { service, users };
    Router::new()
        .route("/api/v1/announcements", get(list_handler::<R, C>))
        .route(
            "/api/v1/announcements/create",
            post(submit_handler::<R, C>),
        )
        .route("/api/v1/announcements/my", get(my_handler::<R, C>))
        .route(
            "/api/v1/announcements/called-off",
            get(called_off_list_handler::<R, C>),
        )
        .route(
            "/api/v1/announcements/:announcement_id",
            get(detail_handler::<R, C>).delete(moderation_delete_handler::<R, C>),
        )
        .route(
            "/api/v1/announcements/:announcement_id/my/update",
            patch(update_own_handler::<R, C>),
        )
        .route(
            "/api/v1/announcements/:announcement_id/my/delete",
            delete(delete_own_handler::<R, C>),
        )
        .route(
            "/api/v1/announcements/:announcement_id/call-off",
            patch(call_off_handler::<R, C>),
        )
        .route(
            "/api/v1/announcements/:announcement_id/allow",
            patch(allow_handler::<R, C>),
        )
        .route(
            "/api/v1/chessboards/:complex_id",
            get(chessboards_handler::<R, C>),
        )
        .with_state(state)
}

/// Router builder for the builder-side approval queue.
pub fn approval_router<R, C>(
    service: Arc<AnnouncementService<R, C>>,
    users: Arc<dyn UserDirectory>,
) -> Router
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let state = AnnouncementRoutes { service, users };
    Router::new()
        .route(
            "/api/v1/announcements-approval",
            get(accepted_list_handler::<R, C>),
        )
        .route(
            "/api/v1/announcements-approval/requests",
            get(requests_handler::<R, C>),
        )
        .route(
            "/api/v1/announcements-approval/:announcement_id/detail",
            get(approval_detail_handler::<R, C>),
        )
        .route(
            "/api/v1/announcements-approval/:announcement_id/approve",
            patch(approve_handler::<R, C>),
        )
        .route(
            "/api/v1/announcements-approval/:announcement_id/delete",
            delete(reject_request_handler::<R, C>),
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

fn guard<R, C>(
    state: &AnnouncementRoutes<R, C>,
    headers: &HeaderMap,
    action: Action,
) -> Result<Principal, Response> {
    let principal = authenticate(state.users.as_ref(), headers).map_err(auth_failure)?;
    if access::resolve(action, principal.role).is_none() {
        return Err(denied());
    }
    Ok(principal)
}

fn failure(error: AnnouncementServiceError) -> Response {
    let (status, message) = match &error {
        AnnouncementServiceError::Validation { field, message } => {
            let payload = json!({ "error": message, "field": field });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
        AnnouncementServiceError::MissingEntity(_) => {
            (StatusCode::BAD_REQUEST, error.to_string())
        }
        AnnouncementServiceError::Forbidden => (StatusCode::FORBIDDEN, error.to_string()),
        AnnouncementServiceError::Repository(RepositoryError::Conflict) => {
            (StatusCode::CONFLICT, error.to_string())
        }
        AnnouncementServiceError::Catalog(CatalogError::Protected(_)) => {
            (StatusCode::CONFLICT, error.to_string())
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    };
    let payload = json!({ "error": message });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn list_handler<R, C>(
    State(state): State<AnnouncementRoutes<R, C>>,
    headers: HeaderMap,
    Query(filter): Query<AnnouncementFilter>,
) -> Response
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let principal = match authenticate(state.users.as_ref(), &headers) {
        Ok(principal) => principal,
        Err(error) => return auth_failure(error),
    };
    match access::resolve(Action::ListAnnouncements, principal.role) {
        Some(ResponseShape::ModerationRow) => match state.service.moderation_rows() {
            Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
            Err(error) => failure(error),
        },
        Some(_) => match state.service.public_cards(&filter) {
            Ok(cards) => (StatusCode::OK, axum::Json(cards)).into_response(),
            Err(error) => failure(error),
        },
        None => denied(),
    }
}

pub(crate) async fn submit_handler<R, C>(
    State(state): State<AnnouncementRoutes<R, C>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<SubmissionPayload>,
) -> Response
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::SubmitAnnouncement) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.submit(&principal, payload) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn my_handler<R, C>(
    State(state): State<AnnouncementRoutes<R, C>>,
    headers: HeaderMap,
) -> Response
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let principal = match authenticate(state.users.as_ref(), &headers) {
        Ok(principal) => principal,
        Err(error) => return auth_failure(error),
    };
    match state.service.my_announcements(&principal) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn called_off_list_handler<R, C>(
    State(state): State<AnnouncementRoutes<R, C>>,
    headers: HeaderMap,
) -> Response
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::ModerateAnnouncement) {
        return response;
    }
    match state.service.called_off_rows() {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn detail_handler<R, C>(
    State(state): State<AnnouncementRoutes<R, C>>,
    headers: HeaderMap,
    Path(announcement_id): Path<u64>,
) -> Response
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::RetrieveAnnouncement) {
        return response;
    }
    match state.service.detail(AnnouncementId(announcement_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn moderation_delete_handler<R, C>(
    State(state): State<AnnouncementRoutes<R, C>>,
    headers: HeaderMap,
    Path(announcement_id): Path<u64>,
) -> Response
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::ModerateAnnouncement) {
        return response;
    }
    match state.service.delete(AnnouncementId(announcement_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn update_own_handler<R, C>(
    State(state): State<AnnouncementRoutes<R, C>>,
    headers: HeaderMap,
    Path(announcement_id): Path<u64>,
    axum::Json(update): axum::Json<UpdatePayload>,
) -> Response
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let principal = match authenticate(state.users.as_ref(), &headers) {
        Ok(principal) => principal,
        Err(error) => return auth_failure(error),
    };
    match state
        .service
        .update_own(&principal, AnnouncementId(announcement_id), update)
    {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn delete_own_handler<R, C>(
    State(state): State<AnnouncementRoutes<R, C>>,
    headers: HeaderMap,
    Path(announcement_id): Path<u64>,
) -> Response
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let principal = match authenticate(state.users.as_ref(), &headers) {
        Ok(principal) => principal,
        Err(error) => return auth_failure(error),
    };
    match state
        .service
        .delete_own(&principal, AnnouncementId(announcement_id))
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn call_off_handler<R, C>(
    State(state): State<AnnouncementRoutes<R, C>>,
    headers: HeaderMap,
    Path(announcement_id): Path<u64>,
    axum::Json(payload): axum::Json<CallOffPayload>,
) -> Response
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::ModerateAnnouncement) {
        return response;
    }
    match state
        .service
        .call_off(AnnouncementId(announcement_id), payload)
    {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn allow_handler<R, C>(
    State(state): State<AnnouncementRoutes<R, C>>,
    headers: HeaderMap,
    Path(announcement_id): Path<u64>,
) -> Response
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::ModerateAnnouncement) {
        return response;
    }
    match state.service.allow(AnnouncementId(announcement_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn chessboards_handler<R, C>(
    State(state): State<AnnouncementRoutes<R, C>>,
    headers: HeaderMap,
    Path(complex_id): Path<u64>,
) -> Response
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::BrowseCatalog) {
        return response;
    }
    match state.service.chessboards(ComplexId(complex_id)) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn accepted_list_handler<R, C>(
    State(state): State<AnnouncementRoutes<R, C>>,
    headers: HeaderMap,
) -> Response
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ApproveAnnouncement) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.accepted_list(&principal) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn requests_handler<R, C>(
    State(state): State<AnnouncementRoutes<R, C>>,
    headers: HeaderMap,
) -> Response
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ApproveAnnouncement) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.approval_requests(&principal) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn approval_detail_handler<R, C>(
    State(state): State<AnnouncementRoutes<R, C>>,
    headers: HeaderMap,
    Path(announcement_id): Path<u64>,
) -> Response
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::ApproveAnnouncement) {
        return response;
    }
    match state.service.detail(AnnouncementId(announcement_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn approve_handler<R, C>(
    State(state): State<AnnouncementRoutes<R, C>>,
    headers: HeaderMap,
    Path(announcement_id): Path<u64>,
    axum::Json(payload): axum::Json<ApprovalPayload>,
) -> Response
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ApproveAnnouncement) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state
        .service
        .approve(&principal, AnnouncementId(announcement_id), payload)
    {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn reject_request_handler<R, C>(
    State(state): State<AnnouncementRoutes<R, C>>,
    headers: HeaderMap,
    Path(announcement_id): Path<u64>,
) -> Response
where
    R: AnnouncementRepository + 'static,
    C: CatalogRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ApproveAnnouncement) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state
        .service
        .reject_request(&principal, AnnouncementId(announcement_id))
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}
