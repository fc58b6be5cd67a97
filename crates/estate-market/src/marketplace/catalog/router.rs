use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Router,
};
use serde_json::json;

use super::domain::{
    ComplexId, ComplexPayload, ComplexUpdate, CorpsId, FlatId, FlatPayload, FlatUpdate, FloorId,
    SectionId,
};
use super::gallery::PhotoId;
use super::repository::{CatalogError, CatalogRepository};
use super::service::{CatalogService, CatalogServiceError};
use crate::marketplace::access::{self, Action};
use crate::marketplace::announcements::AnnouncementRepository;
use crate::marketplace::users::{authenticate, AuthError, Principal, UserDirectory};

/// Shared state for catalog endpoints.
pub struct CatalogRoutes<C, A> {
    pub service: Arc<CatalogService<C, A>>,
    pub users: Arc<dyn UserDirectory>,
}

impl<C, A> Clone for CatalogRoutes<C, A> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            users: Arc::clone(&self.users),
        }
    }
}

/// Router builder exposing the builder inventory and public catalog.
pub fn catalog_router<C, A>(
    service: Arc<CatalogService<C, A>>,
    users: Arc<dyn UserDirectory>,
) -> Router
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let state = CatalogRoutes { service, users };
    Router::new()
        .route(
            "/api/v1/residential-complexes",
            get(list_complexes_handler::<C, A>).post(create_complex_handler::<C, A>),
        )
        .route(
            "/api/v1/residential-complexes/my",
            get(my_complex_handler::<C, A>)
                .patch(update_my_complex_handler::<C, A>)
                .delete(delete_my_complex_handler::<C, A>),
        )
        .route(
            "/api/v1/residential-complexes/:complex_id",
            get(complex_detail_handler::<C, A>).delete(delete_complex_handler::<C, A>),
        )
        .route(
            "/api/v1/corps/my",
            get(my_corps_handler::<C, A>).post(create_corps_handler::<C, A>),
        )
        .route(
            "/api/v1/corps/:corps_id/my",
            delete(delete_corps_handler::<C, A>),
        )
        .route(
            "/api/v1/corps/:complex_id",
            get(corps_of_complex_handler::<C, A>),
        )
        .route(
            "/api/v1/sections/my",
            get(my_sections_handler::<C, A>).post(create_section_handler::<C, A>),
        )
        .route(
            "/api/v1/sections/:section_id/my",
            delete(delete_section_handler::<C, A>),
        )
        .route(
            "/api/v1/sections/:complex_id",
            get(sections_of_complex_handler::<C, A>),
        )
        .route(
            "/api/v1/floors/my",
            get(my_floors_handler::<C, A>).post(create_floor_handler::<C, A>),
        )
        .route(
            "/api/v1/floors/:floor_id/my",
            delete(delete_floor_handler::<C, A>),
        )
        .route(
            "/api/v1/floors/:complex_id",
            get(floors_of_complex_handler::<C, A>),
        )
        .route("/api/v1/flats", get(list_flats_handler::<C, A>))
        .route(
            "/api/v1/flats/my",
            get(my_flats_handler::<C, A>).post(create_flat_handler::<C, A>),
        )
        .route(
            "/api/v1/flats/not-bounded",
            get(not_bounded_flats_handler::<C, A>),
        )
        .route(
            "/api/v1/flats/:flat_id/my",
            axum::routing::patch(update_my_flat_handler::<C, A>)
                .delete(delete_my_flat_handler::<C, A>),
        )
        .route("/api/v1/flats/:flat_id", get(flat_detail_handler::<C, A>))
        .route(
            "/api/v1/photos/:photo_id",
            delete(delete_photo_handler::<C, A>),
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

fn guard<C, A>(
    state: &CatalogRoutes<C, A>,
    headers: &HeaderMap,
    action: Action,
) -> Result<Principal, Response> {
    let principal = authenticate(state.users.as_ref(), headers).map_err(auth_failure)?;
    if access::resolve(action, principal.role).is_none() {
        return Err(denied());
    }
    Ok(principal)
}

fn failure(error: CatalogServiceError) -> Response {
    let (status, message) = match &error {
        CatalogServiceError::Validation { field, message } => {
            let payload = json!({ "error": message, "field": field });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
        CatalogServiceError::NoComplex => (StatusCode::BAD_REQUEST, error.to_string()),
        CatalogServiceError::MissingEntity(_) => (StatusCode::BAD_REQUEST, error.to_string()),
        CatalogServiceError::Forbidden => (StatusCode::FORBIDDEN, error.to_string()),
        CatalogServiceError::Catalog(CatalogError::NotFound) => {
            (StatusCode::NOT_FOUND, "record not found".to_string())
        }
        CatalogServiceError::Catalog(CatalogError::Protected(_)) => {
            (StatusCode::CONFLICT, error.to_string())
        }
        CatalogServiceError::Catalog(CatalogError::Conflict) => {
            (StatusCode::CONFLICT, error.to_string())
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    };
    let payload = json!({ "error": message });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn list_complexes_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::BrowseCatalog) {
        return response;
    }
    match state.service.list_complexes() {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn create_complex_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<ComplexPayload>,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.create_complex(&principal, payload) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn my_complex_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.my_complex(&principal) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn update_my_complex_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
    axum::Json(update): axum::Json<ComplexUpdate>,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.update_my_complex(&principal, update) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn delete_my_complex_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.delete_my_complex(&principal) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn complex_detail_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
    Path(complex_id): Path<u64>,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::BrowseCatalog) {
        return response;
    }
    match state.service.complex_detail(ComplexId(complex_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn delete_complex_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
    Path(complex_id): Path<u64>,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::ModerateCatalog) {
        return response;
    }
    match state.service.delete_complex(ComplexId(complex_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn my_corps_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.my_corps(&principal) {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn create_corps_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.create_corps(&principal) {
        Ok(row) => (StatusCode::CREATED, axum::Json(row)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn delete_corps_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
    Path(corps_id): Path<u64>,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.delete_corps(&principal, CorpsId(corps_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn corps_of_complex_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
    Path(complex_id): Path<u64>,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::ModerateCatalog) {
        return response;
    }
    match state.service.corps_of_complex(ComplexId(complex_id)) {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn my_sections_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.my_sections(&principal) {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn create_section_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.create_section(&principal) {
        Ok(row) => (StatusCode::CREATED, axum::Json(row)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn delete_section_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
    Path(section_id): Path<u64>,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.delete_section(&principal, SectionId(section_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn sections_of_complex_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
    Path(complex_id): Path<u64>,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::ModerateCatalog) {
        return response;
    }
    match state.service.sections_of_complex(ComplexId(complex_id)) {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn my_floors_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.my_floors(&principal) {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn create_floor_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.create_floor(&principal) {
        Ok(row) => (StatusCode::CREATED, axum::Json(row)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn delete_floor_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
    Path(floor_id): Path<u64>,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.delete_floor(&principal, FloorId(floor_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn floors_of_complex_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
    Path(complex_id): Path<u64>,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::ModerateCatalog) {
        return response;
    }
    match state.service.floors_of_complex(ComplexId(complex_id)) {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn list_flats_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::BrowseCatalog) {
        return response;
    }
    match state.service.list_flats() {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn my_flats_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.my_flats(&principal) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn not_bounded_flats_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.not_bounded_flats(&principal) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn create_flat_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<FlatPayload>,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.create_flat(&principal, payload) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn update_my_flat_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
    Path(flat_id): Path<u64>,
    axum::Json(update): axum::Json<FlatUpdate>,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.update_my_flat(&principal, FlatId(flat_id), update) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn delete_my_flat_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
    Path(flat_id): Path<u64>,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match guard(&state, &headers, Action::ManageOwnInventory) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.service.delete_my_flat(&principal, FlatId(flat_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn flat_detail_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
    Path(flat_id): Path<u64>,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    if let Err(response) = guard(&state, &headers, Action::BrowseCatalog) {
        return response;
    }
    match state.service.flat_detail(FlatId(flat_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn delete_photo_handler<C, A>(
    State(state): State<CatalogRoutes<C, A>>,
    headers: HeaderMap,
    Path(photo_id): Path<u64>,
) -> Response
where
    C: CatalogRepository + 'static,
    A: AnnouncementRepository + 'static,
{
    let principal = match authenticate(state.users.as_ref(), &headers) {
        Ok(principal) => principal,
        Err(error) => return auth_failure(error),
    };
    match state.service.delete_photo(&principal, PhotoId(photo_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}
