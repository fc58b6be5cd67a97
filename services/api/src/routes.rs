use crate::infra::{AppState, Services};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use estate_market::marketplace::announcements::{announcement_router, approval_router};
use estate_market::marketplace::catalog::catalog_router;
use estate_market::marketplace::favorites::favorite_router;
use estate_market::marketplace::messaging::messaging_router;
use estate_market::marketplace::promotions::promotion_router;
use estate_market::marketplace::subscriptions::subscription_router;
use serde_json::json;

/// Composes every marketplace router with the operational endpoints.
pub(crate) fn with_marketplace_routes(services: &Services) -> axum::Router {
    let directory = services.directory();
    announcement_router(services.announcements.clone(), directory.clone())
        .merge(approval_router(
            services.announcements.clone(),
            directory.clone(),
        ))
        .merge(catalog_router(services.catalog.clone(), directory.clone()))
        .merge(promotion_router(
            services.promotions.clone(),
            directory.clone(),
        ))
        .merge(favorite_router(
            services.favorites.clone(),
            directory.clone(),
        ))
        .merge(messaging_router(
            services.messaging.clone(),
            directory.clone(),
        ))
        .merge(subscription_router(
            services.subscriptions.clone(),
            directory,
        ))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use estate_market::marketplace::users::Role;
    use tower::ServiceExt;

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let services = Services::new();
        let app = with_marketplace_routes(&services);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn announcements_require_credentials() {
        let services = Services::new();
        let app = with_marketplace_routes(&services);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/announcements")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authenticated_user_sees_empty_feed() {
        let services = Services::new();
        let (_, token) = services
            .store
            .add_user("Ann", "Buyer", "ann@estate.test", Role::User);
        let app = with_marketplace_routes(&services);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/announcements")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
