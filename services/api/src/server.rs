use crate::cli::ServeArgs;
use crate::infra::{seed_admin, AppState, Services};
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use estate_market::config::AppConfig;
use estate_market::error::AppError;
use estate_market::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let services = Services::new();
    let (admin, token) = seed_admin(&services.store);
    info!(admin = admin.id.0, %token, "bootstrap admin seeded");

    let renewal_service = services.subscriptions.clone();
    let renewal_interval = config.renewal.interval_secs;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(renewal_interval));
        loop {
            ticker.tick().await;
            match renewal_service.renew_expired(Utc::now()) {
                Ok(renewed) if renewed > 0 => {
                    info!(renewed, "subscription renewal sweep completed");
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::error!(%error, "subscription renewal sweep failed");
                }
            }
        }
    });

    let app = with_marketplace_routes(&services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "estate market ready");

    axum::serve(listener, app).await?;
    Ok(())
}
