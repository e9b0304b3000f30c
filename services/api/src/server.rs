use crate::cli::ServeArgs;
use crate::infra::{marketplace_services, AppState};
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rental_market::config::AppConfig;
use rental_market::error::AppError;
use rental_market::marketplace::TokenIssuer;
use rental_market::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let (accounts, listings) = marketplace_services(TokenIssuer::from_config(&config.auth));
    if let Some(seed) = &config.bootstrap.admin {
        let admin = accounts.seed_admin(seed)?;
        info!(user_id = %admin.id, email = %admin.email, "administrator account available");
    }

    let app = with_marketplace_routes(accounts, listings)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "rental marketplace ready");

    axum::serve(listener, app).await?;
    Ok(())
}
