use crate::cli::ServeArgs;
use crate::infra::{build_storage, AppState};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use listings::catalog::{catalog_router, CatalogState, MemoryStore};
use listings::config::AppConfig;
use listings::error::AppError;
use listings::identity::JwtIdentityVerifier;
use listings::telemetry;
use std::sync::atomic::Ordering;
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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(MemoryStore::new());
    let storage = build_storage(&config.storage).await?;
    let verifier = Arc::new(JwtIdentityVerifier::new(
        &config.auth.jwt_secret,
        config.auth.jwt_issuer.clone(),
    ));
    let catalog = CatalogState::new(store, storage, verifier, config.pagination);

    let app = with_operational_routes(catalog_router(catalog))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "listing marketplace api ready");

    axum::serve(listener, app).await?;
    Ok(())
}
