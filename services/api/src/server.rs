use crate::cli::ServeArgs;
use crate::infra::{seeded_store, AppState, LoggedOutbox};
use crate::routes::with_accountability_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use manager_hub::config::AppConfig;
use manager_hub::error::AppError;
use manager_hub::telemetry;
use manager_hub::workflows::accountability::AccountabilityService;
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

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(seeded_store()?);
    let outbox = Arc::new(LoggedOutbox::default());
    let service = Arc::new(AccountabilityService::new(
        store,
        outbox,
        &config.accountability,
    ));

    let app = with_accountability_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "manager hub accountability service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
