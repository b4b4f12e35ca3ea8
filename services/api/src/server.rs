use crate::cli::ServeArgs;
use crate::infra::{build_sync_service, AppState};
use crate::routes::with_sync_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use workforce_sync::config::AppConfig;
use workforce_sync::error::AppError;
use workforce_sync::telemetry;
use workforce_sync::workforce::{
    ExportDirectoryProvider, InMemoryEmployeeRepository, InMemoryPersonRepository,
};

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

    let sync_service = Arc::new(build_sync_service(
        Arc::new(ExportDirectoryProvider::new(config.hris.export_dir.clone())),
        Arc::new(InMemoryEmployeeRepository::default()),
        Arc::new(InMemoryPersonRepository::default()),
        &config.hris.source_system,
    ));

    let app = with_sync_routes(sync_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);
    info!(
        ?config.environment,
        %addr,
        export_dir = %config.hris.export_dir.display(),
        source_system = %config.hris.source_system,
        "workforce sync service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
