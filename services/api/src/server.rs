use crate::cli::ServeArgs;
use crate::infra::{
    AppState, ConfiguredGateway, InMemoryAuditRepository, InMemorySiteRepository,
    InMemoryUserRepository,
};
use crate::routes::{with_audit_routes, AuditApi};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use obra_audit::config::AppConfig;
use obra_audit::error::AppError;
use obra_audit::telemetry;
use obra_audit::workflows::audit::{AuditWizardService, SessionTable};
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

    let gateway = ConfiguredGateway::from_config(&config.analysis)?;
    info!(
        gateway = gateway.label(),
        model = %config.analysis.model,
        "analysis gateway configured"
    );

    let api = AuditApi {
        service: Arc::new(AuditWizardService::new(
            Arc::new(gateway),
            Arc::new(InMemoryAuditRepository::default()),
        )),
        sites: Arc::new(InMemorySiteRepository::with_demo_site()),
        users: Arc::new(InMemoryUserRepository::default()),
        sessions: Arc::new(SessionTable::default()),
    };

    let app = with_audit_routes(api)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "site audit service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
