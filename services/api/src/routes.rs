use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use obra_audit::workflows::audit::{
    audit_router, AnalysisGateway, AuditRepository, AuditWizardService, SessionTable,
};
use obra_audit::workflows::registry::{registry_router, SiteRepository, UserRepository};
use serde_json::json;
use std::sync::Arc;

/// Everything the HTTP surface needs, grouped so the server and tests wire it the same way.
pub(crate) struct AuditApi<G, R, S, U> {
    pub(crate) service: Arc<AuditWizardService<G, R>>,
    pub(crate) sites: Arc<S>,
    pub(crate) users: Arc<U>,
    pub(crate) sessions: Arc<SessionTable>,
}

pub(crate) fn with_audit_routes<G, R, S, U>(api: AuditApi<G, R, S, U>) -> axum::Router
where
    G: AnalysisGateway + 'static,
    R: AuditRepository + 'static,
    S: SiteRepository + 'static,
    U: UserRepository + 'static,
{
    audit_router(api.service, api.sites.clone(), api.sessions)
        .merge(registry_router(api.sites, api.users))
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
