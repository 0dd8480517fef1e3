use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::analysis::AnalysisGateway;
use super::catalog::AuditCatalog;
use super::domain::{
    AuditType, BlockKey, InterviewQuestion, Question, SiteSelection, WizardError, WizardPhase,
};
use super::repository::AuditRepository;
use super::service::{AdvanceOutcome, AuditWizardService};
use super::session::{ActionEffect, SessionId, WizardAction, WizardSession};
use crate::workflows::registry::{RepositoryError, SiteId, SiteRepository};

enum SessionSlot {
    Idle(Box<WizardSession>),
    /// Submission outstanding; the session is checked out by the advancing request.
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotError {
    Missing,
    Busy,
}

/// Open wizard sessions keyed by id. Nothing here is persisted.
#[derive(Default)]
pub struct SessionTable {
    slots: Mutex<HashMap<SessionId, SessionSlot>>,
}

impl SessionTable {
    pub fn insert(&self, session: WizardSession) {
        self.lock()
            .insert(session.id().clone(), SessionSlot::Idle(Box::new(session)));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub(crate) fn with_session<T>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut WizardSession) -> T,
    ) -> Result<T, SlotError> {
        let mut slots = self.lock();
        match slots.get_mut(id) {
            Some(SessionSlot::Idle(session)) => Ok(f(&mut **session)),
            Some(SessionSlot::Busy) => Err(SlotError::Busy),
            None => Err(SlotError::Missing),
        }
    }

    pub(crate) fn check_out(&self, id: &SessionId) -> Result<WizardSession, SlotError> {
        let mut slots = self.lock();
        let Some(slot) = slots.get_mut(id) else {
            return Err(SlotError::Missing);
        };
        match std::mem::replace(slot, SessionSlot::Busy) {
            SessionSlot::Idle(session) => Ok(*session),
            SessionSlot::Busy => Err(SlotError::Busy),
        }
    }

    pub(crate) fn check_in(&self, session: WizardSession) {
        self.insert(session);
    }

    /// Drop a slot whatever its state, for sessions that will never be checked back in.
    pub(crate) fn release(&self, id: &SessionId) {
        self.lock().remove(id);
    }

    pub(crate) fn remove(&self, id: &SessionId) -> Result<(), SlotError> {
        let mut slots = self.lock();
        match slots.get(id) {
            Some(SessionSlot::Idle(_)) => {
                slots.remove(id);
                Ok(())
            }
            Some(SessionSlot::Busy) => Err(SlotError::Busy),
            None => Err(SlotError::Missing),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, SessionSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) struct AuditState<G, R, S> {
    pub(crate) service: Arc<AuditWizardService<G, R>>,
    pub(crate) sites: Arc<S>,
    pub(crate) sessions: Arc<SessionTable>,
}

impl<G, R, S> Clone for AuditState<G, R, S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            sites: self.sites.clone(),
            sessions: self.sessions.clone(),
        }
    }
}

/// Router exposing the catalog, wizard sessions, audit history and the dashboard.
pub fn audit_router<G, R, S>(
    service: Arc<AuditWizardService<G, R>>,
    sites: Arc<S>,
    sessions: Arc<SessionTable>,
) -> Router
where
    G: AnalysisGateway + 'static,
    R: AuditRepository + 'static,
    S: SiteRepository + 'static,
{
    Router::new()
        .route("/api/v1/catalog", get(catalog_handler::<G, R, S>))
        .route("/api/v1/audits", get(history_handler::<G, R, S>))
        .route("/api/v1/dashboard", get(dashboard_handler::<G, R, S>))
        .route(
            "/api/v1/audits/sessions",
            post(open_session_handler::<G, R, S>),
        )
        .route(
            "/api/v1/audits/sessions/:session_id",
            get(session_handler::<G, R, S>).delete(discard_session_handler::<G, R, S>),
        )
        .route(
            "/api/v1/audits/sessions/:session_id/site",
            post(select_site_handler::<G, R, S>),
        )
        .route(
            "/api/v1/audits/sessions/:session_id/begin",
            post(begin_handler::<G, R, S>),
        )
        .route(
            "/api/v1/audits/sessions/:session_id/actions",
            post(action_handler::<G, R, S>),
        )
        .route(
            "/api/v1/audits/sessions/:session_id/advance",
            post(advance_handler::<G, R, S>),
        )
        .route(
            "/api/v1/audits/sessions/:session_id/retreat",
            post(retreat_handler::<G, R, S>),
        )
        .with_state(AuditState {
            service,
            sites,
            sessions,
        })
}

#[derive(Debug, Serialize)]
struct CatalogBlockView<'a> {
    key: BlockKey,
    label: &'static str,
    questions: Vec<&'a Question>,
}

#[derive(Debug, Serialize)]
struct CatalogView<'a> {
    blocks: Vec<CatalogBlockView<'a>>,
    interview_questions: &'a [InterviewQuestion],
}

fn catalog_view(catalog: &AuditCatalog) -> CatalogView<'_> {
    CatalogView {
        blocks: catalog
            .blocks_ordered()
            .iter()
            .map(|block| CatalogBlockView {
                key: *block,
                label: block.label(),
                questions: catalog.questions_for_block(*block),
            })
            .collect(),
        interview_questions: catalog.interview_questions(),
    }
}

pub(crate) async fn catalog_handler<G, R, S>(State(state): State<AuditState<G, R, S>>) -> Response
where
    G: AnalysisGateway + 'static,
    R: AuditRepository + 'static,
    S: SiteRepository + 'static,
{
    (
        StatusCode::OK,
        axum::Json(catalog_view(state.service.catalog())),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryQuery {
    site_id: Option<String>,
}

pub(crate) async fn history_handler<G, R, S>(
    State(state): State<AuditState<G, R, S>>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    G: AnalysisGateway + 'static,
    R: AuditRepository + 'static,
    S: SiteRepository + 'static,
{
    let site_id = query
        .site_id
        .filter(|id| !id.trim().is_empty())
        .map(SiteId);
    match state.service.history(site_id.as_ref()) {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(err) => repository_failure(err),
    }
}

pub(crate) async fn dashboard_handler<G, R, S>(
    State(state): State<AuditState<G, R, S>>,
) -> Response
where
    G: AnalysisGateway + 'static,
    R: AuditRepository + 'static,
    S: SiteRepository + 'static,
{
    match state.service.dashboard() {
        Ok(dashboard) => (StatusCode::OK, axum::Json(dashboard)).into_response(),
        Err(err) => repository_failure(err),
    }
}

pub(crate) async fn open_session_handler<G, R, S>(
    State(state): State<AuditState<G, R, S>>,
) -> Response
where
    G: AnalysisGateway + 'static,
    R: AuditRepository + 'static,
    S: SiteRepository + 'static,
{
    let session = state.service.open_session();
    let view = session.to_view();
    state.sessions.insert(session);
    (StatusCode::CREATED, axum::Json(view)).into_response()
}

pub(crate) async fn session_handler<G, R, S>(
    State(state): State<AuditState<G, R, S>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: AnalysisGateway + 'static,
    R: AuditRepository + 'static,
    S: SiteRepository + 'static,
{
    match state
        .sessions
        .with_session(&SessionId(session_id), |session| session.to_view())
    {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => slot_failure(err),
    }
}

pub(crate) async fn discard_session_handler<G, R, S>(
    State(state): State<AuditState<G, R, S>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: AnalysisGateway + 'static,
    R: AuditRepository + 'static,
    S: SiteRepository + 'static,
{
    match state.sessions.remove(&SessionId(session_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => slot_failure(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SiteSelectionRequest {
    site_id: String,
    #[serde(default)]
    audit_type: Option<AuditType>,
}

pub(crate) async fn select_site_handler<G, R, S>(
    State(state): State<AuditState<G, R, S>>,
    Path(session_id): Path<String>,
    axum::Json(payload): axum::Json<SiteSelectionRequest>,
) -> Response
where
    G: AnalysisGateway + 'static,
    R: AuditRepository + 'static,
    S: SiteRepository + 'static,
{
    let site_id = SiteId(payload.site_id);
    let site = match state.sites.fetch(&site_id) {
        Ok(Some(site)) => site,
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, format!("site {site_id} not found"))
        }
        Err(err) => return repository_failure(err),
    };

    let selection = SiteSelection {
        site_id: site.id,
        site_name: site.name,
    };
    let audit_type = payload.audit_type;
    let result = state
        .sessions
        .with_session(&SessionId(session_id), |session| -> Result<_, WizardError> {
            session.select_site(selection)?;
            if let Some(audit_type) = audit_type {
                session.set_audit_type(audit_type)?;
            }
            Ok(session.to_view())
        });
    session_result(result)
}

pub(crate) async fn begin_handler<G, R, S>(
    State(state): State<AuditState<G, R, S>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: AnalysisGateway + 'static,
    R: AuditRepository + 'static,
    S: SiteRepository + 'static,
{
    let result = state
        .sessions
        .with_session(&SessionId(session_id), |session| -> Result<_, WizardError> {
            session.begin()?;
            Ok(session.to_view())
        });
    session_result(result)
}

pub(crate) async fn retreat_handler<G, R, S>(
    State(state): State<AuditState<G, R, S>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: AnalysisGateway + 'static,
    R: AuditRepository + 'static,
    S: SiteRepository + 'static,
{
    let result = state
        .sessions
        .with_session(&SessionId(session_id), |session| -> Result<_, WizardError> {
            session.retreat()?;
            Ok(session.to_view())
        });
    session_result(result)
}

pub(crate) async fn action_handler<G, R, S>(
    State(state): State<AuditState<G, R, S>>,
    Path(session_id): Path<String>,
    axum::Json(action): axum::Json<WizardAction>,
) -> Response
where
    G: AnalysisGateway + 'static,
    R: AuditRepository + 'static,
    S: SiteRepository + 'static,
{
    let result = state
        .sessions
        .with_session(&SessionId(session_id), |session| -> Result<_, WizardError> {
            let effect = session.apply(action)?;
            let interview_id = match effect {
                ActionEffect::Applied => None,
                ActionEffect::IntervieweeAdded(id) => Some(id),
            };
            Ok(json!({
                "interview_id": interview_id,
                "session": session.to_view(),
            }))
        });
    session_result(result)
}

pub(crate) async fn advance_handler<G, R, S>(
    State(state): State<AuditState<G, R, S>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: AnalysisGateway + 'static,
    R: AuditRepository + 'static,
    S: SiteRepository + 'static,
{
    let session_id = SessionId(session_id);
    let mut session = match state.sessions.check_out(&session_id) {
        Ok(session) => session,
        Err(err) => return slot_failure(err),
    };

    // Run to completion even if the client goes away so the slot is always released.
    // A completed session is finished with and is not checked back in.
    let service = state.service.clone();
    let sessions = state.sessions.clone();
    let task = tokio::spawn(async move {
        let outcome = service.advance(&mut session).await;
        let view = session.to_view();
        if session.phase() == WizardPhase::Completed {
            sessions.release(session.id());
        } else {
            sessions.check_in(session);
        }
        (outcome, view)
    });

    let (outcome, view) = match task.await {
        Ok(resolved) => resolved,
        Err(err) => {
            tracing::error!(session_id = %session_id, error = %err, "advance task aborted");
            state.sessions.release(&session_id);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "advance did not complete".to_string(),
            );
        }
    };

    let payload = match outcome {
        Ok(AdvanceOutcome::Moved { from, to }) => json!({
            "outcome": "moved",
            "from": from,
            "to": to,
            "session": view,
        }),
        Ok(AdvanceOutcome::Blocked { block, gaps }) => {
            let messages: Vec<String> = gaps.iter().map(|gap| gap.describe()).collect();
            json!({
                "outcome": "blocked",
                "block": block,
                "gaps": gaps,
                "messages": messages,
                "session": view,
            })
        }
        Ok(AdvanceOutcome::Completed(record)) => json!({
            "outcome": "completed",
            "audit": record.summary(),
            "analysis": record.analysis,
            "session": view,
        }),
        Ok(AdvanceOutcome::SubmissionFailed { notice }) => json!({
            "outcome": "submission_failed",
            "notice": notice,
            "session": view,
        }),
        Err(err) => return wizard_failure(err),
    };
    (StatusCode::OK, axum::Json(payload)).into_response()
}

fn session_result<T: Serialize>(result: Result<Result<T, WizardError>, SlotError>) -> Response {
    match result {
        Ok(Ok(body)) => (StatusCode::OK, axum::Json(body)).into_response(),
        Ok(Err(err)) => wizard_failure(err),
        Err(err) => slot_failure(err),
    }
}

fn wizard_failure(err: WizardError) -> Response {
    error_response(StatusCode::BAD_REQUEST, err.to_string())
}

fn slot_failure(err: SlotError) -> Response {
    match err {
        SlotError::Missing => error_response(StatusCode::NOT_FOUND, "session not found".to_string()),
        SlotError::Busy => error_response(
            StatusCode::CONFLICT,
            "session is waiting for its submission to finish".to_string(),
        ),
    }
}

fn repository_failure(err: RepositoryError) -> Response {
    let status = match err {
        RepositoryError::Conflict => StatusCode::CONFLICT,
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, axum::Json(json!({ "error": message }))).into_response()
}
