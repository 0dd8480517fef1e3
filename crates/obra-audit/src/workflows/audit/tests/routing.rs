use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use async_trait::async_trait;

use super::common::*;

use crate::workflows::audit::analysis::{
    AnalysisError, AnalysisGateway, AnalysisPayload, AnalysisResult,
};
use crate::workflows::audit::router::{audit_router, SessionTable};
use crate::workflows::audit::service::AuditWizardService;

fn router_with_sessions() -> (Router, Arc<SessionTable>) {
    let service = Arc::new(AuditWizardService::new(
        Arc::new(StubGateway::default()),
        Arc::new(MemoryAudits::default()),
    ));
    let sessions = Arc::new(SessionTable::default());
    let router = audit_router(service, Arc::new(MemorySites::seeded()), sessions.clone());
    (router, sessions)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::post(uri)
        .body(Body::empty())
        .expect("request builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request builds")
}

#[tokio::test]
async fn catalog_lists_blocks_in_order() {
    let (router, _) = router_with_sessions();
    let response = router
        .oneshot(get("/api/v1/catalog"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json_body(response).await;
    let blocks = body["blocks"].as_array().expect("blocks array");
    assert_eq!(blocks.len(), 6);
    assert_eq!(blocks[0]["key"], "headcount");
    assert_eq!(blocks[5]["key"], "interviews");
    assert_eq!(body["interview_questions"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn session_walks_through_site_selection_and_the_first_block() {
    let (router, _) = router_with_sessions();

    let created = router
        .clone()
        .oneshot(post_empty("/api/v1/audits/sessions"))
        .await
        .expect("router responds");
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = read_json_body(created).await;
    let session_id = body["session_id"].as_str().expect("session id").to_string();
    assert_eq!(body["phase"], "setup");
    let base = format!("/api/v1/audits/sessions/{session_id}");

    let selected = router
        .clone()
        .oneshot(post_json(
            &format!("{base}/site"),
            json!({ "site_id": "site-aurora", "audit_type": "complaint" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(selected.status(), StatusCode::OK);
    let body = read_json_body(selected).await;
    assert_eq!(body["site"]["site_name"], "Residencial Aurora");
    assert_eq!(body["audit_type"], "complaint");

    let begun = router
        .clone()
        .oneshot(post_empty(&format!("{base}/begin")))
        .await
        .expect("router responds");
    assert_eq!(begun.status(), StatusCode::OK);

    let refused = router
        .clone()
        .oneshot(post_empty(&format!("{base}/advance")))
        .await
        .expect("router responds");
    let body = read_json_body(refused).await;
    assert_eq!(body["outcome"], "blocked");
    assert_eq!(body["gaps"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["gaps"][0]["gap"], "field_headcount_missing");

    for action in [
        json!({ "action": "set_field_headcount", "value": "12" }),
        json!({ "action": "set_system_headcount", "value": "12" }),
        json!({ "action": "set_subcontracting_regular", "regular": true }),
    ] {
        let applied = router
            .clone()
            .oneshot(post_json(&format!("{base}/actions"), action))
            .await
            .expect("router responds");
        assert_eq!(applied.status(), StatusCode::OK);
    }

    let moved = router
        .oneshot(post_empty(&format!("{base}/advance")))
        .await
        .expect("router responds");
    let body = read_json_body(moved).await;
    assert_eq!(body["outcome"], "moved");
    assert_eq!(body["to"], "documentation");
    assert_eq!(body["session"]["sampling"]["target_count"], 2);
}

#[tokio::test]
async fn final_advance_completes_and_shows_up_in_history() {
    let (router, sessions) = router_with_sessions();
    let session = session_on_last_block();
    let session_id = session.id().0.clone();
    sessions.insert(session);

    let response = router
        .clone()
        .oneshot(post_empty(&format!(
            "/api/v1/audits/sessions/{session_id}/advance"
        )))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["outcome"], "completed");
    assert_eq!(body["analysis"]["overallIndex"], 42.0);
    assert_eq!(body["session"]["phase"], "completed");
    assert!(sessions.is_empty());

    let history = router
        .clone()
        .oneshot(get("/api/v1/audits?site_id=site-aurora"))
        .await
        .expect("router responds");
    let rows = read_json_body(history).await;
    assert_eq!(rows.as_array().map(Vec::len), Some(1));

    let dashboard = router
        .oneshot(get("/api/v1/dashboard"))
        .await
        .expect("router responds");
    let body = read_json_body(dashboard).await;
    assert_eq!(body["total_audits"], 1);
}

#[tokio::test]
async fn busy_session_answers_conflict() {
    let (router, sessions) = router_with_sessions();
    let session = started_session();
    let id = session.id().clone();
    sessions.insert(session);
    let _checked_out = sessions.check_out(&id).expect("session checked out");
    let base = format!("/api/v1/audits/sessions/{id}");

    let read = router
        .clone()
        .oneshot(get(&base))
        .await
        .expect("router responds");
    assert_eq!(read.status(), StatusCode::CONFLICT);

    let edit = router
        .clone()
        .oneshot(post_json(
            &format!("{base}/actions"),
            json!({ "action": "add_interviewee" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(edit.status(), StatusCode::CONFLICT);

    let discard = router
        .oneshot(
            Request::delete(&base)
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(discard.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_session_and_site_are_not_found() {
    let (router, sessions) = router_with_sessions();
    let missing = router
        .clone()
        .oneshot(get("/api/v1/audits/sessions/ses-missing"))
        .await
        .expect("router responds");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let session = crate::workflows::audit::session::WizardSession::new(catalog());
    let id = session.id().clone();
    sessions.insert(session);
    let unknown_site = router
        .oneshot(post_json(
            &format!("/api/v1/audits/sessions/{id}/site"),
            json!({ "site_id": "site-nowhere" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(unknown_site.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn actions_outside_the_questionnaire_are_bad_requests() {
    let (router, sessions) = router_with_sessions();
    let session = crate::workflows::audit::session::WizardSession::new(catalog());
    let id = session.id().clone();
    sessions.insert(session);

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/audits/sessions/{id}/actions"),
            json!({ "action": "set_answer", "question_id": "doc_pgr", "value": "yes" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("questions"));
}

#[tokio::test]
async fn discarded_session_is_gone() {
    let (router, sessions) = router_with_sessions();
    let session = started_session();
    let id = session.id().clone();
    sessions.insert(session);

    let discard = router
        .clone()
        .oneshot(
            Request::delete(format!("/api/v1/audits/sessions/{id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(discard.status(), StatusCode::NO_CONTENT);
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn completed_session_is_released_from_the_table() {
    let (router, sessions) = router_with_sessions();
    let session = session_on_last_block();
    let id = session.id().clone();
    sessions.insert(session);

    let response = router
        .clone()
        .oneshot(post_empty(&format!("/api/v1/audits/sessions/{id}/advance")))
        .await
        .expect("router responds");
    let body = read_json_body(response).await;
    assert_eq!(body["outcome"], "completed");
    assert_eq!(body["session"]["phase"], "completed");
    assert!(sessions.is_empty());

    let lookup = router
        .oneshot(get(&format!("/api/v1/audits/sessions/{id}")))
        .await
        .expect("router responds");
    assert_eq!(lookup.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_submission_keeps_the_session_open() {
    let service = Arc::new(AuditWizardService::new(
        Arc::new(StubGateway::failing_once()),
        Arc::new(MemoryAudits::default()),
    ));
    let sessions = Arc::new(SessionTable::default());
    let router = audit_router(service, Arc::new(MemorySites::seeded()), sessions.clone());
    let session = session_on_last_block();
    let id = session.id().clone();
    sessions.insert(session);

    let response = router
        .clone()
        .oneshot(post_empty(&format!("/api/v1/audits/sessions/{id}/advance")))
        .await
        .expect("router responds");
    let body = read_json_body(response).await;
    assert_eq!(body["outcome"], "submission_failed");
    assert_eq!(sessions.len(), 1);

    let lookup = router
        .oneshot(get(&format!("/api/v1/audits/sessions/{id}")))
        .await
        .expect("router responds");
    assert_eq!(lookup.status(), StatusCode::OK);
}

struct PanickingGateway;

#[async_trait]
impl AnalysisGateway for PanickingGateway {
    async fn analyze(&self, _payload: &AnalysisPayload) -> Result<AnalysisResult, AnalysisError> {
        panic!("scoring backend crashed");
    }
}

#[tokio::test]
async fn aborted_submission_frees_the_session_slot() {
    let service = Arc::new(AuditWizardService::new(
        Arc::new(PanickingGateway),
        Arc::new(MemoryAudits::default()),
    ));
    let sessions = Arc::new(SessionTable::default());
    let router = audit_router(service, Arc::new(MemorySites::seeded()), sessions.clone());
    let session = session_on_last_block();
    let id = session.id().clone();
    sessions.insert(session);

    let response = router
        .clone()
        .oneshot(post_empty(&format!("/api/v1/audits/sessions/{id}/advance")))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(sessions.is_empty());

    let lookup = router
        .oneshot(get(&format!("/api/v1/audits/sessions/{id}")))
        .await
        .expect("router responds");
    assert_eq!(lookup.status(), StatusCode::NOT_FOUND);
}
