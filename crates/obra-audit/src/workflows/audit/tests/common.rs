use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::workflows::audit::analysis::{
    AnalysisError, AnalysisGateway, AnalysisPayload, AnalysisResult,
};
use crate::workflows::audit::catalog::AuditCatalog;
use crate::workflows::audit::domain::{AnswerValue, BlockKey, IntervieweeField, SiteSelection};
use crate::workflows::audit::evidence::EvidenceImage;
use crate::workflows::audit::repository::{AuditRepository, FinalizedAudit};
use crate::workflows::audit::service::AuditWizardService;
use crate::workflows::audit::session::WizardSession;
use crate::workflows::registry::{
    NewSite, RepositoryError, Site, SiteId, SiteRepository,
};

pub(super) fn catalog() -> Arc<AuditCatalog> {
    Arc::new(AuditCatalog::standard())
}

pub(super) fn site_selection() -> SiteSelection {
    SiteSelection {
        site_id: SiteId("site-aurora".to_string()),
        site_name: "Residencial Aurora".to_string(),
    }
}

pub(super) fn photo() -> EvidenceImage {
    EvidenceImage::from_bytes("image/jpeg", &[0xff, 0xd8, 0xff, 0xe0]).expect("jpeg accepted")
}

/// Session with a site selected, sitting on the first block.
pub(super) fn started_session() -> WizardSession {
    let mut session = WizardSession::new(catalog());
    session
        .select_site(site_selection())
        .expect("setup accepts site");
    session.begin().expect("session begins");
    session
}

pub(super) fn declare_headcount(session: &mut WizardSession, field: &str) {
    session
        .set_field_headcount(field)
        .expect("field headcount accepted");
    session
        .set_system_headcount(field)
        .expect("system headcount accepted");
    session
        .set_subcontracting_regular(Some(true))
        .expect("subcontracting accepted");
}

/// Answer every question of `block` with `yes` and attach the photos it needs.
pub(super) fn satisfy_block(session: &mut WizardSession, block: BlockKey) {
    let requirements: Vec<(String, usize)> = session
        .catalog()
        .questions_for_block(block)
        .into_iter()
        .map(|question| {
            (
                question.id.to_string(),
                question.required_photos().unwrap_or(0),
            )
        })
        .collect();

    for (question_id, photos) in requirements {
        session
            .set_answer(&question_id, AnswerValue::Yes)
            .expect("answer accepted");
        for _ in 0..photos {
            session
                .add_evidence(&question_id, photo())
                .expect("evidence accepted");
        }
    }
}

pub(super) fn add_interviewees(session: &mut WizardSession, count: usize) {
    for index in 0..count {
        let id = session.add_interviewee().expect("interviewee added");
        session
            .set_interviewee_field(&id, IntervieweeField::Role, format!("Mason {index}"))
            .expect("role set");
        session
            .set_interviewee_field(&id, IntervieweeField::Company, "Construtora Alfa")
            .expect("company set");
    }
}

/// Fill every block with passing data for a 20-person site and stop on the interview block.
pub(super) fn session_on_last_block() -> WizardSession {
    let mut session = started_session();
    declare_headcount(&mut session, "20");
    session.advance().expect("headcount block advances");

    for block in [
        BlockKey::Documentation,
        BlockKey::SiteSafety,
        BlockKey::WorkAtHeight,
        BlockKey::WelfareFacilities,
    ] {
        satisfy_block(&mut session, block);
        session.advance().expect("block advances");
    }

    add_interviewees(&mut session, 2);
    assert_eq!(session.current_block(), Some(BlockKey::Interviews));
    session
}

pub(super) fn analysis_result(index: f64) -> AnalysisResult {
    AnalysisResult {
        overall_index: index,
        classification: "Moderate risk".to_string(),
        legal_risk: "Medium".to_string(),
        financial_exposure: 18_500.0,
        non_conformities: vec!["PGR not updated after scope change".to_string()],
        legal_impact: "Administrative fines under NR-1".to_string(),
        recommendations: vec!["Review the PGR with the safety engineer".to_string()],
        executive_conclusion: "Operation may continue with a corrective plan.".to_string(),
        calculation_breakdown: None,
    }
}

#[derive(Default)]
pub(super) struct StubGateway {
    calls: AtomicUsize,
    payloads: Mutex<Vec<AnalysisPayload>>,
    fail_first: bool,
}

impl StubGateway {
    pub(super) fn failing_once() -> Self {
        Self {
            fail_first: true,
            ..Self::default()
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn last_payload(&self) -> Option<AnalysisPayload> {
        self.payloads
            .lock()
            .expect("payload mutex poisoned")
            .last()
            .cloned()
    }
}

#[async_trait]
impl AnalysisGateway for StubGateway {
    async fn analyze(&self, payload: &AnalysisPayload) -> Result<AnalysisResult, AnalysisError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads
            .lock()
            .expect("payload mutex poisoned")
            .push(payload.clone());
        if self.fail_first && call == 0 {
            return Err(AnalysisError::Transport("connection reset".to_string()));
        }
        Ok(analysis_result(42.0))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAudits {
    pub(super) records: Arc<Mutex<Vec<FinalizedAudit>>>,
}

impl AuditRepository for MemoryAudits {
    fn list(&self) -> Result<Vec<FinalizedAudit>, RepositoryError> {
        Ok(self.records.lock().expect("audit mutex poisoned").clone())
    }

    fn create(&self, record: FinalizedAudit) -> Result<FinalizedAudit, RepositoryError> {
        self.records
            .lock()
            .expect("audit mutex poisoned")
            .push(record.clone());
        Ok(record)
    }
}

pub(super) struct UnavailableAudits;

impl AuditRepository for UnavailableAudits {
    fn list(&self) -> Result<Vec<FinalizedAudit>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn create(&self, _record: FinalizedAudit) -> Result<FinalizedAudit, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemorySites {
    records: Mutex<Vec<Site>>,
}

impl MemorySites {
    pub(super) fn seeded() -> Self {
        let site = NewSite {
            name: "Residencial Aurora".to_string(),
            address: "Rua das Flores, 100".to_string(),
            contractor: "Construtora Alfa".to_string(),
        }
        .into_site(Utc::now());
        Self {
            records: Mutex::new(vec![Site {
                id: SiteId("site-aurora".to_string()),
                ..site
            }]),
        }
    }
}

impl SiteRepository for MemorySites {
    fn list(&self) -> Result<Vec<Site>, RepositoryError> {
        Ok(self.records.lock().expect("sites mutex poisoned").clone())
    }

    fn create(&self, site: Site) -> Result<Site, RepositoryError> {
        self.records
            .lock()
            .expect("sites mutex poisoned")
            .push(site.clone());
        Ok(site)
    }

    fn fetch(&self, id: &SiteId) -> Result<Option<Site>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("sites mutex poisoned")
            .iter()
            .find(|site| &site.id == id)
            .cloned())
    }
}

pub(super) fn build_service(
    gateway: StubGateway,
) -> (
    AuditWizardService<StubGateway, MemoryAudits>,
    Arc<StubGateway>,
    MemoryAudits,
) {
    let gateway = Arc::new(gateway);
    let audits = MemoryAudits::default();
    let service = AuditWizardService::new(gateway.clone(), Arc::new(audits.clone()));
    (service, gateway, audits)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
