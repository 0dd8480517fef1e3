use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::analysis::AnalysisResult;
use super::domain::{AuditType, InterviewRecord, Response};
use super::sampling::SamplingState;
use super::session::WizardSession;
use crate::workflows::registry::{RepositoryError, SiteId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditId(pub String);

impl AuditId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for AuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Audit as persisted after a successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedAudit {
    pub id: AuditId,
    pub site_id: SiteId,
    pub site_name: String,
    pub audit_type: AuditType,
    pub declared_field_headcount: u32,
    pub declared_system_headcount: u32,
    pub subcontracting_declared_regular: Option<bool>,
    pub sampling: SamplingState,
    pub responses: Vec<Response>,
    pub interviews: Vec<InterviewRecord>,
    pub analysis: AnalysisResult,
    pub created_at: DateTime<Utc>,
}

impl FinalizedAudit {
    /// Returns `None` if the session never had a site selected.
    pub fn from_session(
        session: &WizardSession,
        analysis: AnalysisResult,
        created_at: DateTime<Utc>,
    ) -> Option<Self> {
        let site = session.site()?;
        Some(Self {
            id: AuditId::generate(),
            site_id: site.site_id.clone(),
            site_name: site.site_name.clone(),
            audit_type: session.audit_type(),
            declared_field_headcount: session.declared_field_headcount().count(),
            declared_system_headcount: session.declared_system_headcount().count(),
            subcontracting_declared_regular: session.subcontracting_declared_regular(),
            sampling: session.sampling(),
            responses: session.responses().iter().cloned().collect(),
            interviews: session.interviews().records().to_vec(),
            analysis,
            created_at,
        })
    }

    pub fn overall_index(&self) -> f64 {
        self.analysis.overall_index
    }

    pub fn summary(&self) -> AuditSummary {
        AuditSummary {
            audit_id: self.id.clone(),
            site_id: self.site_id.clone(),
            site_name: self.site_name.clone(),
            audit_type: self.audit_type,
            overall_index: self.analysis.overall_index,
            classification: self.analysis.classification.clone(),
            legal_risk: self.analysis.legal_risk.clone(),
            interviewed: self.sampling.interview_count,
            created_at: self.created_at,
        }
    }
}

/// History row exposed by the API; evidence payloads stay out of listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditSummary {
    pub audit_id: AuditId,
    pub site_id: SiteId,
    pub site_name: String,
    pub audit_type: AuditType,
    pub overall_index: f64,
    pub classification: String,
    pub legal_risk: String,
    pub interviewed: u32,
    pub created_at: DateTime<Utc>,
}

pub trait AuditRepository: Send + Sync {
    fn list(&self) -> Result<Vec<FinalizedAudit>, RepositoryError>;
    fn create(&self, record: FinalizedAudit) -> Result<FinalizedAudit, RepositoryError>;
}
