//! Audit intake wizard.
//!
//! A [`WizardSession`] walks an auditor through the catalog one block at a
//! time. Each block has a completion rule checked by [`block_gaps`]; the last
//! block hands the session to [`AuditWizardService`], which submits the
//! assembled payload to an [`AnalysisGateway`] and stores the result.

pub mod analysis;
pub mod catalog;
pub mod domain;
pub mod evidence;
pub mod report;
pub mod repository;
pub mod responses;
pub mod router;
pub mod sampling;
pub mod service;
pub mod session;
pub mod validation;

#[cfg(test)]
mod tests;

pub use analysis::{
    AnalysisError, AnalysisGateway, AnalysisPayload, AnalysisResult, AnswerLine, BreakdownValue,
    CalculationItem, HttpAnalysisClient, InterviewSummary, SamplingSummary,
};
pub use catalog::AuditCatalog;
pub use domain::{
    AnswerValue, AuditType, BlockKey, BlockRule, HeadcountEntry, InterviewId, InterviewRecord,
    IntervieweeField, Question, Response, SiteSelection, WizardError, WizardPhase,
    DEFAULT_MIN_PHOTOS, MIN_JUSTIFICATION_CHARS,
};
pub use evidence::{capture_evidence, CapturedEvidence, EvidenceError, EvidenceImage};
pub use report::{audit_history, AuditDashboard};
pub use repository::{AuditId, AuditRepository, AuditSummary, FinalizedAudit};
pub use responses::{InterviewRoster, ResponseStore};
pub use router::{audit_router, SessionTable};
pub use sampling::{compute_quota, SamplingState};
pub use service::{AdvanceOutcome, AuditWizardService};
pub use session::{
    ActionEffect, BlockAdvance, SessionId, SessionView, WizardAction, WizardSession,
};
pub use validation::{block_gaps, is_block_complete, BlockGap};
