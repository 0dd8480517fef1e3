use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::analysis::{AnalysisGateway, AnalysisPayload};
use super::catalog::AuditCatalog;
use super::domain::{BlockKey, WizardError};
use super::report::{audit_history, AuditDashboard};
use super::repository::{AuditRepository, AuditSummary, FinalizedAudit};
use super::session::{BlockAdvance, WizardSession};
use super::validation::BlockGap;
use crate::workflows::registry::{RepositoryError, SiteId};

/// Outcome of an advance request, including the submission that follows the last block.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    Moved { from: BlockKey, to: BlockKey },
    Blocked { block: BlockKey, gaps: Vec<BlockGap> },
    Completed(Box<FinalizedAudit>),
    /// Analysis or persistence failed; the session is back on its last block.
    SubmissionFailed { notice: String },
}

/// Drives wizard sessions through submission against the analysis and storage collaborators.
pub struct AuditWizardService<G, R> {
    catalog: Arc<AuditCatalog>,
    gateway: Arc<G>,
    repository: Arc<R>,
}

impl<G, R> AuditWizardService<G, R>
where
    G: AnalysisGateway + 'static,
    R: AuditRepository + 'static,
{
    pub fn new(gateway: Arc<G>, repository: Arc<R>) -> Self {
        Self::with_catalog(Arc::new(AuditCatalog::standard()), gateway, repository)
    }

    pub fn with_catalog(catalog: Arc<AuditCatalog>, gateway: Arc<G>, repository: Arc<R>) -> Self {
        Self {
            catalog,
            gateway,
            repository,
        }
    }

    pub fn catalog(&self) -> &AuditCatalog {
        &self.catalog
    }

    pub fn open_session(&self) -> WizardSession {
        let session = WizardSession::new(self.catalog.clone());
        info!(session_id = %session.id(), "audit session opened");
        session
    }

    /// Move past the current block. Passing the last block submits the audit;
    /// the exclusive borrow keeps the session untouchable until that resolves.
    pub async fn advance(&self, session: &mut WizardSession) -> Result<AdvanceOutcome, WizardError> {
        match session.advance()? {
            BlockAdvance::Moved { from, to } => {
                info!(session_id = %session.id(), from = ?from, to = ?to, "block advanced");
                Ok(AdvanceOutcome::Moved { from, to })
            }
            BlockAdvance::Blocked { block, gaps } => {
                info!(
                    session_id = %session.id(),
                    block = ?block,
                    gaps = gaps.len(),
                    "block advance refused"
                );
                Ok(AdvanceOutcome::Blocked { block, gaps })
            }
            BlockAdvance::ReadyForSubmission => Ok(self.submit(session).await),
        }
    }

    async fn submit(&self, session: &mut WizardSession) -> AdvanceOutcome {
        let payload = AnalysisPayload::from_session(session);
        info!(
            session_id = %session.id(),
            answers = payload.answers.len(),
            interviews = payload.interviews.len(),
            "submitting audit for analysis"
        );

        let analysis = match self.gateway.analyze(&payload).await {
            Ok(analysis) => analysis,
            Err(err) => {
                warn!(session_id = %session.id(), error = %err, "analysis failed");
                return recover(
                    session,
                    format!("Analysis failed: {err}. Your answers were kept; submit again to retry."),
                );
            }
        };

        let Some(record) = FinalizedAudit::from_session(session, analysis, Utc::now()) else {
            return recover(session, "No site is selected for this audit.".to_string());
        };

        match self.repository.create(record) {
            Ok(stored) => {
                info!(
                    session_id = %session.id(),
                    audit_id = %stored.id,
                    overall_index = stored.analysis.overall_index,
                    "audit persisted"
                );
                session.complete_submission();
                AdvanceOutcome::Completed(Box::new(stored))
            }
            Err(err) => {
                warn!(session_id = %session.id(), error = %err, "audit could not be stored");
                recover(
                    session,
                    format!("Saving the audit failed: {err}. Your answers were kept; submit again to retry."),
                )
            }
        }
    }

    pub fn history(&self, site_id: Option<&SiteId>) -> Result<Vec<AuditSummary>, RepositoryError> {
        let records = self.repository.list()?;
        Ok(audit_history(&records, site_id))
    }

    pub fn dashboard(&self) -> Result<AuditDashboard, RepositoryError> {
        let records = self.repository.list()?;
        Ok(AuditDashboard::from_records(&records))
    }
}

fn recover(session: &mut WizardSession, notice: String) -> AdvanceOutcome {
    session.fail_submission(notice.clone());
    AdvanceOutcome::SubmissionFailed { notice }
}
