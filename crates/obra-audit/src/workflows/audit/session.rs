use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::catalog::AuditCatalog;
use super::domain::{
    AnswerValue, AuditType, BlockKey, HeadcountEntry, InterviewId, InterviewRecord,
    IntervieweeField, SiteSelection, WizardError, WizardPhase,
};
use super::evidence::{CapturedEvidence, EvidenceImage};
use super::responses::{InterviewRoster, ResponseStore};
use super::sampling::{compute_quota, SamplingState};
use super::validation::{block_gaps, BlockGap};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(format!("ses-{}", uuid::Uuid::new_v4().simple()))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of asking the wizard to move past the current block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockAdvance {
    Moved { from: BlockKey, to: BlockKey },
    Blocked { block: BlockKey, gaps: Vec<BlockGap> },
    /// Last block passed; the session is now in `processing`.
    ReadyForSubmission,
}

/// Operator edits accepted while the questionnaire is open.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WizardAction {
    SetFieldHeadcount {
        value: String,
    },
    SetSystemHeadcount {
        value: String,
    },
    SetSubcontractingRegular {
        regular: Option<bool>,
    },
    SetAnswer {
        question_id: String,
        value: AnswerValue,
    },
    SetJustification {
        question_id: String,
        justification: String,
    },
    AddEvidence {
        question_id: String,
        mime_type: String,
        data_base64: String,
    },
    RemoveEvidence {
        question_id: String,
        index: usize,
    },
    AddInterviewee,
    RemoveInterviewee {
        interview_id: InterviewId,
    },
    SetIntervieweeField {
        interview_id: InterviewId,
        field: IntervieweeField,
        value: String,
    },
    SetIntervieweeAnswer {
        interview_id: InterviewId,
        question_id: String,
        value: AnswerValue,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionEffect {
    Applied,
    IntervieweeAdded(InterviewId),
}

/// One operator's in-progress audit. Owned exclusively by its caller and never
/// persisted before submission.
#[derive(Debug, Clone)]
pub struct WizardSession {
    id: SessionId,
    catalog: Arc<AuditCatalog>,
    phase: WizardPhase,
    current_block_index: usize,
    site: Option<SiteSelection>,
    audit_type: AuditType,
    declared_field_headcount: HeadcountEntry,
    declared_system_headcount: HeadcountEntry,
    subcontracting_declared_regular: Option<bool>,
    responses: ResponseStore,
    interviews: InterviewRoster,
    notice: Option<String>,
}

impl WizardSession {
    pub fn new(catalog: Arc<AuditCatalog>) -> Self {
        Self {
            id: SessionId::generate(),
            catalog,
            phase: WizardPhase::Setup,
            current_block_index: 0,
            site: None,
            audit_type: AuditType::default(),
            declared_field_headcount: HeadcountEntry::Empty,
            declared_system_headcount: HeadcountEntry::Empty,
            subcontracting_declared_regular: None,
            responses: ResponseStore::default(),
            interviews: InterviewRoster::default(),
            notice: None,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn catalog(&self) -> &AuditCatalog {
        &self.catalog
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    pub fn current_block_index(&self) -> usize {
        self.current_block_index
    }

    pub fn current_block(&self) -> Option<BlockKey> {
        match self.phase {
            WizardPhase::Questions | WizardPhase::Processing => {
                self.catalog.block_at(self.current_block_index)
            }
            WizardPhase::Setup | WizardPhase::Completed => None,
        }
    }

    pub fn site(&self) -> Option<&SiteSelection> {
        self.site.as_ref()
    }

    pub fn audit_type(&self) -> AuditType {
        self.audit_type
    }

    pub fn declared_field_headcount(&self) -> HeadcountEntry {
        self.declared_field_headcount
    }

    pub fn declared_system_headcount(&self) -> HeadcountEntry {
        self.declared_system_headcount
    }

    pub fn subcontracting_declared_regular(&self) -> Option<bool> {
        self.subcontracting_declared_regular
    }

    pub fn responses(&self) -> &ResponseStore {
        &self.responses
    }

    pub fn interviews(&self) -> &InterviewRoster {
        &self.interviews
    }

    /// Operator-visible notice left by the last failed submission.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn sampling(&self) -> SamplingState {
        compute_quota(
            self.declared_field_headcount.count(),
            u32::try_from(self.interviews.len()).unwrap_or(u32::MAX),
        )
    }

    /// Gaps of the block currently shown, empty outside the questionnaire.
    pub fn current_gaps(&self) -> Vec<BlockGap> {
        self.current_block()
            .map(|block| block_gaps(block, self))
            .unwrap_or_default()
    }

    pub fn select_site(&mut self, site: SiteSelection) -> Result<(), WizardError> {
        self.require_phase(WizardPhase::Setup)?;
        self.site = Some(site);
        Ok(())
    }

    pub fn set_audit_type(&mut self, audit_type: AuditType) -> Result<(), WizardError> {
        self.require_phase(WizardPhase::Setup)?;
        self.audit_type = audit_type;
        Ok(())
    }

    /// Enter the questionnaire at the first block. Entered data is kept.
    pub fn begin(&mut self) -> Result<(), WizardError> {
        self.require_phase(WizardPhase::Setup)?;
        let has_site = self
            .site
            .as_ref()
            .is_some_and(|site| !site.site_id.0.trim().is_empty());
        if !has_site {
            return Err(WizardError::SiteNotSelected);
        }

        self.phase = WizardPhase::Questions;
        self.current_block_index = 0;
        self.notice = None;
        Ok(())
    }

    pub fn advance(&mut self) -> Result<BlockAdvance, WizardError> {
        self.require_phase(WizardPhase::Questions)?;
        let block = self.block_or_first();

        let gaps = block_gaps(block, self);
        if !gaps.is_empty() {
            return Ok(BlockAdvance::Blocked { block, gaps });
        }

        let next_index = self.current_block_index + 1;
        match self.catalog.block_at(next_index) {
            Some(next) => {
                self.current_block_index = next_index;
                Ok(BlockAdvance::Moved {
                    from: block,
                    to: next,
                })
            }
            None => {
                self.phase = WizardPhase::Processing;
                self.notice = None;
                Ok(BlockAdvance::ReadyForSubmission)
            }
        }
    }

    /// Step back one block, or out to setup from the first block.
    ///
    /// Leaving to setup keeps every answer, headcount and interview so `begin`
    /// resumes with the same data. Abandoning a session is done by discarding it
    /// (`DELETE /api/v1/audits/sessions/:session_id`), which persists nothing.
    pub fn retreat(&mut self) -> Result<(), WizardError> {
        self.require_phase(WizardPhase::Questions)?;
        if self.current_block_index == 0 {
            self.phase = WizardPhase::Setup;
        } else {
            self.current_block_index -= 1;
        }
        Ok(())
    }

    pub fn set_field_headcount(&mut self, raw: &str) -> Result<(), WizardError> {
        self.require_phase(WizardPhase::Questions)?;
        self.declared_field_headcount = HeadcountEntry::parse(raw);
        Ok(())
    }

    pub fn set_system_headcount(&mut self, raw: &str) -> Result<(), WizardError> {
        self.require_phase(WizardPhase::Questions)?;
        self.declared_system_headcount = HeadcountEntry::parse(raw);
        Ok(())
    }

    pub fn set_subcontracting_regular(&mut self, regular: Option<bool>) -> Result<(), WizardError> {
        self.require_phase(WizardPhase::Questions)?;
        self.subcontracting_declared_regular = regular;
        Ok(())
    }

    pub fn set_answer(&mut self, question_id: &str, value: AnswerValue) -> Result<(), WizardError> {
        self.require_phase(WizardPhase::Questions)?;
        self.require_question(question_id)?;
        self.responses.set_answer(question_id, value);
        Ok(())
    }

    pub fn set_justification(
        &mut self,
        question_id: &str,
        justification: impl Into<String>,
    ) -> Result<(), WizardError> {
        self.require_phase(WizardPhase::Questions)?;
        self.require_question(question_id)?;
        self.responses
            .set_justification(question_id, justification.into())
    }

    /// Append a photo to one question's evidence; returns the new count.
    pub fn add_evidence(
        &mut self,
        question_id: &str,
        image: EvidenceImage,
    ) -> Result<usize, WizardError> {
        self.require_phase(WizardPhase::Questions)?;
        self.require_question(question_id)?;
        self.responses.add_evidence(question_id, image)
    }

    pub fn apply_evidence(&mut self, captured: CapturedEvidence) -> Result<usize, WizardError> {
        let CapturedEvidence { question_id, image } = captured;
        self.add_evidence(&question_id, image)
    }

    pub fn remove_evidence(
        &mut self,
        question_id: &str,
        index: usize,
    ) -> Result<EvidenceImage, WizardError> {
        self.require_phase(WizardPhase::Questions)?;
        self.require_question(question_id)?;
        self.responses.remove_evidence(question_id, index)
    }

    pub fn add_interviewee(&mut self) -> Result<InterviewId, WizardError> {
        self.require_phase(WizardPhase::Questions)?;
        Ok(self.interviews.add(self.catalog.interview_questions()))
    }

    pub fn remove_interviewee(&mut self, id: &InterviewId) -> Result<InterviewRecord, WizardError> {
        self.require_phase(WizardPhase::Questions)?;
        self.interviews.remove(id)
    }

    pub fn set_interviewee_field(
        &mut self,
        id: &InterviewId,
        field: IntervieweeField,
        value: impl Into<String>,
    ) -> Result<(), WizardError> {
        self.require_phase(WizardPhase::Questions)?;
        self.interviews.set_field(id, field, value.into())
    }

    pub fn set_interviewee_answer(
        &mut self,
        id: &InterviewId,
        question_id: &str,
        value: AnswerValue,
    ) -> Result<(), WizardError> {
        self.require_phase(WizardPhase::Questions)?;
        if self.catalog.interview_question(question_id).is_none() {
            return Err(WizardError::UnknownInterviewQuestion(question_id.to_string()));
        }
        self.interviews.set_answer(id, question_id, value)
    }

    pub fn apply(&mut self, action: WizardAction) -> Result<ActionEffect, WizardError> {
        match action {
            WizardAction::SetFieldHeadcount { value } => self.set_field_headcount(&value)?,
            WizardAction::SetSystemHeadcount { value } => self.set_system_headcount(&value)?,
            WizardAction::SetSubcontractingRegular { regular } => {
                self.set_subcontracting_regular(regular)?
            }
            WizardAction::SetAnswer { question_id, value } => {
                self.set_answer(&question_id, value)?
            }
            WizardAction::SetJustification {
                question_id,
                justification,
            } => self.set_justification(&question_id, justification)?,
            WizardAction::AddEvidence {
                question_id,
                mime_type,
                data_base64,
            } => {
                self.require_phase(WizardPhase::Questions)?;
                let image = EvidenceImage::from_base64(&mime_type, &data_base64)?;
                self.add_evidence(&question_id, image)?;
            }
            WizardAction::RemoveEvidence { question_id, index } => {
                self.remove_evidence(&question_id, index)?;
            }
            WizardAction::AddInterviewee => {
                return self.add_interviewee().map(ActionEffect::IntervieweeAdded);
            }
            WizardAction::RemoveInterviewee { interview_id } => {
                self.remove_interviewee(&interview_id)?;
            }
            WizardAction::SetIntervieweeField {
                interview_id,
                field,
                value,
            } => self.set_interviewee_field(&interview_id, field, value)?,
            WizardAction::SetIntervieweeAnswer {
                interview_id,
                question_id,
                value,
            } => self.set_interviewee_answer(&interview_id, &question_id, value)?,
        }
        Ok(ActionEffect::Applied)
    }

    /// Return to the block the submission started from, keeping every answer.
    pub(crate) fn fail_submission(&mut self, notice: String) {
        if self.phase == WizardPhase::Processing {
            self.phase = WizardPhase::Questions;
            self.notice = Some(notice);
        }
    }

    pub(crate) fn complete_submission(&mut self) {
        if self.phase == WizardPhase::Processing {
            self.phase = WizardPhase::Completed;
        }
    }

    pub fn to_view(&self) -> SessionView {
        let current_block = self.current_block();
        SessionView {
            session_id: self.id.clone(),
            phase: self.phase,
            current_block_index: self.current_block_index,
            current_block,
            current_block_label: current_block.map(BlockKey::label),
            block_count: self.catalog.block_count(),
            site: self.site.clone(),
            audit_type: self.audit_type,
            declared_field_headcount: self.declared_field_headcount.value(),
            declared_system_headcount: self.declared_system_headcount.value(),
            subcontracting_declared_regular: self.subcontracting_declared_regular,
            sampling: self.sampling(),
            responses: self
                .responses
                .iter()
                .map(|response| ResponseView {
                    question_id: response.question_id.clone(),
                    value: response.value,
                    justification: response.justification.clone(),
                    evidence_count: response.evidence.len(),
                })
                .collect(),
            interviews: self.interviews.records().to_vec(),
            gaps: self.current_gaps(),
            notice: self.notice.clone(),
        }
    }

    fn block_or_first(&self) -> BlockKey {
        self.catalog
            .block_at(self.current_block_index)
            .unwrap_or(BlockKey::Headcount)
    }

    fn require_phase(&self, expected: WizardPhase) -> Result<(), WizardError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(WizardError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    fn require_question(&self, question_id: &str) -> Result<(), WizardError> {
        self.catalog
            .question(question_id)
            .map(|_| ())
            .ok_or_else(|| WizardError::UnknownQuestion(question_id.to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseView {
    pub question_id: String,
    pub value: AnswerValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    pub evidence_count: usize,
}

/// Serializable snapshot of a session for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub phase: WizardPhase,
    pub current_block_index: usize,
    pub current_block: Option<BlockKey>,
    pub current_block_label: Option<&'static str>,
    pub block_count: usize,
    pub site: Option<SiteSelection>,
    pub audit_type: AuditType,
    pub declared_field_headcount: Option<u32>,
    pub declared_system_headcount: Option<u32>,
    pub subcontracting_declared_regular: Option<bool>,
    pub sampling: SamplingState,
    pub responses: Vec<ResponseView>,
    pub interviews: Vec<InterviewRecord>,
    pub gaps: Vec<BlockGap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}
