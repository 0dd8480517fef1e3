use serde::{Deserialize, Serialize};
use std::fmt;

use super::evidence::{EvidenceError, EvidenceImage};
use crate::workflows::registry::SiteId;

/// Evidence minimum applied when a photo-gated question does not configure its own.
pub const DEFAULT_MIN_PHOTOS: u8 = 3;

/// Minimum count of non-whitespace characters in a deviation justification.
pub const MIN_JUSTIFICATION_CHARS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKey {
    Headcount,
    Documentation,
    SiteSafety,
    WorkAtHeight,
    WelfareFacilities,
    Interviews,
}

impl BlockKey {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Headcount,
            Self::Documentation,
            Self::SiteSafety,
            Self::WorkAtHeight,
            Self::WelfareFacilities,
            Self::Interviews,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Headcount => "Headcount & Subcontracting",
            Self::Documentation => "Labor Documentation",
            Self::SiteSafety => "Site Safety & PPE",
            Self::WorkAtHeight => "Work at Height",
            Self::WelfareFacilities => "Welfare Facilities",
            Self::Interviews => "Worker Interviews",
        }
    }

    /// Completion rule shape the validator dispatches on.
    pub const fn rule(self) -> BlockRule {
        match self {
            Self::Headcount => BlockRule::HeadcountDeclaration,
            Self::Interviews => BlockRule::InterviewSampling,
            _ => BlockRule::StandardQuestions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockRule {
    HeadcountDeclaration,
    InterviewSampling,
    StandardQuestions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerValue {
    Yes,
    Partial,
    No,
    NotApplicable,
}

impl AnswerValue {
    /// `yes` and `not_applicable` need neither justification nor follow-up.
    pub const fn is_conforming(self) -> bool {
        matches!(self, Self::Yes | Self::NotApplicable)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::Partial => "Partial",
            Self::No => "No",
            Self::NotApplicable => "N/A",
        }
    }
}

/// Catalog entry. `weight` is forwarded to the analysis service and never used locally.
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: &'static str,
    pub block: BlockKey,
    pub text: &'static str,
    pub weight: u8,
    pub requires_photos: bool,
    pub min_photos: Option<u8>,
}

impl Question {
    /// Evidence items the response must carry, if the question is photo-gated.
    pub fn required_photos(&self) -> Option<usize> {
        self.requires_photos
            .then(|| usize::from(self.min_photos.unwrap_or(DEFAULT_MIN_PHOTOS)))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewQuestion {
    pub id: &'static str,
    pub text: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub question_id: String,
    pub value: AnswerValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    #[serde(default)]
    pub evidence: Vec<EvidenceImage>,
}

impl Response {
    pub fn new(question_id: impl Into<String>, value: AnswerValue) -> Self {
        Self {
            question_id: question_id.into(),
            value,
            justification: None,
            evidence: Vec::new(),
        }
    }

    pub fn justification_chars(&self) -> usize {
        self.justification
            .as_deref()
            .map(|text| text.chars().filter(|c| !c.is_whitespace()).count())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InterviewId(pub String);

impl InterviewId {
    pub fn generate() -> Self {
        Self(format!("int-{}", uuid::Uuid::new_v4().simple()))
    }
}

impl fmt::Display for InterviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewAnswer {
    pub question_id: String,
    pub value: AnswerValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewRecord {
    pub id: InterviewId,
    pub role: String,
    pub company: String,
    pub sub_responses: Vec<InterviewAnswer>,
}

impl InterviewRecord {
    pub fn is_attributed(&self) -> bool {
        !self.role.trim().is_empty() && !self.company.trim().is_empty()
    }

    /// Sub-answers other than `yes`.
    pub fn deviation_count(&self) -> usize {
        self.sub_responses
            .iter()
            .filter(|answer| answer.value != AnswerValue::Yes)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervieweeField {
    Role,
    Company,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditType {
    #[default]
    Routine,
    FollowUp,
    Complaint,
}

impl AuditType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Routine => "Routine inspection",
            Self::FollowUp => "Follow-up inspection",
            Self::Complaint => "Complaint-driven inspection",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardPhase {
    Setup,
    Questions,
    Processing,
    Completed,
}

impl WizardPhase {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Questions => "questions",
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for WizardPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Operator-entered headcount. Anything that is not a non-negative integer is `Empty`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeadcountEntry {
    #[default]
    Empty,
    Provided(u32),
}

impl HeadcountEntry {
    pub fn parse(raw: &str) -> Self {
        raw.trim()
            .parse::<u32>()
            .map(Self::Provided)
            .unwrap_or(Self::Empty)
    }

    pub const fn value(self) -> Option<u32> {
        match self {
            Self::Empty => None,
            Self::Provided(count) => Some(count),
        }
    }

    pub const fn is_provided(self) -> bool {
        matches!(self, Self::Provided(_))
    }

    /// Headcount for quota math; an empty entry counts as zero.
    pub const fn count(self) -> u32 {
        match self {
            Self::Empty => 0,
            Self::Provided(count) => count,
        }
    }
}

impl From<Option<u32>> for HeadcountEntry {
    fn from(value: Option<u32>) -> Self {
        value.map(Self::Provided).unwrap_or(Self::Empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSelection {
    pub site_id: SiteId,
    pub site_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("operation requires the {expected} phase (session is in {actual})")]
    WrongPhase {
        expected: WizardPhase,
        actual: WizardPhase,
    },
    #[error("a site must be selected before the questionnaire starts")]
    SiteNotSelected,
    #[error("question {0} is not part of the catalog")]
    UnknownQuestion(String),
    #[error("question {0} has not been answered yet")]
    NoResponse(String),
    #[error("question {question_id} has no evidence at position {index}")]
    EvidenceNotFound { question_id: String, index: usize },
    #[error("interviewee {0} not found")]
    UnknownInterviewee(InterviewId),
    #[error("interview question {0} is not part of the catalog")]
    UnknownInterviewQuestion(String),
    #[error(transparent)]
    Evidence(#[from] EvidenceError),
}
