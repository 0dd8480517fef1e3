use serde::Serialize;

use super::super::domain::AnswerValue;
use super::super::session::WizardSession;

/// Structured audit handed to the risk-scoring service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisPayload {
    pub site: String,
    pub sampling: SamplingSummary,
    pub answers: Vec<AnswerLine>,
    pub interviews: Vec<InterviewSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingSummary {
    pub total_headcount: u32,
    pub system_headcount: u32,
    pub irregular_subcontracting: bool,
    pub interviewed_count: u32,
    pub coverage: String,
    pub quota_met: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerLine {
    pub question: String,
    pub answer: AnswerValue,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterviewSummary {
    pub role: String,
    pub company: String,
    pub deviation_count: usize,
}

impl AnalysisPayload {
    /// Answers are emitted in catalog order with the question text resolved.
    pub fn from_session(session: &WizardSession) -> Self {
        let sampling = session.sampling();
        let site = session
            .site()
            .map(|site| site.site_name.clone())
            .unwrap_or_default();

        let answers = session
            .catalog()
            .questions_ordered()
            .filter_map(|question| {
                session.responses().get(question.id).map(|response| AnswerLine {
                    question: question.text.to_string(),
                    answer: response.value,
                    note: response.justification.clone().unwrap_or_default(),
                })
            })
            .collect();

        let interviews = session
            .interviews()
            .records()
            .iter()
            .map(|record| InterviewSummary {
                role: record.role.trim().to_string(),
                company: record.company.trim().to_string(),
                deviation_count: record.deviation_count(),
            })
            .collect();

        Self {
            site,
            sampling: SamplingSummary {
                total_headcount: session.declared_field_headcount().count(),
                system_headcount: session.declared_system_headcount().count(),
                irregular_subcontracting: session.subcontracting_declared_regular() == Some(false),
                interviewed_count: sampling.interview_count,
                coverage: sampling.coverage_label(),
                quota_met: sampling.quota_met,
            },
            answers,
            interviews,
        }
    }
}
