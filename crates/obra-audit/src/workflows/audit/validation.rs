use serde::Serialize;

use super::domain::{BlockKey, BlockRule, InterviewId, MIN_JUSTIFICATION_CHARS};
use super::session::WizardSession;

/// One unmet sub-condition of a block's completion rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "gap", rename_all = "snake_case")]
pub enum BlockGap {
    FieldHeadcountMissing,
    SystemHeadcountMissing,
    SubcontractingUndeclared,
    HeadcountNotDeclared,
    QuotaNotMet {
        target: u32,
        interviewed: u32,
    },
    IntervieweeUnattributed {
        interview_id: InterviewId,
    },
    Unanswered {
        question_id: String,
    },
    JustificationMissing {
        question_id: String,
    },
    EvidenceMissing {
        question_id: String,
        required: usize,
        attached: usize,
    },
}

impl BlockGap {
    pub fn describe(&self) -> String {
        match self {
            BlockGap::FieldHeadcountMissing => "declare the headcount found on site".to_string(),
            BlockGap::SystemHeadcountMissing => {
                "declare the headcount registered in the employer's system".to_string()
            }
            BlockGap::SubcontractingUndeclared => {
                "state whether subcontracting is regular".to_string()
            }
            BlockGap::HeadcountNotDeclared => {
                "a site headcount above zero is required before sampling".to_string()
            }
            BlockGap::QuotaNotMet {
                target,
                interviewed,
            } => format!("interview quota not met ({interviewed}/{target})"),
            BlockGap::IntervieweeUnattributed { interview_id } => {
                format!("interviewee {interview_id} needs a role and a company")
            }
            BlockGap::Unanswered { question_id } => format!("{question_id} is unanswered"),
            BlockGap::JustificationMissing { question_id } => format!(
                "{question_id} needs a justification of at least {MIN_JUSTIFICATION_CHARS} characters"
            ),
            BlockGap::EvidenceMissing {
                question_id,
                required,
                attached,
            } => format!("{question_id} needs {required} photos ({attached} attached)"),
        }
    }
}

pub fn is_block_complete(block: BlockKey, session: &WizardSession) -> bool {
    block_gaps(block, session).is_empty()
}

/// Every reason `block` cannot be left yet, in display order.
pub fn block_gaps(block: BlockKey, session: &WizardSession) -> Vec<BlockGap> {
    match block.rule() {
        BlockRule::HeadcountDeclaration => headcount_gaps(session),
        BlockRule::InterviewSampling => interview_gaps(session),
        BlockRule::StandardQuestions => question_gaps(block, session),
    }
}

fn headcount_gaps(session: &WizardSession) -> Vec<BlockGap> {
    let mut gaps = Vec::new();
    if !session.declared_field_headcount().is_provided() {
        gaps.push(BlockGap::FieldHeadcountMissing);
    }
    if !session.declared_system_headcount().is_provided() {
        gaps.push(BlockGap::SystemHeadcountMissing);
    }
    if session.subcontracting_declared_regular().is_none() {
        gaps.push(BlockGap::SubcontractingUndeclared);
    }
    gaps
}

fn interview_gaps(session: &WizardSession) -> Vec<BlockGap> {
    let mut gaps = Vec::new();
    let sampling = session.sampling();

    if sampling.declared_headcount == 0 {
        gaps.push(BlockGap::HeadcountNotDeclared);
    } else if !sampling.quota_met {
        gaps.push(BlockGap::QuotaNotMet {
            target: sampling.target_count,
            interviewed: sampling.interview_count,
        });
    }

    gaps.extend(
        session
            .interviews()
            .records()
            .iter()
            .filter(|record| !record.is_attributed())
            .map(|record| BlockGap::IntervieweeUnattributed {
                interview_id: record.id.clone(),
            }),
    );
    gaps
}

fn question_gaps(block: BlockKey, session: &WizardSession) -> Vec<BlockGap> {
    let mut gaps = Vec::new();

    for question in session.catalog().questions_for_block(block) {
        let question_id = question.id.to_string();
        let Some(response) = session.responses().get(question.id) else {
            gaps.push(BlockGap::Unanswered { question_id });
            continue;
        };

        if !response.value.is_conforming()
            && response.justification_chars() < MIN_JUSTIFICATION_CHARS
        {
            gaps.push(BlockGap::JustificationMissing {
                question_id: question_id.clone(),
            });
        }

        if let Some(required) = question.required_photos() {
            let attached = response.evidence.len();
            if attached < required {
                gaps.push(BlockGap::EvidenceMissing {
                    question_id,
                    required,
                    attached,
                });
            }
        }
    }

    gaps
}
