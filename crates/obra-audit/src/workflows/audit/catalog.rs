use super::domain::{BlockKey, InterviewQuestion, Question};

/// Static inspection questionnaire. Block order drives wizard progression.
#[derive(Debug)]
pub struct AuditCatalog {
    blocks: Vec<BlockKey>,
    questions: Vec<Question>,
    interview_questions: Vec<InterviewQuestion>,
}

impl AuditCatalog {
    pub fn standard() -> Self {
        Self {
            blocks: BlockKey::ordered().to_vec(),
            questions: standard_questions(),
            interview_questions: standard_interview_questions(),
        }
    }

    pub fn blocks_ordered(&self) -> &[BlockKey] {
        &self.blocks
    }

    pub fn block_at(&self, index: usize) -> Option<BlockKey> {
        self.blocks.get(index).copied()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn questions_for_block(&self, block: BlockKey) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|question| question.block == block)
            .collect()
    }

    /// Every question in block order, then declaration order within the block.
    pub fn questions_ordered(&self) -> impl Iterator<Item = &Question> {
        self.blocks
            .iter()
            .flat_map(move |block| self.questions_for_block(*block))
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    pub fn interview_questions(&self) -> &[InterviewQuestion] {
        &self.interview_questions
    }

    pub fn interview_question(&self, id: &str) -> Option<&InterviewQuestion> {
        self.interview_questions
            .iter()
            .find(|question| question.id == id)
    }
}

impl Default for AuditCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_questions() -> Vec<Question> {
    vec![
        Question {
            id: "doc_registration",
            block: BlockKey::Documentation,
            text: "Every worker on site has a formal employment registration (CTPS/eSocial) matching the site roster.",
            weight: 5,
            requires_photos: false,
            min_photos: None,
        },
        Question {
            id: "doc_aso",
            block: BlockKey::Documentation,
            text: "Occupational health certificates (ASO) are current for all workers on site (NR-7).",
            weight: 4,
            requires_photos: false,
            min_photos: None,
        },
        Question {
            id: "doc_pgr",
            block: BlockKey::Documentation,
            text: "The site risk management program (PGR) is available and covers the current construction phase (NR-18).",
            weight: 4,
            requires_photos: false,
            min_photos: None,
        },
        Question {
            id: "doc_payroll",
            block: BlockKey::Documentation,
            text: "Payroll and overtime records for the last month are consistent with the declared headcount.",
            weight: 3,
            requires_photos: false,
            min_photos: None,
        },
        Question {
            id: "doc_subcontracts",
            block: BlockKey::Documentation,
            text: "Subcontractor agreements and their labor compliance certificates are on file.",
            weight: 4,
            requires_photos: false,
            min_photos: None,
        },
        Question {
            id: "safety_ppe_usage",
            block: BlockKey::SiteSafety,
            text: "Workers are using the PPE required for their activity, with delivery receipts on file (NR-6).",
            weight: 5,
            requires_photos: true,
            min_photos: None,
        },
        Question {
            id: "safety_collective_protection",
            block: BlockKey::SiteSafety,
            text: "Collective protection (guardrails, openings covered, edge protection) is installed where required (NR-18).",
            weight: 5,
            requires_photos: true,
            min_photos: Some(2),
        },
        Question {
            id: "safety_electrical",
            block: BlockKey::SiteSafety,
            text: "Temporary electrical installations are grounded, protected and signposted (NR-10).",
            weight: 4,
            requires_photos: false,
            min_photos: None,
        },
        Question {
            id: "safety_machinery",
            block: BlockKey::SiteSafety,
            text: "Machinery and equipment have guards and are operated by trained, authorized workers (NR-12).",
            weight: 3,
            requires_photos: false,
            min_photos: None,
        },
        Question {
            id: "height_anchorage",
            block: BlockKey::WorkAtHeight,
            text: "Anchorage points and lifelines are installed and inspected for all work above two meters (NR-35).",
            weight: 5,
            requires_photos: true,
            min_photos: None,
        },
        Question {
            id: "height_training",
            block: BlockKey::WorkAtHeight,
            text: "Workers performing work at height hold valid NR-35 training certificates.",
            weight: 4,
            requires_photos: false,
            min_photos: None,
        },
        Question {
            id: "height_scaffolding",
            block: BlockKey::WorkAtHeight,
            text: "Scaffolding is assembled on firm ground, braced, and has a responsible technician's release.",
            weight: 4,
            requires_photos: true,
            min_photos: Some(2),
        },
        Question {
            id: "welfare_sanitary",
            block: BlockKey::WelfareFacilities,
            text: "Sanitary facilities are clean and sized for the number of workers on site (NR-24).",
            weight: 3,
            requires_photos: true,
            min_photos: Some(1),
        },
        Question {
            id: "welfare_dining",
            block: BlockKey::WelfareFacilities,
            text: "A covered dining area with potable water and a means to heat meals is provided.",
            weight: 3,
            requires_photos: false,
            min_photos: None,
        },
        Question {
            id: "welfare_lodging",
            block: BlockKey::WelfareFacilities,
            text: "Lodging, where provided, meets ventilation, occupancy and hygiene requirements.",
            weight: 4,
            requires_photos: true,
            min_photos: None,
        },
    ]
}

fn standard_interview_questions() -> Vec<InterviewQuestion> {
    vec![
        InterviewQuestion {
            id: "iv_registered",
            text: "Is your employment formally registered?",
        },
        InterviewQuestion {
            id: "iv_ppe_supplied",
            text: "Did the employer supply your PPE free of charge?",
        },
        InterviewQuestion {
            id: "iv_wages_on_time",
            text: "Are wages paid in full and on time?",
        },
        InterviewQuestion {
            id: "iv_safety_training",
            text: "Did you receive safety training before starting on this site?",
        },
        InterviewQuestion {
            id: "iv_hours_recorded",
            text: "Are your working hours and overtime recorded?",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn question_ids_are_unique() {
        let catalog = AuditCatalog::standard();
        let mut seen = HashSet::new();
        for question in catalog.questions_ordered() {
            assert!(seen.insert(question.id), "duplicate id {}", question.id);
        }
        for question in catalog.interview_questions() {
            assert!(seen.insert(question.id), "duplicate id {}", question.id);
        }
    }

    #[test]
    fn declaration_blocks_carry_no_catalog_questions() {
        let catalog = AuditCatalog::standard();
        assert!(catalog.questions_for_block(BlockKey::Headcount).is_empty());
        assert!(catalog.questions_for_block(BlockKey::Interviews).is_empty());
        assert_eq!(catalog.questions_for_block(BlockKey::Documentation).len(), 5);
    }

    #[test]
    fn block_order_starts_with_headcount_and_ends_with_interviews() {
        let catalog = AuditCatalog::standard();
        assert_eq!(catalog.block_at(0), Some(BlockKey::Headcount));
        assert_eq!(
            catalog.block_at(catalog.block_count() - 1),
            Some(BlockKey::Interviews)
        );
        assert_eq!(catalog.block_at(catalog.block_count()), None);
    }

    #[test]
    fn ordered_questions_follow_block_order() {
        let catalog = AuditCatalog::standard();
        let blocks: Vec<BlockKey> = catalog.questions_ordered().map(|q| q.block).collect();
        let mut sorted = blocks.clone();
        sorted.sort();
        assert_eq!(blocks, sorted);
    }
}
