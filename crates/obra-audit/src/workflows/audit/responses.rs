use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{
    AnswerValue, InterviewAnswer, InterviewId, InterviewQuestion, InterviewRecord,
    IntervieweeField, Response, WizardError,
};
use super::evidence::EvidenceImage;

/// Answers keyed by question id; at most one response per question.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResponseStore {
    responses: BTreeMap<String, Response>,
}

impl ResponseStore {
    pub fn get(&self, question_id: &str) -> Option<&Response> {
        self.responses.get(question_id)
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Response> {
        self.responses.values()
    }

    /// Create the response on first answer; afterwards only the value changes.
    pub fn set_answer(&mut self, question_id: &str, value: AnswerValue) {
        self.responses
            .entry(question_id.to_string())
            .and_modify(|response| response.value = value)
            .or_insert_with(|| Response::new(question_id, value));
    }

    pub fn set_justification(
        &mut self,
        question_id: &str,
        justification: String,
    ) -> Result<(), WizardError> {
        let response = self.existing_mut(question_id)?;
        response.justification = Some(justification);
        Ok(())
    }

    pub fn add_evidence(
        &mut self,
        question_id: &str,
        image: EvidenceImage,
    ) -> Result<usize, WizardError> {
        let response = self.existing_mut(question_id)?;
        response.evidence.push(image);
        Ok(response.evidence.len())
    }

    pub fn remove_evidence(
        &mut self,
        question_id: &str,
        index: usize,
    ) -> Result<EvidenceImage, WizardError> {
        let response = self.existing_mut(question_id)?;
        if index >= response.evidence.len() {
            return Err(WizardError::EvidenceNotFound {
                question_id: question_id.to_string(),
                index,
            });
        }
        Ok(response.evidence.remove(index))
    }

    fn existing_mut(&mut self, question_id: &str) -> Result<&mut Response, WizardError> {
        self.responses
            .get_mut(question_id)
            .ok_or_else(|| WizardError::NoResponse(question_id.to_string()))
    }
}

/// Interview records in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct InterviewRoster {
    records: Vec<InterviewRecord>,
}

impl InterviewRoster {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[InterviewRecord] {
        &self.records
    }

    pub fn get(&self, id: &InterviewId) -> Option<&InterviewRecord> {
        self.records.iter().find(|record| &record.id == id)
    }

    /// Add a blank interviewee with every sub-question answered `yes`.
    pub fn add(&mut self, questions: &[InterviewQuestion]) -> InterviewId {
        let id = InterviewId::generate();
        self.records.push(InterviewRecord {
            id: id.clone(),
            role: String::new(),
            company: String::new(),
            sub_responses: questions
                .iter()
                .map(|question| InterviewAnswer {
                    question_id: question.id.to_string(),
                    value: AnswerValue::Yes,
                })
                .collect(),
        });
        id
    }

    pub fn remove(&mut self, id: &InterviewId) -> Result<InterviewRecord, WizardError> {
        let position = self
            .records
            .iter()
            .position(|record| &record.id == id)
            .ok_or_else(|| WizardError::UnknownInterviewee(id.clone()))?;
        Ok(self.records.remove(position))
    }

    pub fn set_field(
        &mut self,
        id: &InterviewId,
        field: IntervieweeField,
        value: String,
    ) -> Result<(), WizardError> {
        let record = self.existing_mut(id)?;
        match field {
            IntervieweeField::Role => record.role = value,
            IntervieweeField::Company => record.company = value,
        }
        Ok(())
    }

    pub fn set_answer(
        &mut self,
        id: &InterviewId,
        question_id: &str,
        value: AnswerValue,
    ) -> Result<(), WizardError> {
        let record = self.existing_mut(id)?;
        match record
            .sub_responses
            .iter_mut()
            .find(|answer| answer.question_id == question_id)
        {
            Some(answer) => answer.value = value,
            None => record.sub_responses.push(InterviewAnswer {
                question_id: question_id.to_string(),
                value,
            }),
        }
        Ok(())
    }

    fn existing_mut(&mut self, id: &InterviewId) -> Result<&mut InterviewRecord, WizardError> {
        self.records
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or_else(|| WizardError::UnknownInterviewee(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(tag: u8) -> EvidenceImage {
        EvidenceImage::from_bytes("image/png", &[tag]).expect("valid image")
    }

    #[test]
    fn second_answer_overwrites_value_only() {
        let mut store = ResponseStore::default();
        store.set_answer("safety_ppe_usage", AnswerValue::No);
        store
            .set_justification("safety_ppe_usage", "helmets missing on slab".to_string())
            .expect("response exists");
        store
            .add_evidence("safety_ppe_usage", image(1))
            .expect("response exists");

        store.set_answer("safety_ppe_usage", AnswerValue::Partial);

        assert_eq!(store.len(), 1);
        let response = store.get("safety_ppe_usage").expect("response stored");
        assert_eq!(response.value, AnswerValue::Partial);
        assert_eq!(response.evidence, vec![image(1)]);
        assert_eq!(
            response.justification.as_deref(),
            Some("helmets missing on slab")
        );
    }

    #[test]
    fn justification_and_evidence_require_an_answer() {
        let mut store = ResponseStore::default();
        assert!(matches!(
            store.set_justification("doc_pgr", "missing".to_string()),
            Err(WizardError::NoResponse(id)) if id == "doc_pgr"
        ));
        assert!(matches!(
            store.add_evidence("doc_pgr", image(1)),
            Err(WizardError::NoResponse(_))
        ));
    }

    #[test]
    fn evidence_removal_is_positional() {
        let mut store = ResponseStore::default();
        store.set_answer("height_anchorage", AnswerValue::Yes);
        for tag in 1..=3 {
            store
                .add_evidence("height_anchorage", image(tag))
                .expect("append evidence");
        }

        let removed = store
            .remove_evidence("height_anchorage", 1)
            .expect("middle photo removed");
        assert_eq!(removed, image(2));
        assert_eq!(
            store.get("height_anchorage").map(|r| r.evidence.clone()),
            Some(vec![image(1), image(3)])
        );

        assert!(matches!(
            store.remove_evidence("height_anchorage", 5),
            Err(WizardError::EvidenceNotFound { index: 5, .. })
        ));
    }

    #[test]
    fn new_interviewees_default_every_answer_to_yes() {
        let questions = [
            InterviewQuestion {
                id: "iv_registered",
                text: "Registered?",
            },
            InterviewQuestion {
                id: "iv_wages_on_time",
                text: "Paid on time?",
            },
        ];
        let mut roster = InterviewRoster::default();
        let id = roster.add(&questions);

        let record = roster.get(&id).expect("record added");
        assert_eq!(record.sub_responses.len(), 2);
        assert!(record
            .sub_responses
            .iter()
            .all(|answer| answer.value == AnswerValue::Yes));
        assert_eq!(record.deviation_count(), 0);
    }

    #[test]
    fn roster_edits_target_a_single_interviewee() {
        let mut roster = InterviewRoster::default();
        let first = roster.add(&[]);
        let second = roster.add(&[]);

        roster
            .set_field(&first, IntervieweeField::Role, "Mason".to_string())
            .expect("first exists");
        roster
            .set_answer(&second, "iv_registered", AnswerValue::No)
            .expect("second exists");

        assert_eq!(roster.get(&first).map(|r| r.role.as_str()), Some("Mason"));
        assert_eq!(roster.get(&second).map(|r| r.role.as_str()), Some(""));
        assert_eq!(roster.get(&second).map(|r| r.deviation_count()), Some(1));

        roster.remove(&first).expect("remove first");
        assert_eq!(roster.len(), 1);
        assert!(matches!(
            roster.remove(&first),
            Err(WizardError::UnknownInterviewee(_))
        ));
    }
}
