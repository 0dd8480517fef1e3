mod client;
mod payload;

pub use client::HttpAnalysisClient;
pub use payload::{AnalysisPayload, AnswerLine, InterviewSummary, SamplingSummary};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// External risk-scoring service. Called once per submission, never retried.
#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    async fn analyze(&self, payload: &AnalysisPayload) -> Result<AnalysisResult, AnalysisError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub overall_index: f64,
    pub classification: String,
    pub legal_risk: String,
    pub financial_exposure: f64,
    pub non_conformities: Vec<String>,
    pub legal_impact: String,
    pub recommendations: Vec<String>,
    pub executive_conclusion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_breakdown: Option<Vec<CalculationItem>>,
}

impl AnalysisResult {
    /// Reject results the service should never produce.
    pub fn validate(self) -> Result<Self, AnalysisError> {
        if !self.overall_index.is_finite() || !(0.0..=100.0).contains(&self.overall_index) {
            return Err(AnalysisError::Malformed(format!(
                "overallIndex {} outside 0-100",
                self.overall_index
            )));
        }
        if self.classification.trim().is_empty() || self.legal_risk.trim().is_empty() {
            return Err(AnalysisError::Malformed(
                "classification and legalRisk are required".to_string(),
            ));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationItem {
    pub item: String,
    pub value: BreakdownValue,
    #[serde(default)]
    pub legal_basis: String,
    #[serde(default)]
    pub rationale: String,
}

/// Breakdown values arrive either as amounts or as preformatted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BreakdownValue {
    Amount(f64),
    Text(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("analysis service unreachable: {0}")]
    Transport(String),
    #[error("analysis service answered with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("analysis result could not be parsed: {0}")]
    Malformed(String),
}
