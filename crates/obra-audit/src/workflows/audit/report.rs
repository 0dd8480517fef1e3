use std::collections::BTreeMap;

use serde::Serialize;

use super::repository::{AuditSummary, FinalizedAudit};
use crate::workflows::registry::SiteId;

/// Portfolio view across every persisted audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditDashboard {
    pub total_audits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_overall_index: Option<f64>,
    pub by_classification: BTreeMap<String, usize>,
    pub by_legal_risk: BTreeMap<String, usize>,
    pub latest_by_site: Vec<AuditSummary>,
}

impl AuditDashboard {
    pub fn from_records(records: &[FinalizedAudit]) -> Self {
        let mut by_classification = BTreeMap::new();
        let mut by_legal_risk = BTreeMap::new();
        let mut latest: BTreeMap<&SiteId, &FinalizedAudit> = BTreeMap::new();

        for record in records {
            *by_classification
                .entry(record.analysis.classification.clone())
                .or_insert(0) += 1;
            *by_legal_risk
                .entry(record.analysis.legal_risk.clone())
                .or_insert(0) += 1;

            latest
                .entry(&record.site_id)
                .and_modify(|current| {
                    if record.created_at > current.created_at {
                        *current = record;
                    }
                })
                .or_insert(record);
        }

        let mean_overall_index = (!records.is_empty()).then(|| {
            let sum: f64 = records.iter().map(FinalizedAudit::overall_index).sum();
            round_one_decimal(sum / records.len() as f64)
        });

        let mut latest_by_site: Vec<AuditSummary> =
            latest.into_values().map(FinalizedAudit::summary).collect();
        latest_by_site.sort_by(|a, b| a.site_name.cmp(&b.site_name));

        Self {
            total_audits: records.len(),
            mean_overall_index,
            by_classification,
            by_legal_risk,
            latest_by_site,
        }
    }
}

/// Newest-first history, optionally restricted to one site.
pub fn audit_history(records: &[FinalizedAudit], site_id: Option<&SiteId>) -> Vec<AuditSummary> {
    let mut rows: Vec<AuditSummary> = records
        .iter()
        .filter(|record| site_id.map_or(true, |id| &record.site_id == id))
        .map(FinalizedAudit::summary)
        .collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
