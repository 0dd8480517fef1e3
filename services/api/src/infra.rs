use async_trait::async_trait;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use obra_audit::config::AnalysisConfig;
use obra_audit::workflows::audit::{
    AnalysisError, AnalysisGateway, AnalysisPayload, AnalysisResult, AnswerValue, AuditRepository,
    BreakdownValue, CalculationItem, FinalizedAudit, HttpAnalysisClient,
};
use obra_audit::workflows::registry::{
    NewSite, RepositoryError, Site, SiteId, SiteRepository, User, UserId, UserRepository,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAuditRepository {
    records: Arc<Mutex<Vec<FinalizedAudit>>>,
}

impl AuditRepository for InMemoryAuditRepository {
    fn list(&self) -> Result<Vec<FinalizedAudit>, RepositoryError> {
        let guard = self.records.lock().expect("audit mutex poisoned");
        Ok(guard.clone())
    }

    fn create(&self, record: FinalizedAudit) -> Result<FinalizedAudit, RepositoryError> {
        let mut guard = self.records.lock().expect("audit mutex poisoned");
        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySiteRepository {
    records: Arc<Mutex<Vec<Site>>>,
}

impl InMemorySiteRepository {
    /// Repository holding one site so a fresh server can run an audit immediately.
    pub(crate) fn with_demo_site() -> Self {
        let repository = Self::default();
        let site = NewSite {
            name: "Residencial Parque das Aguas".to_string(),
            address: "Av. Brasil, 2450".to_string(),
            contractor: "Construtora Horizonte".to_string(),
        }
        .into_site(Utc::now());
        repository
            .records
            .lock()
            .expect("site mutex poisoned")
            .push(site);
        repository
    }
}

impl SiteRepository for InMemorySiteRepository {
    fn list(&self) -> Result<Vec<Site>, RepositoryError> {
        let guard = self.records.lock().expect("site mutex poisoned");
        Ok(guard.clone())
    }

    fn create(&self, site: Site) -> Result<Site, RepositoryError> {
        let mut guard = self.records.lock().expect("site mutex poisoned");
        if guard.iter().any(|existing| existing.id == site.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(site.clone());
        Ok(site)
    }

    fn fetch(&self, id: &SiteId) -> Result<Option<Site>, RepositoryError> {
        let guard = self.records.lock().expect("site mutex poisoned");
        Ok(guard.iter().find(|site| &site.id == id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryUserRepository {
    records: Arc<Mutex<HashMap<UserId, User>>>,
}

impl UserRepository for InMemoryUserRepository {
    fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let guard = self.records.lock().expect("user mutex poisoned");
        let mut users: Vec<User> = guard.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut guard = self.records.lock().expect("user mutex poisoned");
        if guard.values().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let guard = self.records.lock().expect("user mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, user: User) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("user mutex poisoned");
        if guard.contains_key(&user.id) {
            guard.insert(user.id.clone(), user);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }
}

const FINE_PER_DEVIATION: f64 = 4_500.0;
const FINE_PER_UNREGISTERED_WORKER: f64 = 3_000.0;

/// Rule-of-thumb scorer used when no analysis endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct OfflineAnalysisGateway;

impl OfflineAnalysisGateway {
    pub(crate) fn score(payload: &AnalysisPayload) -> AnalysisResult {
        let answered = payload.answers.len().max(1) as f64;
        let deviation_points: f64 = payload
            .answers
            .iter()
            .map(|line| match line.answer {
                AnswerValue::No => 2.0,
                AnswerValue::Partial => 1.0,
                AnswerValue::Yes | AnswerValue::NotApplicable => 0.0,
            })
            .sum();
        let interview_deviations: usize = payload
            .interviews
            .iter()
            .map(|interview| interview.deviation_count)
            .sum();
        let sampling = &payload.sampling;
        let unregistered = sampling
            .total_headcount
            .saturating_sub(sampling.system_headcount);

        let mut index = deviation_points / (answered * 2.0) * 60.0;
        if sampling.irregular_subcontracting {
            index += 15.0;
        }
        if !sampling.quota_met {
            index += 10.0;
        }
        index += (interview_deviations as f64 * 2.5).min(15.0);
        let index = (index.clamp(0.0, 100.0) * 10.0).round() / 10.0;

        let (classification, legal_risk) = match index {
            i if i < 30.0 => ("Low risk", "Low"),
            i if i < 60.0 => ("Moderate risk", "Medium"),
            _ => ("High risk", "High"),
        };

        let deviations: Vec<_> = payload
            .answers
            .iter()
            .filter(|line| !line.answer.is_conforming())
            .collect();
        let non_conformities: Vec<String> = deviations
            .iter()
            .map(|line| {
                if line.note.trim().is_empty() {
                    line.question.clone()
                } else {
                    format!("{} ({})", line.question, line.note.trim())
                }
            })
            .collect();
        let recommendations: Vec<String> = deviations
            .iter()
            .map(|line| format!("Correct and re-inspect: {}", line.question))
            .collect();

        let deviation_fines = deviations.len() as f64 * FINE_PER_DEVIATION;
        let registration_fines = f64::from(unregistered) * FINE_PER_UNREGISTERED_WORKER;
        let mut breakdown = vec![CalculationItem {
            item: "Non-conforming checklist items".to_string(),
            value: BreakdownValue::Amount(deviation_fines),
            legal_basis: "NR-28".to_string(),
            rationale: format!("{} item(s) answered partial or no", deviations.len()),
        }];
        if unregistered > 0 {
            breakdown.push(CalculationItem {
                item: "Workers missing from the employer system".to_string(),
                value: BreakdownValue::Amount(registration_fines),
                legal_basis: "CLT art. 47".to_string(),
                rationale: format!("{unregistered} worker(s) on site without registration"),
            });
        }
        if sampling.irregular_subcontracting {
            breakdown.push(CalculationItem {
                item: "Irregular subcontracting".to_string(),
                value: BreakdownValue::Text("joint liability exposure".to_string()),
                legal_basis: "Lei 6.019/74".to_string(),
                rationale: "Subcontracting declared irregular".to_string(),
            });
        }

        let legal_impact = if sampling.irregular_subcontracting || unregistered > 0 {
            "Joint liability for labor claims of subcontracted or unregistered workers".to_string()
        } else if deviations.is_empty() {
            "No legal exposure identified".to_string()
        } else {
            "Administrative fines under the regulatory standards".to_string()
        };

        AnalysisResult {
            overall_index: index,
            classification: classification.to_string(),
            legal_risk: legal_risk.to_string(),
            financial_exposure: deviation_fines + registration_fines,
            non_conformities,
            legal_impact,
            recommendations,
            executive_conclusion: format!(
                "{} scored {index:.1} with {} interview(s) at {} coverage.",
                payload.site, sampling.interviewed_count, sampling.coverage
            ),
            calculation_breakdown: Some(breakdown),
        }
    }
}

#[async_trait]
impl AnalysisGateway for OfflineAnalysisGateway {
    async fn analyze(&self, payload: &AnalysisPayload) -> Result<AnalysisResult, AnalysisError> {
        Self::score(payload).validate()
    }
}

/// Gateway chosen at startup from the analysis configuration.
pub(crate) enum ConfiguredGateway {
    Remote(HttpAnalysisClient),
    Offline(OfflineAnalysisGateway),
}

impl ConfiguredGateway {
    pub(crate) fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        Ok(match HttpAnalysisClient::from_config(config)? {
            Some(client) => Self::Remote(client),
            None => Self::Offline(OfflineAnalysisGateway),
        })
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Remote(_) => "remote",
            Self::Offline(_) => "offline",
        }
    }
}

#[async_trait]
impl AnalysisGateway for ConfiguredGateway {
    async fn analyze(&self, payload: &AnalysisPayload) -> Result<AnalysisResult, AnalysisError> {
        match self {
            Self::Remote(client) => client.analyze(payload).await,
            Self::Offline(gateway) => gateway.analyze(payload).await,
        }
    }
}
