use crate::infra::{InMemoryAuditRepository, InMemorySiteRepository, OfflineAnalysisGateway};
use clap::Args;
use obra_audit::error::AppError;
use obra_audit::workflows::audit::{
    capture_evidence, AdvanceOutcome, AnalysisPayload, AnswerValue, AuditCatalog,
    AuditWizardService, BlockKey, BreakdownValue, EvidenceImage, FinalizedAudit,
    IntervieweeField, SiteSelection, WizardError, WizardSession,
};
use obra_audit::workflows::registry::SiteRepository;
use std::path::PathBuf;
use std::sync::Arc;

/// 1x1 transparent PNG used when no photos are supplied.
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Deviations the scripted audit records, with the auditor's justification.
const SCRIPTED_DEVIATIONS: &[(&str, AnswerValue, &str)] = &[
    (
        "doc_pgr",
        AnswerValue::Partial,
        "PGR not revised after the facade phase started",
    ),
    (
        "height_anchorage",
        AnswerValue::No,
        "No lifeline on the east facade, tower B",
    ),
    (
        "welfare_dining",
        AnswerValue::Partial,
        "Dining area lacks a hand-washing station",
    ),
];

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Workers found on site; the interview quota is 10% of this, rounded up.
    #[arg(long, default_value_t = 30)]
    pub(crate) headcount: u32,
    /// Image files to attach as evidence; reused in turn across photo-gated questions.
    #[arg(long = "photo")]
    pub(crate) photos: Vec<PathBuf>,
}

pub(crate) fn print_catalog() {
    let catalog = AuditCatalog::standard();
    println!("Inspection catalog ({} blocks)", catalog.block_count());
    for (index, block) in catalog.blocks_ordered().iter().enumerate() {
        println!("\n{}. {}", index + 1, block.label());
        match *block {
            BlockKey::Headcount => {
                println!("  - Workers on site, workers in the employer system, subcontracting status")
            }
            BlockKey::Interviews => {
                for question in catalog.interview_questions() {
                    println!("  - [{}] {}", question.id, question.text);
                }
            }
            _ => {
                for question in catalog.questions_for_block(*block) {
                    let photos = question
                        .required_photos()
                        .map(|count| format!(" | {count} photo(s)"))
                        .unwrap_or_default();
                    println!(
                        "  - [{}] {} (weight {}{photos})",
                        question.id, question.text, question.weight
                    );
                }
            }
        }
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { headcount, photos } = args;

    let sites = InMemorySiteRepository::with_demo_site();
    let site = sites
        .list()
        .ok()
        .and_then(|sites| sites.into_iter().next())
        .ok_or(WizardError::SiteNotSelected)?;

    let service = AuditWizardService::new(
        Arc::new(OfflineAnalysisGateway),
        Arc::new(InMemoryAuditRepository::default()),
    );
    let mut session = service.open_session();
    session.select_site(SiteSelection {
        site_id: site.id.clone(),
        site_name: site.name.clone(),
    })?;
    session.begin()?;

    println!("Site audit demo: {} ({})", site.name, site.contractor);

    session.set_field_headcount(&headcount.to_string())?;
    session.set_system_headcount(&headcount.saturating_sub(2).to_string())?;
    session.set_subcontracting_regular(Some(true))?;

    let mut photo_cursor = 0usize;
    loop {
        let Some(block) = session.current_block() else {
            break;
        };
        if block == BlockKey::Interviews {
            conduct_interviews(&mut session)?;
            print_payload(&session);
        } else if block != BlockKey::Headcount {
            fill_block(&mut session, block, &photos, &mut photo_cursor).await?;
        }

        match service.advance(&mut session).await? {
            AdvanceOutcome::Moved { from, to } => {
                println!("- {} complete, moving to {}", from.label(), to.label());
            }
            AdvanceOutcome::Blocked { block, gaps } => {
                println!("\n{} cannot be completed:", block.label());
                for gap in gaps {
                    println!("  - {}", gap.describe());
                }
                return Ok(());
            }
            AdvanceOutcome::Completed(record) => {
                render_report(&record);
                return Ok(());
            }
            AdvanceOutcome::SubmissionFailed { notice } => {
                println!("\nSubmission failed: {notice}");
                return Ok(());
            }
        }

        if session.current_block() == Some(BlockKey::Interviews) {
            print_sampling(&session);
        }
    }

    Ok(())
}

async fn fill_block(
    session: &mut WizardSession,
    block: BlockKey,
    photos: &[PathBuf],
    photo_cursor: &mut usize,
) -> Result<(), AppError> {
    let questions: Vec<(&'static str, usize)> = session
        .catalog()
        .questions_for_block(block)
        .into_iter()
        .map(|question| (question.id, question.required_photos().unwrap_or(0)))
        .collect();

    for (question_id, required) in questions {
        match SCRIPTED_DEVIATIONS
            .iter()
            .find(|(id, _, _)| *id == question_id)
        {
            Some((_, value, justification)) => {
                session.set_answer(question_id, *value)?;
                session.set_justification(question_id, *justification)?;
            }
            None => session.set_answer(question_id, AnswerValue::Yes)?,
        }

        for _ in 0..required {
            if photos.is_empty() {
                let image = EvidenceImage::from_bytes("image/png", PLACEHOLDER_PNG)
                    .map_err(WizardError::from)?;
                session.add_evidence(question_id, image)?;
            } else {
                let path = &photos[*photo_cursor % photos.len()];
                *photo_cursor += 1;
                let captured = capture_evidence(question_id, path)
                    .await
                    .map_err(WizardError::from)?;
                session.apply_evidence(captured)?;
            }
        }
    }
    Ok(())
}

fn conduct_interviews(session: &mut WizardSession) -> Result<(), AppError> {
    let roles = ["Mason", "Carpenter", "Rebar fixer", "Electrician", "Helper"];
    let target = session.sampling().target_count as usize;

    for index in session.interviews().len()..target {
        let id = session.add_interviewee()?;
        session.set_interviewee_field(&id, IntervieweeField::Role, roles[index % roles.len()])?;
        let company = if index % 2 == 0 {
            "Construtora Horizonte"
        } else {
            "Alfa Formas e Escoramentos"
        };
        session.set_interviewee_field(&id, IntervieweeField::Company, company)?;
        if index == 1 {
            session.set_interviewee_answer(&id, "iv_hours_recorded", AnswerValue::No)?;
        }
    }
    Ok(())
}

fn print_sampling(session: &WizardSession) {
    let sampling = session.sampling();
    println!(
        "\nInterview sampling: {} workers declared, {} interview(s) required",
        sampling.declared_headcount, sampling.target_count
    );
}

fn print_payload(session: &WizardSession) {
    let payload = AnalysisPayload::from_session(session);
    println!("\nAnalysis payload");
    println!(
        "{}",
        serde_json::to_string_pretty(&payload)
            .unwrap_or_else(|err| format!("<unable to render payload: {err}>"))
    );
}

fn render_report(record: &FinalizedAudit) {
    let analysis = &record.analysis;
    let sampling = &record.sampling;

    println!("\nSampling summary");
    println!(
        "- {} on site | {} in system | subcontracting {}",
        record.declared_field_headcount,
        record.declared_system_headcount,
        match record.subcontracting_declared_regular {
            Some(true) => "regular",
            Some(false) => "irregular",
            None => "undeclared",
        }
    );
    println!(
        "- {} of {} required interviews | {} coverage | quota {}",
        sampling.interview_count,
        sampling.target_count,
        sampling.coverage_label(),
        if sampling.quota_met { "met" } else { "not met" }
    );

    println!("\nAudit report: {} ({})", record.site_name, record.audit_type.label());
    println!("Audit id: {}", record.id);
    println!(
        "Risk index {:.1}/100 | {} | legal risk {}",
        analysis.overall_index, analysis.classification, analysis.legal_risk
    );
    println!("Estimated financial exposure: R$ {:.2}", analysis.financial_exposure);

    if !analysis.non_conformities.is_empty() {
        println!("\nNon-conformities");
        for item in &analysis.non_conformities {
            println!("  - {item}");
        }
    }
    println!("\nLegal impact: {}", analysis.legal_impact);
    if !analysis.recommendations.is_empty() {
        println!("\nRecommendations");
        for item in &analysis.recommendations {
            println!("  - {item}");
        }
    }
    if let Some(breakdown) = &analysis.calculation_breakdown {
        println!("\nCalculation breakdown");
        for entry in breakdown {
            let value = match &entry.value {
                BreakdownValue::Amount(amount) => format!("R$ {amount:.2}"),
                BreakdownValue::Text(text) => text.clone(),
            };
            println!(
                "  - {}: {value} [{}] {}",
                entry.item, entry.legal_basis, entry.rationale
            );
        }
    }
    println!("\n{}", analysis.executive_conclusion);
}
