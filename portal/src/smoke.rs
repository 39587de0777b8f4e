// Deterministic smoke runs: sample input for walking a wizard, and an
// end-to-end submission -> review -> claim -> history pass.

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::sync::Arc;

use crate::account::AccountService;
use crate::backend::session_auth::SessionAuth;
use crate::backend::{AuthUser, Services};
use crate::config::Collections;
use crate::models::request::{DocumentType, RequestStatus};
use crate::wizard::catalog::blueprint;
use crate::wizard::commit::BackendCommit;
use crate::wizard::controller::Transition;
use crate::wizard::files::PendingFile;
use crate::wizard::group::FieldKind;
use crate::wizard::page::WizardPage;
use crate::workflow::admin::AdminDashboard;
use crate::workflow::history::HistoryView;
use crate::workflow::query::RequestFilter;
use crate::workflow::repository::RequestRepository;
use crate::workflow::tracking::TrackingView;

pub(crate) fn sample_value(kind: FieldKind) -> String {
    match kind {
        FieldKind::Text => "Sample".to_string(),
        FieldKind::LongText => "Sample text".to_string(),
        FieldKind::Date => "2024-01-15".to_string(),
        FieldKind::DateTime => "2024-01-15 09:00".to_string(),
        FieldKind::Email => "resident@example.com".to_string(),
        FieldKind::Phone => "09171234567".to_string(),
        FieldKind::Number => "25".to_string(),
        FieldKind::Choice(options) => options.first().map(|o| o.to_string()).unwrap_or_default(),
    }
}

/// Fill every input of the active step with sample data.
pub(crate) fn fill_active_step(page: &mut WizardPage) -> Result<()> {
    let Some(groups) = page.active_groups() else {
        return Ok(());
    };
    let fields: Vec<(String, FieldKind)> = groups
        .fields
        .iter()
        .flat_map(|g| g.fields().iter().map(|f| (f.key.clone(), f.kind)))
        .collect();
    let slots: Vec<String> = groups
        .uploads
        .iter()
        .flat_map(|g| g.slots().iter().map(|s| s.key.clone()))
        .collect();

    for (key, kind) in fields {
        page.set_field(&key, sample_value(kind))?;
    }
    for slot in slots {
        page.select_file(&slot, PendingFile::new("sample.png", b"smoke".to_vec()))?;
    }
    Ok(())
}

/// Submit a request, move it through review, claim it and find it in history.
/// Returns the transcript.
pub async fn submission_smoke(
    services: Services,
    auth: Arc<SessionAuth>,
    collections: Collections,
    document_type: DocumentType,
) -> Result<Vec<String>> {
    let mut transcript = Vec::new();
    let user = AuthUser {
        uid: "smoke-resident".to_string(),
        email: "resident@example.com".to_string(),
    };
    auth.sign_in(user.clone()).await;

    let profile = json!({
        "uid": user.uid,
        "fullName": "Smoke Resident",
        "email": user.email,
        "phoneNumber": "09171234567",
        "address": "Barangay Hall"
    })
    .as_object()
    .cloned()
    .unwrap_or_default();
    services
        .documents
        .add_document(&collections.profiles, profile)
        .await
        .context("Failed to seed the smoke profile")?;
    let account = AccountService::new(services.clone(), collections.clone());
    let stored_profile = account.profile().await?;
    transcript.push(format!(
        "profile: {}",
        stored_profile.map(|p| p.full_name).unwrap_or_default()
    ));

    // Wizard
    let committer = Arc::new(BackendCommit::new(
        services.clone(),
        collections.clone(),
        document_type,
    ));
    let mut page = WizardPage::new(blueprint(document_type), 2, committer);
    let receipt = loop {
        if page.controller().on_terminal() {
            bail!("Wizard reached the terminal step without a receipt");
        }
        fill_active_step(&mut page)?;
        match page.next().await {
            Transition::Advanced { step } => {
                transcript.push(format!("wizard: advanced to step {}", step))
            }
            Transition::Submitted { step, receipt } => {
                transcript.push(format!(
                    "wizard: submitted at step {} ({} uploads)",
                    step,
                    receipt.uploads.len()
                ));
                break receipt;
            }
            other => bail!("Unexpected wizard transition: {:?}", other),
        }
    };

    // Review
    let repo = RequestRepository::new(services.documents.clone(), collections.requests.clone());
    let admin = AdminDashboard::new(repo.clone());
    let active = admin.active_requests(&RequestFilter::default(), None).await?;
    transcript.push(format!("admin: {} active request(s)", active.len()));
    if !active.iter().any(|r| r.request_id == receipt.request_id) {
        bail!("Submitted request is missing from the admin list");
    }

    let tracking = TrackingView::new(repo.clone(), services.auth.clone());
    admin
        .change_status(
            &receipt.container_id,
            &receipt.request_id,
            RequestStatus::Processing,
            None,
        )
        .await?;
    tracking
        .follow_up(&receipt.container_id, &receipt.request_id)
        .await?;
    admin
        .change_status(
            &receipt.container_id,
            &receipt.request_id,
            RequestStatus::ReadyForPickup,
            None,
        )
        .await?;
    transcript.push("admin: ready for pick-up".to_string());

    // Claim and history
    let claimed = tracking
        .mark_claimed(&receipt.container_id, &receipt.request_id)
        .await?;
    transcript.push(format!("tracking: {}", claimed.status));

    let history = HistoryView::new(repo, services.auth.clone());
    let past = history.requests().await?;
    transcript.push(format!("history: {} request(s)", past.len()));
    if past.len() != 1 || tracking.active_requests().await?.len() != 0 {
        bail!("Claimed request did not move into history");
    }

    log::info!(
        "[PHASE: smoke] [STEP: submission] Completed with {} transcript lines",
        transcript.len()
    );
    Ok(transcript)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_document_survives_the_full_pass() {
        for doc in DocumentType::ALL {
            let (services, auth) = Services::in_memory();
            let transcript = submission_smoke(services, auth, Collections::default(), doc)
                .await
                .unwrap_or_else(|e| panic!("{} failed: {:#}", doc, e));
            assert!(transcript.iter().any(|l| l.starts_with("wizard: submitted")));
            assert_eq!(transcript.last().map(String::as_str), Some("history: 1 request(s)"));
        }
    }

    #[test]
    fn sample_values_fill_choices_with_first_option() {
        assert_eq!(sample_value(FieldKind::Choice(&["DTI", "SEC"])), "DTI");
        assert!(!sample_value(FieldKind::Email).is_empty());
    }
}
