// Wizard page
//
// Composes one wizard session: the draft store, the pending file buffer, the
// mounted groups of every form step and the controller. All capabilities are
// handed down explicitly.

use std::sync::Arc;
use tokio::sync::watch;

use super::catalog::Blueprint;
use super::commit::{CommitReceipt, CommitRoutine};
use super::controller::{StepController, Transition};
use super::draft::DraftStore;
use super::files::{PendingFile, PendingFiles};
use super::group::{FieldGroup, GroupError, GroupSpec, UploadGroup};
use super::stepper::{stepper_view, StepIndicator};
use crate::models::record::FieldValue;
use crate::models::request::DocumentType;

/// Mounted groups of one step, in declaration order.
#[derive(Default)]
pub struct StepGroups {
    pub fields: Vec<FieldGroup>,
    pub uploads: Vec<UploadGroup>,
}

impl StepGroups {
    fn set_highlight(&mut self, active: bool) {
        for g in &mut self.fields {
            g.set_highlight(active);
        }
        for g in &mut self.uploads {
            g.set_highlight(active);
        }
    }
}

pub struct WizardPage {
    document_type: DocumentType,
    draft: DraftStore,
    files: PendingFiles,
    groups: Vec<StepGroups>,
    controller: StepController,
    committer: Arc<dyn CommitRoutine>,
    receipt: Option<CommitReceipt>,
}

impl WizardPage {
    pub fn new(blueprint: Blueprint, copies: u32, committer: Arc<dyn CommitRoutine>) -> Self {
        let draft = DraftStore::seeded(blueprint.seed(copies));
        let files = PendingFiles::new();
        let document_type = blueprint.document_type;

        let groups = blueprint
            .steps
            .iter()
            .map(|step| mount_step(step.groups(), &draft, &files))
            .collect();

        log::info!(
            "[PHASE: wizard] [STEP: mount] {} wizard with {} steps, {} cop(ies)",
            document_type,
            blueprint.steps.len(),
            copies.max(1)
        );

        Self {
            document_type,
            draft,
            files,
            groups,
            controller: StepController::new(blueprint.steps),
            committer,
            receipt: None,
        }
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    pub fn draft(&self) -> &DraftStore {
        &self.draft
    }

    pub fn files(&self) -> &PendingFiles {
        &self.files
    }

    pub fn controller(&self) -> &StepController {
        &self.controller
    }

    pub fn current_step(&self) -> usize {
        self.controller.current_step()
    }

    pub fn error(&self) -> Option<&str> {
        self.controller.error()
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    pub fn busy_signal(&self) -> watch::Receiver<bool> {
        self.controller.busy_signal()
    }

    pub fn receipt(&self) -> Option<&CommitReceipt> {
        self.receipt.as_ref()
    }

    pub fn stepper(&self) -> Vec<StepIndicator> {
        let titles: Vec<&str> = self
            .controller
            .steps()
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        stepper_view(&titles, self.controller.current_step())
    }

    /// Groups of the step the user is on.
    pub fn active_groups(&self) -> Option<&StepGroups> {
        self.groups.get(self.controller.current_step().saturating_sub(1))
    }

    fn active_groups_mut(&mut self) -> Option<&mut StepGroups> {
        let index = self.controller.current_step().saturating_sub(1);
        self.groups.get_mut(index)
    }

    pub fn field_group_mut(&mut self, key: &str) -> Option<&mut FieldGroup> {
        self.active_groups_mut()?
            .fields
            .iter_mut()
            .find(|g| g.has_field(key))
    }

    pub fn upload_group_mut(&mut self, slot: &str) -> Option<&mut UploadGroup> {
        self.active_groups_mut()?
            .uploads
            .iter_mut()
            .find(|g| g.has_slot(slot))
    }

    /// Edit a field of the active step.
    pub fn set_field(&mut self, key: &str, value: impl Into<FieldValue>) -> Result<(), GroupError> {
        self.field_group_mut(key)
            .ok_or_else(|| GroupError::UnknownField(key.to_string()))?
            .set_field(key, value)?;
        self.refresh();
        Ok(())
    }

    pub fn select_file(&mut self, slot: &str, file: PendingFile) -> Result<(), GroupError> {
        self.upload_group_mut(slot)
            .ok_or_else(|| GroupError::UnknownSlot(slot.to_string()))?
            .select_file(slot, file)?;
        self.refresh();
        Ok(())
    }

    pub fn cancel_file(&mut self, slot: &str, file_name: &str) -> Result<(), GroupError> {
        self.upload_group_mut(slot)
            .ok_or_else(|| GroupError::UnknownSlot(slot.to_string()))?
            .cancel_file(slot, file_name)?;
        self.refresh();
        Ok(())
    }

    fn refresh(&mut self) {
        let draft = self.draft.get();
        let files = self.files.snapshot();
        self.controller.refresh(&draft, &files);
    }

    fn propagate_highlight(&mut self) {
        let active = self.controller.highlight();
        if let Some(groups) = self.active_groups_mut() {
            groups.set_highlight(active);
        }
    }

    pub async fn next(&mut self) -> Transition {
        let draft = self.draft.get();
        let files = self.files.snapshot();
        let committer = self.committer.clone();

        let transition = self.controller.next(&draft, &files, committer.as_ref()).await;
        match &transition {
            Transition::Submitted { receipt, .. } => {
                // The buffer is consumed by a successful commit only.
                self.files.take_all();
                self.receipt = Some(receipt.clone());
            }
            Transition::Blocked { .. } | Transition::Advanced { .. } => {
                self.propagate_highlight();
            }
            _ => {}
        }
        transition
    }

    pub fn back(&mut self) -> Transition {
        let transition = self.controller.back();
        if let Transition::Retreated { step } = &transition {
            // Markers of the step that was left; its index is the new step number.
            if let Some(left) = self.groups.get_mut(*step) {
                left.set_highlight(false);
            }
            self.propagate_highlight();
            self.refresh();
        }
        transition
    }
}

fn mount_step(specs: &[GroupSpec], draft: &DraftStore, files: &PendingFiles) -> StepGroups {
    let mut mounted = StepGroups::default();
    for spec in specs {
        match spec {
            GroupSpec::Fields { title, fields } => {
                let mut group = FieldGroup::mount(title, fields.clone(), draft.clone());
                group.on_completion(completion_logger(title));
                mounted.fields.push(group);
            }
            GroupSpec::Uploads { title, slots } => {
                let mut group = UploadGroup::mount(title, slots.clone(), files.clone());
                group.on_completion(completion_logger(title));
                mounted.uploads.push(group);
            }
        }
    }
    mounted
}

fn completion_logger(title: &str) -> super::group::CompletionCallback {
    let title = title.to_string();
    Box::new(move |complete| {
        log::debug!(
            "[PHASE: wizard] [STEP: completion] Group '{}' complete={}",
            title,
            complete
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryDocumentStore;
    use crate::backend::session_auth::SessionAuth;
    use crate::backend::{AuthUser, DocumentStore, Services};
    use crate::config::Collections;
    use crate::models::request::{RequestStatus, SubmittedRequest};
    use crate::wizard::catalog::blueprint;
    use crate::wizard::commit::BackendCommit;
    use crate::wizard::controller::COMMIT_FAILED_MESSAGE;

    async fn residency_page() -> (WizardPage, Arc<MemoryDocumentStore>, Arc<SessionAuth>) {
        let docs = Arc::new(MemoryDocumentStore::new());
        let auth = Arc::new(SessionAuth::new());
        let services = Services::new(
            docs.clone(),
            Arc::new(crate::backend::memory::MemoryBlobStore::new()),
            auth.clone(),
        );
        let committer = Arc::new(BackendCommit::new(
            services,
            Collections::default(),
            DocumentType::Residency,
        ));
        (
            WizardPage::new(blueprint(DocumentType::Residency), 1, committer),
            docs,
            auth,
        )
    }

    fn fill_residency_through_upload(page: &mut WizardPage) {
        for (k, v) in [
            ("fullname", "Ana Santos"),
            ("sex", "Female"),
            ("residency-purpose", "School"),
        ] {
            page.set_field(k, v).unwrap();
        }
    }

    #[tokio::test]
    async fn blocked_next_highlights_and_edits_clear_markers() {
        let (mut page, _, _) = residency_page().await;

        let t = page.next().await;
        assert!(matches!(t, Transition::Blocked { .. }));
        assert_eq!(page.error(), Some("Personal information fields are incomplete."));
        let group = page.field_group_mut("fullname").unwrap();
        assert!(group.is_highlighted("fullname"));
        assert!(group.is_highlighted("sex"));

        page.set_field("fullname", "Ana").unwrap();
        let group = page.field_group_mut("fullname").unwrap();
        assert!(!group.is_highlighted("fullname"));
        assert!(group.is_highlighted("sex"));
        assert!(page.error().is_some(), "Step still incomplete");

        page.set_field("sex", "Female").unwrap();
        page.set_field("residency-purpose", "Employment").unwrap();
        assert!(page.error().is_none(), "Error clears once the step is complete");
    }

    #[tokio::test]
    async fn back_from_a_blocked_step_leaves_no_stale_markers() {
        let (mut page, _, _) = residency_page().await;
        fill_residency_through_upload(&mut page);
        assert_eq!(page.next().await, Transition::Advanced { step: 2 });

        assert!(matches!(page.next().await, Transition::Blocked { .. }));
        assert_eq!(page.error(), Some("Address information fields are incomplete."));
        assert!(page.field_group_mut("street").unwrap().is_highlighted("street"));

        assert_eq!(page.back(), Transition::Retreated { step: 1 });
        assert!(page.error().is_none());
        assert!(!page.controller().highlight());
        assert!(page.field_group_mut("fullname").unwrap().highlighted().is_empty());

        // Returning to Address starts a fresh pass without markers.
        assert_eq!(page.next().await, Transition::Advanced { step: 2 });
        assert!(page.field_group_mut("street").unwrap().highlighted().is_empty());
    }

    #[tokio::test]
    async fn full_residency_submission_writes_one_pending_request() {
        let (mut page, docs, auth) = residency_page().await;
        auth.sign_in(AuthUser {
            uid: "resident-42".to_string(),
            email: "r42@example.com".to_string(),
        })
        .await;

        fill_residency_through_upload(&mut page);
        assert_eq!(page.next().await, Transition::Advanced { step: 2 });

        for (k, v) in [
            ("house-bldg-number", "12"),
            ("building-name", "Unit A"),
            ("lot-number", "7"),
            ("subdivision", "Sunrise"),
            ("street", "Rizal St."),
            ("region", "VII"),
            ("province", "Cebu"),
            ("city", "Cebu City"),
            ("barangay", "Lahug"),
        ] {
            page.set_field(k, v).unwrap();
        }
        assert_eq!(page.next().await, Transition::Advanced { step: 3 });

        page.select_file("government-id", PendingFile::new("id.png", vec![1, 2]))
            .unwrap();
        assert_eq!(page.next().await, Transition::Advanced { step: 4 });

        page.set_field("reference-number", "GC-123").unwrap();
        page.set_field("date-of-payment", "2024-06-01").unwrap();
        page.select_file("proof-of-payment", PendingFile::new("gcash.png", vec![3]))
            .unwrap();

        let t = page.next().await;
        assert!(matches!(t, Transition::Submitted { step: 5, .. }), "got {:?}", t);
        assert!(page.files().snapshot().is_empty(), "Files are consumed by the commit");

        let all = docs.get_all("userData").await.unwrap();
        assert_eq!(all.len(), 1);
        let receipt = page.receipt().unwrap();
        let stored: SubmittedRequest =
            serde_json::from_value(all[0].data[&receipt.request_id].clone()).unwrap();
        assert_eq!(stored.status, RequestStatus::Pending);
        assert_eq!(stored.form.text("barangay"), "Lahug");
        assert!(stored.form.text("proof-of-payment").contains("gcash.png"));
    }

    #[tokio::test]
    async fn commit_failure_keeps_files_for_retry() {
        // Nobody signed in, so the commit routine refuses.
        let (mut page, docs, auth) = residency_page().await;
        fill_residency_through_upload(&mut page);
        page.next().await;
        for k in [
            "house-bldg-number",
            "building-name",
            "lot-number",
            "subdivision",
            "street",
            "region",
            "province",
            "city",
            "barangay",
        ] {
            page.set_field(k, "x").unwrap();
        }
        page.next().await;
        page.select_file("government-id", PendingFile::new("id.png", vec![1]))
            .unwrap();
        page.next().await;
        page.set_field("reference-number", "R").unwrap();
        page.set_field("date-of-payment", "2024-06-01").unwrap();
        page.select_file("proof-of-payment", PendingFile::new("p.png", vec![1]))
            .unwrap();

        assert_eq!(page.next().await, Transition::CommitFailed);
        assert_eq!(page.current_step(), 4);
        assert_eq!(page.error(), Some(COMMIT_FAILED_MESSAGE));
        assert!(!page.is_busy());
        assert!(page.files().is_filled("government-id"));
        assert_eq!(docs.write_count(), 0);

        auth.sign_in(AuthUser {
            uid: "late-user".to_string(),
            email: "late@example.com".to_string(),
        })
        .await;
        assert!(matches!(page.next().await, Transition::Submitted { .. }));
    }

    #[tokio::test]
    async fn back_keeps_entered_values() {
        let (mut page, _, _) = residency_page().await;
        fill_residency_through_upload(&mut page);
        page.next().await;
        assert_eq!(page.back(), Transition::Retreated { step: 1 });
        assert_eq!(
            page.field_group_mut("fullname").unwrap().value("fullname"),
            "Ana Santos"
        );
        assert!(page.stepper()[0].highlighted);
        assert!(page.set_field("street", "x").is_err(), "Street is not on step 1");
    }
}
