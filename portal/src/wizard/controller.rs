// Step controller
//
// One parametrized state machine for every wizard. It owns the 1-based current
// step, the inline error, the highlight trigger and the busy flag, and it gates
// Next on the current step's completion.

use tokio::sync::watch;

use super::commit::{CommitReceipt, CommitRoutine};
use super::files::FileMap;
use super::step::StepSpec;
use crate::models::record::DraftRecord;

/// Shown when the commit routine fails; the user stays on the step and may retry.
pub const COMMIT_FAILED_MESSAGE: &str = "Submission failed, please retry.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The current step is incomplete; the error and highlight are now set.
    Blocked { missing: Vec<String> },
    /// Moved to `step` without side effects.
    Advanced { step: usize },
    /// The commit succeeded and the wizard is now on the terminal step.
    Submitted { step: usize, receipt: CommitReceipt },
    /// The commit failed; the step did not change.
    CommitFailed,
    /// Moved back to `step`.
    Retreated { step: usize },
    /// Nothing to do: first step on Back, terminal step, or already busy.
    Ignored,
}

pub struct StepController {
    steps: Vec<StepSpec>,
    current: usize,
    error: Option<String>,
    highlight: bool,
    busy: watch::Sender<bool>,
}

impl StepController {
    pub fn new(steps: Vec<StepSpec>) -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            steps,
            current: 1,
            error: None,
            highlight: false,
            busy,
        }
    }

    pub fn current_step(&self) -> usize {
        self.current
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    pub fn current_spec(&self) -> Option<&StepSpec> {
        self.steps.get(self.current.saturating_sub(1))
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn highlight(&self) -> bool {
        self.highlight
    }

    pub fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    /// Observe the busy flag while a commit is in flight.
    pub fn busy_signal(&self) -> watch::Receiver<bool> {
        self.busy.subscribe()
    }

    pub fn on_terminal(&self) -> bool {
        self.current_spec().map(StepSpec::is_terminal).unwrap_or(true)
    }

    pub fn can_go_back(&self) -> bool {
        self.current > 1 && !self.on_terminal() && !self.is_busy()
    }

    /// The step after the current one is the terminal step, so Next commits.
    pub fn next_commits(&self) -> bool {
        self.steps
            .get(self.current)
            .map(StepSpec::is_terminal)
            .unwrap_or(false)
    }

    /// Completion of the current step, derived from the given snapshots.
    pub fn current_complete(&self, draft: &DraftRecord, files: &FileMap) -> bool {
        self.current_spec()
            .map(|s| s.is_complete(draft, files))
            .unwrap_or(false)
    }

    /// Clear a stale validation error once the current step becomes complete.
    pub fn refresh(&mut self, draft: &DraftRecord, files: &FileMap) {
        if self.error.is_some() && self.current_complete(draft, files) {
            self.error = None;
        }
    }

    pub fn back(&mut self) -> Transition {
        if !self.can_go_back() {
            return Transition::Ignored;
        }
        self.current -= 1;
        // The error and highlight belong to the step that was left.
        self.error = None;
        self.highlight = false;
        log::debug!(
            "[PHASE: wizard] [STEP: back] Moved back to step {}/{}",
            self.current,
            self.total_steps()
        );
        Transition::Retreated { step: self.current }
    }

    pub async fn next(
        &mut self,
        draft: &DraftRecord,
        files: &FileMap,
        commit: &dyn CommitRoutine,
    ) -> Transition {
        if self.on_terminal() || self.is_busy() {
            return Transition::Ignored;
        }
        let Some((title, message, missing)) = self.current_spec().map(|spec| {
            (
                spec.title.clone(),
                spec.incomplete_message().map(str::to_string),
                spec.missing(draft, files),
            )
        }) else {
            return Transition::Ignored;
        };

        if !missing.is_empty() {
            self.error = message;
            self.highlight = true;
            log::info!(
                "[PHASE: wizard] [STEP: validate] Step {} '{}' blocked, {} required input(s) empty",
                self.current,
                title,
                missing.len()
            );
            return Transition::Blocked { missing };
        }

        self.error = None;
        self.highlight = false;

        if !self.next_commits() {
            self.current += 1;
            log::debug!(
                "[PHASE: wizard] [STEP: advance] Advanced to step {}/{}",
                self.current,
                self.total_steps()
            );
            return Transition::Advanced { step: self.current };
        }

        self.busy.send_replace(true);
        let outcome = commit.commit(draft.clone(), files.clone()).await;
        self.busy.send_replace(false);

        match outcome {
            Ok(receipt) => {
                self.current += 1;
                log::info!(
                    "[PHASE: wizard] [STEP: commit] Submitted, wizard complete at step {}",
                    self.current
                );
                Transition::Submitted {
                    step: self.current,
                    receipt,
                }
            }
            Err(e) => {
                log::error!(
                    "[PHASE: wizard] [STEP: commit] Submission failed: {} ({})",
                    e,
                    e.internal_details()
                );
                self.error = Some(COMMIT_FAILED_MESSAGE.to_string());
                Transition::CommitFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::wizard::commit::CommitError;
    use crate::wizard::files::PendingFile;
    use crate::wizard::group::{FieldKind, FieldSpec, GroupSpec, SlotSpec};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    // -------------------------------------------------------------------------
    // Stub commit routines
    // -------------------------------------------------------------------------

    struct RecordingCommit {
        call_count: AtomicU32,
        busy_seen: AtomicBool,
        busy: Option<watch::Receiver<bool>>,
        fail: bool,
    }

    impl RecordingCommit {
        fn ok() -> Self {
            Self {
                call_count: AtomicU32::new(0),
                busy_seen: AtomicBool::new(false),
                busy: None,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl CommitRoutine for RecordingCommit {
        async fn commit(
            &self,
            _draft: DraftRecord,
            _files: FileMap,
        ) -> Result<CommitReceipt, CommitError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Some(rx) = &self.busy {
                self.busy_seen.store(*rx.borrow(), Ordering::SeqCst);
            }
            if self.fail {
                return Err(CommitError::Write(BackendError::new(
                    "Storage is temporarily unavailable.",
                    "simulated outage",
                )));
            }
            Ok(CommitReceipt {
                container_id: "c1".to_string(),
                request_id: "r1".to_string(),
                folder_id: "f1".to_string(),
                uploads: BTreeMap::new(),
            })
        }
    }

    // -------------------------------------------------------------------------
    // Fixture: A (field) -> B (upload) -> Terminal
    // -------------------------------------------------------------------------

    fn three_steps() -> Vec<StepSpec> {
        vec![
            StepSpec::form(
                "A",
                "A is incomplete.",
                vec![GroupSpec::fields(
                    "A",
                    vec![FieldSpec::required("a", "A", FieldKind::Text)],
                )],
            ),
            StepSpec::form(
                "B",
                "B is incomplete.",
                vec![GroupSpec::uploads("B", vec![SlotSpec::required("b", "B")])],
            ),
            StepSpec::terminal("Complete"),
        ]
    }

    fn draft_with_a() -> DraftRecord {
        let mut d = DraftRecord::with_keys(["a", "b"]);
        d.insert("a", "x");
        d
    }

    fn files_with_b() -> FileMap {
        let mut f = FileMap::new();
        f.insert("b".to_string(), vec![PendingFile::new("b.pdf", vec![1])]);
        f
    }

    #[tokio::test]
    async fn scenario_a_b_terminal_happy_path() {
        let mut ctl = StepController::new(three_steps());
        let commit = RecordingCommit::ok();

        // Next on an empty A: error, highlight, stay.
        let t = ctl.next(&DraftRecord::with_keys(["a"]), &FileMap::new(), &commit).await;
        assert_eq!(t, Transition::Blocked { missing: vec!["a".to_string()] });
        assert_eq!(ctl.current_step(), 1);
        assert_eq!(ctl.error(), Some("A is incomplete."));
        assert!(ctl.highlight());

        // Fill A, Next: move to B, error and highlight cleared.
        let t = ctl.next(&draft_with_a(), &FileMap::new(), &commit).await;
        assert_eq!(t, Transition::Advanced { step: 2 });
        assert!(ctl.error().is_none());
        assert!(!ctl.highlight());

        // Next on B without a file: blocked, no commit.
        let t = ctl.next(&draft_with_a(), &FileMap::new(), &commit).await;
        assert!(matches!(t, Transition::Blocked { .. }));
        assert_eq!(ctl.current_step(), 2);
        assert_eq!(commit.call_count.load(Ordering::SeqCst), 0);

        // With a file: exactly one commit, then terminal.
        let t = ctl.next(&draft_with_a(), &files_with_b(), &commit).await;
        assert!(matches!(t, Transition::Submitted { step: 3, .. }));
        assert_eq!(commit.call_count.load(Ordering::SeqCst), 1);
        assert!(ctl.on_terminal());
        assert!(!ctl.is_busy());

        // Terminal step has no controls.
        assert_eq!(ctl.next(&draft_with_a(), &files_with_b(), &commit).await, Transition::Ignored);
        assert_eq!(ctl.back(), Transition::Ignored);
        assert_eq!(commit.call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn busy_is_set_while_commit_runs() {
        let mut ctl = StepController::new(three_steps());
        let mut commit = RecordingCommit::ok();
        commit.busy = Some(ctl.busy_signal());

        ctl.next(&draft_with_a(), &FileMap::new(), &commit).await;
        ctl.next(&draft_with_a(), &files_with_b(), &commit).await;

        assert!(commit.busy_seen.load(Ordering::SeqCst), "Busy must be true during commit");
        assert!(!ctl.is_busy(), "Busy must be cleared afterwards");
    }

    #[tokio::test]
    async fn failed_commit_surfaces_error_and_allows_retry() {
        let mut ctl = StepController::new(three_steps());
        let failing = RecordingCommit::failing();

        ctl.next(&draft_with_a(), &FileMap::new(), &failing).await;
        let t = ctl.next(&draft_with_a(), &files_with_b(), &failing).await;

        assert_eq!(t, Transition::CommitFailed);
        assert_eq!(ctl.current_step(), 2, "A failed commit must not advance");
        assert_eq!(ctl.error(), Some(COMMIT_FAILED_MESSAGE));
        assert!(!ctl.is_busy(), "Busy must never stay stuck");

        let ok = RecordingCommit::ok();
        let t = ctl.next(&draft_with_a(), &files_with_b(), &ok).await;
        assert!(matches!(t, Transition::Submitted { .. }));
        assert!(ctl.error().is_none());
    }

    #[test]
    fn back_is_unvalidated_and_stops_at_first_step() {
        let mut ctl = StepController::new(three_steps());
        assert_eq!(ctl.back(), Transition::Ignored);
        ctl.current = 2;
        assert_eq!(ctl.back(), Transition::Retreated { step: 1 });
        assert!(!ctl.can_go_back());
    }

    #[tokio::test]
    async fn back_after_blocked_next_drops_stale_error() {
        // INTENT: a blocked Next on B must not leave "B is incomplete." or the
        // highlight trigger behind on the already-complete step A.
        let mut ctl = StepController::new(three_steps());
        let commit = RecordingCommit::ok();

        ctl.next(&draft_with_a(), &FileMap::new(), &commit).await;
        let t = ctl.next(&draft_with_a(), &FileMap::new(), &commit).await;
        assert!(matches!(t, Transition::Blocked { .. }));
        assert_eq!(ctl.error(), Some("B is incomplete."));

        assert_eq!(ctl.back(), Transition::Retreated { step: 1 });
        assert!(ctl.error().is_none());
        assert!(!ctl.highlight());
    }

    #[test]
    fn refresh_clears_error_once_step_is_complete() {
        let mut ctl = StepController::new(three_steps());
        ctl.error = Some("A is incomplete.".to_string());

        ctl.refresh(&DraftRecord::with_keys(["a"]), &FileMap::new());
        assert!(ctl.error().is_some());

        ctl.refresh(&draft_with_a(), &FileMap::new());
        assert!(ctl.error().is_none());
    }

    #[test]
    fn next_commits_only_on_second_to_last_step() {
        let mut ctl = StepController::new(three_steps());
        assert!(!ctl.next_commits());
        ctl.current = 2;
        assert!(ctl.next_commits());
    }
}
