// Field and upload groups
//
// A group owns one visual block of a step. It keeps a local copy of its subset,
// pushes that whole subset into the shared buffer on every edit, tracks which
// required inputs are highlighted, and reports completion changes upward.

use std::collections::BTreeSet;
use thiserror::Error;

use super::draft::DraftStore;
use super::files::{slot_filled, FileMap, PendingFile, PendingFiles};
use crate::models::record::{DraftRecord, FieldValue};

/// Called with the group's new completion state whenever it flips.
pub type CompletionCallback = Box<dyn FnMut(bool) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    LongText,
    Date,
    DateTime,
    Email,
    Phone,
    Number,
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(key: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind,
            required: true,
        }
    }

    pub fn optional(key: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            required: false,
            ..Self::required(key, label, kind)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSpec {
    pub key: String,
    pub label: String,
    pub required: bool,
}

impl SlotSpec {
    pub fn required(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            required: true,
        }
    }
}

/// Declarative description of one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSpec {
    Fields { title: String, fields: Vec<FieldSpec> },
    Uploads { title: String, slots: Vec<SlotSpec> },
}

impl GroupSpec {
    pub fn fields(title: &str, fields: Vec<FieldSpec>) -> Self {
        GroupSpec::Fields {
            title: title.to_string(),
            fields,
        }
    }

    pub fn uploads(title: &str, slots: Vec<SlotSpec>) -> Self {
        GroupSpec::Uploads {
            title: title.to_string(),
            slots,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            GroupSpec::Fields { title, .. } | GroupSpec::Uploads { title, .. } => title,
        }
    }

    /// Every key this group contributes to the draft.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            GroupSpec::Fields { fields, .. } => fields.iter().map(|f| f.key.as_str()).collect(),
            GroupSpec::Uploads { slots, .. } => slots.iter().map(|s| s.key.as_str()).collect(),
        }
    }

    pub fn required_keys(&self) -> Vec<&str> {
        match self {
            GroupSpec::Fields { fields, .. } => fields
                .iter()
                .filter(|f| f.required)
                .map(|f| f.key.as_str())
                .collect(),
            GroupSpec::Uploads { slots, .. } => slots
                .iter()
                .filter(|s| s.required)
                .map(|s| s.key.as_str())
                .collect(),
        }
    }

    /// Required inputs of this group that are still empty.
    pub fn missing(&self, draft: &DraftRecord, files: &FileMap) -> Vec<String> {
        match self {
            GroupSpec::Fields { .. } => draft.missing(self.required_keys()),
            GroupSpec::Uploads { .. } => self
                .required_keys()
                .into_iter()
                .filter(|slot| !slot_filled(files, slot))
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupError {
    #[error("'{0}' is not a field of this step")]
    UnknownField(String),
    #[error("'{0}' is not an upload slot of this step")]
    UnknownSlot(String),
}

// =============================================================================
// Highlight bookkeeping shared by both group kinds
// =============================================================================

#[derive(Debug, Default)]
struct Highlight {
    active: bool,
    marked: BTreeSet<String>,
}

impl Highlight {
    fn set(&mut self, active: bool, missing: Vec<String>) {
        self.active = active;
        self.marked = if active {
            missing.into_iter().collect()
        } else {
            BTreeSet::new()
        };
    }

    /// Filling clears the marker whether or not a pass is active. Emptying a
    /// required input marks it again only during a pass.
    fn on_edit(&mut self, key: &str, filled: bool, required: bool) {
        if filled {
            self.marked.remove(key);
        } else if self.active && required {
            self.marked.insert(key.to_string());
        }
    }
}

struct Reporter {
    last: Option<bool>,
    callback: Option<CompletionCallback>,
}

impl Reporter {
    fn new() -> Self {
        Self {
            last: None,
            callback: None,
        }
    }

    fn report(&mut self, complete: bool) {
        if self.last == Some(complete) {
            return;
        }
        self.last = Some(complete);
        if let Some(cb) = self.callback.as_mut() {
            cb(complete);
        }
    }

    fn attach(&mut self, callback: CompletionCallback, complete: bool) {
        self.callback = Some(callback);
        self.last = None;
        self.report(complete);
    }
}

// =============================================================================
// Field group
// =============================================================================

pub struct FieldGroup {
    title: String,
    fields: Vec<FieldSpec>,
    local: DraftRecord,
    draft: DraftStore,
    highlight: Highlight,
    reporter: Reporter,
}

impl FieldGroup {
    /// Mount against a draft. The local copy starts from whatever the draft
    /// already holds for these keys.
    pub fn mount(title: &str, fields: Vec<FieldSpec>, draft: DraftStore) -> Self {
        let snapshot = draft.get();
        let local = fields
            .iter()
            .map(|f| {
                let value = snapshot.get(&f.key).cloned().unwrap_or_default();
                (f.key.clone(), value)
            })
            .collect();
        Self {
            title: title.to_string(),
            fields,
            local,
            draft,
            highlight: Highlight::default(),
            reporter: Reporter::new(),
        }
    }

    pub fn on_completion(&mut self, callback: CompletionCallback) {
        let complete = self.is_complete();
        self.reporter.attach(callback, complete);
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f.key == key)
    }

    pub fn value(&self, key: &str) -> String {
        self.local.text(key)
    }

    pub fn set_field(&mut self, key: &str, value: impl Into<FieldValue>) -> Result<(), GroupError> {
        let required = self
            .fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.required)
            .ok_or_else(|| GroupError::UnknownField(key.to_string()))?;

        let value = value.into();
        let filled = value.is_filled();
        self.local.insert(key, value);
        self.draft.merge(&self.local);
        self.highlight.on_edit(key, filled, required);

        let complete = self.is_complete();
        self.reporter.report(complete);
        Ok(())
    }

    pub fn set_highlight(&mut self, active: bool) {
        let missing = self.missing();
        self.highlight.set(active, missing);
    }

    pub fn is_highlighted(&self, key: &str) -> bool {
        self.highlight.marked.contains(key)
    }

    pub fn highlighted(&self) -> Vec<String> {
        self.highlight.marked.iter().cloned().collect()
    }

    pub fn missing(&self) -> Vec<String> {
        self.local.missing(
            self.fields
                .iter()
                .filter(|f| f.required)
                .map(|f| f.key.as_str()),
        )
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

// =============================================================================
// Upload group
// =============================================================================

pub struct UploadGroup {
    title: String,
    slots: Vec<SlotSpec>,
    local: FileMap,
    files: PendingFiles,
    highlight: Highlight,
    reporter: Reporter,
}

impl UploadGroup {
    pub fn mount(title: &str, slots: Vec<SlotSpec>, files: PendingFiles) -> Self {
        let snapshot = files.snapshot();
        let local = slots
            .iter()
            .map(|s| (s.key.clone(), snapshot.get(&s.key).cloned().unwrap_or_default()))
            .collect();
        Self {
            title: title.to_string(),
            slots,
            local,
            files,
            highlight: Highlight::default(),
            reporter: Reporter::new(),
        }
    }

    pub fn on_completion(&mut self, callback: CompletionCallback) {
        let complete = self.is_complete();
        self.reporter.attach(callback, complete);
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn slots(&self) -> &[SlotSpec] {
        &self.slots
    }

    pub fn has_slot(&self, key: &str) -> bool {
        self.slots.iter().any(|s| s.key == key)
    }

    pub fn selected(&self, slot: &str) -> &[PendingFile] {
        self.local.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    fn slot_required(&self, slot: &str) -> Result<bool, GroupError> {
        self.slots
            .iter()
            .find(|s| s.key == slot)
            .map(|s| s.required)
            .ok_or_else(|| GroupError::UnknownSlot(slot.to_string()))
    }

    /// Pick a file for `slot`, replacing any earlier pick.
    pub fn select_file(&mut self, slot: &str, file: PendingFile) -> Result<(), GroupError> {
        let required = self.slot_required(slot)?;
        self.local.insert(slot.to_string(), vec![file]);
        self.push(slot, required);
        Ok(())
    }

    /// Remove a picked file by name. Emptying a slot during a highlight pass
    /// marks it again.
    pub fn cancel_file(&mut self, slot: &str, file_name: &str) -> Result<(), GroupError> {
        let required = self.slot_required(slot)?;
        if let Some(files) = self.local.get_mut(slot) {
            files.retain(|f| f.file_name != file_name);
        }
        self.push(slot, required);
        Ok(())
    }

    fn push(&mut self, slot: &str, required: bool) {
        self.files.merge(&self.local);
        let filled = slot_filled(&self.local, slot);
        self.highlight.on_edit(slot, filled, required);
        let complete = self.is_complete();
        self.reporter.report(complete);
    }

    pub fn set_highlight(&mut self, active: bool) {
        let missing = self.missing();
        self.highlight.set(active, missing);
    }

    pub fn is_highlighted(&self, slot: &str) -> bool {
        self.highlight.marked.contains(slot)
    }

    pub fn highlighted(&self) -> Vec<String> {
        self.highlight.marked.iter().cloned().collect()
    }

    pub fn missing(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|s| s.required && !slot_filled(&self.local, &s.key))
            .map(|s| s.key.clone())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn personal_fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::required("fullname", "Full Name", FieldKind::Text),
            FieldSpec::required("sex", "Sex", FieldKind::Choice(&["Male", "Female"])),
            FieldSpec::optional("suffix", "Suffix", FieldKind::Text),
        ]
    }

    fn recorder() -> (CompletionCallback, Arc<Mutex<Vec<bool>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (Box::new(move |c| sink.lock().unwrap().push(c)), seen)
    }

    // -------------------------------------------------------------------------
    // Field group
    // -------------------------------------------------------------------------

    #[test]
    fn edits_push_whole_local_subset_into_draft() {
        let draft = DraftStore::seeded(DraftRecord::with_keys(["fullname", "sex", "suffix"]));
        let mut group = FieldGroup::mount("Personal Information", personal_fields(), draft.clone());

        group.set_field("fullname", "Ana Santos").unwrap();
        group.set_field("sex", "Female").unwrap();

        let snapshot = draft.get();
        assert_eq!(snapshot.text("fullname"), "Ana Santos");
        assert_eq!(snapshot.text("sex"), "Female");
        assert!(group.is_complete(), "Optional suffix must not block completion");
    }

    #[test]
    fn completion_is_reported_only_on_change() {
        let draft = DraftStore::new();
        let mut group = FieldGroup::mount("Personal Information", personal_fields(), draft);
        let (cb, seen) = recorder();
        group.on_completion(cb);

        group.set_field("fullname", "Ana").unwrap();
        group.set_field("fullname", "Ana S.").unwrap();
        group.set_field("sex", "Female").unwrap();
        group.set_field("fullname", "  ").unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
    }

    #[test]
    fn highlight_clears_incrementally_per_field() {
        // INTENT: a marker clears as soon as that field gets a value, without
        // waiting for another Next press.
        let draft = DraftStore::new();
        let mut group = FieldGroup::mount("Personal Information", personal_fields(), draft);

        group.set_highlight(true);
        assert_eq!(group.highlighted(), vec!["fullname", "sex"]);

        group.set_field("fullname", "Ana").unwrap();
        assert_eq!(group.highlighted(), vec!["sex"]);

        group.set_field("fullname", "").unwrap();
        assert!(group.is_highlighted("fullname"), "Emptied field re-marks during a pass");

        group.set_highlight(false);
        assert!(group.highlighted().is_empty());

        group.set_field("sex", "").unwrap();
        assert!(!group.is_highlighted("sex"), "No pass active, nothing re-marked");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut group =
            FieldGroup::mount("Personal Information", personal_fields(), DraftStore::new());
        assert_eq!(
            group.set_field("tin", "1"),
            Err(GroupError::UnknownField("tin".to_string()))
        );
    }

    #[test]
    fn mount_picks_up_existing_draft_values() {
        let mut seed = DraftRecord::with_keys(["fullname", "sex"]);
        seed.insert("fullname", "Prefilled");
        let group = FieldGroup::mount(
            "Personal Information",
            personal_fields(),
            DraftStore::seeded(seed),
        );
        assert_eq!(group.value("fullname"), "Prefilled");
        assert_eq!(group.missing(), vec!["sex"]);
    }

    // -------------------------------------------------------------------------
    // Upload group
    // -------------------------------------------------------------------------

    #[test]
    fn cancelling_only_file_re_highlights_during_pass() {
        let files = PendingFiles::new();
        let mut group = UploadGroup::mount(
            "Upload",
            vec![SlotSpec::required("government-id", "Government Issued ID")],
            files.clone(),
        );
        let (cb, seen) = recorder();
        group.on_completion(cb);

        group.set_highlight(true);
        assert!(group.is_highlighted("government-id"));

        group
            .select_file("government-id", PendingFile::new("id.png", vec![1]))
            .unwrap();
        assert!(!group.is_highlighted("government-id"));
        assert!(files.is_filled("government-id"));

        group.cancel_file("government-id", "id.png").unwrap();
        assert!(group.is_highlighted("government-id"));
        assert!(!files.is_filled("government-id"));
        assert!(!group.is_complete());

        assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
    }

    #[test]
    fn selecting_replaces_previous_pick() {
        let files = PendingFiles::new();
        let mut group = UploadGroup::mount(
            "Upload",
            vec![SlotSpec::required("proof-of-payment", "Proof of Payment")],
            files.clone(),
        );
        group
            .select_file("proof-of-payment", PendingFile::new("a.jpg", vec![1]))
            .unwrap();
        group
            .select_file("proof-of-payment", PendingFile::new("b.jpg", vec![2]))
            .unwrap();

        let picked = files.slot("proof-of-payment");
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].file_name, "b.jpg");
        assert!(group.select_file("other", PendingFile::new("x", vec![])).is_err());
    }

    #[test]
    fn group_spec_missing_checks_draft_and_files() {
        let fields = GroupSpec::fields(
            "Payment",
            vec![FieldSpec::required("reference-number", "Reference", FieldKind::Text)],
        );
        let uploads = GroupSpec::uploads(
            "Proof",
            vec![SlotSpec::required("proof-of-payment", "Proof")],
        );

        let draft = DraftRecord::with_keys(["reference-number"]);
        let files = FileMap::new();
        assert_eq!(fields.missing(&draft, &files), vec!["reference-number"]);
        assert_eq!(uploads.missing(&draft, &files), vec!["proof-of-payment"]);
        assert_eq!(uploads.keys(), vec!["proof-of-payment"]);
    }
}
