// Step descriptors
//
// A wizard is a list of steps. Every step except the last gates forward
// navigation on its groups; the last one is the terminal confirmation page.

use super::files::FileMap;
use super::group::GroupSpec;
use crate::models::record::DraftRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepGate {
    /// Next is allowed once every required input of every group is filled.
    Form {
        groups: Vec<GroupSpec>,
        incomplete_message: String,
    },
    /// Final page: no controls, no validation.
    Terminal,
}

impl StepGate {
    /// Pure completion check, recomputed on every read.
    pub fn is_complete(&self, draft: &DraftRecord, files: &FileMap) -> bool {
        self.missing(draft, files).is_empty()
    }

    pub fn missing(&self, draft: &DraftRecord, files: &FileMap) -> Vec<String> {
        match self {
            StepGate::Form { groups, .. } => groups
                .iter()
                .flat_map(|g| g.missing(draft, files))
                .collect(),
            StepGate::Terminal => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSpec {
    pub title: String,
    pub gate: StepGate,
}

impl StepSpec {
    pub fn form(title: &str, incomplete_message: &str, groups: Vec<GroupSpec>) -> Self {
        Self {
            title: title.to_string(),
            gate: StepGate::Form {
                groups,
                incomplete_message: incomplete_message.to_string(),
            },
        }
    }

    pub fn terminal(title: &str) -> Self {
        Self {
            title: title.to_string(),
            gate: StepGate::Terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.gate, StepGate::Terminal)
    }

    pub fn groups(&self) -> &[GroupSpec] {
        match &self.gate {
            StepGate::Form { groups, .. } => groups.as_slice(),
            StepGate::Terminal => &[],
        }
    }

    pub fn incomplete_message(&self) -> Option<&str> {
        match &self.gate {
            StepGate::Form {
                incomplete_message, ..
            } => Some(incomplete_message.as_str()),
            StepGate::Terminal => None,
        }
    }

    pub fn is_complete(&self, draft: &DraftRecord, files: &FileMap) -> bool {
        self.gate.is_complete(draft, files)
    }

    pub fn missing(&self, draft: &DraftRecord, files: &FileMap) -> Vec<String> {
        self.gate.missing(draft, files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::FieldValue;
    use crate::wizard::files::PendingFile;
    use crate::wizard::group::{FieldKind, FieldSpec, SlotSpec};

    fn payment_step() -> StepSpec {
        StepSpec::form(
            "Payment",
            "Payment fields are incomplete.",
            vec![
                GroupSpec::fields(
                    "Payment Details",
                    vec![
                        FieldSpec::required(
                            "reference-number",
                            "Reference Number",
                            FieldKind::Text,
                        ),
                        FieldSpec::required("date-of-payment", "Date of Payment", FieldKind::Date),
                    ],
                ),
                GroupSpec::uploads(
                    "Proof of Payment",
                    vec![SlotSpec::required("proof-of-payment", "Proof of Payment")],
                ),
            ],
        )
    }

    #[test]
    fn complete_iff_every_required_key_and_slot_is_filled() {
        let step = payment_step();
        let mut draft = DraftRecord::with_keys(["reference-number", "date-of-payment"]);
        let mut files = FileMap::new();
        assert!(!step.is_complete(&draft, &files));

        draft.insert("reference-number", "GC-0001");
        draft.insert("date-of-payment", "2024-06-01");
        assert!(!step.is_complete(&draft, &files), "Slot still empty");
        assert_eq!(step.missing(&draft, &files), vec!["proof-of-payment"]);

        files.insert(
            "proof-of-payment".to_string(),
            vec![PendingFile::new("r.jpg", vec![1])],
        );
        assert!(step.is_complete(&draft, &files));

        draft.insert("reference-number", FieldValue::from("   "));
        assert!(!step.is_complete(&draft, &files), "Whitespace does not count");
    }

    #[test]
    fn terminal_step_is_always_complete() {
        let step = StepSpec::terminal("Complete");
        assert!(step.is_terminal());
        assert!(step.is_complete(&DraftRecord::new(), &FileMap::new()));
        assert!(step.incomplete_message().is_none());
        assert!(step.groups().is_empty());
    }
}
