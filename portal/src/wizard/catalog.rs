// Document catalog
//
// The shipped request forms. Each blueprint is a declarative step list; the
// same controller drives all of them.

use super::group::{FieldKind, FieldSpec, GroupSpec, SlotSpec};
use super::step::StepSpec;
use crate::models::record::DraftRecord;
use crate::models::request::{DocumentType, COPIES_KEY, DOCUMENT_TYPE_KEY};

const SEX: FieldKind = FieldKind::Choice(&["Male", "Female"]);
const REGISTRATION_TYPES: FieldKind = FieldKind::Choice(&["DTI", "SEC", "CDA"]);

const PERSONAL_INCOMPLETE: &str = "Personal information fields are incomplete.";
const PAYMENT_INCOMPLETE: &str = "Payment fields are incomplete.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blueprint {
    pub document_type: DocumentType,
    pub steps: Vec<StepSpec>,
}

impl Blueprint {
    pub fn titles(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.title.as_str()).collect()
    }

    /// Every key any group of this form writes.
    pub fn keys(&self) -> Vec<&str> {
        self.steps
            .iter()
            .flat_map(|s| s.groups())
            .flat_map(|g| g.keys())
            .collect()
    }

    /// Initial draft: every known key empty, plus the type and copy count.
    pub fn seed(&self, copies: u32) -> DraftRecord {
        let mut draft = DraftRecord::with_keys(self.keys());
        draft.insert(DOCUMENT_TYPE_KEY, self.document_type.as_str());
        draft.insert(COPIES_KEY, copies.max(1));
        draft
    }
}

pub fn blueprint(document_type: DocumentType) -> Blueprint {
    let steps = match document_type {
        DocumentType::Residency => vec![
            StepSpec::form(
                "Personal Information",
                PERSONAL_INCOMPLETE,
                vec![GroupSpec::fields(
                    "Personal Information",
                    vec![
                        text("fullname", "Full Name"),
                        FieldSpec::required("sex", "Sex", SEX),
                        long("residency-purpose", "Purpose"),
                    ],
                )],
            ),
            StepSpec::form(
                "Address",
                "Address information fields are incomplete.",
                vec![GroupSpec::fields("Address", address_fields(""))],
            ),
            StepSpec::form(
                "Upload",
                "Upload ID fields incomplete.",
                vec![government_id()],
            ),
            payment_step(),
            StepSpec::terminal("Complete"),
        ],
        DocumentType::GoodMoral => vec![
            StepSpec::form(
                "Personal Information",
                PERSONAL_INCOMPLETE,
                vec![
                    GroupSpec::fields(
                        "Personal Information",
                        vec![
                            text("fullname", "Full Name"),
                            FieldSpec::required("date-of-birth", "Date of Birth", FieldKind::Date),
                            text("address", "Address"),
                            FieldSpec::required(
                                "contact-details",
                                "Contact Details",
                                FieldKind::Phone,
                            ),
                            long("good-moral-purpose", "Purpose"),
                        ],
                    ),
                    government_id(),
                ],
            ),
            payment_step(),
            StepSpec::terminal("Complete"),
        ],
        DocumentType::BusinessPermit => vec![
            StepSpec::form(
                "Personal Details",
                PERSONAL_INCOMPLETE,
                vec![GroupSpec::fields("Personal Details", personal_details())],
            ),
            StepSpec::form(
                "Business Information",
                "Business information fields are incomplete.",
                vec![GroupSpec::fields("Business Information", business_info())],
            ),
            payment_step(),
            StepSpec::terminal("Complete"),
        ],
        DocumentType::BusinessClearance => vec![
            StepSpec::form(
                "Upload",
                "File uploads are incomplete.",
                vec![GroupSpec::uploads(
                    "Business Documents",
                    vec![
                        SlotSpec::required("fsi-certificate", "Fire Safety Inspection Certificate"),
                        SlotSpec::required("health-permit", "Health Permit"),
                        SlotSpec::required("zoning-clearance", "Zoning Clearance"),
                        SlotSpec::required(
                            "business-permit-or-license",
                            "Business Permit or License",
                        ),
                        SlotSpec::required("income-statements", "Income Statements"),
                        SlotSpec::required("balance-sheets", "Balance Sheets"),
                    ],
                )],
            ),
            StepSpec::form(
                "Business Information",
                "Business information fields are incomplete.",
                vec![GroupSpec::fields("Business Information", business_info())],
            ),
            StepSpec::form(
                "Business Address",
                "Business address fields are incomplete.",
                vec![GroupSpec::fields("Business Address", address_fields("business-"))],
            ),
            StepSpec::form(
                "Personal Details",
                PERSONAL_INCOMPLETE,
                vec![GroupSpec::fields("Personal Details", personal_details())],
            ),
            StepSpec::form(
                "Owner Address",
                "Owner address fields are incomplete.",
                vec![GroupSpec::fields("Owner Address", address_fields("owner-"))],
            ),
            payment_step(),
            StepSpec::terminal("Complete"),
        ],
        DocumentType::CommunityEvents => vec![
            StepSpec::form(
                "Organizer Information",
                "Organizer information fields are incomplete.",
                vec![GroupSpec::fields(
                    "Organizer Information",
                    vec![
                        text("event-organizer", "Event Organizer"),
                        FieldSpec::required(
                            "organizer-contact-number",
                            "Contact Number",
                            FieldKind::Phone,
                        ),
                        FieldSpec::required(
                            "organizer-contact-email",
                            "Contact Email",
                            FieldKind::Email,
                        ),
                        text("organizer-address", "Address"),
                    ],
                )],
            ),
            StepSpec::form(
                "Event Details",
                "Event details fields are incomplete.",
                vec![GroupSpec::fields(
                    "Event Details",
                    vec![
                        text("event-name", "Event Name"),
                        long("event-purpose", "Purpose"),
                        FieldSpec::required(
                            "date-and-time-of-event",
                            "Date and Time",
                            FieldKind::DateTime,
                        ),
                        text("event-venue", "Venue"),
                        long("event-description", "Description"),
                    ],
                )],
            ),
            StepSpec::form(
                "Participant Information",
                "Participant information fields are incomplete.",
                vec![GroupSpec::fields(
                    "Participant Information",
                    vec![
                        FieldSpec::required(
                            "participant-number",
                            "Expected Participants",
                            FieldKind::Number,
                        ),
                        text("participant-target", "Target Participants"),
                        long("participant-requirements", "Participant Requirements"),
                    ],
                )],
            ),
            StepSpec::form(
                "Upload",
                "Upload fields incomplete.",
                vec![GroupSpec::uploads(
                    "Supporting Documents",
                    vec![SlotSpec::required("supporting-documents", "Supporting Documents")],
                )],
            ),
            payment_step(),
            StepSpec::terminal("Complete"),
        ],
        DocumentType::Indigency => vec![
            StepSpec::form(
                "Personal Information",
                PERSONAL_INCOMPLETE,
                vec![GroupSpec::fields(
                    "Personal Information",
                    vec![
                        text("fullname", "Full Name"),
                        FieldSpec::required("sex", "Sex", SEX),
                        long("indigency-purpose", "Purpose"),
                    ],
                )],
            ),
            StepSpec::form(
                "Address",
                "Address information fields are incomplete.",
                vec![GroupSpec::fields("Address", address_fields(""))],
            ),
            StepSpec::form(
                "Upload",
                "Upload ID fields incomplete.",
                vec![government_id()],
            ),
            StepSpec::terminal("Complete"),
        ],
    };

    Blueprint {
        document_type,
        steps,
    }
}

fn text(key: &str, label: &str) -> FieldSpec {
    FieldSpec::required(key, label, FieldKind::Text)
}

fn long(key: &str, label: &str) -> FieldSpec {
    FieldSpec::required(key, label, FieldKind::LongText)
}

fn government_id() -> GroupSpec {
    GroupSpec::uploads(
        "Upload ID",
        vec![SlotSpec::required("government-id", "Government Issued ID")],
    )
}

fn payment_step() -> StepSpec {
    StepSpec::form(
        "Payment",
        PAYMENT_INCOMPLETE,
        vec![
            GroupSpec::fields(
                "Payment Details",
                vec![
                    text("reference-number", "Reference Number"),
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

/// Address block. Building name, lot number and subdivision are optional in
/// prefixed (business and owner) addresses.
fn address_fields(prefix: &str) -> Vec<FieldSpec> {
    let k = |name: &str| format!("{}{}", prefix, name);
    let optional_extras = !prefix.is_empty();
    let extra = |name: &str, label: &str| {
        let key = k(name);
        if optional_extras {
            FieldSpec::optional(&key, label, FieldKind::Text)
        } else {
            FieldSpec::required(&key, label, FieldKind::Text)
        }
    };
    vec![
        text(&k("house-bldg-number"), "House/Bldg No."),
        extra("building-name", "Building Name"),
        extra("lot-number", "Lot No."),
        extra("subdivision", "Subdivision"),
        text(&k("street"), "Street"),
        text(&k("region"), "Region"),
        text(&k("province"), "Province"),
        text(&k("city"), "City/Municipality"),
        text(&k("barangay"), "Barangay"),
    ]
}

fn personal_details() -> Vec<FieldSpec> {
    vec![
        text("surname", "Surname"),
        text("given-name", "Given Name"),
        FieldSpec::optional("middle-name", "Middle Name", FieldKind::Text),
        FieldSpec::optional("suffix", "Suffix", FieldKind::Text),
        FieldSpec::required("sex", "Sex", SEX),
    ]
}

fn business_info() -> Vec<FieldSpec> {
    vec![
        FieldSpec::required("registration-type", "Registration Type", REGISTRATION_TYPES),
        text("registration-number", "Registration Number"),
        FieldSpec::required("registration-date", "Registration Date", FieldKind::Date),
        text("tin", "TIN"),
        FieldSpec::optional("sss-number", "SSS Number", FieldKind::Text),
        text("business-name", "Business Name"),
        FieldSpec::optional("trade-name", "Trade Name", FieldKind::Text),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::validate_field_key;
    use std::collections::BTreeSet;

    #[test]
    fn every_form_ends_in_one_terminal_step() {
        for doc in DocumentType::ALL {
            let bp = blueprint(doc);
            let terminals = bp.steps.iter().filter(|s| s.is_terminal()).count();
            assert_eq!(terminals, 1, "{} must have exactly one terminal step", doc);
            assert!(
                bp.steps.last().map(StepSpec::is_terminal).unwrap_or(false),
                "{} must end with its terminal step",
                doc
            );
            assert!(bp.steps.len() >= 2, "{} needs at least one form step", doc);
        }
    }

    #[test]
    fn keys_are_valid_and_unique_per_form() {
        for doc in DocumentType::ALL {
            let bp = blueprint(doc);
            let keys = bp.keys();
            let unique: BTreeSet<&str> = keys.iter().copied().collect();
            assert_eq!(unique.len(), keys.len(), "{} reuses a key across groups", doc);
            for key in keys {
                assert!(validate_field_key(key).is_ok(), "{}: bad key '{}'", doc, key);
            }
        }
    }

    #[test]
    fn residency_matches_known_layout() {
        let bp = blueprint(DocumentType::Residency);
        assert_eq!(
            bp.titles(),
            vec!["Personal Information", "Address", "Upload", "Payment", "Complete"]
        );
        assert_eq!(
            bp.steps[1].incomplete_message(),
            Some("Address information fields are incomplete.")
        );
        assert_eq!(bp.steps[2].incomplete_message(), Some("Upload ID fields incomplete."));
    }

    #[test]
    fn seed_contains_every_key_plus_metadata() {
        let bp = blueprint(DocumentType::GoodMoral);
        let seed = bp.seed(0);
        assert_eq!(seed.text(DOCUMENT_TYPE_KEY), "Good Moral");
        assert_eq!(seed.text(COPIES_KEY), "1", "Copies are clamped to at least one");
        for key in bp.keys() {
            assert_eq!(seed.text(key), "", "'{}' should be seeded empty", key);
        }
        assert!(seed.contains_key("government-id"));
    }
}
