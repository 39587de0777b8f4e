// Submitted request models
//
// Wire names are kept exactly as existing stored data uses them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use super::record::{DraftRecord, FieldValue};

/// Marker stored in `Fupstatus` once the owner has followed up.
pub const FOLLOW_UP_MARKER: &str = "This document has been followed up";

/// Draft keys that carry request metadata rather than form content.
pub const DOCUMENT_TYPE_KEY: &str = "document-type";
pub const COPIES_KEY: &str = "number-of-copies";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "Business Permit")]
    BusinessPermit,
    #[serde(rename = "Residency")]
    Residency,
    #[serde(rename = "Good Moral")]
    GoodMoral,
    #[serde(rename = "Community Events")]
    CommunityEvents,
    #[serde(rename = "Indigency")]
    Indigency,
    #[serde(rename = "Business Clearance")]
    BusinessClearance,
}

impl DocumentType {
    pub const ALL: [DocumentType; 6] = [
        DocumentType::BusinessPermit,
        DocumentType::Residency,
        DocumentType::GoodMoral,
        DocumentType::CommunityEvents,
        DocumentType::Indigency,
        DocumentType::BusinessClearance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::BusinessPermit => "Business Permit",
            DocumentType::Residency => "Residency",
            DocumentType::GoodMoral => "Good Moral",
            DocumentType::CommunityEvents => "Community Events",
            DocumentType::Indigency => "Indigency",
            DocumentType::BusinessClearance => "Business Clearance",
        }
    }

    /// Short command-line name, e.g. `good-moral`.
    pub fn slug(&self) -> &'static str {
        match self {
            DocumentType::BusinessPermit => "business-permit",
            DocumentType::Residency => "residency",
            DocumentType::GoodMoral => "good-moral",
            DocumentType::CommunityEvents => "community-events",
            DocumentType::Indigency => "indigency",
            DocumentType::BusinessClearance => "business-clearance",
        }
    }

    /// Top-level blob folder used for this type's uploads.
    pub fn storage_prefix(&self) -> &'static str {
        match self {
            DocumentType::BusinessPermit => "BusinessPermit-Upload",
            DocumentType::Residency => "Residency-Upload",
            DocumentType::GoodMoral => "GoodMoral-Upload",
            DocumentType::CommunityEvents => "CommunityEvents-Upload",
            DocumentType::Indigency => "Indigency-Upload",
            DocumentType::BusinessClearance => "BusinessClearance-Upload",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = anyhow::Error;

    /// Accepts either the display name or the slug, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str().to_ascii_lowercase() == needle || t.slug() == needle)
            .ok_or_else(|| anyhow::anyhow!("Unknown document type: '{}'", s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "Processing")]
    Processing,
    #[serde(rename = "Ready for Pick-up")]
    ReadyForPickup,
    #[serde(rename = "Claimed")]
    Claimed,
    #[serde(rename = "Declined")]
    Declined,
    #[serde(rename = "Decline Viewed")]
    DeclineViewed,
}

impl RequestStatus {
    /// Statuses an administrator can pick from the status selector.
    pub const ADMIN_SELECTABLE: [RequestStatus; 4] = [
        RequestStatus::Pending,
        RequestStatus::Processing,
        RequestStatus::ReadyForPickup,
        RequestStatus::Declined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Processing => "Processing",
            RequestStatus::ReadyForPickup => "Ready for Pick-up",
            RequestStatus::Claimed => "Claimed",
            RequestStatus::Declined => "Declined",
            RequestStatus::DeclineViewed => "Decline Viewed",
        }
    }

    /// Terminal records leave the active views and show up in history.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Claimed | RequestStatus::DeclineViewed)
    }

    /// Declined records can no longer be changed by an administrator.
    pub fn is_declined(&self) -> bool {
        matches!(self, RequestStatus::Declined | RequestStatus::DeclineViewed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        [
            RequestStatus::Pending,
            RequestStatus::Processing,
            RequestStatus::ReadyForPickup,
            RequestStatus::Claimed,
            RequestStatus::Declined,
            RequestStatus::DeclineViewed,
        ]
        .into_iter()
        .find(|st| st.as_str().eq_ignore_ascii_case(needle))
        .ok_or_else(|| anyhow::anyhow!("Unknown request status: '{}'", needle))
    }
}

/// Profile document stored in the `userInfo` collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub uid: String,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// One nested record inside a request container document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedRequest {
    #[serde(rename = "document-type")]
    pub document_type: DocumentType,
    #[serde(
        rename = "number-of-copies",
        default = "default_copies",
        deserialize_with = "deserialize_copies"
    )]
    pub copies: u32,
    pub status: RequestStatus,
    #[serde(
        rename = "Decline Reason",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub decline_reason: Option<String>,
    #[serde(rename = "requestDateTime")]
    pub requested_at: DateTime<Utc>,
    #[serde(
        rename = "claimedDateTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(rename = "Fupstatus", default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userInfo", default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserProfile>,
    /// Everything the wizard collected, with upload slots holding download URLs.
    #[serde(flatten)]
    pub form: DraftRecord,
}

fn default_copies() -> u32 {
    1
}

fn deserialize_copies<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    // Older records carry the select value as a string.
    let raw = FieldValue::deserialize(deserializer)?;
    Ok(raw
        .as_number()
        .filter(|n| *n >= 1.0)
        .map(|n| n as u32)
        .unwrap_or_else(default_copies))
}

/// Keys that live in dedicated fields and must not leak into `form`.
const RESERVED_KEYS: [&str; 9] = [
    DOCUMENT_TYPE_KEY,
    COPIES_KEY,
    "status",
    "Decline Reason",
    "requestDateTime",
    "claimedDateTime",
    "Fupstatus",
    "userId",
    "userInfo",
];

impl SubmittedRequest {
    /// Stamp a finished draft as a new pending request.
    pub fn from_draft(
        document_type: DocumentType,
        mut draft: DraftRecord,
        user_id: impl Into<String>,
        user_info: Option<UserProfile>,
        requested_at: DateTime<Utc>,
    ) -> Self {
        let copies = draft
            .get(COPIES_KEY)
            .and_then(FieldValue::as_number)
            .filter(|n| *n >= 1.0)
            .map(|n| n as u32)
            .unwrap_or_else(default_copies);
        for key in RESERVED_KEYS {
            draft.remove(key);
        }

        Self {
            document_type,
            copies,
            status: RequestStatus::Pending,
            decline_reason: None,
            requested_at,
            claimed_at: None,
            follow_up: None,
            user_id: user_id.into(),
            user_info,
            form: draft,
        }
    }

    pub fn is_followed_up(&self) -> bool {
        self.follow_up.is_some()
    }

    /// Follow-ups are only offered while the office is still working on it.
    pub fn can_follow_up(&self) -> bool {
        !self.is_followed_up()
            && matches!(
                self.status,
                RequestStatus::Pending | RequestStatus::Processing
            )
    }
}

/// A nested request addressed by its container and nested ids.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRow {
    pub container_id: String,
    pub request_id: String,
    pub request: SubmittedRequest,
}

impl RequestRow {
    pub fn key(&self) -> String {
        format!("{}/{}", self.container_id, self.request_id)
    }
}
