// Administrator dashboard
//
// Lists active requests and changes their status. Declined records are final:
// any further change is refused before a write is issued.

use chrono::Utc;
use serde_json::Value;

use super::query::{apply, RequestFilter, SortKey, SortOrder};
use super::repository::RequestRepository;
use super::StatusChangeError;
use crate::backend::BackendError;
use crate::models::request::{RequestRow, RequestStatus, SubmittedRequest};

/// Keys that are bookkeeping, not content, in the detail view.
const HIDDEN_DETAIL_KEYS: [&str; 3] = ["userInfo", "userId", "proof-of-payment-input"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailField {
    pub key: String,
    pub value: String,
    /// Rendered as a link (uploaded files).
    pub is_link: bool,
}

fn is_link(value: &str) -> bool {
    ["http://", "https://", "file://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
}

pub struct AdminDashboard {
    repo: RequestRepository,
}

impl AdminDashboard {
    pub fn new(repo: RequestRepository) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &RequestRepository {
        &self.repo
    }

    /// Non-terminal requests of every user, filtered and optionally sorted.
    pub async fn active_requests(
        &self,
        filter: &RequestFilter,
        sort: Option<(SortKey, SortOrder)>,
    ) -> Result<Vec<RequestRow>, BackendError> {
        let rows: Vec<RequestRow> = self
            .repo
            .list_rows()
            .await?
            .into_iter()
            .filter(|row| !row.request.status.is_terminal())
            .collect();
        Ok(apply(rows, filter, sort))
    }

    /// Set a new status. `Declined` needs a reason, which is stored with it.
    pub async fn change_status(
        &self,
        container_id: &str,
        request_id: &str,
        status: RequestStatus,
        reason: Option<&str>,
    ) -> Result<SubmittedRequest, StatusChangeError> {
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());

        let result = self
            .repo
            .update_nested(container_id, request_id, |request| {
                check_admin_change(request, status, reason)?;
                request.status = status;
                if status == RequestStatus::Declined {
                    request.decline_reason = reason.map(str::to_string);
                }
                Ok(())
            })
            .await;

        match &result {
            Ok(_) => log::info!(
                "[PHASE: workflow] [STEP: change_status] {}/{} set to '{}' at {}",
                container_id,
                request_id,
                status,
                Utc::now().to_rfc3339()
            ),
            Err(e) => log::warn!(
                "[PHASE: workflow] [STEP: change_status] {}/{} -> '{}' refused: {}",
                container_id,
                request_id,
                status,
                e
            ),
        }
        result
    }

    /// Flattened key/value view of one request for the detail panel.
    pub fn detail_fields(&self, row: &RequestRow) -> Vec<DetailField> {
        let Ok(Value::Object(map)) = serde_json::to_value(&row.request) else {
            return Vec::new();
        };
        map.into_iter()
            .filter(|(key, _)| !HIDDEN_DETAIL_KEYS.contains(&key.as_str()))
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                DetailField {
                    is_link: is_link(&value),
                    key,
                    value,
                }
            })
            .collect()
    }
}

fn check_admin_change(
    request: &SubmittedRequest,
    to: RequestStatus,
    reason: Option<&str>,
) -> Result<(), StatusChangeError> {
    if request.status.is_declined() {
        return Err(StatusChangeError::AlreadyDeclined);
    }
    if request.status.is_terminal() || !RequestStatus::ADMIN_SELECTABLE.contains(&to) {
        return Err(StatusChangeError::InvalidTransition {
            from: request.status,
            to,
        });
    }
    if to == RequestStatus::Declined && reason.is_none() {
        return Err(StatusChangeError::ReasonRequired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryDocumentStore;
    use crate::workflow::repository::{sample_request, seed_request};
    use std::sync::Arc;

    async fn setup(
        status: RequestStatus,
    ) -> (AdminDashboard, Arc<MemoryDocumentStore>, String, String) {
        let docs = Arc::new(MemoryDocumentStore::new());
        let (container, request) =
            seed_request(docs.as_ref(), "userData", &sample_request("u1", status)).await;
        let dashboard = AdminDashboard::new(RequestRepository::new(docs.clone(), "userData"));
        (dashboard, docs, container, request)
    }

    #[tokio::test]
    async fn decline_is_final_and_refusals_do_not_write() {
        // INTENT: once declined, every later change attempt is rejected
        // with the warning and the store sees no write at all.
        let (admin, docs, container, request) = setup(RequestStatus::Pending).await;

        let declined = admin
            .change_status(&container, &request, RequestStatus::Declined, Some("Blurry ID"))
            .await
            .unwrap();
        assert_eq!(declined.status, RequestStatus::Declined);
        assert_eq!(declined.decline_reason.as_deref(), Some("Blurry ID"));

        let writes_after_decline = docs.write_count();
        let err = admin
            .change_status(&container, &request, RequestStatus::Processing, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StatusChangeError::AlreadyDeclined));
        assert_eq!(
            err.to_string(),
            "This document has already been declined and cannot be changed."
        );
        assert_eq!(docs.write_count(), writes_after_decline, "No write for a refused change");

        let stored = admin.repository().fetch(&container, &request).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Declined);
    }

    #[tokio::test]
    async fn declining_requires_a_reason() {
        let (admin, docs, container, request) = setup(RequestStatus::Processing).await;
        let before = docs.write_count();

        for reason in [None, Some("   ")] {
            let err = admin
                .change_status(&container, &request, RequestStatus::Declined, reason)
                .await
                .unwrap_err();
            assert!(matches!(err, StatusChangeError::ReasonRequired));
        }
        assert_eq!(docs.write_count(), before);
    }

    #[tokio::test]
    async fn owner_only_statuses_are_not_selectable() {
        let (admin, _, container, request) = setup(RequestStatus::ReadyForPickup).await;
        let err = admin
            .change_status(&container, &request, RequestStatus::Claimed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StatusChangeError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn active_list_hides_terminal_requests() {
        let docs = Arc::new(MemoryDocumentStore::new());
        for status in [
            RequestStatus::Pending,
            RequestStatus::Declined,
            RequestStatus::Claimed,
            RequestStatus::DeclineViewed,
        ] {
            seed_request(docs.as_ref(), "userData", &sample_request("u1", status)).await;
        }
        let admin = AdminDashboard::new(RequestRepository::new(docs, "userData"));

        let rows = admin
            .active_requests(
                &RequestFilter::default(),
                Some((SortKey::Status, SortOrder::Ascending)),
            )
            .await
            .unwrap();
        let statuses: Vec<RequestStatus> = rows.iter().map(|r| r.request.status).collect();
        assert_eq!(statuses, vec![RequestStatus::Declined, RequestStatus::Pending]);
    }

    #[tokio::test]
    async fn detail_fields_hide_bookkeeping_and_mark_links() {
        let (admin, _, container, request) = setup(RequestStatus::Pending).await;
        let mut row = admin
            .active_requests(&RequestFilter::default(), None)
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.container_id == container && r.request_id == request)
            .unwrap();
        row.request
            .form
            .insert("proof-of-payment-input", "C:\\fakepath\\proof.png");

        let fields = admin.detail_fields(&row);
        let keys: Vec<&str> = fields.iter().map(|f| f.key.as_str()).collect();
        assert!(!keys.contains(&"userId"));
        assert!(!keys.contains(&"proof-of-payment-input"));
        assert!(keys.contains(&"document-type"));

        let proof = fields.iter().find(|f| f.key == "proof-of-payment").unwrap();
        assert!(proof.is_link);
        let name = fields.iter().find(|f| f.key == "fullname").unwrap();
        assert!(!name.is_link);
        assert_eq!(name.value, "Juan Dela Cruz");
    }
}
