// Tracking view: the signed-in owner's active requests and the actions the
// owner can take on them.

use chrono::Utc;
use std::sync::Arc;

use super::repository::RequestRepository;
use super::StatusChangeError;
use crate::backend::{AuthProvider, BackendError};
use crate::models::record::DraftRecord;
use crate::models::request::{
    RequestRow, RequestStatus, SubmittedRequest, COPIES_KEY, DOCUMENT_TYPE_KEY, FOLLOW_UP_MARKER,
};

/// Keys the owner sees but cannot edit.
const READ_ONLY_KEYS: [&str; 4] = [DOCUMENT_TYPE_KEY, COPIES_KEY, "status", "requestDateTime"];

pub struct TrackingView {
    repo: RequestRepository,
    auth: Arc<dyn AuthProvider>,
}

impl TrackingView {
    pub fn new(repo: RequestRepository, auth: Arc<dyn AuthProvider>) -> Self {
        Self { repo, auth }
    }

    /// The owner's non-terminal requests, newest first. Empty when signed out.
    pub async fn active_requests(&self) -> Result<Vec<RequestRow>, BackendError> {
        let Some(user) = self.auth.current_user().await else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<RequestRow> = self
            .repo
            .list_rows()
            .await?
            .into_iter()
            .filter(|row| row.request.user_id == user.uid && !row.request.status.is_terminal())
            .collect();
        rows.sort_by(|a, b| b.request.requested_at.cmp(&a.request.requested_at));
        Ok(rows)
    }

    /// Update one of the signed-in user's records. Records of other users are
    /// reported as missing.
    async fn update_owned<F>(
        &self,
        container_id: &str,
        request_id: &str,
        mutate: F,
    ) -> Result<SubmittedRequest, StatusChangeError>
    where
        F: FnOnce(&mut SubmittedRequest) -> Result<(), StatusChangeError>,
    {
        let user = self
            .auth
            .current_user()
            .await
            .ok_or(StatusChangeError::NotSignedIn)?;
        self.repo
            .update_nested(container_id, request_id, |request| {
                if request.user_id != user.uid {
                    return Err(StatusChangeError::not_found(container_id, request_id));
                }
                mutate(request)
            })
            .await
    }

    /// `Ready for Pick-up -> Claimed`, stamping the claim time.
    pub async fn mark_claimed(
        &self,
        container_id: &str,
        request_id: &str,
    ) -> Result<SubmittedRequest, StatusChangeError> {
        let request = self
            .update_owned(container_id, request_id, |request| {
                transition(request, RequestStatus::ReadyForPickup, RequestStatus::Claimed)
            })
            .await?;
        log::info!(
            "[PHASE: workflow] [STEP: mark_claimed] {}/{} claimed",
            container_id,
            request_id
        );
        Ok(request)
    }

    /// `Declined -> Decline Viewed`. Returns the decline reason to show once.
    pub async fn acknowledge_decline(
        &self,
        container_id: &str,
        request_id: &str,
    ) -> Result<Option<String>, StatusChangeError> {
        let request = self
            .update_owned(container_id, request_id, |request| {
                transition(request, RequestStatus::Declined, RequestStatus::DeclineViewed)
            })
            .await?;
        log::info!(
            "[PHASE: workflow] [STEP: acknowledge_decline] {}/{} acknowledged",
            container_id,
            request_id
        );
        Ok(request.decline_reason)
    }

    /// One-time follow-up flag while the office is still working on it.
    pub async fn follow_up(
        &self,
        container_id: &str,
        request_id: &str,
    ) -> Result<SubmittedRequest, StatusChangeError> {
        self.update_owned(container_id, request_id, |request| {
            if request.is_followed_up() {
                return Err(StatusChangeError::AlreadyFollowedUp);
            }
            if !request.can_follow_up() {
                return Err(StatusChangeError::InvalidTransition {
                    from: request.status,
                    to: request.status,
                });
            }
            request.follow_up = Some(FOLLOW_UP_MARKER.to_string());
            Ok(())
        })
        .await
    }

    /// Merge edited form values into a still-pending request.
    pub async fn save_edits(
        &self,
        container_id: &str,
        request_id: &str,
        edits: DraftRecord,
    ) -> Result<SubmittedRequest, StatusChangeError> {
        if let Some((key, _)) = edits
            .iter()
            .find(|(key, _)| READ_ONLY_KEYS.contains(&key.as_str()))
        {
            return Err(StatusChangeError::ReadOnlyField(key.clone()));
        }
        self.update_owned(container_id, request_id, |request| {
            if request.status != RequestStatus::Pending {
                return Err(StatusChangeError::NotEditable);
            }
            request.form.merge(&edits);
            Ok(())
        })
        .await
    }
}

fn transition(
    request: &mut SubmittedRequest,
    from: RequestStatus,
    to: RequestStatus,
) -> Result<(), StatusChangeError> {
    if request.status != from {
        return Err(StatusChangeError::InvalidTransition {
            from: request.status,
            to,
        });
    }
    request.status = to;
    request.claimed_at = Some(Utc::now());
    Ok(())
}
