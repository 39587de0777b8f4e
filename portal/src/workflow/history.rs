// History view: the owner's finished (claimed or acknowledged) requests.

use std::sync::Arc;

use super::query::{apply, RequestFilter};
use super::repository::RequestRepository;
use super::StatusChangeError;
use crate::backend::{AuthProvider, BackendError};
use crate::models::request::RequestRow;
use crate::utils::logging::mask_sensitive;

pub struct HistoryView {
    repo: RequestRepository,
    auth: Arc<dyn AuthProvider>,
}

impl HistoryView {
    pub fn new(repo: RequestRepository, auth: Arc<dyn AuthProvider>) -> Self {
        Self { repo, auth }
    }

    /// Terminal requests of the signed-in user, most recently closed first.
    pub async fn requests(&self) -> Result<Vec<RequestRow>, BackendError> {
        self.filtered(&RequestFilter::default()).await
    }

    pub async fn filtered(&self, filter: &RequestFilter) -> Result<Vec<RequestRow>, BackendError> {
        let Some(user) = self.auth.current_user().await else {
            return Ok(Vec::new());
        };
        let rows: Vec<RequestRow> = self
            .repo
            .list_rows()
            .await?
            .into_iter()
            .filter(|row| row.request.user_id == user.uid && row.request.status.is_terminal())
            .collect();
        let mut rows = apply(rows, filter, None);
        rows.sort_by(|a, b| {
            let closed = |r: &RequestRow| r.request.claimed_at.unwrap_or(r.request.requested_at);
            closed(b).cmp(&closed(a))
        });
        Ok(rows)
    }

    /// Delete a whole container from history. Every record in it must belong
    /// to the signed-in user and be terminal.
    pub async fn purge(&self, container_id: &str) -> Result<(), StatusChangeError> {
        let user = self
            .auth
            .current_user()
            .await
            .ok_or(StatusChangeError::NotSignedIn)?;
        let rows = self.repo.container_rows(container_id).await?;

        if rows.is_empty() || rows.iter().any(|r| r.request.user_id != user.uid) {
            return Err(StatusChangeError::not_found(container_id, ""));
        }
        if rows.iter().any(|r| !r.request.status.is_terminal()) {
            return Err(StatusChangeError::NotTerminal);
        }

        self.repo.delete_container(container_id).await?;
        log::info!(
            "[PHASE: workflow] [STEP: purge] {} removed {} from history",
            mask_sensitive(&user.uid),
            container_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryDocumentStore;
    use crate::backend::session_auth::SessionAuth;
    use crate::backend::{AuthUser, DocumentStore};
    use crate::models::request::RequestStatus;
    use crate::workflow::repository::{sample_request, seed_request};

    async fn setup() -> (HistoryView, Arc<MemoryDocumentStore>, Arc<SessionAuth>) {
        let docs = Arc::new(MemoryDocumentStore::new());
        let auth = Arc::new(SessionAuth::new());
        auth.sign_in(AuthUser {
            uid: "u1".to_string(),
            email: "owner@example.com".to_string(),
        })
        .await;
        let view = HistoryView::new(RequestRepository::new(docs.clone(), "userData"), auth.clone());
        (view, docs, auth)
    }

    #[tokio::test]
    async fn only_own_terminal_requests_are_listed() {
        let (history, docs, _) = setup().await;
        for (uid, status) in [
            ("u1", RequestStatus::Claimed),
            ("u1", RequestStatus::DeclineViewed),
            ("u1", RequestStatus::Declined),
            ("u2", RequestStatus::Claimed),
        ] {
            seed_request(docs.as_ref(), "userData", &sample_request(uid, status)).await;
        }

        let rows = history.requests().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.request.user_id == "u1" && r.request.status.is_terminal()));

        let only_claimed = history
            .filtered(&RequestFilter {
                status: Some(RequestStatus::Claimed),
                ..RequestFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(only_claimed.len(), 1);
    }

    #[tokio::test]
    async fn purge_deletes_finished_containers_only() {
        let (history, docs, _) = setup().await;
        let (done, _) = seed_request(
            docs.as_ref(),
            "userData",
            &sample_request("u1", RequestStatus::Claimed),
        )
        .await;
        let (open, _) = seed_request(
            docs.as_ref(),
            "userData",
            &sample_request("u1", RequestStatus::Processing),
        )
        .await;
        let (foreign, _) = seed_request(
            docs.as_ref(),
            "userData",
            &sample_request("u2", RequestStatus::Claimed),
        )
        .await;

        let before = docs.write_count();
        assert!(matches!(history.purge(&open).await, Err(StatusChangeError::NotTerminal)));
        assert!(matches!(
            history.purge(&foreign).await,
            Err(StatusChangeError::NotFound { .. })
        ));
        assert_eq!(docs.write_count(), before);

        history.purge(&done).await.unwrap();
        assert!(history.requests().await.unwrap().is_empty());
        assert!(docs.get_document("userData", &done).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn signed_out_history_is_empty() {
        let (history, docs, auth) = setup().await;
        seed_request(
            docs.as_ref(),
            "userData",
            &sample_request("u1", RequestStatus::Claimed),
        )
        .await;
        auth.sign_out();
        assert!(history.requests().await.unwrap().is_empty());
    }
}
