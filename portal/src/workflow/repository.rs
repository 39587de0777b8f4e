// Request repository
//
// Reads flatten every container into `RequestRow`s. Writes are
// read-modify-write of one nested record: the record is fetched, mutated in
// memory and written back under its key with a shallow container update.
// There is no optimistic concurrency control; two clients editing the same
// nested record concurrently will overwrite each other (last write wins).

use std::sync::Arc;

use crate::backend::{BackendError, CollectionSubscription, DocumentStore, JsonMap};
use crate::models::request::{RequestRow, SubmittedRequest};
use crate::wizard::commit::decode_container;

#[derive(Clone)]
pub struct RequestRepository {
    documents: Arc<dyn DocumentStore>,
    collection: String,
}

impl RequestRepository {
    pub fn new(documents: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            documents,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Every nested request in every container.
    pub async fn list_rows(&self) -> Result<Vec<RequestRow>, BackendError> {
        let docs = self.documents.get_all(&self.collection).await?;
        let rows: Vec<RequestRow> = docs
            .iter()
            .flat_map(|doc| {
                decode_container(&doc.id, &doc.data)
                    .into_iter()
                    .map(|(request_id, request)| RequestRow {
                        container_id: doc.id.clone(),
                        request_id,
                        request,
                    })
            })
            .collect();
        log::debug!(
            "[PHASE: workflow] [STEP: list_rows] {} requests in {} containers",
            rows.len(),
            docs.len()
        );
        Ok(rows)
    }

    /// All nested requests of one container. Empty when the container is gone.
    pub async fn container_rows(
        &self,
        container_id: &str,
    ) -> Result<Vec<RequestRow>, BackendError> {
        let Some(data) = self
            .documents
            .get_document(&self.collection, container_id)
            .await?
        else {
            return Ok(Vec::new());
        };
        Ok(decode_container(container_id, &data)
            .into_iter()
            .map(|(request_id, request)| RequestRow {
                container_id: container_id.to_string(),
                request_id,
                request,
            })
            .collect())
    }

    pub async fn fetch(
        &self,
        container_id: &str,
        request_id: &str,
    ) -> Result<Option<SubmittedRequest>, BackendError> {
        Ok(self
            .container_rows(container_id)
            .await?
            .into_iter()
            .find(|row| row.request_id == request_id)
            .map(|row| row.request))
    }

    /// Read the record, let `mutate` change it, write it back.
    ///
    /// `mutate` returning an error (or the record being absent) means nothing
    /// is written.
    pub async fn update_nested<F, E>(
        &self,
        container_id: &str,
        request_id: &str,
        mutate: F,
    ) -> Result<SubmittedRequest, E>
    where
        F: FnOnce(&mut SubmittedRequest) -> Result<(), E>,
        E: From<BackendError>,
    {
        let mut request = self
            .fetch(container_id, request_id)
            .await?
            .ok_or_else(|| BackendError::not_found(&self.collection, container_id))?;

        mutate(&mut request)?;

        let value = serde_json::to_value(&request).map_err(|e| {
            BackendError::new(
                "The request could not be saved.",
                format!("Encoding {}/{} failed: {}", container_id, request_id, e),
            )
        })?;
        let mut patch = JsonMap::new();
        patch.insert(request_id.to_string(), value);
        self.documents
            .update_document(&self.collection, container_id, patch)
            .await?;

        log::info!(
            "[PHASE: workflow] [STEP: update_nested] {}/{} saved with status '{}'",
            container_id,
            request_id,
            request.status
        );
        Ok(request)
    }

    pub async fn delete_container(&self, container_id: &str) -> Result<(), BackendError> {
        self.documents
            .delete_document(&self.collection, container_id)
            .await?;
        log::info!(
            "[PHASE: workflow] [STEP: delete_container] Container {} deleted",
            container_id
        );
        Ok(())
    }

    /// Live change notifications for the request collection.
    pub fn subscribe(&self) -> CollectionSubscription {
        self.documents.subscribe(&self.collection)
    }
}

/// Store one request in a fresh container, the way a submission does.
/// Returns `(container_id, request_id)`.
#[cfg(test)]
pub(crate) async fn seed_request(
    documents: &dyn DocumentStore,
    collection: &str,
    request: &SubmittedRequest,
) -> (String, String) {
    let request_id = crate::backend::new_document_id();
    let mut container = JsonMap::new();
    container.insert(
        request_id.clone(),
        serde_json::to_value(request).unwrap_or(serde_json::Value::Null),
    );
    let container_id = documents.add_document(collection, container).await.unwrap();
    (container_id, request_id)
}

#[cfg(test)]
pub(crate) fn sample_request(
    user_id: &str,
    status: crate::models::request::RequestStatus,
) -> SubmittedRequest {
    use crate::models::record::DraftRecord;
    use crate::models::request::DocumentType;

    let mut draft = DraftRecord::new();
    draft.insert("fullname", "Juan Dela Cruz");
    draft.insert("residency-purpose", "School requirement");
    draft.insert("proof-of-payment", "https://files.example/proof.png");
    let mut request = SubmittedRequest::from_draft(
        DocumentType::Residency,
        draft,
        user_id,
        None,
        chrono::Utc::now(),
    );
    request.status = status;
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryDocumentStore;
    use crate::backend::ChangeKind;
    use crate::models::request::RequestStatus;
    use serde_json::Value;

    #[tokio::test]
    async fn rows_are_flattened_and_garbage_entries_skipped() {
        let docs = Arc::new(MemoryDocumentStore::new());
        let repo = RequestRepository::new(docs.clone(), "userData");
        let (container, request_id) = seed_request(
            docs.as_ref(),
            "userData",
            &sample_request("u1", RequestStatus::Pending),
        )
        .await;

        let mut junk = JsonMap::new();
        junk.insert("note".to_string(), Value::String("not a request".to_string()));
        docs.update_document("userData", &container, junk).await.unwrap();

        let rows = repo.list_rows().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key(), format!("{}/{}", container, request_id));
    }

    #[tokio::test]
    async fn update_nested_writes_only_when_mutation_succeeds() {
        let docs = Arc::new(MemoryDocumentStore::new());
        let repo = RequestRepository::new(docs.clone(), "userData");
        let (container, request_id) = seed_request(
            docs.as_ref(),
            "userData",
            &sample_request("u1", RequestStatus::Pending),
        )
        .await;
        let writes_before = docs.write_count();

        let refused: Result<SubmittedRequest, BackendError> = repo
            .update_nested(&container, &request_id, |_| {
                Err(BackendError::new("refused", "test refusal"))
            })
            .await;
        assert!(refused.is_err());
        assert_eq!(docs.write_count(), writes_before, "A refused mutation must not write");

        let updated: SubmittedRequest = repo
            .update_nested::<_, BackendError>(&container, &request_id, |r| {
                r.status = RequestStatus::Processing;
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(updated.status, RequestStatus::Processing);
        assert_eq!(
            repo.fetch(&container, &request_id).await.unwrap().unwrap().status,
            RequestStatus::Processing
        );
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let docs = Arc::new(MemoryDocumentStore::new());
        let repo = RequestRepository::new(docs.clone(), "userData");
        let result = repo
            .update_nested::<_, BackendError>("nope", "nope", |_| Ok(()))
            .await;
        assert!(result.is_err());
        assert!(repo.fetch("nope", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_container_is_published() {
        let docs = Arc::new(MemoryDocumentStore::new());
        let repo = RequestRepository::new(docs.clone(), "userData");
        let (container, _) = seed_request(
            docs.as_ref(),
            "userData",
            &sample_request("u1", RequestStatus::Claimed),
        )
        .await;

        let mut sub = repo.subscribe();
        repo.delete_container(&container).await.unwrap();

        let change = sub.try_changed().unwrap();
        assert_eq!(change.document_id, container);
        assert_eq!(change.kind, ChangeKind::Removed);
        assert!(repo.list_rows().await.unwrap().is_empty());
    }
}
