// Commit routine
//
// Runs once, when the wizard leaves its second-to-last step. All buffered files
// are uploaded concurrently; only when every upload has produced a download URL
// is the request written, as one new container document holding one nested
// record. Blobs uploaded before a failure are left behind.

use async_trait::async_trait;
use chrono::Utc;
use futures::future::try_join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use super::files::FileMap;
use crate::account::find_profile;
use crate::backend::{BackendError, JsonMap, Services};
use crate::config::Collections;
use crate::models::record::DraftRecord;
use crate::models::request::{DocumentType, SubmittedRequest};
use crate::utils::logging::mask_sensitive;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub container_id: String,
    pub request_id: String,
    pub folder_id: String,
    /// `slot -> download URL` for every uploaded slot.
    pub uploads: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("You must be signed in to submit a request.")]
    NotSignedIn,
    #[error("Uploading '{slot}' failed: {source}")]
    Upload {
        slot: String,
        #[source]
        source: BackendError,
    },
    #[error("Saving the request failed: {0}")]
    Write(#[source] BackendError),
    #[error("The request could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CommitError {
    /// Detail for logs; the Display text is what a user may see.
    pub fn internal_details(&self) -> String {
        match self {
            CommitError::Upload { slot, source } => {
                format!("slot '{}': {}", slot, source.internal_details)
            }
            CommitError::Write(source) => source.internal_details.clone(),
            other => other.to_string(),
        }
    }
}

/// Side-effecting submission step awaited by the step controller.
#[async_trait]
pub trait CommitRoutine: Send + Sync {
    async fn commit(&self, draft: DraftRecord, files: FileMap)
        -> Result<CommitReceipt, CommitError>;
}

/// Commit against the configured backend services.
pub struct BackendCommit {
    services: Services,
    collections: Collections,
    document_type: DocumentType,
}

impl BackendCommit {
    pub fn new(services: Services, collections: Collections, document_type: DocumentType) -> Self {
        Self {
            services,
            collections,
            document_type,
        }
    }

    async fn upload_one(
        &self,
        path: String,
        slot: String,
        bytes: std::sync::Arc<Vec<u8>>,
    ) -> Result<(String, String), CommitError> {
        let upload = async {
            let blob = self.services.blobs.put(&path, &bytes).await?;
            self.services.blobs.download_url(&blob).await
        };
        match upload.await {
            Ok(url) => {
                log::debug!(
                    "[PHASE: wizard] [STEP: upload] Uploaded '{}' ({} bytes)",
                    path,
                    bytes.len()
                );
                Ok((slot, url))
            }
            Err(source) => Err(CommitError::Upload { slot, source }),
        }
    }
}

#[async_trait]
impl CommitRoutine for BackendCommit {
    async fn commit(
        &self,
        mut draft: DraftRecord,
        files: FileMap,
    ) -> Result<CommitReceipt, CommitError> {
        let user = self
            .services
            .auth
            .current_user()
            .await
            .ok_or(CommitError::NotSignedIn)?;

        let folder_id = Uuid::new_v4().to_string();
        let prefix = self.document_type.storage_prefix();
        log::info!(
            "[PHASE: wizard] [STEP: commit] Submitting {} request for {} with {} slot(s)",
            self.document_type,
            mask_sensitive(&user.uid),
            files.len()
        );

        let folder = folder_id.as_str();
        let uploads = files.iter().flat_map(|(slot, picked)| {
            picked.iter().map(move |file| {
                let path = format!("{}/{}/{}", prefix, folder, file.file_name);
                self.upload_one(path, slot.clone(), file.bytes.clone())
            })
        });
        let resolved = try_join_all(uploads).await.map_err(|e| {
            log::error!(
                "[PHASE: wizard] [STEP: upload] Upload failed, request not written: {}",
                e.internal_details()
            );
            e
        })?;

        // A slot with several files keeps the URL of the last one.
        let uploads: BTreeMap<String, String> = resolved.into_iter().collect();
        for (slot, url) in &uploads {
            draft.insert(slot.clone(), url.clone());
        }

        let profile = match find_profile(
            self.services.documents.as_ref(),
            &self.collections.profiles,
            &user.uid,
        )
        .await
        {
            Ok(p) => p,
            Err(e) => {
                log::warn!(
                    "[PHASE: wizard] [STEP: commit] Profile lookup failed, submitting without snapshot: {}",
                    e.internal_details
                );
                None
            }
        };

        let request =
            SubmittedRequest::from_draft(
                self.document_type,
                draft,
                user.uid.clone(),
                profile,
                Utc::now(),
            );
        let request_id = Uuid::new_v4().to_string();
        let mut container = JsonMap::new();
        container.insert(request_id.clone(), serde_json::to_value(&request)?);

        let container_id = self
            .services
            .documents
            .add_document(&self.collections.requests, container)
            .await
            .map_err(|e| {
                log::error!(
                    "[PHASE: wizard] [STEP: commit] Request write failed: {}",
                    e.internal_details
                );
                CommitError::Write(e)
            })?;

        log::info!(
            "[PHASE: wizard] [STEP: commit] Request {} stored in container {}",
            request_id,
            container_id
        );
        Ok(CommitReceipt {
            container_id,
            request_id,
            folder_id,
            uploads,
        })
    }
}

/// Decode one container document into `(request_id, request)` pairs, skipping
/// entries that are not request records.
pub fn decode_container(container_id: &str, data: &JsonMap) -> Vec<(String, SubmittedRequest)> {
    data.iter()
        .filter_map(|(request_id, value)| match value {
            Value::Object(_) => match serde_json::from_value::<SubmittedRequest>(value.clone()) {
                Ok(req) => Some((request_id.clone(), req)),
                Err(e) => {
                    log::warn!(
                        "[PHASE: backend] [STEP: decode] Skipping {}/{}: {}",
                        container_id,
                        request_id,
                        e
                    );
                    None
                }
            },
            _ => None,
        })
        .collect()
}
