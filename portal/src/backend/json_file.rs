// File-backed document store
//
// One JSON object per collection at `<root>/<collection>.json`, mapping document
// ids to document bodies. Every write rewrites the whole file through a temp file
// and a rename. Writes are serialized by a process-local lock only; two processes
// sharing the same directory will clobber each other.

use anyhow::Context;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, Mutex};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use super::{
    new_document_id, shallow_merge, BackendError, ChangeKind, CollectionChange, Document,
    DocumentStore, JsonMap, CHANGE_FEED_CAPACITY,
};
use crate::utils::validation::validate_collection_name;

type CollectionFile = BTreeMap<String, JsonMap>;

pub struct JsonFileDocumentStore {
    root: PathBuf,
    lock: Mutex<()>,
    changes: broadcast::Sender<CollectionChange>,
}

impl JsonFileDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            root: root.into(),
            lock: Mutex::new(()),
            changes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf, BackendError> {
        validate_collection_name(collection).map_err(|e| {
            BackendError::new(
                "The requested collection is not available.",
                format!("Rejected collection name: {}", e),
            )
        })?;
        Ok(self.root.join(format!("{}.json", collection)))
    }

    async fn load(&self, collection: &str) -> Result<CollectionFile, BackendError> {
        let path = self.collection_path(collection)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Ok(CollectionFile::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                BackendError::new(
                    "Stored data could not be read.",
                    format!("Corrupt collection file {:?}: {}", path, e),
                )
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CollectionFile::new()),
            Err(e) => Err(BackendError::io(&format!("read {:?}", path), e)),
        }
    }

    async fn save(&self, collection: &str, docs: &CollectionFile) -> Result<(), BackendError> {
        let path = self.collection_path(collection)?;
        let encoded = serde_json::to_vec_pretty(docs)
            .map_err(|e| BackendError::io("encode collection", e))?;

        let write_action = || async {
            tokio::fs::create_dir_all(&self.root)
                .await
                .with_context(|| format!("Failed to create data directory: {:?}", self.root))?;
            let tmp = path.with_extension("json.tmp");
            tokio::fs::write(&tmp, &encoded)
                .await
                .with_context(|| format!("Failed to write {:?}", tmp))?;
            tokio::fs::rename(&tmp, &path)
                .await
                .with_context(|| format!("Failed to replace {:?}", path))?;
            Ok::<(), anyhow::Error>(())
        };

        let retry_strategy = ExponentialBackoff::from_millis(50)
            .factor(2)
            .max_delay(std::time::Duration::from_millis(750))
            .take(3)
            .map(jitter);

        RetryIf::spawn(retry_strategy, write_action, is_transient_io_error)
            .await
            .map_err(|e| {
                log::error!(
                    "[PHASE: backend] [STEP: save] Writing collection '{}' failed: {:#}",
                    collection,
                    e
                );
                BackendError::io(&format!("save collection '{}'", collection), format!("{:#}", e))
            })
    }

    fn notify(&self, collection: &str, id: &str, kind: ChangeKind) {
        let _ = self.changes.send(CollectionChange {
            collection: collection.to_string(),
            document_id: id.to_string(),
            kind,
        });
    }
}

/// Lock and sharing errors are worth retrying; everything else fails fast.
pub(crate) fn is_transient_io_error(err: &anyhow::Error) -> bool {
    let transient_kind = err.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .map(|io| {
                matches!(
                    io.kind(),
                    std::io::ErrorKind::Interrupted
                        | std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::TimedOut
                )
            })
            .unwrap_or(false)
    });
    let text = format!("{:#}", err).to_ascii_lowercase();
    transient_kind
        || text.contains("used by another process")
        || text.contains("access is denied")
        || text.contains("sharing violation")
        || text.contains("resource busy")
}

#[async_trait]
impl DocumentStore for JsonFileDocumentStore {
    async fn add_document(&self, collection: &str, data: JsonMap) -> Result<String, BackendError> {
        let _guard = self.lock.lock().await;
        let mut docs = self.load(collection).await?;
        let id = new_document_id();
        docs.insert(id.clone(), data);
        self.save(collection, &docs).await?;
        self.notify(collection, &id, ChangeKind::Added);
        log::debug!(
            "[PHASE: backend] [STEP: add] Added document {} to '{}'",
            id,
            collection
        );
        Ok(id)
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<Document>, BackendError> {
        let _guard = self.lock.lock().await;
        let docs = self.load(collection).await?;
        Ok(docs
            .into_iter()
            .map(|(id, data)| Document { id, data })
            .collect())
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<JsonMap>, BackendError> {
        let _guard = self.lock.lock().await;
        let mut docs = self.load(collection).await?;
        Ok(docs.remove(id))
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        partial: JsonMap,
    ) -> Result<(), BackendError> {
        let _guard = self.lock.lock().await;
        let mut docs = self.load(collection).await?;
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| BackendError::not_found(collection, id))?;
        shallow_merge(doc, partial);
        self.save(collection, &docs).await?;
        self.notify(collection, id, ChangeKind::Modified);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), BackendError> {
        let _guard = self.lock.lock().await;
        let mut docs = self.load(collection).await?;
        if docs.remove(id).is_some() {
            self.save(collection, &docs).await?;
            self.notify(collection, id, ChangeKind::Removed);
        }
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<CollectionChange> {
        self.changes.subscribe()
    }
}
