// Backend capability seams
//
// Everything the portal persists goes through three traits: a document collection
// store, a blob store and an auth provider. Production-shaped adapters live in the
// submodules; tests plug in stubs with call counters.

pub mod json_file;
pub mod local_blob;
pub mod memory;
pub mod session_auth;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Raw document body as stored in a collection.
pub type JsonMap = Map<String, Value>;

/// Capacity of the change feed shared by all collections of one store.
pub const CHANGE_FEED_CAPACITY: usize = 256;

// =============================================================================
// Errors
// =============================================================================

/// Error returned by backend adapters.
/// Keeps user-friendly messages separate from internal details.
#[derive(Debug, Clone)]
pub struct BackendError {
    /// User-friendly message (safe to show in UI)
    pub user_message: String,
    /// Internal details for logging (may contain masked info)
    pub internal_details: String,
}

impl BackendError {
    pub fn new(user_message: impl Into<String>, internal_details: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            internal_details: internal_details.into(),
        }
    }

    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::new(
            "The requested record no longer exists.",
            format!("Document '{}' not found in collection '{}'", id, collection),
        )
    }

    pub fn io(context: &str, err: impl std::fmt::Display) -> Self {
        Self::new(
            "Storage is temporarily unavailable. Please try again.",
            format!("{}: {}", context, err),
        )
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.user_message)
    }
}

impl std::error::Error for BackendError {}

// =============================================================================
// Document store
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: JsonMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
    /// The subscriber fell behind; it should re-read the whole collection.
    Resync,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionChange {
    pub collection: String,
    pub document_id: String,
    pub kind: ChangeKind,
}

/// Hosted document database capability.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document under a fresh id and return that id.
    async fn add_document(&self, collection: &str, data: JsonMap) -> Result<String, BackendError>;

    async fn get_all(&self, collection: &str) -> Result<Vec<Document>, BackendError>;

    async fn get_document(&self, collection: &str, id: &str)
        -> Result<Option<JsonMap>, BackendError>;

    /// Shallow key merge into an existing document. Fails if the document is absent.
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        partial: JsonMap,
    ) -> Result<(), BackendError>;

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), BackendError>;

    /// Raw change feed for every collection in this store.
    fn changes(&self) -> broadcast::Receiver<CollectionChange>;

    /// Live subscription to one collection.
    fn subscribe(&self, collection: &str) -> CollectionSubscription {
        CollectionSubscription {
            collection: collection.to_string(),
            rx: self.changes(),
        }
    }
}

/// Filtered view over a store's change feed.
pub struct CollectionSubscription {
    collection: String,
    rx: broadcast::Receiver<CollectionChange>,
}

impl CollectionSubscription {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Wait for the next change to this collection. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<CollectionChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.collection == self.collection => return Some(change),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!(
                        "[PHASE: backend] [STEP: subscribe] Subscriber for '{}' lagged by {} changes",
                        self.collection,
                        skipped
                    );
                    return Some(CollectionChange {
                        collection: self.collection.clone(),
                        document_id: String::new(),
                        kind: ChangeKind::Resync,
                    });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking check used by polling UIs.
    pub fn try_changed(&mut self) -> Option<CollectionChange> {
        loop {
            match self.rx.try_recv() {
                Ok(change) if change.collection == self.collection => return Some(change),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    return Some(CollectionChange {
                        collection: self.collection.clone(),
                        document_id: String::new(),
                        kind: ChangeKind::Resync,
                    })
                }
                Err(_) => return None,
            }
        }
    }
}

/// Shallow merge used by every adapter's `update_document`.
pub(crate) fn shallow_merge(target: &mut JsonMap, partial: JsonMap) {
    for (k, v) in partial {
        target.insert(k, v);
    }
}

/// Ids for new documents. Opaque to callers.
pub(crate) fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

// =============================================================================
// Blob store
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobRef {
    pub path: String,
}

/// Hosted file storage capability.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<BlobRef, BackendError>;

    async fn download_url(&self, blob: &BlobRef) -> Result<String, BackendError>;
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

/// Hosted authentication capability.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_user(&self) -> Option<AuthUser>;

    fn auth_state(&self) -> watch::Receiver<Option<AuthUser>>;

    async fn send_password_reset_email(&self, email: &str) -> Result<(), BackendError>;
}

// =============================================================================
// Bundle
// =============================================================================

/// The three capabilities, passed explicitly to every component that needs them.
#[derive(Clone)]
pub struct Services {
    pub documents: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Services {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self {
            documents,
            blobs,
            auth,
        }
    }

    /// Fully in-process bundle, used by smoke modes and tests.
    pub fn in_memory() -> (Self, Arc<session_auth::SessionAuth>) {
        let auth = Arc::new(session_auth::SessionAuth::new());
        let services = Self::new(
            Arc::new(memory::MemoryDocumentStore::new()),
            Arc::new(memory::MemoryBlobStore::new()),
            auth.clone(),
        );
        (services, auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_display_hides_internal_details() {
        let err = BackendError::io("write userData.json", "permission denied (os error 13)");
        let shown = err.to_string();
        assert!(
            !shown.contains("os error"),
            "Internal details must not reach the UI: {}",
            shown
        );
        assert!(err.internal_details.contains("userData.json"));
    }

    #[tokio::test]
    async fn subscription_filters_other_collections() {
        let (tx, _) = broadcast::channel(8);
        let mut sub = CollectionSubscription {
            collection: "userData".to_string(),
            rx: tx.subscribe(),
        };

        tx.send(CollectionChange {
            collection: "hotlines".to_string(),
            document_id: "h1".to_string(),
            kind: ChangeKind::Added,
        })
        .unwrap();
        tx.send(CollectionChange {
            collection: "userData".to_string(),
            document_id: "c1".to_string(),
            kind: ChangeKind::Modified,
        })
        .unwrap();

        let change = sub.changed().await.unwrap();
        assert_eq!(change.document_id, "c1");
        assert_eq!(change.kind, ChangeKind::Modified);
        assert!(sub.try_changed().is_none());
    }
}
