// In-process document and blob stores.
//
// Used by smoke modes and tests. Behaves like the hosted backend for every
// operation the portal relies on, including the live change feed.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::{broadcast, Mutex};

use super::{
    new_document_id, shallow_merge, BackendError, BlobRef, BlobStore, ChangeKind,
    CollectionChange, Document, DocumentStore, JsonMap, CHANGE_FEED_CAPACITY,
};

pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, BTreeMap<String, JsonMap>>>,
    changes: broadcast::Sender<CollectionChange>,
    writes: AtomicU32,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            collections: Mutex::new(HashMap::new()),
            changes,
            writes: AtomicU32::new(0),
        }
    }

    /// Number of add/update/delete calls that reached the store.
    pub fn write_count(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }

    fn notify(&self, collection: &str, id: &str, kind: ChangeKind) {
        // No subscribers is fine.
        let _ = self.changes.send(CollectionChange {
            collection: collection.to_string(),
            document_id: id.to_string(),
            kind,
        });
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn add_document(&self, collection: &str, data: JsonMap) -> Result<String, BackendError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let id = new_document_id();
        {
            let mut guard = self.collections.lock().await;
            guard
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), data);
        }
        self.notify(collection, &id, ChangeKind::Added);
        Ok(id)
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<Document>, BackendError> {
        let guard = self.collections.lock().await;
        Ok(guard
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<JsonMap>, BackendError> {
        let guard = self.collections.lock().await;
        Ok(guard.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        partial: JsonMap,
    ) -> Result<(), BackendError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        {
            let mut guard = self.collections.lock().await;
            let doc = guard
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| BackendError::not_found(collection, id))?;
            shallow_merge(doc, partial);
        }
        self.notify(collection, id, ChangeKind::Modified);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), BackendError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let removed = {
            let mut guard = self.collections.lock().await;
            guard
                .get_mut(collection)
                .and_then(|docs| docs.remove(id))
                .is_some()
        };
        if removed {
            self.notify(collection, id, ChangeKind::Removed);
        }
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<CollectionChange> {
        self.changes.subscribe()
    }
}

/// Blob store that keeps bytes in memory and hands out `memory://` URLs.
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    puts: AtomicU32,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            puts: AtomicU32::new(0),
        }
    }

    pub fn put_count(&self) -> u32 {
        self.puts.load(Ordering::SeqCst)
    }

    pub async fn bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.lock().await.get(path).cloned()
    }

    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.blobs.lock().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<BlobRef, BackendError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.blobs
            .lock()
            .await
            .insert(path.to_string(), bytes.to_vec());
        Ok(BlobRef {
            path: path.to_string(),
        })
    }

    async fn download_url(&self, blob: &BlobRef) -> Result<String, BackendError> {
        if !self.blobs.lock().await.contains_key(&blob.path) {
            return Err(BackendError::new(
                "The uploaded file could not be found.",
                format!("No blob stored at '{}'", blob.path),
            ));
        }
        Ok(format!("memory://blobs/{}", blob.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: serde_json::Value) -> JsonMap {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn update_merges_top_level_keys_only() {
        let store = MemoryDocumentStore::new();
        let id = store
            .add_document("userData", map(json!({"a": {"status": "Pending"}, "b": 1})))
            .await
            .unwrap();

        store
            .update_document("userData", &id, map(json!({"a": {"status": "Claimed"}})))
            .await
            .unwrap();

        let doc = store.get_document("userData", &id).await.unwrap().unwrap();
        assert_eq!(doc["a"], json!({"status": "Claimed"}));
        assert_eq!(doc["b"], json!(1), "Untouched keys must survive the merge");
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn update_of_missing_document_fails() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update_document("userData", "nope", JsonMap::new())
            .await
            .unwrap_err();
        assert!(err.internal_details.contains("nope"));
    }

    #[tokio::test]
    async fn writes_are_published_to_subscribers() {
        let store = MemoryDocumentStore::new();
        let mut sub = store.subscribe("hotlines");

        let id = store
            .add_document("hotlines", map(json!({"description": "Fire", "number": "911"})))
            .await
            .unwrap();
        let change = sub.changed().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Added);
        assert_eq!(change.document_id, id);

        store.delete_document("hotlines", &id).await.unwrap();
        assert_eq!(sub.changed().await.unwrap().kind, ChangeKind::Removed);
        assert!(store.get_all("hotlines").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blob_urls_require_an_existing_blob() {
        let blobs = MemoryBlobStore::new();
        let r = blobs.put("Residency-Upload/f/id.png", b"png").await.unwrap();
        assert_eq!(
            blobs.download_url(&r).await.unwrap(),
            "memory://blobs/Residency-Upload/f/id.png"
        );
        let ghost = BlobRef {
            path: "missing".to_string(),
        };
        assert!(blobs.download_url(&ghost).await.is_err());
    }
}
