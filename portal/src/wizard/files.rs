// Pending file buffer
//
// Files picked in upload slots stay in memory until the commit routine uploads
// them. Handles are cheap to clone and share one buffer.

use anyhow::Context;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

use crate::utils::validation::sanitize_file_name;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub file_name: String,
    pub bytes: Arc<Vec<u8>>,
}

impl PendingFile {
    pub fn new(file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: sanitize_file_name(file_name),
            bytes: Arc::new(bytes),
        }
    }

    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read selected file: {:?}", path))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(&name, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// `slot -> selected files`, in selection order.
pub type FileMap = BTreeMap<String, Vec<PendingFile>>;

#[derive(Debug, Clone)]
pub struct PendingFiles {
    tx: Arc<watch::Sender<FileMap>>,
}

impl PendingFiles {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(FileMap::new());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> FileMap {
        self.tx.borrow().clone()
    }

    pub fn slot(&self, slot: &str) -> Vec<PendingFile> {
        self.tx.borrow().get(slot).cloned().unwrap_or_default()
    }

    pub fn is_filled(&self, slot: &str) -> bool {
        slot_filled(&self.tx.borrow(), slot)
    }

    /// Replace the selection for `slot`.
    pub fn select(&self, slot: &str, files: Vec<PendingFile>) {
        self.tx.send_modify(|map| {
            map.insert(slot.to_string(), files);
        });
    }

    /// Drop one file from `slot` by name. Returns whether anything was removed.
    pub fn cancel(&self, slot: &str, file_name: &str) -> bool {
        let mut removed = false;
        self.tx.send_modify(|map| {
            if let Some(files) = map.get_mut(slot) {
                let before = files.len();
                files.retain(|f| f.file_name != file_name);
                removed = files.len() != before;
            }
        });
        removed
    }

    /// Shallow merge of several slots at once.
    pub fn merge(&self, patch: &FileMap) {
        self.tx.send_modify(|map| {
            for (slot, files) in patch {
                map.insert(slot.clone(), files.clone());
            }
        });
    }

    /// Hand the whole buffer over and leave it empty.
    pub fn take_all(&self) -> FileMap {
        let mut taken = FileMap::new();
        self.tx.send_modify(|map| std::mem::swap(map, &mut taken));
        taken
    }

    pub fn subscribe(&self) -> watch::Receiver<FileMap> {
        self.tx.subscribe()
    }
}

impl Default for PendingFiles {
    fn default() -> Self {
        Self::new()
    }
}

/// A slot is filled when at least one file is selected for it.
pub fn slot_filled(files: &FileMap, slot: &str) -> bool {
    files.get(slot).map(|f| !f.is_empty()).unwrap_or(false)
}
