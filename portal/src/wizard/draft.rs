// Draft store
//
// Shared accumulator for one wizard session. Cloning the handle shares the same
// draft; nothing global is involved.

use std::sync::Arc;
use tokio::sync::watch;

use crate::models::record::DraftRecord;

#[derive(Debug, Clone)]
pub struct DraftStore {
    tx: Arc<watch::Sender<DraftRecord>>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::seeded(DraftRecord::new())
    }

    pub fn seeded(initial: DraftRecord) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the current draft.
    pub fn get(&self) -> DraftRecord {
        self.tx.borrow().clone()
    }

    /// Read without cloning the whole record.
    pub fn with<R>(&self, f: impl FnOnce(&DraftRecord) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Shallow merge `patch` into the draft and notify observers.
    pub fn merge(&self, patch: &DraftRecord) {
        self.tx.send_modify(|draft| draft.merge(patch));
    }

    pub fn subscribe(&self) -> watch::Receiver<DraftRecord> {
        self.tx.subscribe()
    }
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::new()
    }
}
