// Filesystem blob store
//
// Blobs land under `<root>/<path>`. Download URLs are `file://` URLs unless a
// public base URL is configured, in which case the blob path is joined onto it.

use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use url::Url;

use super::json_file::is_transient_io_error;
use super::{BackendError, BlobRef, BlobStore};
use crate::utils::validation::validate_blob_path;

pub struct LocalBlobStore {
    root: PathBuf,
    public_base: Option<Url>,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            public_base: None,
        }
    }

    /// Serve download URLs from `base` instead of `file://`.
    pub fn with_public_base(mut self, base: Url) -> Self {
        self.public_base = Some(base);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute_root(&self) -> Result<PathBuf, BackendError> {
        if self.root.is_absolute() {
            return Ok(self.root.clone());
        }
        std::env::current_dir()
            .map(|cwd| cwd.join(&self.root))
            .map_err(|e| BackendError::io("resolve blob root", e))
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, BackendError> {
        validate_blob_path(path).map_err(|e| {
            BackendError::new(
                "The file name is not allowed.",
                format!("Rejected blob path '{}': {}", path, e),
            )
        })?;
        let mut full = self.absolute_root()?;
        for segment in path.split('/') {
            full.push(segment);
        }
        Ok(full)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<BlobRef, BackendError> {
        let target = self.resolve(path)?;

        let write_action = || async {
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create blob directory: {:?}", parent))?;
            }
            tokio::fs::write(&target, bytes)
                .await
                .with_context(|| format!("Failed to write blob: {:?}", target))?;
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
                    "[PHASE: backend] [STEP: blob_put] Upload to '{}' failed: {:#}",
                    path,
                    e
                );
                BackendError::new(
                    "File upload failed. Please try again.",
                    format!("{:#}", e),
                )
            })?;

        log::debug!(
            "[PHASE: backend] [STEP: blob_put] Stored {} bytes at '{}'",
            bytes.len(),
            path
        );
        Ok(BlobRef {
            path: path.to_string(),
        })
    }

    async fn download_url(&self, blob: &BlobRef) -> Result<String, BackendError> {
        let target = self.resolve(&blob.path)?;
        if tokio::fs::metadata(&target).await.is_err() {
            return Err(BackendError::new(
                "The uploaded file could not be found.",
                format!("No blob at {:?}", target),
            ));
        }

        match &self.public_base {
            Some(base) => base
                .join(&blob.path)
                .map(|u| u.to_string())
                .map_err(|e| BackendError::io("build download URL", e)),
            None => Url::from_file_path(&target)
                .map(|u| u.to_string())
                .map_err(|_| BackendError::io("build download URL", format!("{:?}", target))),
        }
    }
}
