// Portal configuration
//
// Layered: built-in defaults, then an optional `portal.toml`, then `PORTAL_*`
// environment variables (double underscore for nesting, e.g.
// `PORTAL_COLLECTIONS__REQUESTS=userData`).

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::json_file::JsonFileDocumentStore;
use crate::backend::local_blob::LocalBlobStore;
use crate::backend::memory::{MemoryBlobStore, MemoryDocumentStore};
use crate::backend::session_auth::SessionAuth;
use crate::backend::{BlobStore, DocumentStore, Services};
use crate::utils::path_resolver::{default_blob_folder, default_data_folder, CONFIG_FILE_NAME};
use crate::utils::validation::validate_collection_name;

/// Collection names used in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Collections {
    pub requests: String,
    pub profiles: String,
    pub hotlines: String,
    pub contacts: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            requests: "userData".to_string(),
            profiles: "userInfo".to_string(),
            hotlines: "hotlines".to_string(),
            contacts: "contacts".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Everything in process memory; lost on exit.
    Memory,
    /// JSON documents under `data_dir`, blobs under `blob_dir`.
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub storage: StorageMode,
    pub data_dir: PathBuf,
    pub blob_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
    /// Public base URL for blob downloads; `file://` URLs when unset.
    pub public_blob_url: Option<String>,
    pub default_copies: u32,
    pub collections: Collections,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            storage: StorageMode::File,
            data_dir: default_data_folder(),
            blob_dir: default_blob_folder(),
            log_dir: None,
            public_blob_url: None,
            default_copies: 1,
            collections: Collections::default(),
        }
    }
}

impl PortalConfig {
    /// Load from `./portal.toml` (if present) and the process environment.
    pub fn load() -> Result<Self> {
        Self::load_from(Some(Path::new(CONFIG_FILE_NAME)), None)
    }

    /// Load with an explicit file and, for tests, an explicit environment map.
    pub fn load_from(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let defaults = serde_json::to_string(&PortalConfig::default())?;
        let mut builder = Config::builder().add_source(File::from_str(&defaults, FileFormat::Json));

        if let Some(path) = path {
            if path.exists() {
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("PORTAL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let cfg: PortalConfig = builder
            .build()
            .context("Failed to read portal configuration")?
            .try_deserialize()
            .context("Invalid portal configuration")?;
        cfg.validate()?;

        log::info!(
            "[PHASE: initialization] [STEP: config] storage={:?} data_dir={:?} blob_dir={:?}",
            cfg.storage,
            cfg.data_dir,
            cfg.blob_dir
        );
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        for name in [
            &self.collections.requests,
            &self.collections.profiles,
            &self.collections.hotlines,
            &self.collections.contacts,
        ] {
            validate_collection_name(name)?;
        }
        if self.default_copies == 0 {
            anyhow::bail!("default_copies must be at least 1");
        }
        if let Some(url) = &self.public_blob_url {
            url::Url::parse(url)
                .with_context(|| format!("public_blob_url is not a valid URL: {}", url))?;
        }
        Ok(())
    }

    /// Render as TOML, e.g. to seed a `portal.toml`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration as TOML")
    }

    /// Build the backend adapters this configuration asks for.
    pub fn build_services(&self) -> Result<(Services, Arc<SessionAuth>)> {
        let auth = Arc::new(SessionAuth::new());
        let (documents, blobs): (Arc<dyn DocumentStore>, Arc<dyn BlobStore>) = match self.storage {
            StorageMode::Memory => (
                Arc::new(MemoryDocumentStore::new()),
                Arc::new(MemoryBlobStore::new()),
            ),
            StorageMode::File => {
                let mut blob_store = LocalBlobStore::new(&self.blob_dir);
                if let Some(base) = &self.public_blob_url {
                    let base = url::Url::parse(base)
                        .with_context(|| format!("public_blob_url is not a valid URL: {}", base))?;
                    blob_store = blob_store.with_public_base(base);
                }
                (
                    Arc::new(JsonFileDocumentStore::new(&self.data_dir)),
                    Arc::new(blob_store),
                )
            }
        };
        Ok((Services::new(documents, blobs, auth.clone()), auth))
    }
}
