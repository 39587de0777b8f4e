use anyhow::Result;
use std::path::{Path, PathBuf};

/// Folder name used for log output next to the workspace or install dir.
pub const LOG_FOLDER_NAME: &str = "Portal_Log";

/// Application folder name under the platform data directory.
pub const APP_DIR_NAME: &str = "docrequest-portal";

/// Config file that marks a portal workspace root.
pub const CONFIG_FILE_NAME: &str = "portal.toml";

/// Resolve deployment folder (absolute path)
pub fn resolve_deployment_folder() -> PathBuf {
    // Prefer the folder where the binary is running from
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(dir) = exe_path.parent() {
            return dir.to_path_buf();
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Resolve log folder (absolute path)
///
/// Walks up from the working directory looking for an existing `Portal_Log/` or a
/// `portal.toml` marker, so running from a nested crate dir does not scatter log
/// folders. Falls back to the platform data dir, then the deployment folder.
pub fn resolve_log_folder(override_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        std::fs::create_dir_all(dir)
            .map_err(|e| anyhow::anyhow!("Failed to create log folder {:?}: {}", dir, e))?;
        return Ok(dir.to_path_buf());
    }

    if let Ok(cwd) = std::env::current_dir() {
        if let Some(found) = find_log_folder_from(&cwd)? {
            return Ok(found);
        }
    }

    let base = dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(resolve_deployment_folder);
    let log_dir = base.join(LOG_FOLDER_NAME);
    std::fs::create_dir_all(&log_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create log folder: {}", e))?;
    Ok(log_dir)
}

fn find_log_folder_from(start: &Path) -> Result<Option<PathBuf>> {
    let mut dir = start.to_path_buf();
    for _ in 0..12 {
        let candidate = dir.join(LOG_FOLDER_NAME);
        if candidate.exists() {
            return Ok(Some(candidate));
        }

        if dir.join(CONFIG_FILE_NAME).exists() {
            std::fs::create_dir_all(&candidate)
                .map_err(|e| anyhow::anyhow!("Failed to create log folder: {}", e))?;
            return Ok(Some(candidate));
        }

        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => break,
        }
    }
    Ok(None)
}

/// Default data directory for the file-backed stores.
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME).join("data"))
        .unwrap_or_else(|| resolve_deployment_folder().join("portal-data"))
}

/// Default blob directory for the local blob store.
pub fn default_blob_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME).join("blobs"))
        .unwrap_or_else(|| resolve_deployment_folder().join("portal-blobs"))
}
