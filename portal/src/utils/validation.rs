// Input validation utilities

use anyhow::Result;
use regex::Regex;

/// Collection names become file names in the file-backed store, so keep them simple.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let re = Regex::new(r"^[A-Za-z0-9_-]{1,64}$")
        .map_err(|e| anyhow::anyhow!("Internal error: failed to compile collection regex: {}", e))?;
    if !re.is_match(name) {
        return Err(anyhow::anyhow!(
            "Collection name '{}' must be 1-64 letters, digits, '-' or '_'",
            name
        ));
    }
    Ok(())
}

/// Validate a draft field key (`fullname`, `date-of-payment`, ...).
pub fn validate_field_key(key: &str) -> Result<()> {
    let re = Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$")
        .map_err(|e| anyhow::anyhow!("Internal error: failed to compile key regex: {}", e))?;
    if !re.is_match(key) {
        return Err(anyhow::anyhow!(
            "Field key '{}' must be lower-case words joined by '-'",
            key
        ));
    }
    Ok(())
}

/// Validate a `/`-separated blob path. Rejects absolute paths and traversal.
pub fn validate_blob_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(anyhow::anyhow!("Blob path cannot be empty"));
    }
    if path.starts_with('/') || path.contains('\\') || path.contains('\0') {
        return Err(anyhow::anyhow!("Blob path contains invalid characters"));
    }
    if path.len() > 1024 {
        return Err(anyhow::anyhow!("Blob path cannot exceed 1024 characters"));
    }
    for segment in path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(anyhow::anyhow!(
                "Blob path contains an empty or relative segment"
            ));
        }
        if segment.contains(':') {
            return Err(anyhow::anyhow!("Blob path segment '{}' is not allowed", segment));
        }
    }
    Ok(())
}

/// Make a user-supplied file name safe to use as one blob path segment.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, ':' | '<' | '>' | '"' | '|' | '?' | '*') {
                '_'
            } else {
                c
            }
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').trim().to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Basic email shape check used before asking the auth provider.
pub fn validate_email(email: &str) -> Result<()> {
    let re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
        .map_err(|e| anyhow::anyhow!("Internal error: failed to compile email regex: {}", e))?;
    if !re.is_match(email.trim()) {
        return Err(anyhow::anyhow!("Invalid email address"));
    }
    Ok(())
}
