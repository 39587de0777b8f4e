// Hotline directory and contact inbox
//
// Hotlines are plain `{description, number}` documents maintained by the
// office. Contact messages are write-only from the resident's side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::backend::{BackendError, DocumentStore, JsonMap};
use crate::utils::logging::mask_email;
use crate::utils::validation::validate_email;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotline {
    #[serde(skip)]
    pub id: String,
    pub description: String,
    pub number: String,
}

fn hotline_patch(description: &str, number: &str) -> Result<JsonMap, DirectoryError> {
    let description = description.trim();
    let number = number.trim();
    if description.is_empty() || number.is_empty() {
        return Err(DirectoryError::Invalid(
            "Please provide both a description and a number.".to_string(),
        ));
    }
    let mut data = JsonMap::new();
    data.insert("description".to_string(), Value::String(description.to_string()));
    data.insert("number".to_string(), Value::String(number.to_string()));
    Ok(data)
}

pub struct HotlineDirectory {
    documents: Arc<dyn DocumentStore>,
    collection: String,
}

impl HotlineDirectory {
    pub fn new(documents: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            documents,
            collection: collection.into(),
        }
    }

    /// All hotlines ordered by description.
    pub async fn list(&self) -> Result<Vec<Hotline>, DirectoryError> {
        let mut hotlines: Vec<Hotline> = self
            .documents
            .get_all(&self.collection)
            .await?
            .into_iter()
            .filter_map(|doc| {
                serde_json::from_value::<Hotline>(Value::Object(doc.data))
                    .ok()
                    .map(|h| Hotline { id: doc.id, ..h })
            })
            .collect();
        hotlines.sort_by(|a, b| {
            a.description
                .to_lowercase()
                .cmp(&b.description.to_lowercase())
        });
        Ok(hotlines)
    }

    pub async fn add(&self, description: &str, number: &str) -> Result<String, DirectoryError> {
        let data = hotline_patch(description, number)?;
        let id = self.documents.add_document(&self.collection, data).await?;
        log::info!("[PHASE: directory] [STEP: add] Hotline {} added", id);
        Ok(id)
    }

    pub async fn update(
        &self,
        id: &str,
        description: &str,
        number: &str,
    ) -> Result<(), DirectoryError> {
        let data = hotline_patch(description, number)?;
        self.documents
            .update_document(&self.collection, id, data)
            .await?;
        log::info!("[PHASE: directory] [STEP: update] Hotline {} updated", id);
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> Result<(), DirectoryError> {
        self.documents.delete_document(&self.collection, id).await?;
        log::info!("[PHASE: directory] [STEP: remove] Hotline {} removed", id);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub full_name: String,
    pub email: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

pub struct ContactInbox {
    documents: Arc<dyn DocumentStore>,
    collection: String,
}

impl ContactInbox {
    pub fn new(documents: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            documents,
            collection: collection.into(),
        }
    }

    pub async fn submit(
        &self,
        full_name: &str,
        email: &str,
        message: &str,
    ) -> Result<String, DirectoryError> {
        if full_name.trim().is_empty() || message.trim().is_empty() {
            return Err(DirectoryError::Invalid(
                "Please fill in your name and message.".to_string(),
            ));
        }
        validate_email(email)
            .map_err(|_| DirectoryError::Invalid("Please enter a valid email.".to_string()))?;

        let contact = ContactMessage {
            full_name: full_name.trim().to_string(),
            email: email.trim().to_string(),
            message: message.trim().to_string(),
            sent_at: Utc::now(),
        };
        let data = match serde_json::to_value(&contact) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                return Err(DirectoryError::Invalid(
                    "Your message could not be sent.".to_string(),
                ))
            }
        };
        let id = self.documents.add_document(&self.collection, data).await?;
        log::info!(
            "[PHASE: directory] [STEP: contact] Message {} received from {}",
            id,
            mask_email(&contact.email)
        );
        Ok(id)
    }
}
