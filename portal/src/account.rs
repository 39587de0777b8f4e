// Account settings: profile lookup and edits, profile picture, password reset.
//
// Profiles live in the profiles collection and are matched on their `uid`
// field, not on the document id.

use serde_json::Value;
use thiserror::Error;

use crate::backend::{BackendError, DocumentStore, JsonMap, Services};
use crate::config::Collections;
use crate::models::request::UserProfile;
use crate::utils::logging::{mask_email, mask_sensitive};
use crate::utils::validation::validate_email;
use crate::wizard::files::PendingFile;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("You must be signed in to manage your account.")]
    NotSignedIn,
    #[error("No profile was found for this account.")]
    ProfileMissing,
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Backend(#[from] BackendError),
}

/// Editable profile fields. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
}

impl ProfileUpdate {
    fn into_patch(self) -> Result<JsonMap, AccountError> {
        let mut patch = JsonMap::new();
        if let Some(name) = self.full_name {
            if name.trim().is_empty() {
                return Err(AccountError::Invalid("Full name cannot be empty.".to_string()));
            }
            patch.insert("fullName".to_string(), Value::String(name.trim().to_string()));
        }
        if let Some(phone) = self.phone_number {
            patch.insert("phoneNumber".to_string(), Value::String(phone.trim().to_string()));
        }
        if let Some(address) = self.address {
            patch.insert("address".to_string(), Value::String(address.trim().to_string()));
        }
        if let Some(email) = self.email {
            validate_email(&email)
                .map_err(|_| AccountError::Invalid("Please enter a valid email.".to_string()))?;
            patch.insert("email".to_string(), Value::String(email.trim().to_string()));
        }
        Ok(patch)
    }
}

/// Find the profile document for `uid`. Returns the document id with it.
pub async fn find_profile_document(
    documents: &dyn DocumentStore,
    collection: &str,
    uid: &str,
) -> Result<Option<(String, UserProfile)>, BackendError> {
    let docs = documents.get_all(collection).await?;
    Ok(docs.into_iter().find_map(|doc| {
        let matches = doc.data.get("uid").and_then(Value::as_str) == Some(uid);
        if !matches {
            return None;
        }
        match serde_json::from_value::<UserProfile>(Value::Object(doc.data)) {
            Ok(profile) => Some((doc.id, profile)),
            Err(e) => {
                log::warn!(
                    "[PHASE: account] [STEP: lookup] Unreadable profile {}: {}",
                    doc.id,
                    e
                );
                None
            }
        }
    }))
}

pub async fn find_profile(
    documents: &dyn DocumentStore,
    collection: &str,
    uid: &str,
) -> Result<Option<UserProfile>, BackendError> {
    Ok(find_profile_document(documents, collection, uid)
        .await?
        .map(|(_, profile)| profile))
}

pub struct AccountService {
    services: Services,
    collections: Collections,
}

impl AccountService {
    pub fn new(services: Services, collections: Collections) -> Self {
        Self {
            services,
            collections,
        }
    }

    async fn signed_in_profile(&self) -> Result<(String, String, UserProfile), AccountError> {
        let user = self
            .services
            .auth
            .current_user()
            .await
            .ok_or(AccountError::NotSignedIn)?;
        let (doc_id, profile) = find_profile_document(
            self.services.documents.as_ref(),
            &self.collections.profiles,
            &user.uid,
        )
        .await?
        .ok_or(AccountError::ProfileMissing)?;
        Ok((user.uid, doc_id, profile))
    }

    /// Current user's profile. Empty when nobody is signed in.
    pub async fn profile(&self) -> Result<Option<UserProfile>, AccountError> {
        let Some(user) = self.services.auth.current_user().await else {
            return Ok(None);
        };
        Ok(find_profile(
            self.services.documents.as_ref(),
            &self.collections.profiles,
            &user.uid,
        )
        .await?)
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<UserProfile, AccountError> {
        let patch = update.into_patch()?;
        let (uid, doc_id, _) = self.signed_in_profile().await?;
        if !patch.is_empty() {
            self.services
                .documents
                .update_document(&self.collections.profiles, &doc_id, patch)
                .await?;
            log::info!(
                "[PHASE: account] [STEP: update_profile] Profile updated for {}",
                mask_sensitive(&uid)
            );
        }
        let (_, _, refreshed) = self.signed_in_profile().await?;
        Ok(refreshed)
    }

    /// Upload to `profilePictures/<uid>/<file>` and store the URL as `photoURL`.
    pub async fn upload_profile_picture(&self, file: PendingFile) -> Result<String, AccountError> {
        let (uid, doc_id, _) = self.signed_in_profile().await?;
        let path = format!("profilePictures/{}/{}", uid, file.file_name);

        let blob = self.services.blobs.put(&path, &file.bytes).await?;
        let url = self.services.blobs.download_url(&blob).await?;

        let mut patch = JsonMap::new();
        patch.insert("photoURL".to_string(), Value::String(url.clone()));
        self.services
            .documents
            .update_document(&self.collections.profiles, &doc_id, patch)
            .await?;

        log::info!(
            "[PHASE: account] [STEP: profile_picture] Picture updated for {}",
            mask_sensitive(&uid)
        );
        Ok(url)
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<(), AccountError> {
        self.services
            .auth
            .send_password_reset_email(email)
            .await
            .map_err(|e| {
                log::warn!(
                    "[PHASE: account] [STEP: password_reset] Reset for {} failed: {}",
                    mask_email(email),
                    e.internal_details
                );
                AccountError::Backend(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryBlobStore, MemoryDocumentStore};
    use crate::backend::session_auth::SessionAuth;
    use crate::backend::AuthUser;
    use serde_json::json;
    use std::sync::Arc;

    async fn setup(signed_in: bool) -> (AccountService, Arc<MemoryDocumentStore>, String) {
        let docs = Arc::new(MemoryDocumentStore::new());
        let auth = Arc::new(SessionAuth::new());
        let user = AuthUser {
            uid: "uid-account-1".to_string(),
            email: "maria@example.com".to_string(),
        };
        if signed_in {
            auth.sign_in(user).await;
        } else {
            auth.register(user).await;
        }
        let profile_id = docs
            .add_document(
                "userInfo",
                json!({
                    "uid": "uid-account-1",
                    "fullName": "Maria Clara",
                    "email": "maria@example.com",
                    "phoneNumber": "0917",
                    "address": "Lahug"
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .await
            .unwrap();
        let services = Services::new(docs.clone(), Arc::new(MemoryBlobStore::new()), auth);
        (
            AccountService::new(services, Collections::default()),
            docs,
            profile_id,
        )
    }

    #[tokio::test]
    async fn profile_is_empty_without_user() {
        let (svc, _, _) = setup(false).await;
        assert!(svc.profile().await.unwrap().is_none());
        assert!(matches!(
            svc.update_profile(ProfileUpdate::default()).await,
            Err(AccountError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn update_profile_merges_only_given_fields() {
        let (svc, _, _) = setup(true).await;
        let updated = svc
            .update_profile(ProfileUpdate {
                phone_number: Some(" 0918 ".to_string()),
                ..ProfileUpdate::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.phone_number, "0918");
        assert_eq!(updated.full_name, "Maria Clara");

        let err = svc
            .update_profile(ProfileUpdate {
                full_name: Some("  ".to_string()),
                ..ProfileUpdate::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Full name cannot be empty.");
    }

    #[tokio::test]
    async fn profile_picture_url_is_stored_as_photo_url() {
        let (svc, docs, profile_id) = setup(true).await;
        let url = svc
            .upload_profile_picture(PendingFile::new("me.jpg", vec![0xff, 0xd8]))
            .await
            .unwrap();
        assert_eq!(url, "memory://blobs/profilePictures/uid-account-1/me.jpg");

        let doc = docs.get_document("userInfo", &profile_id).await.unwrap().unwrap();
        assert_eq!(doc["photoURL"], json!(url));
        assert_eq!(
            svc.profile().await.unwrap().unwrap().photo_url.as_deref(),
            Some(url.as_str())
        );
    }

    #[tokio::test]
    async fn password_reset_surfaces_friendly_message() {
        let (svc, _, _) = setup(false).await;
        svc.send_password_reset("maria@example.com").await.unwrap();
        let err = svc.send_password_reset("ghost@example.com").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "User not found. Please check your email and try again."
        );
    }
}
