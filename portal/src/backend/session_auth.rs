// In-process auth provider
//
// Holds the signed-in user for this session and publishes changes on a watch
// channel. Password reset requests are recorded in an outbox instead of being
// mailed.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::{watch, Mutex};

use super::{AuthProvider, AuthUser, BackendError};
use crate::utils::logging::mask_email;
use crate::utils::validation::validate_email;

pub struct SessionAuth {
    state: watch::Sender<Option<AuthUser>>,
    accounts: Mutex<BTreeMap<String, AuthUser>>,
    reset_outbox: Mutex<Vec<String>>,
}

impl SessionAuth {
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state,
            accounts: Mutex::new(BTreeMap::new()),
            reset_outbox: Mutex::new(Vec::new()),
        }
    }

    /// Make an account known so password resets can find it.
    pub async fn register(&self, user: AuthUser) {
        self.accounts
            .lock()
            .await
            .insert(user.email.to_ascii_lowercase(), user);
    }

    /// Register (if needed) and sign in.
    pub async fn sign_in(&self, user: AuthUser) {
        self.register(user.clone()).await;
        log::info!(
            "[PHASE: auth] [STEP: sign_in] Signed in {}",
            mask_email(&user.email)
        );
        self.state.send_replace(Some(user));
    }

    pub fn sign_out(&self) {
        if self.state.send_replace(None).is_some() {
            log::info!("[PHASE: auth] [STEP: sign_out] Signed out");
        }
    }

    /// Addresses that were sent a reset link, oldest first.
    pub async fn reset_outbox(&self) -> Vec<String> {
        self.reset_outbox.lock().await.clone()
    }
}

impl Default for SessionAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for SessionAuth {
    async fn current_user(&self) -> Option<AuthUser> {
        self.state.borrow().clone()
    }

    fn auth_state(&self) -> watch::Receiver<Option<AuthUser>> {
        self.state.subscribe()
    }

    async fn send_password_reset_email(&self, email: &str) -> Result<(), BackendError> {
        let email = email.trim();
        if validate_email(email).is_err() {
            return Err(BackendError::new(
                "Invalid email address. Please enter a valid email.",
                format!("auth/invalid-email: {}", mask_email(email)),
            ));
        }

        let known = self
            .accounts
            .lock()
            .await
            .contains_key(&email.to_ascii_lowercase());
        if !known {
            return Err(BackendError::new(
                "User not found. Please check your email and try again.",
                format!("auth/user-not-found: {}", mask_email(email)),
            ));
        }

        self.reset_outbox.lock().await.push(email.to_string());
        log::info!(
            "[PHASE: auth] [STEP: password_reset] Reset link queued for {}",
            mask_email(email)
        );
        Ok(())
    }
}
