//! Session store
//!
//! Persists the (token, profile) pair in the storage area under two fixed keys:
//! - `access_token`: the opaque token string
//! - `user_profile`: the JSON-serialized [`UserProfile`]
//!
//! All access is serialized through one lock, so a reader never observes a
//! half-written session. A failed save removes both keys before returning.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::{Session, UserProfile};
use crate::storage::StorageArea;

/// Storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key for the serialized user profile
pub const USER_PROFILE_KEY: &str = "user_profile";

/// Error types for session store operations
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    /// The storage area rejected a read or write
    #[error("Session storage unavailable: {0}")]
    StorageUnavailable(#[from] anyhow::Error),

    /// The profile could not be serialized
    #[error("Failed to serialize user profile: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Token/profile persistence over a [`StorageArea`]
pub struct SessionStore {
    storage: Arc<dyn StorageArea>,
    lock: Mutex<()>,
}

impl SessionStore {
    /// Create a session store over the given storage area
    pub fn new(storage: Arc<dyn StorageArea>) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }

    /// Persist a session, replacing any previous one
    ///
    /// Either both entries are written or, on failure, neither is left behind.
    pub async fn save(&self, token: &str, profile: &UserProfile) -> Result<(), SessionStoreError> {
        let profile_json = serde_json::to_string(profile)?;
        let _guard = self.lock.lock().await;

        let written = async {
            self.storage.set_item(ACCESS_TOKEN_KEY, token).await?;
            self.storage.set_item(USER_PROFILE_KEY, &profile_json).await
        }
        .await;

        if let Err(e) = written {
            tracing::warn!("Failed to save session, rolling back: {}", e);
            self.remove_both().await;
            return Err(SessionStoreError::StorageUnavailable(e));
        }

        tracing::debug!(username = %profile.username, "Session saved");
        Ok(())
    }

    /// Load the persisted session
    ///
    /// Returns `None` when either entry is missing, the profile does not
    /// deserialize, or the storage area cannot be read.
    pub async fn load(&self) -> Option<Session> {
        let _guard = self.lock.lock().await;

        let token = match self.storage.get_item(ACCESS_TOKEN_KEY).await {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read access token: {}", e);
                return None;
            }
        };

        let profile_json = match self.storage.get_item(USER_PROFILE_KEY).await {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read user profile: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<UserProfile>(&profile_json) {
            Ok(profile) => Some(Session { token, profile }),
            Err(e) => {
                tracing::warn!("Stored user profile is corrupt: {}", e);
                None
            }
        }
    }

    /// Remove both entries. Safe to call when nothing is stored.
    pub async fn clear(&self) -> Result<(), SessionStoreError> {
        let _guard = self.lock.lock().await;

        let token = self.storage.remove_item(ACCESS_TOKEN_KEY).await;
        let profile = self.storage.remove_item(USER_PROFILE_KEY).await;
        token?;
        profile?;

        tracing::debug!("Session cleared");
        Ok(())
    }

    async fn remove_both(&self) {
        for key in [ACCESS_TOKEN_KEY, USER_PROFILE_KEY] {
            if let Err(e) = self.storage.remove_item(key).await {
                tracing::warn!("Failed to remove '{}': {}", key, e);
            }
        }
    }
}
