//! Application context
//!
//! The shared services of one portal instance, built once at start-up and
//! handed to the view layer. `init` restores any stored session before the
//! context is returned; `teardown` ends the instance's use of it.

use chrono::Duration;
use std::sync::Arc;

use crate::config::{AuthConfig, Config};
use crate::services::{
    AuthService, AuthSnapshot, DemoCredentialVerifier, DemoTokenCodec, HmacTokenCodec,
    PatientService, SessionStore, TokenCodec,
};
use crate::storage::{create_storage, StorageArea};

/// Application context containing shared services
#[derive(Clone)]
pub struct AppContext {
    pub auth: Arc<AuthService>,
    pub patients: Arc<PatientService>,
}

impl AppContext {
    /// Build the context from configuration and restore the stored session
    pub async fn init(config: &Config) -> Self {
        let storage = create_storage(&config.storage);
        Self::init_with_storage(config, storage).await
    }

    /// Build the context over an existing storage area
    ///
    /// Used when the storage outlives the context, e.g. a page reload.
    pub async fn init_with_storage(config: &Config, storage: Arc<dyn StorageArea>) -> Self {
        let auth = AuthService::with_token_ttl(
            SessionStore::new(storage),
            create_codec(&config.auth),
            Arc::new(DemoCredentialVerifier::from_config(&config.auth)),
            Duration::hours(i64::from(config.auth.token_ttl_hours)),
        );

        let snapshot = auth.initialize().await;
        tracing::info!(state = ?snapshot.state, "Auth context initialized");

        Self {
            auth: Arc::new(auth),
            patients: Arc::new(PatientService::with_mock_data()),
        }
    }

    /// Release the context, returning the last auth state
    ///
    /// The session store is left untouched so a later `init` over the same
    /// storage restores the session.
    pub fn teardown(self) -> AuthSnapshot {
        let snapshot = self.auth.snapshot();
        tracing::info!(state = ?snapshot.state, "Auth context torn down");
        snapshot
    }
}

/// Pick the token codec: signed when a key is configured, demo otherwise
pub fn create_codec(config: &AuthConfig) -> Arc<dyn TokenCodec> {
    match &config.signing_key {
        Some(key) => Arc::new(HmacTokenCodec::new(key.as_bytes())),
        None => {
            tracing::warn!("No signing key configured; issuing unsigned demo tokens");
            Arc::new(DemoTokenCodec)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Credentials;
    use crate::services::AuthState;
    use crate::storage::MemoryStorage;
    use chrono::Utc;

    #[tokio::test]
    async fn test_init_starts_unauthenticated() {
        let context = AppContext::init(&Config::default()).await;

        let snapshot = context.auth.snapshot();
        assert_eq!(snapshot.state, AuthState::Unauthenticated);
        assert!(!snapshot.is_loading());
    }

    #[tokio::test]
    async fn test_reinit_over_same_storage_restores_session() {
        let storage: Arc<MemoryStorage> = Arc::new(MemoryStorage::new());
        let config = Config::default();

        let first = AppContext::init_with_storage(&config, storage.clone()).await;
        first.auth.login(Credentials::new("admin", "admin")).await.unwrap();
        let last = first.teardown();
        assert_eq!(last.state, AuthState::Authenticated);

        let second = AppContext::init_with_storage(&config, storage).await;
        assert_eq!(second.auth.snapshot().user, last.user);
    }

    #[tokio::test]
    async fn test_configured_credentials_and_ttl() {
        let mut config = Config::default();
        config.auth.username = "nurse".to_string();
        config.auth.password = "rounds".to_string();
        config.auth.token_ttl_hours = 2;
        let context = AppContext::init(&config).await;

        assert!(context.auth.login(Credentials::new("admin", "admin")).await.is_err());
        context.auth.login(Credentials::new("nurse", "rounds")).await.unwrap();

        let token = context.auth.snapshot().access_token.unwrap();
        let claims = DemoTokenCodec.decode(&token).unwrap();
        assert_eq!(claims.expires_at - claims.issued_at, Duration::hours(2));
    }

    #[tokio::test]
    async fn test_signing_key_selects_signed_codec() {
        let mut config = Config::default();
        config.auth.signing_key = Some("ward-7".to_string());
        let context = AppContext::init(&config).await;

        context.auth.login(Credentials::new("admin", "admin")).await.unwrap();

        let token = context.auth.snapshot().access_token.unwrap();
        assert!(HmacTokenCodec::new("ward-7").is_valid(&token, Utc::now()));
    }

    #[tokio::test]
    async fn test_changing_signing_key_invalidates_stored_session() {
        let storage: Arc<MemoryStorage> = Arc::new(MemoryStorage::new());
        let mut config = Config::default();
        config.auth.signing_key = Some("old".to_string());
        let first = AppContext::init_with_storage(&config, storage.clone()).await;
        first.auth.login(Credentials::new("admin", "admin")).await.unwrap();
        first.teardown();

        config.auth.signing_key = Some("new".to_string());
        let second = AppContext::init_with_storage(&config, storage).await;

        assert_eq!(second.auth.snapshot().state, AuthState::Unauthenticated);
    }
}
