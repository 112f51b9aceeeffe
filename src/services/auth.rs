//! Auth service
//!
//! Owns the authentication state of one portal instance and drives it through
//! its lifecycle:
//!
//! ```text
//! Initializing ──► Unauthenticated ◄──► Authenticating ──► Authenticated
//!        └──────────────────────────────────────────────────────►┘
//! Authenticated ──logout──► Unauthenticated
//! ```
//!
//! - `initialize` restores a stored session if its token is still valid
//! - `login` verifies credentials, issues a token and persists the session
//! - `logout` always succeeds and always wins over an in-flight login
//!
//! Transitions are serialized by a single lock. Every `login`, `logout` and
//! `initialize` call takes a new epoch; a login only commits if its epoch is
//! still the latest when verification returns, so the last call decides the
//! final state.

use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use crate::models::{Credentials, Session, TokenClaims, UserProfile};
use crate::services::credentials::CredentialVerifier;
use crate::services::session::{SessionStore, SessionStoreError};
use crate::services::token::{TokenCodec, TokenError};

/// Default token lifetime in hours
const DEFAULT_TOKEN_TTL_HOURS: i64 = 8;

/// Lifecycle state of the auth service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// Restoring the stored session
    Initializing,
    /// No session
    Unauthenticated,
    /// Login in progress
    Authenticating,
    /// Session active
    Authenticated,
}

/// What the view layer sees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub state: AuthState,
    pub user: Option<UserProfile>,
    pub access_token: Option<String>,
    pub error: Option<String>,
}

impl AuthSnapshot {
    fn initializing() -> Self {
        Self {
            state: AuthState::Initializing,
            user: None,
            access_token: None,
            error: None,
        }
    }

    fn signed_out() -> Self {
        Self {
            state: AuthState::Unauthenticated,
            user: None,
            access_token: None,
            error: None,
        }
    }

    fn signed_in(session: Session) -> Self {
        Self {
            state: AuthState::Authenticated,
            user: Some(session.profile),
            access_token: Some(session.token),
            error: None,
        }
    }

    /// A user and a token are both held
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.access_token.is_some()
    }

    /// Initialization or a login is in progress
    pub fn is_loading(&self) -> bool {
        matches!(self.state, AuthState::Initializing | AuthState::Authenticating)
    }
}

/// Error types for auth operations
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Credentials were rejected
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Token could not be decoded
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Session storage failed
    #[error("Session storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A later login or logout took over before this login completed
    #[error("Login superseded by a later request")]
    Superseded,

    /// No user is signed in
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Malformed(reason) => AuthError::MalformedToken(reason),
            other => AuthError::InternalError(anyhow::Error::new(other)),
        }
    }
}

impl From<SessionStoreError> for AuthError {
    fn from(e: SessionStoreError) -> Self {
        match e {
            SessionStoreError::StorageUnavailable(inner) => {
                AuthError::StorageUnavailable(inner.to_string())
            }
            other => AuthError::InternalError(anyhow::Error::new(other)),
        }
    }
}

/// Auth service for one portal instance
pub struct AuthService {
    store: SessionStore,
    codec: Arc<dyn TokenCodec>,
    verifier: Arc<dyn CredentialVerifier>,
    token_ttl: Duration,
    state: watch::Sender<AuthSnapshot>,
    epoch: AtomicU64,
    transition: Mutex<()>,
}

impl AuthService {
    /// Create a new auth service with the default 8 hour token lifetime
    pub fn new(
        store: SessionStore,
        codec: Arc<dyn TokenCodec>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        Self::with_token_ttl(store, codec, verifier, Duration::hours(DEFAULT_TOKEN_TTL_HOURS))
    }

    /// Create a new auth service with a custom token lifetime
    pub fn with_token_ttl(
        store: SessionStore,
        codec: Arc<dyn TokenCodec>,
        verifier: Arc<dyn CredentialVerifier>,
        token_ttl: Duration,
    ) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::initializing());
        Self {
            store,
            codec,
            verifier,
            token_ttl,
            state,
            epoch: AtomicU64::new(0),
            transition: Mutex::new(()),
        }
    }

    /// Current state
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    /// The session store backing this service
    pub fn session_store(&self) -> &SessionStore {
        &self.store
    }

    /// Signed-in user, or `NotAuthenticated`
    pub fn require_user(&self) -> Result<UserProfile, AuthError> {
        let snapshot = self.state.borrow();
        match (&snapshot.user, &snapshot.access_token) {
            (Some(user), Some(_)) => Ok(user.clone()),
            _ => Err(AuthError::NotAuthenticated),
        }
    }

    /// Restore the stored session
    ///
    /// A stored session is kept only if its token decodes, has not expired
    /// and names the same user as the stored profile. Anything else clears
    /// the store. Never fails: the worst outcome is `Unauthenticated`.
    pub async fn initialize(&self) -> AuthSnapshot {
        let _guard = self.transition.lock().await;
        self.next_epoch();

        let restored = match self.store.load().await {
            Some(session) => match self.check_session(&session) {
                Ok(()) => Some(session),
                Err(reason) => {
                    tracing::info!("Discarding stored session: {}", reason);
                    None
                }
            },
            None => None,
        };

        match restored {
            Some(session) => {
                tracing::info!(username = %session.profile.username, "Session restored");
                self.state.send_replace(AuthSnapshot::signed_in(session));
            }
            None => {
                if let Err(e) = self.store.clear().await {
                    tracing::warn!("Failed to clear session during initialization: {}", e);
                }
                self.state.send_replace(AuthSnapshot::signed_out());
            }
        }

        self.snapshot()
    }

    /// Sign in with the given credentials
    ///
    /// On success the session is persisted and the signed-in profile is
    /// returned. On failure the error is returned and its message is also
    /// published in the snapshot's `error` field. Rejected credentials do not
    /// drop a session that was already active; any other failure leaves the
    /// service signed out with the store cleared.
    pub async fn login(&self, credentials: Credentials) -> Result<UserProfile, AuthError> {
        let epoch = {
            let _guard = self.transition.lock().await;
            let epoch = self.next_epoch();
            self.state.send_modify(|s| {
                s.state = AuthState::Authenticating;
                s.error = None;
            });
            epoch
        };
        tracing::debug!(username = %credentials.username, "Login started");

        let verified = self.verifier.verify(&credentials).await;

        let _guard = self.transition.lock().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!(username = %credentials.username, "Login superseded");
            return Err(AuthError::Superseded);
        }

        let result = match verified {
            Ok(Some(profile)) => self.establish(profile).await,
            Ok(None) => Err(AuthError::InvalidCredentials),
            Err(e) => Err(AuthError::InternalError(e)),
        };

        match result {
            Ok(session) => {
                tracing::info!(username = %session.profile.username, "Login succeeded");
                let profile = session.profile.clone();
                self.state.send_replace(AuthSnapshot::signed_in(session));
                Ok(profile)
            }
            Err(e @ AuthError::InvalidCredentials) => {
                tracing::warn!(username = %credentials.username, "Login failed: {}", e);
                let message = e.to_string();
                self.state.send_modify(|s| {
                    s.state = if s.is_authenticated() {
                        AuthState::Authenticated
                    } else {
                        AuthState::Unauthenticated
                    };
                    s.error = Some(message);
                });
                Err(e)
            }
            Err(e) => {
                tracing::warn!(username = %credentials.username, "Login failed, signing out: {}", e);
                if let Err(clear_err) = self.store.clear().await {
                    tracing::warn!("Failed to clear session after login failure: {}", clear_err);
                }
                let mut snapshot = AuthSnapshot::signed_out();
                snapshot.error = Some(e.to_string());
                self.state.send_replace(snapshot);
                Err(e)
            }
        }
    }

    /// Sign out
    ///
    /// Clears the in-memory state and the session store. Storage failures
    /// are logged; the in-memory state is cleared regardless.
    pub async fn logout(&self) {
        let _guard = self.transition.lock().await;
        self.next_epoch();

        if let Err(e) = self.store.clear().await {
            tracing::warn!("Failed to clear session on logout: {}", e);
        }
        self.state.send_replace(AuthSnapshot::signed_out());
        tracing::info!("Logged out");
    }

    /// Issue a token for `profile` and persist the session
    async fn establish(&self, profile: UserProfile) -> Result<Session, AuthError> {
        let claims = TokenClaims::issue(&profile.username, profile.role, Utc::now(), self.token_ttl)?;
        let token = self.codec.encode(&claims)?;
        self.store.save(&token, &profile).await?;
        Ok(Session { token, profile })
    }

    fn check_session(&self, session: &Session) -> Result<(), AuthError> {
        let claims = self.codec.decode(&session.token)?;
        if claims.is_expired_at(Utc::now()) {
            return Err(AuthError::MalformedToken(format!(
                "token expired at {}",
                claims.expires_at.to_rfc3339()
            )));
        }
        if claims.username != session.profile.username {
            return Err(AuthError::MalformedToken(
                "token subject does not match stored profile".to_string(),
            ));
        }
        Ok(())
    }

    fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use crate::services::credentials::{demo_profile, DemoCredentialVerifier};
    use crate::services::session::test_support::UnavailableStorage;
    use crate::services::session::USER_PROFILE_KEY;
    use crate::services::token::{DemoTokenCodec, HmacTokenCodec};
    use crate::storage::{MemoryStorage, StorageArea};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Semaphore;

    fn service_over(storage: Arc<dyn StorageArea>) -> AuthService {
        AuthService::new(
            SessionStore::new(storage),
            Arc::new(DemoTokenCodec),
            Arc::new(DemoCredentialVerifier::default()),
        )
    }

    fn service() -> (Arc<MemoryStorage>, AuthService) {
        let storage = Arc::new(MemoryStorage::new());
        (storage.clone(), service_over(storage))
    }

    async fn persist_claims(storage: &Arc<MemoryStorage>, claims: &TokenClaims) {
        let token = DemoTokenCodec.encode(claims).unwrap();
        let store = SessionStore::new(storage.clone());
        store.save(&token, &demo_profile(&claims.username)).await.unwrap();
    }

    /// Verifier that blocks until the test releases the gate for the
    /// attempted password
    struct GatedVerifier {
        inner: DemoCredentialVerifier,
        entered: Arc<Semaphore>,
        gates: HashMap<String, Arc<Semaphore>>,
    }

    impl GatedVerifier {
        fn new(passwords: &[&str]) -> Self {
            Self {
                inner: DemoCredentialVerifier::default(),
                entered: Arc::new(Semaphore::new(0)),
                gates: passwords
                    .iter()
                    .map(|p| (p.to_string(), Arc::new(Semaphore::new(0))))
                    .collect(),
            }
        }

        fn release(&self, password: &str) {
            self.gates[password].add_permits(1);
        }

        async fn wait_entered(&self) {
            self.entered.acquire().await.unwrap().forget();
        }
    }

    #[async_trait]
    impl CredentialVerifier for GatedVerifier {
        async fn verify(&self, credentials: &Credentials) -> Result<Option<UserProfile>> {
            self.entered.add_permits(1);
            if let Some(gate) = self.gates.get(&credentials.password) {
                gate.acquire().await?.forget();
            }
            self.inner.verify(credentials).await
        }
    }

    fn gated_service(passwords: &[&str]) -> (Arc<GatedVerifier>, Arc<AuthService>) {
        let verifier = Arc::new(GatedVerifier::new(passwords));
        let service = AuthService::new(
            SessionStore::new(Arc::new(MemoryStorage::new())),
            Arc::new(DemoTokenCodec),
            verifier.clone(),
        );
        (verifier, Arc::new(service))
    }

    // ========================================================================
    // Initialization
    // ========================================================================

    #[tokio::test]
    async fn test_new_service_is_initializing() {
        let (_storage, service) = service();
        let snapshot = service.snapshot();

        assert_eq!(snapshot.state, AuthState::Initializing);
        assert!(snapshot.is_loading());
        assert!(!snapshot.is_authenticated());
    }

    #[tokio::test]
    async fn test_initialize_without_session() {
        let (_storage, service) = service();

        let snapshot = service.initialize().await;

        assert_eq!(snapshot.state, AuthState::Unauthenticated);
        assert!(!snapshot.is_loading());
        assert!(snapshot.user.is_none());
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_initialize_restores_valid_session() {
        let (storage, service) = service();
        let claims = TokenClaims::issue("admin", UserRole::Admin, Utc::now(), Duration::hours(8)).unwrap();
        persist_claims(&storage, &claims).await;

        let snapshot = service.initialize().await;

        assert_eq!(snapshot.state, AuthState::Authenticated);
        assert!(snapshot.is_authenticated());
        assert_eq!(snapshot.user.unwrap().username, "admin");
        assert_eq!(
            snapshot.access_token,
            Some(DemoTokenCodec.encode(&claims).unwrap())
        );
    }

    #[tokio::test]
    async fn test_initialize_with_expired_token_clears_store() {
        let (storage, service) = service();
        let issued = Utc::now() - Duration::hours(9);
        let claims = TokenClaims::issue("admin", UserRole::Admin, issued, Duration::hours(8)).unwrap();
        persist_claims(&storage, &claims).await;

        let snapshot = service.initialize().await;

        assert_eq!(snapshot.state, AuthState::Unauthenticated);
        assert!(service.session_store().load().await.is_none());
        assert_eq!(storage.get_item("access_token").await.unwrap(), None);
        assert_eq!(storage.get_item("user_profile").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_initialize_with_malformed_token_clears_store() {
        let (storage, service) = service();
        let store = SessionStore::new(storage.clone());
        store.save("%%% not a token %%%", &demo_profile("admin")).await.unwrap();

        let snapshot = service.initialize().await;

        assert_eq!(snapshot.state, AuthState::Unauthenticated);
        assert!(snapshot.error.is_none());
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_initialize_with_mismatched_subject_clears_store() {
        let (storage, service) = service();
        let claims = TokenClaims::issue("someone", UserRole::Admin, Utc::now(), Duration::hours(8)).unwrap();
        let token = DemoTokenCodec.encode(&claims).unwrap();
        let store = SessionStore::new(storage.clone());
        store.save(&token, &demo_profile("admin")).await.unwrap();

        let snapshot = service.initialize().await;

        assert_eq!(snapshot.state, AuthState::Unauthenticated);
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_initialize_with_half_session_clears_leftover() {
        let (storage, service) = service();
        storage.set_item("access_token", "orphan").await.unwrap();

        let snapshot = service.initialize().await;

        assert_eq!(snapshot.state, AuthState::Unauthenticated);
        assert_eq!(storage.get_item("access_token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_initialize_absorbs_storage_failure() {
        let service = service_over(Arc::new(UnavailableStorage));

        let snapshot = service.initialize().await;

        assert_eq!(snapshot.state, AuthState::Unauthenticated);
        assert!(snapshot.error.is_none());
    }

    // ========================================================================
    // Login
    // ========================================================================

    #[tokio::test]
    async fn test_login_with_demo_credentials() {
        let (_storage, service) = service();
        service.initialize().await;

        let user = service.login(Credentials::new("admin", "admin")).await.unwrap();

        assert_eq!(user.username, "admin");
        assert_eq!(user.role, UserRole::Admin);
        let snapshot = service.snapshot();
        assert_eq!(snapshot.state, AuthState::Authenticated);
        assert!(snapshot.is_authenticated());
        assert_eq!(snapshot.user.unwrap().username, "admin");
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_login_persists_valid_eight_hour_token() {
        let (_storage, service) = service();
        service.initialize().await;
        let before = Utc::now();

        service.login(Credentials::new("admin", "admin")).await.unwrap();

        let session = service.session_store().load().await.unwrap();
        let claims = DemoTokenCodec.decode(&session.token).unwrap();
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.expires_at - claims.issued_at, Duration::hours(8));
        assert!(claims.issued_at >= before - Duration::seconds(1));
        assert!(DemoTokenCodec.is_valid(&session.token, Utc::now()));
        assert_eq!(Some(session.token), service.snapshot().access_token);
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let (_storage, service) = service();
        service.initialize().await;

        let result = service.login(Credentials::new("admin", "wrong")).await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        let snapshot = service.snapshot();
        assert_eq!(snapshot.state, AuthState::Unauthenticated);
        assert_eq!(snapshot.error.as_deref(), Some("Invalid username or password"));
        assert!(!snapshot.is_authenticated());
        assert!(service.session_store().load().await.is_none());
    }

    #[tokio::test]
    async fn test_successful_login_clears_previous_error() {
        let (_storage, service) = service();
        service.initialize().await;

        let _ = service.login(Credentials::new("admin", "wrong")).await;
        service.login(Credentials::new("admin", "admin")).await.unwrap();

        assert!(service.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_failed_relogin_keeps_active_session() {
        let (_storage, service) = service();
        service.initialize().await;
        service.login(Credentials::new("admin", "admin")).await.unwrap();
        let token = service.snapshot().access_token;

        let result = service.login(Credentials::new("admin", "wrong")).await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        let snapshot = service.snapshot();
        assert_eq!(snapshot.state, AuthState::Authenticated);
        assert_eq!(snapshot.access_token, token);
        assert_eq!(snapshot.error.as_deref(), Some("Invalid username or password"));
        assert!(service.session_store().load().await.is_some());
    }

    #[tokio::test]
    async fn test_login_with_unavailable_storage() {
        let service = service_over(Arc::new(UnavailableStorage));
        service.initialize().await;

        let result = service.login(Credentials::new("admin", "admin")).await;

        assert!(matches!(result, Err(AuthError::StorageUnavailable(_))));
        let snapshot = service.snapshot();
        assert_eq!(snapshot.state, AuthState::Unauthenticated);
        assert!(snapshot.error.unwrap().contains("unavailable"));
    }

    /// Memory storage whose profile writes start failing once `full` is set
    #[derive(Default)]
    struct QuotaStorage {
        inner: MemoryStorage,
        full: AtomicBool,
    }

    #[async_trait]
    impl StorageArea for QuotaStorage {
        async fn get_item(&self, key: &str) -> Result<Option<String>> {
            self.inner.get_item(key).await
        }

        async fn set_item(&self, key: &str, value: &str) -> Result<()> {
            if key == USER_PROFILE_KEY && self.full.load(Ordering::SeqCst) {
                anyhow::bail!("quota");
            }
            self.inner.set_item(key, value).await
        }

        async fn remove_item(&self, key: &str) -> Result<()> {
            self.inner.remove_item(key).await
        }

        async fn clear(&self) -> Result<()> {
            self.inner.clear().await
        }
    }

    #[tokio::test]
    async fn test_relogin_with_failing_storage_signs_out() {
        let storage = Arc::new(QuotaStorage::default());
        let service = service_over(storage.clone());
        service.initialize().await;
        service.login(Credentials::new("admin", "admin")).await.unwrap();

        storage.full.store(true, Ordering::SeqCst);
        let result = service.login(Credentials::new("admin", "admin")).await;

        assert!(matches!(result, Err(AuthError::StorageUnavailable(_))));
        let snapshot = service.snapshot();
        assert_eq!(snapshot.state, AuthState::Unauthenticated);
        assert_eq!(snapshot.user, None);
        assert_eq!(snapshot.access_token, None);
        assert!(snapshot.error.unwrap().contains("quota"));
        assert!(service.session_store().load().await.is_none());

        // A restart agrees with the in-memory state
        let restarted = service_over(storage);
        assert_eq!(restarted.initialize().await.state, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_login_with_out_of_range_ttl_fails_cleanly() {
        let service = AuthService::with_token_ttl(
            SessionStore::new(Arc::new(MemoryStorage::new())),
            Arc::new(DemoTokenCodec),
            Arc::new(DemoCredentialVerifier::default()),
            Duration::hours(4_000_000_000),
        );
        service.initialize().await;

        let result = service.login(Credentials::new("admin", "admin")).await;

        assert!(matches!(result, Err(AuthError::InternalError(_))));
        let snapshot = service.snapshot();
        assert_eq!(snapshot.state, AuthState::Unauthenticated);
        assert!(snapshot.error.unwrap().contains("out of range"));
        assert!(service.session_store().load().await.is_none());
    }

    #[tokio::test]
    async fn test_login_with_signed_codec() {
        let service = AuthService::new(
            SessionStore::new(Arc::new(MemoryStorage::new())),
            Arc::new(HmacTokenCodec::new("ward-7")),
            Arc::new(DemoCredentialVerifier::default()),
        );
        service.initialize().await;

        service.login(Credentials::new("admin", "admin")).await.unwrap();

        let token = service.snapshot().access_token.unwrap();
        assert!(HmacTokenCodec::new("ward-7").is_valid(&token, Utc::now()));
        assert!(!DemoTokenCodec.is_valid(&token, Utc::now()));
    }

    #[tokio::test]
    async fn test_login_then_restart_restores_session() {
        let storage: Arc<MemoryStorage> = Arc::new(MemoryStorage::new());
        let first = service_over(storage.clone());
        first.initialize().await;
        first.login(Credentials::new("admin", "admin")).await.unwrap();

        let second = service_over(storage);
        let snapshot = second.initialize().await;

        assert_eq!(snapshot.state, AuthState::Authenticated);
        assert_eq!(snapshot.user, first.snapshot().user);
    }

    #[tokio::test]
    async fn test_custom_token_ttl() {
        let service = AuthService::with_token_ttl(
            SessionStore::new(Arc::new(MemoryStorage::new())),
            Arc::new(DemoTokenCodec),
            Arc::new(DemoCredentialVerifier::default()),
            Duration::hours(1),
        );
        service.initialize().await;
        service.login(Credentials::new("admin", "admin")).await.unwrap();

        let token = service.snapshot().access_token.unwrap();
        let claims = DemoTokenCodec.decode(&token).unwrap();
        assert_eq!(claims.expires_at - claims.issued_at, Duration::hours(1));
    }

    // ========================================================================
    // Logout
    // ========================================================================

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let (_storage, service) = service();
        service.initialize().await;
        service.login(Credentials::new("admin", "admin")).await.unwrap();

        service.logout().await;

        let snapshot = service.snapshot();
        assert_eq!(snapshot.state, AuthState::Unauthenticated);
        assert!(snapshot.user.is_none());
        assert!(snapshot.access_token.is_none());
        assert!(snapshot.error.is_none());
        assert!(service.session_store().load().await.is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_error() {
        let (_storage, service) = service();
        service.initialize().await;
        let _ = service.login(Credentials::new("admin", "wrong")).await;

        service.logout().await;

        assert!(service.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_logout_when_signed_out_is_harmless() {
        let (_storage, service) = service();
        service.initialize().await;

        service.logout().await;
        service.logout().await;

        assert_eq!(service.snapshot().state, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_logout_with_unavailable_storage_still_signs_out() {
        let service = service_over(Arc::new(UnavailableStorage));

        service.logout().await;

        assert_eq!(service.snapshot().state, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_require_user() {
        let (_storage, service) = service();
        service.initialize().await;
        assert!(matches!(service.require_user(), Err(AuthError::NotAuthenticated)));

        service.login(Credentials::new("admin", "admin")).await.unwrap();
        assert_eq!(service.require_user().unwrap().id, "admin-001");
    }

    // ========================================================================
    // Concurrency
    // ========================================================================

    #[tokio::test]
    async fn test_logout_wins_over_inflight_login() {
        let (verifier, service) = gated_service(&["admin"]);
        service.initialize().await;

        let login = {
            let service = service.clone();
            tokio::spawn(async move { service.login(Credentials::new("admin", "admin")).await })
        };
        verifier.wait_entered().await;
        assert_eq!(service.snapshot().state, AuthState::Authenticating);

        service.logout().await;
        verifier.release("admin");

        let result = login.await.unwrap();
        assert!(matches!(result, Err(AuthError::Superseded)));
        let snapshot = service.snapshot();
        assert_eq!(snapshot.state, AuthState::Unauthenticated);
        assert!(snapshot.user.is_none());
        assert!(snapshot.error.is_none());
        assert!(service.session_store().load().await.is_none());
    }

    #[tokio::test]
    async fn test_latest_login_decides_final_state() {
        let (verifier, service) = gated_service(&["admin", "wrong"]);
        service.initialize().await;

        let first = {
            let service = service.clone();
            tokio::spawn(async move { service.login(Credentials::new("admin", "admin")).await })
        };
        verifier.wait_entered().await;
        let second = {
            let service = service.clone();
            tokio::spawn(async move { service.login(Credentials::new("admin", "wrong")).await })
        };
        verifier.wait_entered().await;

        // The later call finishes first, then the earlier one completes
        verifier.release("wrong");
        assert!(matches!(second.await.unwrap(), Err(AuthError::InvalidCredentials)));
        verifier.release("admin");
        assert!(matches!(first.await.unwrap(), Err(AuthError::Superseded)));

        let snapshot = service.snapshot();
        assert_eq!(snapshot.state, AuthState::Unauthenticated);
        assert_eq!(snapshot.error.as_deref(), Some("Invalid username or password"));
        assert!(service.session_store().load().await.is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let (verifier, service) = gated_service(&["admin"]);
        let mut rx = service.subscribe();
        service.initialize().await;
        assert_eq!(rx.borrow_and_update().state, AuthState::Unauthenticated);

        let login = {
            let service = service.clone();
            tokio::spawn(async move { service.login(Credentials::new("admin", "admin")).await })
        };
        rx.wait_for(|s| s.state == AuthState::Authenticating).await.unwrap();
        assert!(rx.borrow().is_loading());

        verifier.release("admin");
        login.await.unwrap().unwrap();
        let snapshot = rx.wait_for(|s| s.state == AuthState::Authenticated).await.unwrap().clone();
        assert!(snapshot.is_authenticated());
    }
}
