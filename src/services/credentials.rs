//! Credential verification
//!
//! The login flow asks a [`CredentialVerifier`] whether a username/password
//! pair is accepted and, if so, which profile it maps to. The demo verifier
//! accepts exactly one configured pair and maps it to a fixed administrator
//! identity. A real deployment plugs a server-side verifier in here.

use anyhow::Result;
use async_trait::async_trait;

use crate::config::AuthConfig;
use crate::models::{Credentials, UserProfile, UserRole};

/// Decides whether credentials are accepted
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Returns the profile for accepted credentials, `None` for rejected ones.
    ///
    /// An `Err` means the verifier itself could not answer.
    async fn verify(&self, credentials: &Credentials) -> Result<Option<UserProfile>>;
}

/// Accepts a single fixed username/password pair
#[derive(Clone)]
pub struct DemoCredentialVerifier {
    username: String,
    password: String,
}

impl std::fmt::Debug for DemoCredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoCredentialVerifier")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl DemoCredentialVerifier {
    /// Create a verifier for the given pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create a verifier from the auth configuration
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.username.clone(), config.password.clone())
    }
}

impl Default for DemoCredentialVerifier {
    fn default() -> Self {
        Self::from_config(&AuthConfig::default())
    }
}

#[async_trait]
impl CredentialVerifier for DemoCredentialVerifier {
    async fn verify(&self, credentials: &Credentials) -> Result<Option<UserProfile>> {
        if credentials.username == self.username && credentials.password == self.password {
            Ok(Some(demo_profile(&credentials.username)))
        } else {
            Ok(None)
        }
    }
}

/// Profile of the demo administrator
pub fn demo_profile(username: &str) -> UserProfile {
    UserProfile {
        id: "admin-001".to_string(),
        email: "admin@clinic.example.com".to_string(),
        name: "Administrator".to_string(),
        username: username.to_string(),
        role: UserRole::Admin,
    }
}
