//! Session model
//!
//! Credentials, token claims and the persisted token/profile pair.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::UserProfile;
use super::UserRole;

/// Username/password pair supplied by the login form. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Create a new credential pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Facts embedded in an access token.
///
/// Timestamps are kept at millisecond precision so that a decoded token
/// compares equal to the claims it was encoded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject
    pub username: String,
    /// Role granted to the subject
    pub role: UserRole,
    /// Issue time
    #[serde(rename = "iat", with = "chrono::serde::ts_milliseconds")]
    pub issued_at: DateTime<Utc>,
    /// Expiration time
    #[serde(rename = "exp", with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl TokenClaims {
    /// Issue claims at `now` that expire after `ttl`
    ///
    /// Fails if the expiry falls outside the representable time range.
    pub fn issue(
        username: impl Into<String>,
        role: UserRole,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> anyhow::Result<Self> {
        let issued_at = now.trunc_subsecs(3);
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| anyhow::anyhow!("Token lifetime out of range: {}", ttl))?;
        Ok(Self {
            username: username.into(),
            role,
            issued_at,
            expires_at,
        })
    }

    /// Check whether the claims are still live at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Token and profile held together in the session store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque access token
    pub token: String,
    /// Profile the token authorizes
    pub profile: UserProfile,
}
