//! User profile model
//!
//! The profile is built at login from the accepted identity and persisted
//! next to the access token for the lifetime of the session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Profile of the signed-in user.
///
/// Persisted as JSON under the `user_profile` storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable identifier
    pub id: String,
    /// Contact email
    pub email: String,
    /// Display name shown in the header
    pub name: String,
    /// Login name
    pub username: String,
    /// Access role
    pub role: UserRole,
}

impl UserProfile {
    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Initials for the header avatar
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .flat_map(char::to_uppercase)
            .take(2)
            .collect()
    }
}

/// User role for authorization.
///
/// - Admin: Full access
/// - Clinician: Standard clinical access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Administrator - full access
    Admin,
    /// Clinician - standard clinical access
    Clinician,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Clinician
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Clinician => write!(f, "clinician"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "clinician" => Ok(UserRole::Clinician),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}
