//! Login form
//!
//! Validates input locally before handing credentials to the auth service.
//! The form keeps its own error for validation failures; errors from the
//! service are read back from the auth snapshot.

use std::fmt;

use crate::models::{Credentials, UserProfile};
use crate::services::{AuthError, AuthService, AuthSnapshot};

/// Error types for form submission
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// Username or password left blank
    #[error("Please enter both username and password")]
    MissingFields,

    /// The auth service rejected the login
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Login form state
#[derive(Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    local_error: Option<String>,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("local_error", &self.local_error)
            .finish()
    }
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            local_error: None,
        }
    }

    /// Validation error from the last submit, if any
    pub fn local_error(&self) -> Option<&str> {
        self.local_error.as_deref()
    }

    /// Build credentials from the form fields
    ///
    /// The username is trimmed; the password is taken as typed.
    pub fn credentials(&self) -> Result<Credentials, FormError> {
        let username = self.username.trim();
        if username.is_empty() || self.password.trim().is_empty() {
            return Err(FormError::MissingFields);
        }
        Ok(Credentials::new(username, self.password.as_str()))
    }

    /// Validate and submit the form
    ///
    /// A validation failure never reaches the auth service.
    pub async fn submit(&mut self, auth: &AuthService) -> Result<UserProfile, FormError> {
        self.local_error = None;

        let credentials = match self.credentials() {
            Ok(credentials) => credentials,
            Err(e) => {
                self.local_error = Some(e.to_string());
                return Err(e);
            }
        };

        Ok(auth.login(credentials).await?)
    }

    /// Error to show above the form: the service error wins over the local one
    pub fn display_error(&self, snapshot: &AuthSnapshot) -> Option<String> {
        snapshot.error.clone().or_else(|| self.local_error.clone())
    }
}
