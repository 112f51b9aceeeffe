//! Services layer - Business logic
//!
//! This module contains the business logic of the clinician portal:
//! - Token encoding and validation
//! - Session persistence
//! - Credential verification and the authentication lifecycle
//! - The mock patient directory

pub mod auth;
pub mod credentials;
pub mod patient;
pub mod session;
pub mod token;

pub use auth::{AuthError, AuthService, AuthSnapshot, AuthState};
pub use credentials::{demo_profile, CredentialVerifier, DemoCredentialVerifier};
pub use patient::{PatientService, PatientServiceError};
pub use session::{SessionStore, SessionStoreError, ACCESS_TOKEN_KEY, USER_PROFILE_KEY};
pub use token::{DemoTokenCodec, HmacTokenCodec, TokenCodec, TokenError};
