//! Data models
//!
//! This module contains the data structures used throughout the clinician portal:
//! - Session entities (Credentials, TokenClaims, Session)
//! - The signed-in user's profile
//! - Display-only patient records

mod patient;
mod session;
mod user;

pub use patient::{
    Address, Demographics, Diagnosis, DiagnosisStatus, EmergencyContact, Gender, HistoryEntry,
    HistoryType, Insurance, LabResult, LabStatus, Patient, PatientSearchResult, SearchCriteria,
    Severity, Treatment, TreatmentStatus, TreatmentType,
};
pub use session::{Credentials, Session, TokenClaims};
pub use user::{UserProfile, UserRole};
