//! Patient service
//!
//! Mock patient directory behind the search and detail screens:
//! - Name search (case-insensitive substring on first and/or last name)
//! - Full record lookup
//! - Demographics edit/save
//!
//! Records live in memory for the lifetime of the service.

use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::{
    Address, Demographics, Diagnosis, DiagnosisStatus, EmergencyContact, Gender, HistoryEntry,
    HistoryType, Insurance, LabResult, LabStatus, Patient, PatientSearchResult, SearchCriteria,
    Severity, Treatment, TreatmentStatus, TreatmentType,
};

/// Error types for patient service operations
#[derive(Debug, thiserror::Error)]
pub enum PatientServiceError {
    /// Validation error (invalid input)
    #[error("{0}")]
    ValidationError(String),

    /// No patient with that id
    #[error("Patient not found: {0}")]
    NotFound(String),
}

struct DirectoryEntry {
    patient: Patient,
    last_visit: Option<String>,
}

impl DirectoryEntry {
    fn search_result(&self) -> PatientSearchResult {
        let d = &self.patient.demographics;
        PatientSearchResult {
            id: d.id.clone(),
            first_name: d.first_name.clone(),
            last_name: d.last_name.clone(),
            date_of_birth: d.date_of_birth.clone(),
            gender: d.gender,
            last_visit: self.last_visit.clone(),
        }
    }
}

/// Patient service over the in-memory directory
pub struct PatientService {
    directory: RwLock<HashMap<String, DirectoryEntry>>,
}

impl PatientService {
    /// Create a service seeded with the demo patients
    pub fn with_mock_data() -> Self {
        let entries = mock_directory()
            .into_iter()
            .map(|entry| (entry.patient.demographics.id.clone(), entry))
            .collect();
        Self {
            directory: RwLock::new(entries),
        }
    }

    /// Search patients by name
    ///
    /// Blank filters are ignored; at least one must be filled in. Results
    /// are ordered by patient id.
    pub async fn search(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<PatientSearchResult>, PatientServiceError> {
        if criteria.is_blank() {
            return Err(PatientServiceError::ValidationError(
                "Please enter at least a first name or last name".to_string(),
            ));
        }

        let first = criteria.first_name.trim().to_lowercase();
        let last = criteria.last_name.trim().to_lowercase();

        let directory = self.directory.read().await;
        let mut results: Vec<PatientSearchResult> = directory
            .values()
            .filter(|entry| {
                let d = &entry.patient.demographics;
                let first_match = first.is_empty() || d.first_name.to_lowercase().contains(&first);
                let last_match = last.is_empty() || d.last_name.to_lowercase().contains(&last);
                first_match && last_match
            })
            .map(DirectoryEntry::search_result)
            .collect();
        results.sort_by(|a, b| a.id.cmp(&b.id));

        tracing::debug!(
            first_name = %criteria.first_name,
            last_name = %criteria.last_name,
            found = results.len(),
            "Patient search"
        );
        Ok(results)
    }

    /// Get the full record for a patient
    pub async fn get(&self, id: &str) -> Result<Patient, PatientServiceError> {
        self.directory
            .read()
            .await
            .get(id)
            .map(|entry| entry.patient.clone())
            .ok_or_else(|| PatientServiceError::NotFound(id.to_string()))
    }

    /// Replace a patient's demographics
    ///
    /// The demographics must keep the patient's id and carry a first and
    /// last name. Returns the updated record.
    pub async fn update_demographics(
        &self,
        id: &str,
        demographics: Demographics,
    ) -> Result<Patient, PatientServiceError> {
        if demographics.id != id {
            return Err(PatientServiceError::ValidationError(
                "Patient id cannot be changed".to_string(),
            ));
        }
        if demographics.first_name.trim().is_empty() || demographics.last_name.trim().is_empty() {
            return Err(PatientServiceError::ValidationError(
                "First name and last name are required".to_string(),
            ));
        }

        let mut directory = self.directory.write().await;
        let entry = directory
            .get_mut(id)
            .ok_or_else(|| PatientServiceError::NotFound(id.to_string()))?;

        entry.patient.demographics = demographics;
        entry.patient.last_updated = Utc::now().date_naive().to_string();
        tracing::info!(patient_id = %id, "Demographics updated");

        Ok(entry.patient.clone())
    }
}

impl Default for PatientService {
    fn default() -> Self {
        Self::with_mock_data()
    }
}

fn s(value: &str) -> String {
    value.to_string()
}

fn basic_demographics(id: &str, first: &str, last: &str, dob: &str, gender: Gender) -> Demographics {
    Demographics {
        id: s(id),
        first_name: s(first),
        last_name: s(last),
        date_of_birth: s(dob),
        gender,
        phone_number: None,
        email: None,
        address: None,
        emergency_contact: None,
        insurance: None,
    }
}

fn mock_directory() -> Vec<DirectoryEntry> {
    vec![
        DirectoryEntry {
            patient: john_doe(),
            last_visit: Some(s("2024-07-10")),
        },
        DirectoryEntry {
            patient: Patient {
                demographics: basic_demographics("2", "Jane", "Smith", "1990-08-22", Gender::Female),
                history: vec![],
                diagnoses: vec![],
                treatments: vec![],
                labs: vec![LabResult {
                    id: s("1"),
                    test_name: s("Lipid Panel"),
                    test_code: Some(s("LIPID")),
                    value: s("Pending"),
                    unit: None,
                    reference_range: None,
                    status: LabStatus::Pending,
                    order_date: s("2024-07-12"),
                    result_date: None,
                    ordering_provider: Some(s("Dr. Johnson")),
                    lab_facility: Some(s("LabCorp")),
                    notes: None,
                }],
                last_updated: s("2024-07-12"),
            },
            last_visit: Some(s("2024-07-12")),
        },
        DirectoryEntry {
            patient: Patient {
                demographics: basic_demographics("3", "Robert", "Johnson", "1978-12-05", Gender::Male),
                history: vec![],
                diagnoses: vec![Diagnosis {
                    id: s("1"),
                    icd_code: s("E11.9"),
                    description: s("Type 2 diabetes mellitus without complications"),
                    diagnosis_date: s("2024-07-08"),
                    status: DiagnosisStatus::Active,
                    severity: Some(Severity::Moderate),
                    notes: None,
                    diagnosing_provider: Some(s("Dr. Smith")),
                }],
                treatments: vec![],
                labs: vec![],
                last_updated: s("2024-07-08"),
            },
            last_visit: Some(s("2024-07-08")),
        },
        DirectoryEntry {
            patient: Patient {
                demographics: basic_demographics("4", "Emily", "Davis", "1992-06-18", Gender::Female),
                history: vec![],
                diagnoses: vec![],
                treatments: vec![],
                labs: vec![],
                last_updated: s("2024-07-11"),
            },
            last_visit: Some(s("2024-07-11")),
        },
    ]
}

fn john_doe() -> Patient {
    Patient {
        demographics: Demographics {
            phone_number: Some(s("+1-555-0123")),
            email: Some(s("john.doe@email.com")),
            address: Some(Address {
                street: s("123 Main St"),
                city: s("Anytown"),
                state: s("CA"),
                zip_code: s("12345"),
                country: s("USA"),
            }),
            emergency_contact: Some(EmergencyContact {
                name: s("Jane Doe"),
                relationship: s("Spouse"),
                phone_number: s("+1-555-0124"),
            }),
            insurance: Some(Insurance {
                provider: s("Blue Cross Blue Shield"),
                policy_number: s("BCBS123456789"),
                group_number: Some(s("GRP001")),
            }),
            ..basic_demographics("1", "John", "Doe", "1985-03-15", Gender::Male)
        },
        history: vec![
            HistoryEntry {
                id: s("1"),
                date: s("2020-05-15"),
                kind: HistoryType::Surgery,
                description: s("Appendectomy"),
                notes: Some(s("Routine laparoscopic appendectomy, no complications")),
                provider: Some(s("Dr. Smith")),
            },
            HistoryEntry {
                id: s("2"),
                date: s("2018-03-10"),
                kind: HistoryType::ChronicCondition,
                description: s("Hypertension"),
                notes: Some(s("Diagnosed with essential hypertension, family history positive")),
                provider: Some(s("Dr. Johnson")),
            },
        ],
        diagnoses: vec![
            Diagnosis {
                id: s("1"),
                icd_code: s("I10"),
                description: s("Essential Hypertension"),
                diagnosis_date: s("2018-03-10"),
                status: DiagnosisStatus::Active,
                severity: Some(Severity::Mild),
                notes: None,
                diagnosing_provider: Some(s("Dr. Johnson")),
            },
            Diagnosis {
                id: s("2"),
                icd_code: s("K35.9"),
                description: s("Acute appendicitis, unspecified"),
                diagnosis_date: s("2020-05-15"),
                status: DiagnosisStatus::Resolved,
                severity: None,
                notes: None,
                diagnosing_provider: Some(s("Dr. Smith")),
            },
        ],
        treatments: vec![
            Treatment {
                id: s("1"),
                kind: TreatmentType::Medication,
                name: s("Lisinopril"),
                description: s("ACE inhibitor for hypertension"),
                start_date: s("2018-03-10"),
                end_date: None,
                dosage: Some(s("10mg")),
                frequency: Some(s("Once daily")),
                status: TreatmentStatus::Active,
                prescribing_provider: Some(s("Dr. Johnson")),
                notes: None,
            },
            Treatment {
                id: s("2"),
                kind: TreatmentType::Surgery,
                name: s("Laparoscopic Appendectomy"),
                description: s("Surgical removal of appendix"),
                start_date: s("2020-05-15"),
                end_date: Some(s("2020-05-15")),
                dosage: None,
                frequency: None,
                status: TreatmentStatus::Completed,
                prescribing_provider: Some(s("Dr. Smith")),
                notes: None,
            },
        ],
        labs: vec![
            LabResult {
                id: s("1"),
                test_name: s("Complete Blood Count"),
                test_code: Some(s("CBC")),
                value: s("Normal"),
                unit: None,
                reference_range: None,
                status: LabStatus::Normal,
                order_date: s("2024-07-01"),
                result_date: Some(s("2024-07-02")),
                ordering_provider: Some(s("Dr. Johnson")),
                lab_facility: Some(s("LabCorp")),
                notes: None,
            },
            LabResult {
                id: s("2"),
                test_name: s("Blood Pressure"),
                test_code: None,
                value: s("130/85"),
                unit: Some(s("mmHg")),
                reference_range: Some(s("<120/80")),
                status: LabStatus::Abnormal,
                order_date: s("2024-07-10"),
                result_date: Some(s("2024-07-10")),
                ordering_provider: Some(s("Dr. Johnson")),
                lab_facility: None,
                notes: None,
            },
        ],
        last_updated: s("2024-07-14"),
    }
}
