//! Patient profile model.
//!
//! # Invariants
//! - `user_id` is unique across patient profiles.
//! - `patient_identifier`, when set, is unique across patient profiles.

use super::validation::{limit_optional, ValidationError};
use super::{PatientId, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PATIENT_IDENTIFIER_PREFIX: &str = "PAT-";

/// Persisted patient profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: PatientId,
    pub user_id: UserId,
    pub patient_identifier: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub medical_history: Option<String>,
}

impl PatientProfile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_patient_fields(
            self.patient_identifier.as_deref(),
            self.gender.as_deref(),
            self.phone.as_deref(),
        )
    }
}

/// Insert shape for a patient profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPatientProfile {
    pub user_id: UserId,
    pub patient_identifier: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub medical_history: Option<String>,
}

impl NewPatientProfile {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_patient_fields(
            self.patient_identifier.as_deref(),
            self.gender.as_deref(),
            self.phone.as_deref(),
        )
    }
}

/// Generates a fresh hospital-facing patient identifier (`PAT-XXXXXXXXXXXX`).
pub fn generate_patient_identifier() -> String {
    let simple = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    format!("{PATIENT_IDENTIFIER_PREFIX}{}", &simple[..12])
}

fn validate_patient_fields(
    patient_identifier: Option<&str>,
    gender: Option<&str>,
    phone: Option<&str>,
) -> Result<(), ValidationError> {
    limit_optional("patient_identifier", patient_identifier, 80)?;
    limit_optional("gender", gender, 20)?;
    limit_optional("phone", phone, 30)
}
