//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own transaction boundaries; repositories only see `&Connection`.
//! - Keep routing/session layers decoupled from storage details.

use crate::credential::CredentialError;
use crate::model::user::UserRole;
use crate::model::validation::ValidationError;
use crate::model::{DoctorId, EpochMillis, UserId};
use crate::repo::{ConstraintKind, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod account_service;
pub mod appointment_service;
pub mod directory_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for account, directory and appointment use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Persistence-layer failure, including constraint violations.
    Repo(RepoError),
    /// Input rejected before reaching storage.
    Validation(ValidationError),
    Credential(CredentialError),
    /// Target entity does not exist.
    NotFound { entity: &'static str, id: i64 },
    /// Profile kind does not match the user's role.
    RoleMismatch {
        user_id: UserId,
        expected: UserRole,
        actual: UserRole,
    },
    /// Unknown login or wrong password; the two are not distinguished.
    InvalidCredentials,
    InactiveUser(UserId),
    /// Slot falls outside the doctor's declared availability.
    OutsideAvailability {
        doctor_id: DoctorId,
        scheduled_at: EpochMillis,
    },
    /// Epoch milliseconds outside the representable calendar range.
    InvalidSchedule(EpochMillis),
    /// Write succeeded but read-back did not find the row.
    InconsistentState(&'static str),
}

impl ServiceError {
    /// Returns the constraint kind when storage rejected the write.
    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self {
            Self::Repo(err) => err.constraint_kind(),
            _ => None,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Credential(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::RoleMismatch {
                user_id,
                expected,
                actual,
            } => write!(
                f,
                "user {user_id} has role `{}`, expected `{}`",
                actual.as_str(),
                expected.as_str()
            ),
            Self::InvalidCredentials => write!(f, "invalid username or password"),
            Self::InactiveUser(user_id) => write!(f, "user {user_id} is inactive"),
            Self::OutsideAvailability {
                doctor_id,
                scheduled_at,
            } => write!(
                f,
                "slot {scheduled_at} is outside availability of doctor {doctor_id}"
            ),
            Self::InvalidSchedule(value) => write!(f, "invalid schedule timestamp {value}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Credential(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        RepoError::from(value).into()
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<CredentialError> for ServiceError {
    fn from(value: CredentialError) -> Self {
        Self::Credential(value)
    }
}

fn read_back<T>(value: Option<T>, details: &'static str) -> ServiceResult<T> {
    value.ok_or(ServiceError::InconsistentState(details))
}
