//! Core domain logic for MediBook hospital appointment management.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod context;
pub mod credential;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AdminSeed, AppConfig, ConfigError};
pub use context::{AppContext, AppError};
pub use credential::{CredentialError, PasswordHasher};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::appointment::{Appointment, AppointmentStatus, NewAppointment, Treatment};
pub use model::department::{Department, NewDepartment};
pub use model::doctor::{Availability, DoctorProfile, NewDoctorProfile};
pub use model::patient::{NewPatientProfile, PatientProfile};
pub use model::user::{NewUser, User, UserRole};
pub use model::validation::ValidationError;
pub use model::{
    AppointmentId, DepartmentId, DoctorId, EpochMillis, PatientId, TreatmentId, UserId,
};
pub use repo::{ConstraintKind, RepoError, RepoResult};
pub use service::account_service::{AccountService, RegisterUser};
pub use service::appointment_service::{AppointmentService, BookAppointment, CompletionNotes};
pub use service::directory_service::DirectoryService;
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
