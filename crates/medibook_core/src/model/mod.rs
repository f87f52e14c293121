//! Domain model for hospital accounts, profiles and appointments.
//!
//! # Responsibility
//! - Define plain data structures for every persisted entity.
//! - Keep relationships as foreign-key ids resolved by repositories.
//!
//! # Invariants
//! - Every entity is identified by a surrogate integer key.
//! - No entity holds a reference to another; only `Appointment` owns its
//!   optional `Treatment` by value.

pub mod appointment;
pub mod department;
pub mod doctor;
pub mod patient;
pub mod user;
pub mod validation;

pub type UserId = i64;
pub type DepartmentId = i64;
pub type DoctorId = i64;
pub type PatientId = i64;
pub type AppointmentId = i64;
pub type TreatmentId = i64;

/// Unix epoch milliseconds.
pub type EpochMillis = i64;
