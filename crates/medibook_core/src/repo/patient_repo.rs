//! Patient profile repository contract and SQLite implementation.
//!
//! # Invariants
//! - `delete_patient` cascades to appointments and treatments in the same
//!   order as doctor deletion; callers run it on a transaction.

use super::appointment_repo::{delete_owned_appointments, AppointmentOwner};
use super::{expect_changed, RepoResult};
use crate::model::patient::{NewPatientProfile, PatientProfile};
use crate::model::{PatientId, UserId};
use rusqlite::{params, Connection, OptionalExtension, Row};

const PATIENT_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    patient_identifier,
    date_of_birth,
    gender,
    phone,
    address,
    medical_history
FROM patient_profiles";

/// Repository interface for patient profiles.
pub trait PatientRepository {
    fn create_patient(&self, profile: &NewPatientProfile) -> RepoResult<PatientId>;
    fn get_patient(&self, id: PatientId) -> RepoResult<Option<PatientProfile>>;
    fn find_by_user(&self, user_id: UserId) -> RepoResult<Option<PatientProfile>>;
    fn find_by_identifier(&self, identifier: &str) -> RepoResult<Option<PatientProfile>>;
    fn list_patients(&self) -> RepoResult<Vec<PatientProfile>>;
    fn update_patient(&self, profile: &PatientProfile) -> RepoResult<()>;
    /// Deletes the profile and every appointment it owns.
    ///
    /// Returns the number of appointments removed by the cascade.
    fn delete_patient(&self, id: PatientId) -> RepoResult<usize>;
}

/// SQLite-backed patient profile repository.
pub struct SqlitePatientRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePatientRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PatientRepository for SqlitePatientRepository<'_> {
    fn create_patient(&self, profile: &NewPatientProfile) -> RepoResult<PatientId> {
        profile.validate()?;

        self.conn.execute(
            "INSERT INTO patient_profiles (
                user_id,
                patient_identifier,
                date_of_birth,
                gender,
                phone,
                address,
                medical_history
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                profile.user_id,
                profile.patient_identifier.as_deref(),
                profile.date_of_birth,
                profile.gender.as_deref(),
                profile.phone.as_deref(),
                profile.address.as_deref(),
                profile.medical_history.as_deref(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_patient(&self, id: PatientId) -> RepoResult<Option<PatientProfile>> {
        let profile = self
            .conn
            .query_row(
                &format!("{PATIENT_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_patient_row,
            )
            .optional()?;
        Ok(profile)
    }

    fn find_by_user(&self, user_id: UserId) -> RepoResult<Option<PatientProfile>> {
        let profile = self
            .conn
            .query_row(
                &format!("{PATIENT_SELECT_SQL} WHERE user_id = ?1;"),
                [user_id],
                parse_patient_row,
            )
            .optional()?;
        Ok(profile)
    }

    fn find_by_identifier(&self, identifier: &str) -> RepoResult<Option<PatientProfile>> {
        let profile = self
            .conn
            .query_row(
                &format!("{PATIENT_SELECT_SQL} WHERE patient_identifier = ?1;"),
                [identifier],
                parse_patient_row,
            )
            .optional()?;
        Ok(profile)
    }

    fn list_patients(&self) -> RepoResult<Vec<PatientProfile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PATIENT_SELECT_SQL} ORDER BY id ASC;"))?;
        let profiles = stmt
            .query_map([], parse_patient_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    fn update_patient(&self, profile: &PatientProfile) -> RepoResult<()> {
        profile.validate()?;

        let changed = self.conn.execute(
            "UPDATE patient_profiles
             SET
                patient_identifier = ?2,
                date_of_birth = ?3,
                gender = ?4,
                phone = ?5,
                address = ?6,
                medical_history = ?7
             WHERE id = ?1;",
            params![
                profile.id,
                profile.patient_identifier.as_deref(),
                profile.date_of_birth,
                profile.gender.as_deref(),
                profile.phone.as_deref(),
                profile.address.as_deref(),
                profile.medical_history.as_deref(),
            ],
        )?;
        expect_changed(changed, "patient profile", profile.id)
    }

    fn delete_patient(&self, id: PatientId) -> RepoResult<usize> {
        let removed = delete_owned_appointments(self.conn, AppointmentOwner::Patient, id)?;
        let changed = self
            .conn
            .execute("DELETE FROM patient_profiles WHERE id = ?1;", [id])?;
        expect_changed(changed, "patient profile", id)?;
        Ok(removed)
    }
}

fn parse_patient_row(row: &Row<'_>) -> rusqlite::Result<PatientProfile> {
    Ok(PatientProfile {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        patient_identifier: row.get("patient_identifier")?,
        date_of_birth: row.get("date_of_birth")?,
        gender: row.get("gender")?,
        phone: row.get("phone")?,
        address: row.get("address")?,
        medical_history: row.get("medical_history")?,
    })
}
