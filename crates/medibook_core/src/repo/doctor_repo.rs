//! Doctor profile repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist doctor profiles, including the JSON availability column.
//! - Cascade profile deletion to appointments and their treatments.
//!
//! # Invariants
//! - `delete_doctor` removes treatments, then appointments, then the
//!   profile; callers run it on a transaction so no partial cascade commits.

use super::appointment_repo::{delete_owned_appointments, AppointmentOwner};
use super::{expect_changed, RepoError, RepoResult};
use crate::model::doctor::{Availability, DoctorProfile, NewDoctorProfile};
use crate::model::{DepartmentId, DoctorId, UserId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const DOCTOR_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    license_number,
    specialization,
    department_id,
    availability,
    phone,
    bio
FROM doctor_profiles";

/// Query options for listing doctor profiles.
#[derive(Debug, Clone, Default)]
pub struct DoctorListQuery {
    pub department_id: Option<DepartmentId>,
    /// Case-insensitive exact match.
    pub specialization: Option<String>,
}

/// Repository interface for doctor profiles.
pub trait DoctorRepository {
    fn create_doctor(&self, profile: &NewDoctorProfile) -> RepoResult<DoctorId>;
    fn get_doctor(&self, id: DoctorId) -> RepoResult<Option<DoctorProfile>>;
    fn find_by_user(&self, user_id: UserId) -> RepoResult<Option<DoctorProfile>>;
    fn list_doctors(&self, query: &DoctorListQuery) -> RepoResult<Vec<DoctorProfile>>;
    fn update_doctor(&self, profile: &DoctorProfile) -> RepoResult<()>;
    /// Deletes the profile and every appointment it owns.
    ///
    /// Returns the number of appointments removed by the cascade.
    fn delete_doctor(&self, id: DoctorId) -> RepoResult<usize>;
}

/// SQLite-backed doctor profile repository.
pub struct SqliteDoctorRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDoctorRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn find_one(&self, column: &str, value: i64) -> RepoResult<Option<DoctorProfile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DOCTOR_SELECT_SQL} WHERE {column} = ?1;"))?;
        let profile = stmt
            .query_row([value], |row| Ok(parse_doctor_row(row)))
            .optional()?;
        profile.transpose()
    }
}

impl DoctorRepository for SqliteDoctorRepository<'_> {
    fn create_doctor(&self, profile: &NewDoctorProfile) -> RepoResult<DoctorId> {
        profile.validate()?;
        let availability = availability_to_db(profile.availability.as_ref())?;

        self.conn.execute(
            "INSERT INTO doctor_profiles (
                user_id,
                license_number,
                specialization,
                department_id,
                availability,
                phone,
                bio
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                profile.user_id,
                profile.license_number.as_deref(),
                profile.specialization.as_deref(),
                profile.department_id,
                availability,
                profile.phone.as_deref(),
                profile.bio.as_deref(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_doctor(&self, id: DoctorId) -> RepoResult<Option<DoctorProfile>> {
        self.find_one("id", id)
    }

    fn find_by_user(&self, user_id: UserId) -> RepoResult<Option<DoctorProfile>> {
        self.find_one("user_id", user_id)
    }

    fn list_doctors(&self, query: &DoctorListQuery) -> RepoResult<Vec<DoctorProfile>> {
        let mut sql = format!("{DOCTOR_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(department_id) = query.department_id {
            sql.push_str(" AND department_id = ?");
            bind_values.push(Value::Integer(department_id));
        }
        if let Some(specialization) = query.specialization.as_ref() {
            sql.push_str(" AND specialization = ? COLLATE NOCASE");
            bind_values.push(Value::Text(specialization.clone()));
        }
        sql.push_str(" ORDER BY id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut profiles = Vec::new();
        while let Some(row) = rows.next()? {
            profiles.push(parse_doctor_row(row)?);
        }
        Ok(profiles)
    }

    fn update_doctor(&self, profile: &DoctorProfile) -> RepoResult<()> {
        profile.validate()?;
        let availability = availability_to_db(profile.availability.as_ref())?;

        let changed = self.conn.execute(
            "UPDATE doctor_profiles
             SET
                license_number = ?2,
                specialization = ?3,
                department_id = ?4,
                availability = ?5,
                phone = ?6,
                bio = ?7
             WHERE id = ?1;",
            params![
                profile.id,
                profile.license_number.as_deref(),
                profile.specialization.as_deref(),
                profile.department_id,
                availability,
                profile.phone.as_deref(),
                profile.bio.as_deref(),
            ],
        )?;
        expect_changed(changed, "doctor profile", profile.id)
    }

    fn delete_doctor(&self, id: DoctorId) -> RepoResult<usize> {
        let removed = delete_owned_appointments(self.conn, AppointmentOwner::Doctor, id)?;
        let changed = self
            .conn
            .execute("DELETE FROM doctor_profiles WHERE id = ?1;", [id])?;
        expect_changed(changed, "doctor profile", id)?;
        Ok(removed)
    }
}

fn availability_to_db(availability: Option<&Availability>) -> RepoResult<Option<String>> {
    availability
        .map(|value| {
            serde_json::to_string(value).map_err(|err| {
                RepoError::InvalidData(format!("availability is not serializable: {err}"))
            })
        })
        .transpose()
}

fn parse_doctor_row(row: &Row<'_>) -> RepoResult<DoctorProfile> {
    let availability = match row.get::<_, Option<String>>("availability")? {
        Some(text) => Some(serde_json::from_str::<Availability>(&text).map_err(|err| {
            RepoError::InvalidData(format!(
                "invalid availability json in doctor_profiles.availability: {err}"
            ))
        })?),
        None => None,
    };

    Ok(DoctorProfile {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        license_number: row.get("license_number")?,
        specialization: row.get("specialization")?,
        department_id: row.get("department_id")?,
        availability,
        phone: row.get("phone")?,
        bio: row.get("bio")?,
    })
}
