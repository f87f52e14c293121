//! Appointment/treatment repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist appointments and their one-to-one treatment records.
//! - Own the appointment cascade used by profile deletion.
//!
//! # Invariants
//! - Every write touching an appointment row refreshes `updated_at`, and the
//!   refreshed value is strictly greater than the previous one.
//! - `save_treatment` keys on `appointment_id`, so an appointment never ends
//!   up with two treatments.
//! - Treatments are deleted before their appointment.

use super::{expect_changed, RepoError, RepoResult};
use crate::db::NOW_MS_SQL;
use crate::model::appointment::{Appointment, AppointmentStatus, NewAppointment, Treatment};
use crate::model::{AppointmentId, DoctorId, EpochMillis, PatientId, TreatmentId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const APPOINTMENT_SELECT_SQL: &str = "SELECT
    id,
    patient_id,
    doctor_id,
    scheduled_at,
    status,
    reason,
    created_at,
    updated_at
FROM appointments";

/// Query options for listing appointments.
///
/// Results are ordered by `scheduled_at ASC, id ASC`.
#[derive(Debug, Clone, Default)]
pub struct AppointmentListQuery {
    pub doctor_id: Option<DoctorId>,
    pub patient_id: Option<PatientId>,
    pub status: Option<AppointmentStatus>,
    /// Inclusive lower bound on `scheduled_at`.
    pub from: Option<EpochMillis>,
    /// Exclusive upper bound on `scheduled_at`.
    pub until: Option<EpochMillis>,
    /// No limit when `None`.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for appointments and treatments.
pub trait AppointmentRepository {
    fn create_appointment(&self, appointment: &NewAppointment) -> RepoResult<AppointmentId>;
    /// Loads one appointment together with its treatment, if any.
    fn get_appointment(&self, id: AppointmentId) -> RepoResult<Option<Appointment>>;
    fn list_appointments(&self, query: &AppointmentListQuery) -> RepoResult<Vec<Appointment>>;
    /// Writes schedule, status and reason, refreshing `updated_at`.
    ///
    /// The attached treatment is not written; see `save_treatment`.
    fn update_appointment(&self, appointment: &Appointment) -> RepoResult<()>;
    /// Inserts the treatment, or updates the existing one for its appointment.
    fn save_treatment(&self, treatment: &Treatment) -> RepoResult<TreatmentId>;
    /// Deletes the appointment and its treatment.
    fn delete_appointment(&self, id: AppointmentId) -> RepoResult<()>;
}

/// SQLite-backed appointment repository.
pub struct SqliteAppointmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAppointmentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AppointmentRepository for SqliteAppointmentRepository<'_> {
    fn create_appointment(&self, appointment: &NewAppointment) -> RepoResult<AppointmentId> {
        self.conn.execute(
            "INSERT INTO appointments (
                patient_id,
                doctor_id,
                scheduled_at,
                status,
                reason
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                appointment.patient_id,
                appointment.doctor_id,
                appointment.scheduled_at,
                AppointmentStatus::Booked.as_str(),
                appointment.reason.as_deref(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_appointment(&self, id: AppointmentId) -> RepoResult<Option<Appointment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{APPOINTMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let appointment = stmt
            .query_row([id], |row| Ok(parse_appointment_row(row)))
            .optional()?;

        match appointment.transpose()? {
            Some(mut appointment) => {
                appointment.treatment = load_treatment(self.conn, appointment.id)?;
                Ok(Some(appointment))
            }
            None => Ok(None),
        }
    }

    fn list_appointments(&self, query: &AppointmentListQuery) -> RepoResult<Vec<Appointment>> {
        let mut sql = format!("{APPOINTMENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(doctor_id) = query.doctor_id {
            sql.push_str(" AND doctor_id = ?");
            bind_values.push(Value::Integer(doctor_id));
        }
        if let Some(patient_id) = query.patient_id {
            sql.push_str(" AND patient_id = ?");
            bind_values.push(Value::Integer(patient_id));
        }
        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(from) = query.from {
            sql.push_str(" AND scheduled_at >= ?");
            bind_values.push(Value::Integer(from));
        }
        if let Some(until) = query.until {
            sql.push_str(" AND scheduled_at < ?");
            bind_values.push(Value::Integer(until));
        }

        sql.push_str(" ORDER BY scheduled_at ASC, id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut appointments = Vec::new();
        while let Some(row) = rows.next()? {
            let mut appointment = parse_appointment_row(row)?;
            appointment.treatment = load_treatment(self.conn, appointment.id)?;
            appointments.push(appointment);
        }
        Ok(appointments)
    }

    fn update_appointment(&self, appointment: &Appointment) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE appointments
                 SET
                    scheduled_at = ?2,
                    status = ?3,
                    reason = ?4,
                    updated_at = MAX({NOW_MS_SQL}, updated_at + 1)
                 WHERE id = ?1;"
            ),
            params![
                appointment.id,
                appointment.scheduled_at,
                appointment.status.as_str(),
                appointment.reason.as_deref(),
            ],
        )?;
        expect_changed(changed, "appointment", appointment.id)
    }

    fn save_treatment(&self, treatment: &Treatment) -> RepoResult<TreatmentId> {
        let id = self.conn.query_row(
            "INSERT INTO treatments (
                appointment_id,
                diagnosis,
                prescription,
                notes
            ) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (appointment_id) DO UPDATE SET
                diagnosis = excluded.diagnosis,
                prescription = excluded.prescription,
                notes = excluded.notes
            RETURNING id;",
            params![
                treatment.appointment_id,
                treatment.diagnosis.as_deref(),
                treatment.prescription.as_deref(),
                treatment.notes.as_deref(),
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn delete_appointment(&self, id: AppointmentId) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM treatments WHERE appointment_id = ?1;", [id])?;
        let changed = self
            .conn
            .execute("DELETE FROM appointments WHERE id = ?1;", [id])?;
        expect_changed(changed, "appointment", id)
    }
}

/// Profile side owning a set of appointments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AppointmentOwner {
    Doctor,
    Patient,
}

impl AppointmentOwner {
    fn column(self) -> &'static str {
        match self {
            Self::Doctor => "doctor_id",
            Self::Patient => "patient_id",
        }
    }
}

/// Deletes every appointment owned by the profile, treatments first.
///
/// Returns the number of appointments removed.
pub(crate) fn delete_owned_appointments(
    conn: &Connection,
    owner: AppointmentOwner,
    owner_id: i64,
) -> RepoResult<usize> {
    let column = owner.column();
    conn.execute(
        &format!(
            "DELETE FROM treatments
             WHERE appointment_id IN (
                SELECT id FROM appointments WHERE {column} = ?1
             );"
        ),
        [owner_id],
    )?;
    let removed = conn.execute(
        &format!("DELETE FROM appointments WHERE {column} = ?1;"),
        [owner_id],
    )?;
    Ok(removed)
}

fn load_treatment(conn: &Connection, appointment_id: AppointmentId) -> RepoResult<Option<Treatment>> {
    let treatment = conn
        .query_row(
            "SELECT
                id,
                appointment_id,
                diagnosis,
                prescription,
                notes,
                created_at
             FROM treatments
             WHERE appointment_id = ?1;",
            [appointment_id],
            |row| {
                Ok(Treatment {
                    id: Some(row.get("id")?),
                    appointment_id: row.get("appointment_id")?,
                    diagnosis: row.get("diagnosis")?,
                    prescription: row.get("prescription")?,
                    notes: row.get("notes")?,
                    created_at: Some(row.get("created_at")?),
                })
            },
        )
        .optional()?;
    Ok(treatment)
}

fn parse_appointment_row(row: &Row<'_>) -> RepoResult<Appointment> {
    let status_text: String = row.get("status")?;
    let status = AppointmentStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid appointment status `{status_text}` in appointments.status"
        ))
    })?;

    Ok(Appointment {
        id: row.get("id")?,
        patient_id: row.get("patient_id")?,
        doctor_id: row.get("doctor_id")?,
        scheduled_at: row.get("scheduled_at")?,
        status,
        reason: row.get("reason")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        treatment: None,
    })
}
