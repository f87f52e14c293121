//! Appointment and treatment models with the completion lifecycle.
//!
//! # Responsibility
//! - Define appointment scheduling state and its clinical record.
//! - Apply the completion transition in memory; persistence is the caller's.
//!
//! # Invariants
//! - A treatment exists only attached to its appointment.
//! - An appointment holds at most one treatment; completion mutates it in
//!   place instead of replacing it.
//! - Status changes carry no transition guard.

use super::{AppointmentId, DoctorId, EpochMillis, PatientId, TreatmentId};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Appointment status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Booked,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Booked => "booked",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "booked" => Some(Self::Booked),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Clinical record produced by completing an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treatment {
    /// `None` until persisted.
    pub id: Option<TreatmentId>,
    pub appointment_id: AppointmentId,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    /// `None` until persisted.
    pub created_at: Option<EpochMillis>,
}

impl Treatment {
    /// Creates an empty, unsaved treatment for `appointment_id`.
    pub fn new(appointment_id: AppointmentId) -> Self {
        Self {
            id: None,
            appointment_id,
            diagnosis: None,
            prescription: None,
            notes: None,
            created_at: None,
        }
    }
}

/// Persisted appointment, loaded together with its treatment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub scheduled_at: EpochMillis,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub created_at: EpochMillis,
    pub updated_at: EpochMillis,
    pub treatment: Option<Treatment>,
}

impl Appointment {
    /// Marks the appointment completed and records clinical notes.
    ///
    /// - Status becomes `Completed` regardless of the current status.
    /// - A treatment is attached on first call and reused afterwards.
    /// - Each non-empty argument overwrites its treatment field; `None` or an
    ///   empty string keeps the stored value.
    pub fn mark_completed(
        &mut self,
        diagnosis: Option<&str>,
        prescription: Option<&str>,
        notes: Option<&str>,
    ) {
        self.status = AppointmentStatus::Completed;
        let appointment_id = self.id;
        let treatment = self
            .treatment
            .get_or_insert_with(|| Treatment::new(appointment_id));

        overwrite_if_present(&mut treatment.diagnosis, diagnosis);
        overwrite_if_present(&mut treatment.prescription, prescription);
        overwrite_if_present(&mut treatment.notes, notes);
    }

    pub fn cancel(&mut self) {
        self.status = AppointmentStatus::Cancelled;
    }

    pub fn set_status(&mut self, status: AppointmentStatus) {
        self.status = status;
    }

    /// Scheduled time as a UTC wall-clock value.
    pub fn scheduled_datetime(&self) -> Option<NaiveDateTime> {
        DateTime::from_timestamp_millis(self.scheduled_at).map(|at| at.naive_utc())
    }
}

fn overwrite_if_present(slot: &mut Option<String>, value: Option<&str>) {
    if let Some(text) = value.filter(|text| !text.is_empty()) {
        *slot = Some(text.to_string());
    }
}

/// Insert shape for booking an appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub scheduled_at: EpochMillis,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{Appointment, AppointmentStatus, Treatment};

    fn booked(id: i64) -> Appointment {
        Appointment {
            id,
            patient_id: 10,
            doctor_id: 20,
            scheduled_at: 1_704_103_200_000,
            status: AppointmentStatus::Booked,
            reason: None,
            created_at: 0,
            updated_at: 0,
            treatment: None,
        }
    }

    #[test]
    fn first_completion_attaches_treatment() {
        let mut appointment = booked(1);
        appointment.mark_completed(Some("flu"), Some("rest"), None);

        assert_eq!(appointment.status, AppointmentStatus::Completed);
        let treatment = appointment.treatment.expect("treatment attached");
        assert_eq!(treatment.appointment_id, 1);
        assert_eq!(treatment.diagnosis.as_deref(), Some("flu"));
        assert_eq!(treatment.prescription.as_deref(), Some("rest"));
        assert_eq!(treatment.notes, None);
    }

    #[test]
    fn later_completion_keeps_absent_and_empty_fields() {
        let mut appointment = booked(1);
        appointment.mark_completed(Some("flu"), Some("rest"), None);
        appointment.mark_completed(Some(""), None, Some("follow-up in 1 week"));

        let treatment = appointment.treatment.expect("treatment attached");
        assert_eq!(treatment.diagnosis.as_deref(), Some("flu"));
        assert_eq!(treatment.prescription.as_deref(), Some("rest"));
        assert_eq!(treatment.notes.as_deref(), Some("follow-up in 1 week"));
    }

    #[test]
    fn completion_reuses_existing_treatment_identity() {
        let mut appointment = booked(3);
        let mut existing = Treatment::new(3);
        existing.id = Some(99);
        existing.diagnosis = Some("cold".to_string());
        appointment.treatment = Some(existing);

        appointment.mark_completed(Some("flu"), None, None);

        let treatment = appointment.treatment.expect("treatment kept");
        assert_eq!(treatment.id, Some(99));
        assert_eq!(treatment.diagnosis.as_deref(), Some("flu"));
    }

    #[test]
    fn cancelled_appointment_can_still_be_completed() {
        let mut appointment = booked(4);
        appointment.cancel();
        appointment.mark_completed(None, None, None);

        assert_eq!(appointment.status, AppointmentStatus::Completed);
        assert!(appointment.treatment.is_some());
    }

    #[test]
    fn scheduled_datetime_reads_epoch_millis_as_utc() {
        let appointment = booked(5);
        let at = appointment.scheduled_datetime().expect("valid timestamp");
        assert_eq!(at.to_string(), "2024-01-01 10:00:00");
    }
}
