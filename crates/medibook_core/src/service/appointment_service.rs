//! Appointment use-case service.
//!
//! # Responsibility
//! - Book appointments for existing patient/doctor profiles.
//! - Run the completion lifecycle and other status changes as one
//!   load-mutate-persist transaction.
//!
//! # Invariants
//! - Read-modify-write paths use `IMMEDIATE` transactions, so concurrent
//!   writers serialize on the database lock.
//! - The treatment row is only written when the in-memory treatment changed.
//! - Clinical text (diagnosis, prescription, notes) is never logged.

use super::{read_back, ServiceError, ServiceResult};
use crate::model::appointment::{Appointment, AppointmentStatus, NewAppointment};
use crate::model::{AppointmentId, DoctorId, EpochMillis, PatientId};
use crate::repo::appointment_repo::{
    AppointmentListQuery, AppointmentRepository, SqliteAppointmentRepository,
};
use crate::repo::doctor_repo::{DoctorRepository, SqliteDoctorRepository};
use crate::repo::patient_repo::{PatientRepository, SqlitePatientRepository};
use chrono::DateTime;
use log::info;
use rusqlite::{Connection, TransactionBehavior};

/// Booking request for a single slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookAppointment {
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub scheduled_at: EpochMillis,
    pub reason: Option<String>,
}

/// Optional clinical notes recorded on completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionNotes {
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
}

pub struct AppointmentService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> AppointmentService<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    /// Books a slot in `Booked` status.
    ///
    /// # Errors
    /// - `NotFound` when the patient or doctor profile does not exist.
    /// - `OutsideAvailability` when the doctor declared availability and the
    ///   slot is not inside it.
    pub fn book_appointment(&mut self, request: &BookAppointment) -> ServiceResult<Appointment> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if SqlitePatientRepository::new(&tx)
            .get_patient(request.patient_id)?
            .is_none()
        {
            return Err(ServiceError::NotFound {
                entity: "patient profile",
                id: request.patient_id,
            });
        }
        check_availability(&tx, request.doctor_id, request.scheduled_at)?;

        let repo = SqliteAppointmentRepository::new(&tx);
        let appointment_id = repo.create_appointment(&NewAppointment {
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            scheduled_at: request.scheduled_at,
            reason: request.reason.clone(),
        })?;
        let booked = read_back(
            repo.get_appointment(appointment_id)?,
            "booked appointment not found in read-back",
        )?;
        tx.commit()?;

        info!(
            "event=appointment_book module=service status=ok appointment_id={} doctor_id={} patient_id={}",
            booked.id, booked.doctor_id, booked.patient_id
        );
        Ok(booked)
    }

    /// Marks the appointment completed and stores its treatment.
    ///
    /// See `Appointment::mark_completed` for field semantics. Completing a
    /// cancelled appointment is allowed.
    pub fn complete_appointment(
        &mut self,
        appointment_id: AppointmentId,
        notes: &CompletionNotes,
    ) -> ServiceResult<Appointment> {
        let completed = self.modify(appointment_id, |_, appointment| {
            appointment.mark_completed(
                notes.diagnosis.as_deref(),
                notes.prescription.as_deref(),
                notes.notes.as_deref(),
            );
            Ok(())
        })?;

        info!(
            "event=appointment_complete module=service status=ok appointment_id={} treatment_id={}",
            completed.id,
            completed
                .treatment
                .as_ref()
                .and_then(|treatment| treatment.id)
                .unwrap_or_default()
        );
        Ok(completed)
    }

    pub fn cancel_appointment(&mut self, appointment_id: AppointmentId) -> ServiceResult<Appointment> {
        let cancelled = self.modify(appointment_id, |_, appointment| {
            appointment.cancel();
            Ok(())
        })?;
        info!(
            "event=appointment_cancel module=service status=ok appointment_id={}",
            cancelled.id
        );
        Ok(cancelled)
    }

    /// Assigns `status` directly, without a transition guard.
    pub fn set_status(
        &mut self,
        appointment_id: AppointmentId,
        status: AppointmentStatus,
    ) -> ServiceResult<Appointment> {
        self.modify(appointment_id, |_, appointment| {
            appointment.set_status(status);
            Ok(())
        })
    }

    /// Moves the appointment to `scheduled_at`, re-checking availability.
    pub fn reschedule_appointment(
        &mut self,
        appointment_id: AppointmentId,
        scheduled_at: EpochMillis,
    ) -> ServiceResult<Appointment> {
        self.modify(appointment_id, |conn, appointment| {
            check_availability(conn, appointment.doctor_id, scheduled_at)?;
            appointment.scheduled_at = scheduled_at;
            Ok(())
        })
    }

    pub fn get_appointment(
        &self,
        appointment_id: AppointmentId,
    ) -> ServiceResult<Option<Appointment>> {
        Ok(SqliteAppointmentRepository::new(self.conn).get_appointment(appointment_id)?)
    }

    pub fn list_appointments(
        &self,
        query: &AppointmentListQuery,
    ) -> ServiceResult<Vec<Appointment>> {
        Ok(SqliteAppointmentRepository::new(self.conn).list_appointments(query)?)
    }

    pub fn list_for_doctor(&self, doctor_id: DoctorId) -> ServiceResult<Vec<Appointment>> {
        self.list_appointments(&AppointmentListQuery {
            doctor_id: Some(doctor_id),
            ..AppointmentListQuery::default()
        })
    }

    pub fn list_for_patient(&self, patient_id: PatientId) -> ServiceResult<Vec<Appointment>> {
        self.list_appointments(&AppointmentListQuery {
            patient_id: Some(patient_id),
            ..AppointmentListQuery::default()
        })
    }

    /// Deletes the appointment and its treatment.
    pub fn delete_appointment(&mut self, appointment_id: AppointmentId) -> ServiceResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        SqliteAppointmentRepository::new(&tx).delete_appointment(appointment_id)?;
        tx.commit()?;

        info!(
            "event=appointment_delete module=service status=ok appointment_id={}",
            appointment_id
        );
        Ok(())
    }

    fn modify(
        &mut self,
        appointment_id: AppointmentId,
        apply: impl FnOnce(&Connection, &mut Appointment) -> ServiceResult<()>,
    ) -> ServiceResult<Appointment> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let repo = SqliteAppointmentRepository::new(&tx);
        let mut appointment =
            repo.get_appointment(appointment_id)?
                .ok_or(ServiceError::NotFound {
                    entity: "appointment",
                    id: appointment_id,
                })?;

        let treatment_before = appointment.treatment.clone();
        apply(&tx, &mut appointment)?;

        repo.update_appointment(&appointment)?;
        if appointment.treatment != treatment_before {
            if let Some(treatment) = appointment.treatment.as_ref() {
                repo.save_treatment(treatment)?;
            }
        }

        let updated = read_back(
            repo.get_appointment(appointment_id)?,
            "updated appointment not found in read-back",
        )?;
        tx.commit()?;
        Ok(updated)
    }
}

fn check_availability(
    conn: &Connection,
    doctor_id: DoctorId,
    scheduled_at: EpochMillis,
) -> ServiceResult<()> {
    let doctor = SqliteDoctorRepository::new(conn)
        .get_doctor(doctor_id)?
        .ok_or(ServiceError::NotFound {
            entity: "doctor profile",
            id: doctor_id,
        })?;

    let Some(availability) = doctor.availability.filter(|value| !value.is_empty()) else {
        return Ok(());
    };

    let at = DateTime::from_timestamp_millis(scheduled_at)
        .ok_or(ServiceError::InvalidSchedule(scheduled_at))?
        .naive_utc();
    if !availability.covers(at) {
        return Err(ServiceError::OutsideAvailability {
            doctor_id,
            scheduled_at,
        });
    }
    Ok(())
}
