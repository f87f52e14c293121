use medibook_core::repo::appointment_repo::AppointmentListQuery;
use medibook_core::{
    AppConfig, AppContext, AppointmentStatus, Availability, BookAppointment, CompletionNotes,
    DoctorId, NewDoctorProfile, NewPatientProfile, PatientId, RegisterUser, ServiceError,
    UserRole,
};

/// 2024-01-01 10:00:00 UTC, a Monday.
const MONDAY_10AM: i64 = 1_704_103_200_000;
const HOUR_MS: i64 = 60 * 60 * 1000;
const DAY_MS: i64 = 24 * HOUR_MS;

struct Fixture {
    context: AppContext,
    doctor_id: DoctorId,
    patient_id: PatientId,
}

fn fixture() -> Fixture {
    let mut context = AppContext::open_in_memory(AppConfig {
        password_iterations: 1_000,
        ..AppConfig::default()
    })
    .unwrap();

    let doctor_user = context
        .accounts()
        .register_user(&RegisterUser::new(
            "dr_house",
            "house@hospital.test",
            "vicodin-and-lupus",
            UserRole::Doctor,
        ))
        .unwrap();
    let patient_user = context
        .accounts()
        .register_user(&RegisterUser::new(
            "patient_zero",
            "zero@hospital.test",
            "correct horse battery",
            UserRole::Patient,
        ))
        .unwrap();

    let doctor_id = context
        .accounts()
        .create_doctor_profile(&NewDoctorProfile::new(doctor_user.id))
        .unwrap()
        .id;
    let patient_id = context
        .accounts()
        .create_patient_profile(&NewPatientProfile::new(patient_user.id))
        .unwrap()
        .id;

    Fixture {
        context,
        doctor_id,
        patient_id,
    }
}

fn booking(fixture: &Fixture, scheduled_at: i64) -> BookAppointment {
    BookAppointment {
        patient_id: fixture.patient_id,
        doctor_id: fixture.doctor_id,
        scheduled_at,
        reason: Some("persistent cough".to_string()),
    }
}

fn treatment_rows(context: &AppContext, appointment_id: i64) -> i64 {
    context
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM treatments WHERE appointment_id = ?1;",
            [appointment_id],
            |row| row.get(0),
        )
        .unwrap()
}

#[test]
fn booked_appointment_starts_without_treatment() {
    let mut fx = fixture();
    let request = booking(&fx, MONDAY_10AM);
    let booked = fx.context.appointments().book_appointment(&request).unwrap();

    assert_eq!(booked.status, AppointmentStatus::Booked);
    assert_eq!(booked.scheduled_at, MONDAY_10AM);
    assert_eq!(booked.reason.as_deref(), Some("persistent cough"));
    assert!(booked.treatment.is_none());
    assert_eq!(booked.created_at, booked.updated_at);
}

#[test]
fn completion_fills_treatment_then_keeps_untouched_fields() {
    let mut fx = fixture();
    let request = booking(&fx, MONDAY_10AM);
    let booked = fx.context.appointments().book_appointment(&request).unwrap();

    let first = fx
        .context
        .appointments()
        .complete_appointment(
            booked.id,
            &CompletionNotes {
                diagnosis: Some("flu".to_string()),
                prescription: Some("rest".to_string()),
                notes: None,
            },
        )
        .unwrap();
    assert_eq!(first.status, AppointmentStatus::Completed);
    let treatment = first.treatment.clone().unwrap();
    assert!(treatment.id.is_some());
    assert!(treatment.created_at.is_some());
    assert_eq!(treatment.appointment_id, booked.id);
    assert_eq!(treatment.diagnosis.as_deref(), Some("flu"));
    assert_eq!(treatment.prescription.as_deref(), Some("rest"));
    assert_eq!(treatment.notes, None);

    let second = fx
        .context
        .appointments()
        .complete_appointment(
            booked.id,
            &CompletionNotes {
                notes: Some("follow-up in 1 week".to_string()),
                ..CompletionNotes::default()
            },
        )
        .unwrap();
    let follow_up = second.treatment.unwrap();
    assert_eq!(follow_up.id, treatment.id);
    assert_eq!(follow_up.diagnosis.as_deref(), Some("flu"));
    assert_eq!(follow_up.prescription.as_deref(), Some("rest"));
    assert_eq!(follow_up.notes.as_deref(), Some("follow-up in 1 week"));
    assert_eq!(treatment_rows(&fx.context, booked.id), 1);
}

#[test]
fn later_non_empty_diagnosis_overwrites_and_empty_string_keeps() {
    let mut fx = fixture();
    let request = booking(&fx, MONDAY_10AM);
    let booked = fx.context.appointments().book_appointment(&request).unwrap();

    let diagnose = |text: &str| CompletionNotes {
        diagnosis: Some(text.to_string()),
        ..CompletionNotes::default()
    };
    fx.context
        .appointments()
        .complete_appointment(booked.id, &diagnose("cold"))
        .unwrap();
    fx.context
        .appointments()
        .complete_appointment(booked.id, &diagnose("bronchitis"))
        .unwrap();
    let unchanged = fx
        .context
        .appointments()
        .complete_appointment(booked.id, &diagnose(""))
        .unwrap();

    assert_eq!(
        unchanged.treatment.unwrap().diagnosis.as_deref(),
        Some("bronchitis")
    );
    assert_eq!(treatment_rows(&fx.context, booked.id), 1);
}

#[test]
fn completion_without_notes_still_attaches_empty_treatment() {
    let mut fx = fixture();
    let request = booking(&fx, MONDAY_10AM);
    let booked = fx.context.appointments().book_appointment(&request).unwrap();

    let completed = fx
        .context
        .appointments()
        .complete_appointment(booked.id, &CompletionNotes::default())
        .unwrap();
    let treatment = completed.treatment.unwrap();
    assert!(treatment.id.is_some());
    assert_eq!(treatment.diagnosis, None);
    assert_eq!(treatment_rows(&fx.context, booked.id), 1);
}

#[test]
fn cancelled_appointment_can_still_be_completed() {
    let mut fx = fixture();
    let request = booking(&fx, MONDAY_10AM);
    let booked = fx.context.appointments().book_appointment(&request).unwrap();

    let cancelled = fx.context.appointments().cancel_appointment(booked.id).unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert!(cancelled.treatment.is_none());

    let completed = fx
        .context
        .appointments()
        .complete_appointment(
            booked.id,
            &CompletionNotes {
                diagnosis: Some("flu".to_string()),
                ..CompletionNotes::default()
            },
        )
        .unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);
    assert!(completed.treatment.is_some());
}

#[test]
fn every_change_advances_updated_at() {
    let mut fx = fixture();
    let request = booking(&fx, MONDAY_10AM);
    let booked = fx.context.appointments().book_appointment(&request).unwrap();

    let cancelled = fx.context.appointments().cancel_appointment(booked.id).unwrap();
    assert!(cancelled.updated_at > booked.updated_at);
    assert_eq!(cancelled.created_at, booked.created_at);

    let rebooked = fx
        .context
        .appointments()
        .set_status(booked.id, AppointmentStatus::Booked)
        .unwrap();
    assert!(rebooked.updated_at > cancelled.updated_at);

    let moved = fx
        .context
        .appointments()
        .reschedule_appointment(booked.id, MONDAY_10AM + DAY_MS)
        .unwrap();
    assert_eq!(moved.scheduled_at, MONDAY_10AM + DAY_MS);
    assert!(moved.updated_at > rebooked.updated_at);
}

#[test]
fn booking_requires_existing_profiles() {
    let mut fx = fixture();

    let mut missing_patient = booking(&fx, MONDAY_10AM);
    missing_patient.patient_id = 9_999;
    let err = fx
        .context
        .appointments()
        .book_appointment(&missing_patient)
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { id: 9_999, .. }));

    let mut missing_doctor = booking(&fx, MONDAY_10AM);
    missing_doctor.doctor_id = 8_888;
    let err = fx
        .context
        .appointments()
        .book_appointment(&missing_doctor)
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { id: 8_888, .. }));

    let err = fx
        .context
        .appointments()
        .complete_appointment(7_777, &CompletionNotes::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound {
            entity: "appointment",
            ..
        }
    ));
}

#[test]
fn declared_availability_limits_booking_and_rescheduling() {
    let mut fx = fixture();
    let doctor_id = fx.doctor_id;
    let availability = Availability::new().with_range("Mon", "09:00-12:00");
    fx.context
        .directory()
        .set_availability(doctor_id, Some(availability))
        .unwrap();

    let inside = booking(&fx, MONDAY_10AM);
    let booked = fx.context.appointments().book_appointment(&inside).unwrap();

    let at_range_end = booking(&fx, MONDAY_10AM + 2 * HOUR_MS);
    let err = fx
        .context
        .appointments()
        .book_appointment(&at_range_end)
        .unwrap_err();
    assert!(matches!(err, ServiceError::OutsideAvailability { .. }));

    let err = fx
        .context
        .appointments()
        .reschedule_appointment(booked.id, MONDAY_10AM + DAY_MS)
        .unwrap_err();
    assert!(matches!(err, ServiceError::OutsideAvailability { .. }));
    let stored = fx
        .context
        .appointments()
        .get_appointment(booked.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.scheduled_at, MONDAY_10AM);

    fx.context
        .directory()
        .set_availability(doctor_id, None)
        .unwrap();
    fx.context
        .appointments()
        .reschedule_appointment(booked.id, MONDAY_10AM + DAY_MS)
        .unwrap();
}

#[test]
fn invalid_availability_is_rejected() {
    let mut fx = fixture();
    let doctor_id = fx.doctor_id;

    let err = fx
        .context
        .directory()
        .set_availability(
            doctor_id,
            Some(Availability::new().with_range("someday", "09:00-12:00")),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = fx
        .context
        .directory()
        .set_availability(
            doctor_id,
            Some(Availability::new().with_range("tue", "17:00-09:00")),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[test]
fn listings_filter_by_owner_and_status_in_schedule_order() {
    let mut fx = fixture();
    let later = booking(&fx, MONDAY_10AM + DAY_MS);
    let earlier = booking(&fx, MONDAY_10AM);
    let later_id = fx.context.appointments().book_appointment(&later).unwrap().id;
    let earlier_id = fx
        .context
        .appointments()
        .book_appointment(&earlier)
        .unwrap()
        .id;
    fx.context.appointments().cancel_appointment(later_id).unwrap();

    let for_doctor = fx.context.appointments().list_for_doctor(fx.doctor_id).unwrap();
    let ids: Vec<i64> = for_doctor.iter().map(|appointment| appointment.id).collect();
    assert_eq!(ids, vec![earlier_id, later_id]);

    let for_patient = fx
        .context
        .appointments()
        .list_for_patient(fx.patient_id)
        .unwrap();
    assert_eq!(for_patient.len(), 2);

    let cancelled = fx
        .context
        .appointments()
        .list_appointments(&AppointmentListQuery {
            status: Some(AppointmentStatus::Cancelled),
            ..AppointmentListQuery::default()
        })
        .unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].id, later_id);

    let window = fx
        .context
        .appointments()
        .list_appointments(&AppointmentListQuery {
            from: Some(MONDAY_10AM),
            until: Some(MONDAY_10AM + HOUR_MS),
            ..AppointmentListQuery::default()
        })
        .unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].id, earlier_id);
}

#[test]
fn deleting_completed_appointment_removes_its_treatment() {
    let mut fx = fixture();
    let request = booking(&fx, MONDAY_10AM);
    let booked = fx.context.appointments().book_appointment(&request).unwrap();
    fx.context
        .appointments()
        .complete_appointment(
            booked.id,
            &CompletionNotes {
                diagnosis: Some("flu".to_string()),
                ..CompletionNotes::default()
            },
        )
        .unwrap();

    fx.context.appointments().delete_appointment(booked.id).unwrap();
    assert!(fx
        .context
        .appointments()
        .get_appointment(booked.id)
        .unwrap()
        .is_none());
    assert_eq!(treatment_rows(&fx.context, booked.id), 0);
}

#[test]
fn listings_return_every_row_unless_a_limit_is_given() {
    let mut fx = fixture();
    let total: i64 = 501;
    for slot in 0..total {
        fx.context
            .connection()
            .execute(
                "INSERT INTO appointments (patient_id, doctor_id, scheduled_at)
                 VALUES (?1, ?2, ?3);",
                [fx.patient_id, fx.doctor_id, MONDAY_10AM + slot * HOUR_MS],
            )
            .unwrap();
    }

    let for_doctor = fx.context.appointments().list_for_doctor(fx.doctor_id).unwrap();
    assert_eq!(for_doctor.len(), 501);
    let for_patient = fx
        .context
        .appointments()
        .list_for_patient(fx.patient_id)
        .unwrap();
    assert_eq!(for_patient.len(), 501);

    let page = fx
        .context
        .appointments()
        .list_appointments(&AppointmentListQuery {
            limit: Some(2),
            offset: 500,
            ..AppointmentListQuery::default()
        })
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].scheduled_at, MONDAY_10AM + 500 * HOUR_MS);

    let tail = fx
        .context
        .appointments()
        .list_appointments(&AppointmentListQuery {
            offset: 499,
            ..AppointmentListQuery::default()
        })
        .unwrap();
    assert_eq!(tail.len(), 2);
}
