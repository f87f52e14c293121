use medibook_core::repo::doctor_repo::DoctorListQuery;
use medibook_core::{
    AppConfig, AppContext, BookAppointment, CompletionNotes, ConstraintKind, DoctorProfile,
    NewDepartment, NewDoctorProfile, NewPatientProfile, PatientProfile, RegisterUser,
    ServiceError, UserRole,
};

const MONDAY_10AM: i64 = 1_704_103_200_000;
const HOUR_MS: i64 = 60 * 60 * 1000;

fn test_context() -> AppContext {
    AppContext::open_in_memory(AppConfig {
        password_iterations: 1_000,
        ..AppConfig::default()
    })
    .unwrap()
}

fn doctor(context: &mut AppContext, username: &str) -> DoctorProfile {
    let user = context
        .accounts()
        .register_user(&RegisterUser::new(
            username,
            format!("{username}@hospital.test"),
            "correct horse battery",
            UserRole::Doctor,
        ))
        .unwrap();
    context
        .accounts()
        .create_doctor_profile(&NewDoctorProfile::new(user.id))
        .unwrap()
}

fn patient(context: &mut AppContext, username: &str) -> PatientProfile {
    let user = context
        .accounts()
        .register_user(&RegisterUser::new(
            username,
            format!("{username}@hospital.test"),
            "correct horse battery",
            UserRole::Patient,
        ))
        .unwrap();
    context
        .accounts()
        .create_patient_profile(&NewPatientProfile::new(user.id))
        .unwrap()
}

/// Books `count` hourly slots and completes every other one.
fn book_series(
    context: &mut AppContext,
    doctor: &DoctorProfile,
    patient: &PatientProfile,
    count: i64,
) -> Vec<i64> {
    (0..count)
        .map(|slot| {
            let appointment = context
                .appointments()
                .book_appointment(&BookAppointment {
                    patient_id: patient.id,
                    doctor_id: doctor.id,
                    scheduled_at: MONDAY_10AM + slot * HOUR_MS,
                    reason: None,
                })
                .unwrap();
            if slot % 2 == 0 {
                context
                    .appointments()
                    .complete_appointment(
                        appointment.id,
                        &CompletionNotes {
                            diagnosis: Some("checkup".to_string()),
                            ..CompletionNotes::default()
                        },
                    )
                    .unwrap();
            }
            appointment.id
        })
        .collect()
}

fn count(context: &AppContext, table: &str) -> i64 {
    context
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
            row.get(0)
        })
        .unwrap()
}

#[test]
fn deleting_doctor_removes_only_their_appointments_and_treatments() {
    let mut context = test_context();
    let doctor_a = doctor(&mut context, "dr_a");
    let doctor_b = doctor(&mut context, "dr_b");
    let patient = patient(&mut context, "pat");

    book_series(&mut context, &doctor_a, &patient, 3);
    let kept = book_series(&mut context, &doctor_b, &patient, 2);
    assert_eq!(count(&context, "appointments"), 5);
    assert_eq!(count(&context, "treatments"), 3);

    let removed = context
        .accounts()
        .delete_doctor_profile(doctor_a.id)
        .unwrap();
    assert_eq!(removed, 3);
    assert_eq!(count(&context, "appointments"), 2);
    assert_eq!(count(&context, "treatments"), 1);

    let remaining: Vec<i64> = context
        .appointments()
        .list_for_patient(patient.id)
        .unwrap()
        .into_iter()
        .map(|appointment| appointment.id)
        .collect();
    assert_eq!(remaining, kept);
    assert!(context
        .accounts()
        .get_doctor_profile(doctor_a.id)
        .unwrap()
        .is_none());
}

#[test]
fn deleting_patient_removes_their_appointments_and_treatments() {
    let mut context = test_context();
    let doctor = doctor(&mut context, "dr_c");
    let patient_a = patient(&mut context, "pat_a");
    let patient_b = patient(&mut context, "pat_b");

    book_series(&mut context, &doctor, &patient_a, 4);
    book_series(&mut context, &doctor, &patient_b, 1);

    let removed = context
        .accounts()
        .delete_patient_profile(patient_a.id)
        .unwrap();
    assert_eq!(removed, 4);
    assert_eq!(count(&context, "appointments"), 1);
    assert_eq!(count(&context, "treatments"), 1);
    assert_eq!(
        context.appointments().list_for_doctor(doctor.id).unwrap()[0].patient_id,
        patient_b.id
    );
}

#[test]
fn deleting_profile_without_appointments_reports_zero() {
    let mut context = test_context();
    let doctor = doctor(&mut context, "dr_d");

    let removed = context
        .accounts()
        .delete_doctor_profile(doctor.id)
        .unwrap();
    assert_eq!(removed, 0);

    let err = context
        .accounts()
        .delete_doctor_profile(doctor.id)
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[test]
fn deleting_department_detaches_doctors() {
    let mut context = test_context();
    let cardiology = context
        .directory()
        .create_department(&NewDepartment::new("Cardiology"))
        .unwrap();
    let first = doctor(&mut context, "dr_e");
    let second = doctor(&mut context, "dr_f");
    context
        .directory()
        .assign_department(first.id, Some(cardiology.id))
        .unwrap();
    context
        .directory()
        .assign_department(second.id, Some(cardiology.id))
        .unwrap();

    let members = context
        .directory()
        .list_doctors(&DoctorListQuery {
            department_id: Some(cardiology.id),
            ..DoctorListQuery::default()
        })
        .unwrap();
    assert_eq!(members.len(), 2);

    let detached = context
        .directory()
        .delete_department(cardiology.id)
        .unwrap();
    assert_eq!(detached, 2);
    assert!(context
        .directory()
        .get_department(cardiology.id)
        .unwrap()
        .is_none());
    let orphan = context
        .accounts()
        .get_doctor_profile(first.id)
        .unwrap()
        .unwrap();
    assert_eq!(orphan.department_id, None);
}

#[test]
fn department_names_are_unique_and_doctor_needs_existing_department() {
    let mut context = test_context();
    context
        .directory()
        .create_department(&NewDepartment::new("Neurology"))
        .unwrap();
    let err = context
        .directory()
        .create_department(&NewDepartment::new("Neurology"))
        .unwrap_err();
    assert_eq!(err.constraint_kind(), Some(ConstraintKind::Unique));

    let doctor = doctor(&mut context, "dr_g");
    let err = context
        .directory()
        .assign_department(doctor.id, Some(4_040))
        .unwrap_err();
    assert_eq!(err.constraint_kind(), Some(ConstraintKind::ForeignKey));
}
