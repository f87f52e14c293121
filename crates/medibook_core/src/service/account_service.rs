//! Account use-case service.
//!
//! # Responsibility
//! - Register and authenticate users with hashed credentials.
//! - Attach doctor/patient profiles to users of the matching role.
//! - Delete profiles together with the appointments they own.
//!
//! # Invariants
//! - A doctor profile is only created for a `Doctor` user, a patient profile
//!   only for a `Patient` user.
//! - Log events never include usernames, emails or passwords.

use super::{read_back, ServiceError, ServiceResult};
use crate::credential::PasswordHasher;
use crate::model::doctor::{DoctorProfile, NewDoctorProfile};
use crate::model::patient::{generate_patient_identifier, NewPatientProfile, PatientProfile};
use crate::model::user::{NewUser, User, UserRole};
use crate::model::{DoctorId, PatientId, UserId};
use crate::repo::doctor_repo::{DoctorRepository, SqliteDoctorRepository};
use crate::repo::patient_repo::{PatientRepository, SqlitePatientRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserListQuery, UserRepository};
use log::{info, warn};
use rusqlite::{Connection, TransactionBehavior};

/// Registration request. `password` is plaintext and hashed before storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

impl RegisterUser {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        role: UserRole,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            role,
        }
    }
}

/// Account service over one SQLite connection.
pub struct AccountService<'conn> {
    conn: &'conn mut Connection,
    hasher: PasswordHasher,
}

impl<'conn> AccountService<'conn> {
    pub fn new(conn: &'conn mut Connection, hasher: PasswordHasher) -> Self {
        Self { conn, hasher }
    }

    /// Creates an active user with a freshly hashed password.
    ///
    /// Duplicate usernames or emails surface as `ConstraintKind::Unique`.
    pub fn register_user(&mut self, request: &RegisterUser) -> ServiceResult<User> {
        let password_hash = self.hasher.hash(&request.password)?;
        let new_user = NewUser::new(
            request.username.trim(),
            request.email.trim(),
            password_hash,
            request.role,
        );

        let repo = SqliteUserRepository::new(self.conn);
        let user_id = repo.create_user(&new_user)?;
        info!(
            "event=user_register module=service status=ok user_id={} role={}",
            user_id,
            request.role.as_str()
        );
        read_back(repo.get_user(user_id)?, "registered user not found in read-back")
    }

    /// Resolves `login` as a username, then as an email, and checks the
    /// password.
    ///
    /// Unknown logins and wrong passwords both return `InvalidCredentials`
    /// after the same key derivation cost.
    pub fn authenticate(&self, login: &str, password: &str) -> ServiceResult<User> {
        let repo = SqliteUserRepository::new(self.conn);
        let login = login.trim();
        let user = match repo.find_by_username(login)? {
            Some(user) => Some(user),
            None => repo.find_by_email(login)?,
        };

        let Some(user) = user else {
            self.hasher.verify_missing(password);
            warn!("event=user_auth module=service status=denied reason=unknown_login");
            return Err(ServiceError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            warn!(
                "event=user_auth module=service status=denied reason=bad_password user_id={}",
                user.id
            );
            return Err(ServiceError::InvalidCredentials);
        }
        if !user.is_active {
            warn!(
                "event=user_auth module=service status=denied reason=inactive user_id={}",
                user.id
            );
            return Err(ServiceError::InactiveUser(user.id));
        }

        info!(
            "event=user_auth module=service status=ok user_id={}",
            user.id
        );
        Ok(user)
    }

    pub fn get_user(&self, user_id: UserId) -> ServiceResult<Option<User>> {
        Ok(SqliteUserRepository::new(self.conn).get_user(user_id)?)
    }

    pub fn list_users(&self, query: &UserListQuery) -> ServiceResult<Vec<User>> {
        Ok(SqliteUserRepository::new(self.conn).list_users(query)?)
    }

    pub fn deactivate_user(&self, user_id: UserId) -> ServiceResult<()> {
        SqliteUserRepository::new(self.conn).set_user_active(user_id, false)?;
        info!(
            "event=user_deactivate module=service status=ok user_id={}",
            user_id
        );
        Ok(())
    }

    pub fn activate_user(&self, user_id: UserId) -> ServiceResult<()> {
        SqliteUserRepository::new(self.conn).set_user_active(user_id, true)?;
        Ok(())
    }

    /// Deletes a user without profiles.
    ///
    /// Fails with `ConstraintKind::ForeignKey` while a profile still exists.
    pub fn delete_user(&self, user_id: UserId) -> ServiceResult<()> {
        SqliteUserRepository::new(self.conn).delete_user(user_id)?;
        info!("event=user_delete module=service status=ok user_id={}", user_id);
        Ok(())
    }

    /// Returns the admin user named `username`, creating it when missing.
    ///
    /// An existing non-admin user with that name is reported as
    /// `RoleMismatch`; the stored password is never replaced.
    pub fn ensure_admin(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ServiceResult<User> {
        if let Some(existing) = SqliteUserRepository::new(self.conn).find_by_username(username.trim())? {
            if existing.role != UserRole::Admin {
                return Err(ServiceError::RoleMismatch {
                    user_id: existing.id,
                    expected: UserRole::Admin,
                    actual: existing.role,
                });
            }
            info!(
                "event=admin_bootstrap module=service status=skipped user_id={}",
                existing.id
            );
            return Ok(existing);
        }

        let admin = self.register_user(&RegisterUser::new(
            username,
            email,
            password,
            UserRole::Admin,
        ))?;
        info!(
            "event=admin_bootstrap module=service status=ok user_id={}",
            admin.id
        );
        Ok(admin)
    }

    pub fn create_doctor_profile(
        &mut self,
        profile: &NewDoctorProfile,
    ) -> ServiceResult<DoctorProfile> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        require_role(&SqliteUserRepository::new(&tx), profile.user_id, UserRole::Doctor)?;

        let repo = SqliteDoctorRepository::new(&tx);
        let doctor_id = repo.create_doctor(profile)?;
        let created = read_back(
            repo.get_doctor(doctor_id)?,
            "created doctor profile not found in read-back",
        )?;
        tx.commit()?;

        info!(
            "event=doctor_profile_create module=service status=ok doctor_id={} user_id={}",
            created.id, created.user_id
        );
        Ok(created)
    }

    /// Creates a patient profile, generating `patient_identifier` if absent.
    pub fn create_patient_profile(
        &mut self,
        profile: &NewPatientProfile,
    ) -> ServiceResult<PatientProfile> {
        let mut profile = profile.clone();
        if profile
            .patient_identifier
            .as_deref()
            .map_or(true, |value| value.trim().is_empty())
        {
            profile.patient_identifier = Some(generate_patient_identifier());
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        require_role(&SqliteUserRepository::new(&tx), profile.user_id, UserRole::Patient)?;

        let repo = SqlitePatientRepository::new(&tx);
        let patient_id = repo.create_patient(&profile)?;
        let created = read_back(
            repo.get_patient(patient_id)?,
            "created patient profile not found in read-back",
        )?;
        tx.commit()?;

        info!(
            "event=patient_profile_create module=service status=ok patient_id={} user_id={}",
            created.id, created.user_id
        );
        Ok(created)
    }

    pub fn get_doctor_profile(&self, doctor_id: DoctorId) -> ServiceResult<Option<DoctorProfile>> {
        Ok(SqliteDoctorRepository::new(self.conn).get_doctor(doctor_id)?)
    }

    pub fn doctor_profile_for_user(&self, user_id: UserId) -> ServiceResult<Option<DoctorProfile>> {
        Ok(SqliteDoctorRepository::new(self.conn).find_by_user(user_id)?)
    }

    pub fn get_patient_profile(
        &self,
        patient_id: PatientId,
    ) -> ServiceResult<Option<PatientProfile>> {
        Ok(SqlitePatientRepository::new(self.conn).get_patient(patient_id)?)
    }

    pub fn patient_profile_for_user(
        &self,
        user_id: UserId,
    ) -> ServiceResult<Option<PatientProfile>> {
        Ok(SqlitePatientRepository::new(self.conn).find_by_user(user_id)?)
    }

    pub fn update_doctor_profile(&self, profile: &DoctorProfile) -> ServiceResult<DoctorProfile> {
        let repo = SqliteDoctorRepository::new(self.conn);
        repo.update_doctor(profile)?;
        read_back(
            repo.get_doctor(profile.id)?,
            "updated doctor profile not found in read-back",
        )
    }

    pub fn update_patient_profile(
        &self,
        profile: &PatientProfile,
    ) -> ServiceResult<PatientProfile> {
        let repo = SqlitePatientRepository::new(self.conn);
        repo.update_patient(profile)?;
        read_back(
            repo.get_patient(profile.id)?,
            "updated patient profile not found in read-back",
        )
    }

    /// Deletes the doctor profile, its appointments and their treatments.
    ///
    /// Returns the number of appointments removed.
    pub fn delete_doctor_profile(&mut self, doctor_id: DoctorId) -> ServiceResult<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = SqliteDoctorRepository::new(&tx).delete_doctor(doctor_id)?;
        tx.commit()?;

        info!(
            "event=doctor_profile_delete module=service status=ok doctor_id={} appointments_removed={}",
            doctor_id, removed
        );
        Ok(removed)
    }

    /// Deletes the patient profile, its appointments and their treatments.
    ///
    /// Returns the number of appointments removed.
    pub fn delete_patient_profile(&mut self, patient_id: PatientId) -> ServiceResult<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = SqlitePatientRepository::new(&tx).delete_patient(patient_id)?;
        tx.commit()?;

        info!(
            "event=patient_profile_delete module=service status=ok patient_id={} appointments_removed={}",
            patient_id, removed
        );
        Ok(removed)
    }
}

fn require_role(
    users: &impl UserRepository,
    user_id: UserId,
    expected: UserRole,
) -> ServiceResult<()> {
    let user = users.get_user(user_id)?.ok_or(ServiceError::NotFound {
        entity: "user",
        id: user_id,
    })?;
    if user.role != expected {
        return Err(ServiceError::RoleMismatch {
            user_id,
            expected,
            actual: user.role,
        });
    }
    Ok(())
}
