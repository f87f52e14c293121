//! Department and doctor directory service.
//!
//! # Responsibility
//! - Manage departments and doctor membership.
//! - Maintain doctor availability.

use super::{read_back, ServiceError, ServiceResult};
use crate::model::department::{Department, NewDepartment};
use crate::model::doctor::{Availability, DoctorProfile};
use crate::model::{DepartmentId, DoctorId};
use crate::repo::department_repo::{DepartmentRepository, SqliteDepartmentRepository};
use crate::repo::doctor_repo::{DoctorListQuery, DoctorRepository, SqliteDoctorRepository};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

pub struct DirectoryService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> DirectoryService<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    pub fn create_department(&self, department: &NewDepartment) -> ServiceResult<Department> {
        let repo = SqliteDepartmentRepository::new(self.conn);
        let department_id = repo.create_department(department)?;
        info!(
            "event=department_create module=service status=ok department_id={}",
            department_id
        );
        read_back(
            repo.get_department(department_id)?,
            "created department not found in read-back",
        )
    }

    pub fn get_department(&self, department_id: DepartmentId) -> ServiceResult<Option<Department>> {
        Ok(SqliteDepartmentRepository::new(self.conn).get_department(department_id)?)
    }

    pub fn list_departments(&self) -> ServiceResult<Vec<Department>> {
        Ok(SqliteDepartmentRepository::new(self.conn).list_departments()?)
    }

    pub fn update_department(&self, department: &Department) -> ServiceResult<Department> {
        let repo = SqliteDepartmentRepository::new(self.conn);
        repo.update_department(department)?;
        read_back(
            repo.get_department(department.id)?,
            "updated department not found in read-back",
        )
    }

    /// Deletes a department, keeping its doctors without a department.
    ///
    /// Returns the number of doctors detached.
    pub fn delete_department(&mut self, department_id: DepartmentId) -> ServiceResult<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let detached = SqliteDepartmentRepository::new(&tx).delete_department(department_id)?;
        tx.commit()?;

        info!(
            "event=department_delete module=service status=ok department_id={} doctors_detached={}",
            department_id, detached
        );
        Ok(detached)
    }

    /// Moves a doctor into `department_id`, or out of any department.
    pub fn assign_department(
        &mut self,
        doctor_id: DoctorId,
        department_id: Option<DepartmentId>,
    ) -> ServiceResult<DoctorProfile> {
        self.modify_doctor(doctor_id, |profile| profile.department_id = department_id)
    }

    /// Replaces a doctor's weekly availability; `None` clears it.
    pub fn set_availability(
        &mut self,
        doctor_id: DoctorId,
        availability: Option<Availability>,
    ) -> ServiceResult<DoctorProfile> {
        if let Some(availability) = availability.as_ref() {
            availability.validate()?;
        }
        self.modify_doctor(doctor_id, |profile| profile.availability = availability)
    }

    pub fn list_doctors(&self, query: &DoctorListQuery) -> ServiceResult<Vec<DoctorProfile>> {
        Ok(SqliteDoctorRepository::new(self.conn).list_doctors(query)?)
    }

    fn modify_doctor(
        &mut self,
        doctor_id: DoctorId,
        apply: impl FnOnce(&mut DoctorProfile),
    ) -> ServiceResult<DoctorProfile> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let repo = SqliteDoctorRepository::new(&tx);
        let mut profile = repo.get_doctor(doctor_id)?.ok_or(ServiceError::NotFound {
            entity: "doctor profile",
            id: doctor_id,
        })?;

        apply(&mut profile);
        repo.update_doctor(&profile)?;
        let updated = read_back(
            repo.get_doctor(doctor_id)?,
            "updated doctor profile not found in read-back",
        )?;
        tx.commit()?;
        Ok(updated)
    }
}
