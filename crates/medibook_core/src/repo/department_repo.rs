//! Department repository contract and SQLite implementation.
//!
//! # Invariants
//! - Department names are unique.
//! - Deleting a department detaches its doctors (`department_id = NULL`)
//!   before removing the row; callers run this on a transaction.

use super::{expect_changed, RepoResult};
use crate::model::department::{Department, NewDepartment};
use crate::model::DepartmentId;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for departments.
pub trait DepartmentRepository {
    fn create_department(&self, department: &NewDepartment) -> RepoResult<DepartmentId>;
    fn get_department(&self, id: DepartmentId) -> RepoResult<Option<Department>>;
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Department>>;
    fn list_departments(&self) -> RepoResult<Vec<Department>>;
    fn update_department(&self, department: &Department) -> RepoResult<()>;
    /// Detaches member doctors, then deletes the department.
    ///
    /// Returns the number of doctors that were detached.
    fn delete_department(&self, id: DepartmentId) -> RepoResult<usize>;
}

/// SQLite-backed department repository.
pub struct SqliteDepartmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDepartmentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl DepartmentRepository for SqliteDepartmentRepository<'_> {
    fn create_department(&self, department: &NewDepartment) -> RepoResult<DepartmentId> {
        department.validate()?;
        self.conn.execute(
            "INSERT INTO departments (name, description) VALUES (?1, ?2);",
            params![department.name.as_str(), department.description.as_deref()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_department(&self, id: DepartmentId) -> RepoResult<Option<Department>> {
        let department = self
            .conn
            .query_row(
                "SELECT id, name, description FROM departments WHERE id = ?1;",
                [id],
                parse_department_row,
            )
            .optional()?;
        Ok(department)
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Department>> {
        let department = self
            .conn
            .query_row(
                "SELECT id, name, description FROM departments WHERE name = ?1;",
                [name],
                parse_department_row,
            )
            .optional()?;
        Ok(department)
    }

    fn list_departments(&self) -> RepoResult<Vec<Department>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description FROM departments ORDER BY name COLLATE NOCASE ASC;")?;
        let departments = stmt
            .query_map([], parse_department_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(departments)
    }

    fn update_department(&self, department: &Department) -> RepoResult<()> {
        department.validate()?;
        let changed = self.conn.execute(
            "UPDATE departments SET name = ?2, description = ?3 WHERE id = ?1;",
            params![
                department.id,
                department.name.as_str(),
                department.description.as_deref()
            ],
        )?;
        expect_changed(changed, "department", department.id)
    }

    fn delete_department(&self, id: DepartmentId) -> RepoResult<usize> {
        let detached = self.conn.execute(
            "UPDATE doctor_profiles SET department_id = NULL WHERE department_id = ?1;",
            [id],
        )?;
        let changed = self
            .conn
            .execute("DELETE FROM departments WHERE id = ?1;", [id])?;
        expect_changed(changed, "department", id)?;
        Ok(detached)
    }
}

fn parse_department_row(row: &Row<'_>) -> rusqlite::Result<Department> {
    Ok(Department {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
    })
}
