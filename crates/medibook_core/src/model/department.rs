//! Hospital department model.

use super::validation::{require_text, ValidationError};
use super::DepartmentId;
use serde::{Deserialize, Serialize};

pub const DEPARTMENT_NAME_MAX_CHARS: usize = 120;

/// Department grouping doctor profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub description: Option<String>,
}

/// Insert shape for a department.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewDepartment {
    pub name: String,
    pub description: Option<String>,
}

impl NewDepartment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, DEPARTMENT_NAME_MAX_CHARS)
    }
}

impl Department {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, DEPARTMENT_NAME_MAX_CHARS)
    }
}
