//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define per-entity data access contracts.
//! - Isolate SQLite query details from service orchestration.
//! - Perform cascade deletes explicitly, since the schema declares plain
//!   foreign keys.
//!
//! # Invariants
//! - Write paths validate model fields before SQL mutations.
//! - Repositories never open transactions; multi-step writes must run on a
//!   `rusqlite::Transaction` owned by the caller.
//! - Constraint failures surface as `RepoError::Constraint` with a kind.

use crate::db::DbError;
use crate::model::validation::ValidationError;
use rusqlite::ffi;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod appointment_repo;
pub mod department_repo;
pub mod doctor_repo;
pub mod patient_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Database constraint family reported by SQLite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    NotNull,
    Check,
    Other,
}

impl ConstraintKind {
    fn from_extended_code(code: i32) -> Self {
        match code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Self::Unique,
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Self::ForeignKey,
            ffi::SQLITE_CONSTRAINT_NOTNULL => Self::NotNull,
            ffi::SQLITE_CONSTRAINT_CHECK => Self::Check,
            _ => Self::Other,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::ForeignKey => "foreign key",
            Self::NotNull => "not null",
            Self::Check => "check",
            Self::Other => "other",
        }
    }
}

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    Constraint {
        kind: ConstraintKind,
        message: String,
    },
    NotFound {
        entity: &'static str,
        id: i64,
    },
    InvalidData(String),
}

impl RepoError {
    /// Returns the constraint kind when this error is a constraint failure.
    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self {
            Self::Constraint { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Constraint { kind, message } => {
                write!(f, "{} constraint violated: {message}", kind.label())
            }
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Constraint { .. } | Self::NotFound { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => err.into(),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(err, message)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Constraint {
                    kind: ConstraintKind::from_extended_code(err.extended_code),
                    message: message.unwrap_or_else(|| err.to_string()),
                }
            }
            other => Self::Db(DbError::Sqlite(other)),
        }
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn int_to_bool(table_column: &str, value: i64) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {table_column}"
        ))),
    }
}

/// Maps a zero affected-row count to `NotFound`.
fn expect_changed(changed: usize, entity: &'static str, id: i64) -> RepoResult<()> {
    if changed == 0 {
        return Err(RepoError::NotFound { entity, id });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ConstraintKind, RepoError};
    use rusqlite::Connection;

    #[test]
    fn unique_failures_are_classified() {
        let conn = Connection::open_in_memory().expect("open memory db");
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .expect("seed table");

        let err: RepoError = conn
            .execute("INSERT INTO t VALUES ('a');", [])
            .expect_err("duplicate insert must fail")
            .into();
        assert_eq!(err.constraint_kind(), Some(ConstraintKind::Unique));
    }

    #[test]
    fn not_null_failures_are_classified() {
        let conn = Connection::open_in_memory().expect("open memory db");
        conn.execute_batch("CREATE TABLE t (name TEXT NOT NULL);")
            .expect("create table");

        let err: RepoError = conn
            .execute("INSERT INTO t VALUES (NULL);", [])
            .expect_err("null insert must fail")
            .into();
        assert_eq!(err.constraint_kind(), Some(ConstraintKind::NotNull));
    }
}
