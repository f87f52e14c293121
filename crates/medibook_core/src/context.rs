//! Application context built once at startup.
//!
//! # Responsibility
//! - Own the SQLite connection, resolved configuration and password hasher.
//! - Hand out use-case services borrowing that connection.
//!
//! # Invariants
//! - The connection is migrated before any service is created.
//! - Services borrow the context mutably, so only one use-case runs at a time
//!   per context.

use crate::config::{AppConfig, ConfigError};
use crate::credential::{CredentialError, PasswordHasher};
use crate::db::migrations::current_user_version;
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::logging::{init_logging, LoggingError};
use crate::model::user::User;
use crate::service::account_service::AccountService;
use crate::service::appointment_service::AppointmentService;
use crate::service::directory_service::DirectoryService;
use crate::service::ServiceError;
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Startup failure of the application shell.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Logging(LoggingError),
    Db(DbError),
    Credential(CredentialError),
    Service(ServiceError),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Logging(err) => write!(f, "logging error: {err}"),
            Self::Db(err) => write!(f, "database error: {err}"),
            Self::Credential(err) => write!(f, "credential error: {err}"),
            Self::Service(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Credential(err) => Some(err),
            Self::Service(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for AppError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<DbError> for AppError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<CredentialError> for AppError {
    fn from(value: CredentialError) -> Self {
        Self::Credential(value)
    }
}

impl From<ServiceError> for AppError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

pub struct AppContext {
    config: AppConfig,
    conn: Connection,
    hasher: PasswordHasher,
}

impl AppContext {
    /// Opens the database at `config.db_path`.
    pub fn open(config: AppConfig) -> Result<Self, AppError> {
        let hasher = PasswordHasher::new(config.password_iterations)?;
        let conn = open_db(&config.db_path)?;
        Ok(Self {
            config,
            conn,
            hasher,
        })
    }

    /// Opens a private in-memory database; `config.db_path` is ignored.
    pub fn open_in_memory(config: AppConfig) -> Result<Self, AppError> {
        let hasher = PasswordHasher::new(config.password_iterations)?;
        let conn = open_db_in_memory()?;
        Ok(Self {
            config,
            conn,
            hasher,
        })
    }

    /// Full startup: file logging when configured, database open, admin seed.
    pub fn bootstrap(config: AppConfig) -> Result<Self, AppError> {
        if let Some(log_dir) = config.log_dir.as_ref() {
            init_logging(config.log_level.as_str(), &log_dir.to_string_lossy())?;
        }

        let mut context = Self::open(config)?;
        context.seed_admin()?;
        info!(
            "event=app_bootstrap module=context status=ok schema_version={}",
            context.schema_version()?
        );
        Ok(context)
    }

    /// Creates the configured admin account when missing.
    ///
    /// Returns `None` when no admin seed is configured.
    pub fn seed_admin(&mut self) -> Result<Option<User>, AppError> {
        let Some(seed) = self.config.admin.clone() else {
            return Ok(None);
        };
        let admin = self
            .accounts()
            .ensure_admin(&seed.username, &seed.email, &seed.password)?;
        Ok(Some(admin))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn schema_version(&self) -> Result<u32, AppError> {
        Ok(current_user_version(&self.conn)?)
    }

    pub fn accounts(&mut self) -> AccountService<'_> {
        AccountService::new(&mut self.conn, self.hasher)
    }

    pub fn directory(&mut self) -> DirectoryService<'_> {
        DirectoryService::new(&mut self.conn)
    }

    pub fn appointments(&mut self) -> AppointmentService<'_> {
        AppointmentService::new(&mut self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::{AppContext, AppError};
    use crate::config::{AdminSeed, AppConfig};
    use crate::db::migrations::latest_version;
    use crate::model::user::UserRole;

    fn test_config() -> AppConfig {
        AppConfig {
            password_iterations: 1_000,
            admin: Some(AdminSeed {
                username: "admin".to_string(),
                email: "admin@hospital.test".to_string(),
                password: "admin-password".to_string(),
            }),
            ..AppConfig::default()
        }
    }

    #[test]
    fn seed_admin_is_idempotent() {
        let mut context = AppContext::open_in_memory(test_config()).expect("open context");
        assert_eq!(context.schema_version().expect("version"), latest_version());

        let first = context.seed_admin().expect("seed").expect("admin configured");
        let second = context.seed_admin().expect("reseed").expect("admin configured");
        assert_eq!(first.id, second.id);
        assert_eq!(first.role, UserRole::Admin);

        let user = context
            .accounts()
            .authenticate("admin@hospital.test", "admin-password")
            .expect("seeded admin can log in");
        assert_eq!(user.id, first.id);
    }

    #[test]
    fn weak_iteration_count_is_rejected() {
        let config = AppConfig {
            password_iterations: 10,
            ..AppConfig::default()
        };
        let err = AppContext::open_in_memory(config)
            .err()
            .expect("weak hasher config");
        assert!(matches!(err, AppError::Credential(_)));
    }
}
