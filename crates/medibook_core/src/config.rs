//! Process configuration for the application shell.
//!
//! # Responsibility
//! - Resolve storage, logging and credential settings from `MEDIBOOK_*`
//!   environment variables with build-appropriate defaults.
//!
//! # Invariants
//! - Blank variables are treated as unset.
//! - The admin seed is all-or-nothing: username, email and password must be
//!   provided together.

use crate::credential::DEFAULT_PBKDF2_ITERATIONS;
use crate::logging::LogLevel;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "MEDIBOOK_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "MEDIBOOK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "MEDIBOOK_LOG_DIR";
pub const ENV_PASSWORD_ITERATIONS: &str = "MEDIBOOK_PASSWORD_ITERATIONS";
pub const ENV_ADMIN_USERNAME: &str = "MEDIBOOK_ADMIN_USERNAME";
pub const ENV_ADMIN_EMAIL: &str = "MEDIBOOK_ADMIN_EMAIL";
pub const ENV_ADMIN_PASSWORD: &str = "MEDIBOOK_ADMIN_PASSWORD";

const DEFAULT_DB_FILE_NAME: &str = "medibook.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
    /// Admin seed partially configured; names the first missing variable.
    IncompleteAdminSeed { missing: &'static str },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid {key}=`{value}`: {reason}")
            }
            Self::IncompleteAdminSeed { missing } => {
                write!(f, "admin seed is incomplete: {missing} is not set")
            }
        }
    }
}

impl Error for ConfigError {}

/// Bootstrap admin account created on startup when missing.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Debug for AdminSeed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_level: LogLevel,
    /// File logging is disabled when `None`.
    pub log_dir: Option<PathBuf>,
    pub password_iterations: u32,
    pub admin: Option<AdminSeed>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: LogLevel::default_for_build(),
            log_dir: None,
            password_iterations: DEFAULT_PBKDF2_ITERATIONS,
            admin: None,
        }
    }
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = LogLevel::parse(&level).ok_or(ConfigError::InvalidValue {
                key: ENV_LOG_LEVEL,
                value: level.clone(),
                reason: "expected trace|debug|info|warn|error",
            })?;
        }
        config.log_dir = read(ENV_LOG_DIR).map(PathBuf::from);
        if let Some(iterations) = read(ENV_PASSWORD_ITERATIONS) {
            config.password_iterations =
                iterations.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                    key: ENV_PASSWORD_ITERATIONS,
                    value: iterations.clone(),
                    reason: "expected a positive integer",
                })?;
        }

        config.admin = match (
            read(ENV_ADMIN_USERNAME),
            read(ENV_ADMIN_EMAIL),
            read(ENV_ADMIN_PASSWORD),
        ) {
            (None, None, None) => None,
            (Some(username), Some(email), Some(password)) => Some(AdminSeed {
                username,
                email,
                password,
            }),
            (None, _, _) => {
                return Err(ConfigError::IncompleteAdminSeed {
                    missing: ENV_ADMIN_USERNAME,
                })
            }
            (_, None, _) => {
                return Err(ConfigError::IncompleteAdminSeed {
                    missing: ENV_ADMIN_EMAIL,
                })
            }
            (_, _, None) => {
                return Err(ConfigError::IncompleteAdminSeed {
                    missing: ENV_ADMIN_PASSWORD,
                })
            }
        };

        Ok(config)
    }
}
