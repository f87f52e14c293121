//! User account model.
//!
//! # Responsibility
//! - Define the login identity shared by admins, doctors and patients.
//!
//! # Invariants
//! - `username` and `email` are unique across all users.
//! - `password_hash` is an encoded PBKDF2 hash, never plaintext.
//! - A `Doctor` user is expected to own a doctor profile and a `Patient` user
//!   a patient profile; the account service enforces this on profile creation.

use super::validation::{require_email, require_text, ValidationError};
use super::{EpochMillis, UserId};
use serde::{Deserialize, Serialize};

pub const USERNAME_MAX_CHARS: usize = 80;

/// Account role. Fixed at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Doctor,
    #[default]
    Patient,
}

impl UserRole {
    /// Storage/label form (`admin|doctor|patient`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Doctor => "doctor",
            Self::Patient => "patient",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "doctor" => Some(Self::Doctor),
            "patient" => Some(Self::Patient),
            _ => None,
        }
    }
}

/// Persisted user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: EpochMillis,
}

/// Insert shape for a user. `password_hash` must already be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
}

impl NewUser {
    /// Creates an active user insert shape.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: UserRole,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            role,
            is_active: true,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("username", &self.username, USERNAME_MAX_CHARS)?;
        require_email(&self.email)?;
        require_text("password_hash", &self.password_hash, 255)
    }
}
