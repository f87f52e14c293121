//! Field-level validation shared by model constructors and repositories.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Validation failure for a single model field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty after trimming.
    Empty { field: &'static str },
    /// Text field exceeds its column limit.
    TooLong {
        field: &'static str,
        max_chars: usize,
    },
    /// Email does not look like `local@domain.tld`.
    InvalidEmail(String),
    /// Availability weekday label is not recognized.
    InvalidWeekday(String),
    /// Availability range is not `HH:MM-HH:MM` with start before end.
    InvalidTimeRange(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::TooLong { field, max_chars } => {
                write!(f, "{field} must be at most {max_chars} characters")
            }
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::InvalidWeekday(value) => write!(f, "invalid weekday label `{value}`"),
            Self::InvalidTimeRange(value) => {
                write!(f, "invalid time range `{value}`; expected HH:MM-HH:MM")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    limit_text(field, value, max_chars)
}

pub(crate) fn limit_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max_chars {
        return Err(ValidationError::TooLong { field, max_chars });
    }
    Ok(())
}

pub(crate) fn limit_optional(
    field: &'static str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(text) => limit_text(field, text, max_chars),
        None => Ok(()),
    }
}

pub(crate) fn require_email(value: &str) -> Result<(), ValidationError> {
    require_text("email", value, 255)?;
    if !EMAIL_RE.is_match(value) {
        return Err(ValidationError::InvalidEmail(value.to_string()));
    }
    Ok(())
}
