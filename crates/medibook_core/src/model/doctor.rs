//! Doctor profile model and weekly availability.
//!
//! # Responsibility
//! - Define the doctor extension record attached one-to-one to a user.
//! - Parse and query the per-weekday availability structure.
//!
//! # Invariants
//! - `user_id` is unique across doctor profiles.
//! - `license_number`, when set, is unique across doctor profiles.
//! - Availability ranges are `HH:MM-HH:MM` with start strictly before end.

use super::validation::{limit_optional, ValidationError};
use super::{DepartmentId, DoctorId, UserId};
use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weekly open hours: weekday label to ordered time ranges.
///
/// Stored as a JSON object, e.g. `{"mon": ["09:00-12:00", "14:00-17:00"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Availability(BTreeMap<String, Vec<String>>);

impl Availability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one range to the given weekday, keeping insertion order.
    pub fn with_range(mut self, weekday: impl Into<String>, range: impl Into<String>) -> Self {
        self.0.entry(weekday.into()).or_default().push(range.into());
        self
    }

    /// Ranges declared for `label`, exactly as stored.
    pub fn ranges(&self, label: &str) -> Option<&[String]> {
        self.0.get(label).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (label, ranges) in &self.0 {
            parse_weekday(label).ok_or_else(|| ValidationError::InvalidWeekday(label.clone()))?;
            for range in ranges {
                parse_time_range(range)?;
            }
        }
        Ok(())
    }

    /// Returns whether `at` falls inside a declared range for its weekday.
    ///
    /// Ranges are half-open: a slot starting exactly at a range end is
    /// outside. Unparseable entries never match; `at` is read as UTC.
    pub fn covers(&self, at: NaiveDateTime) -> bool {
        let weekday = at.weekday();
        let time = at.time();

        self.0
            .iter()
            .filter(|(label, _)| parse_weekday(label) == Some(weekday))
            .flat_map(|(_, ranges)| ranges.iter())
            .filter_map(|range| parse_time_range(range).ok())
            .any(|(start, end)| start <= time && time < end)
    }
}

/// Parses `mon`..`sun` or full English weekday names, case-insensitively.
pub fn parse_weekday(label: &str) -> Option<Weekday> {
    match label.trim().to_ascii_lowercase().as_str() {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Parses `HH:MM-HH:MM` into a `(start, end)` pair.
pub fn parse_time_range(value: &str) -> Result<(NaiveTime, NaiveTime), ValidationError> {
    let invalid = || ValidationError::InvalidTimeRange(value.to_string());
    let (start, end) = value.split_once('-').ok_or_else(invalid)?;
    let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").map_err(|_| invalid())?;
    let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").map_err(|_| invalid())?;
    if start >= end {
        return Err(invalid());
    }
    Ok((start, end))
}

/// Persisted doctor profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: DoctorId,
    pub user_id: UserId,
    pub license_number: Option<String>,
    pub specialization: Option<String>,
    pub department_id: Option<DepartmentId>,
    pub availability: Option<Availability>,
    pub phone: Option<String>,
    pub bio: Option<String>,
}

impl DoctorProfile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_doctor_fields(
            self.license_number.as_deref(),
            self.specialization.as_deref(),
            self.phone.as_deref(),
            self.availability.as_ref(),
        )
    }
}

/// Insert shape for a doctor profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewDoctorProfile {
    pub user_id: UserId,
    pub license_number: Option<String>,
    pub specialization: Option<String>,
    pub department_id: Option<DepartmentId>,
    pub availability: Option<Availability>,
    pub phone: Option<String>,
    pub bio: Option<String>,
}

impl NewDoctorProfile {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_doctor_fields(
            self.license_number.as_deref(),
            self.specialization.as_deref(),
            self.phone.as_deref(),
            self.availability.as_ref(),
        )
    }
}

fn validate_doctor_fields(
    license_number: Option<&str>,
    specialization: Option<&str>,
    phone: Option<&str>,
    availability: Option<&Availability>,
) -> Result<(), ValidationError> {
    limit_optional("license_number", license_number, 80)?;
    limit_optional("specialization", specialization, 120)?;
    limit_optional("phone", phone, 30)?;
    if let Some(availability) = availability {
        availability.validate()?;
    }
    Ok(())
}
