// ABOUTME: Field-level validation for journal input: required names, the 1-10 severity scale, and time parsing.
// ABOUTME: Raw values that fail a rule produce a ValidationError naming the offending field; nothing is clamped.

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const MIN_SEVERITY: i64 = 1;
pub const MAX_SEVERITY: i64 = 10;

/// Every input field a tool validates. The serialized names match the
/// parameter names the tools accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    SymptomName,
    Severity,
    Notes,
    MedicationName,
    Dosage,
    TimeTaken,
}

impl Field {
    /// Parameter name, as used in tool params and error payloads.
    pub fn key(&self) -> &'static str {
        match self {
            Field::SymptomName => "symptom_name",
            Field::Severity => "severity",
            Field::Notes => "notes",
            Field::MedicationName => "medication_name",
            Field::Dosage => "dosage",
            Field::TimeTaken => "time_taken",
        }
    }

    /// Lowercase phrase for use inside sentences.
    pub fn describe(&self) -> &'static str {
        match self {
            Field::SymptomName => "symptom name",
            Field::Severity => "severity",
            Field::Notes => "notes",
            Field::MedicationName => "medication name",
            Field::Dosage => "dosage",
            Field::TimeTaken => "time taken",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "symptom_name" => Some(Field::SymptomName),
            "severity" => Some(Field::Severity),
            "notes" => Some(Field::Notes),
            "medication_name" => Some(Field::MedicationName),
            "dosage" => Some(Field::Dosage),
            "time_taken" => Some(Field::TimeTaken),
            _ => None,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A rejected input value. Recoverable: handlers turn it into a follow-up
/// question for `field`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: Field,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    pub fn missing(field: Field) -> Self {
        let message = match field {
            Field::Severity => format!(
                "Severity is required: a whole number between {} and {}.",
                MIN_SEVERITY, MAX_SEVERITY
            ),
            other => {
                let mut label = other.describe().to_string();
                if let Some(first) = label.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                format!("{} is required.", label)
            }
        };
        Self::new(field, message)
    }
}

/// A severity rating on the 1-10 scale. The only way to obtain one is
/// through validation, so a stored entry can never hold an out-of-range value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Severity(u8);

impl Severity {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (MIN_SEVERITY..=MAX_SEVERITY).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(out_of_range(&value.to_string()))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Validate a raw JSON severity. Integers and integer strings are
    /// accepted when in range; floats (including `7.0`), other strings and
    /// other JSON types are rejected.
    pub fn from_json(raw: &Value) -> Result<Self, ValidationError> {
        match raw {
            Value::Null => Err(ValidationError::missing(Field::Severity)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::new(i),
                None => Err(out_of_range(&n.to_string())),
            },
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::missing(Field::Severity));
                }
                trimmed
                    .parse::<i64>()
                    .map_err(|_| out_of_range(trimmed))
                    .and_then(Self::new)
            }
            other => Err(out_of_range(&other.to_string())),
        }
    }
}

impl TryFrom<i64> for Severity {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Severity> for i64 {
    fn from(s: Severity) -> Self {
        i64::from(s.0)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn out_of_range(got: &str) -> ValidationError {
    ValidationError::new(
        Field::Severity,
        format!(
            "Severity must be a whole number between {} and {} (got {}).",
            MIN_SEVERITY, MAX_SEVERITY, got
        ),
    )
}

/// Trim a required text field, rejecting it when nothing is left.
pub fn require_text(field: Field, raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(ValidationError::missing(field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Resolve the reported intake time. Missing or blank input means `now`.
/// Accepts an RFC 3339 timestamp or a wall-clock `HH:MM`, which is read as
/// today in `now`'s time zone.
pub fn parse_time_taken<Tz: TimeZone>(
    raw: Option<&str>,
    now: &DateTime<Tz>,
) -> Result<DateTime<FixedOffset>, ValidationError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(now.fixed_offset());
    };

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant);
    }

    let invalid = || {
        ValidationError::new(
            Field::TimeTaken,
            format!(
                "Time taken must be an RFC 3339 timestamp or a time like 08:30 (got {}).",
                raw
            ),
        )
    };

    let time = NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| invalid())?;
    let local = now.date_naive().and_time(time);
    now.timezone()
        .from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(invalid)
}
