//! Log record schema definition
//!
//! Mirrors one element of the JSON array returned by `GET /logs?...`. Field
//! names are camelCase on the wire. Only `id` and `date` are required; every
//! other field may be missing or null.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::trace;

/// Schema identifier reported by the CLI and in reports
pub const SCHEMA_VERSION: &str = "journal.log_record.v1";

/// Accept ids served either as strings or as numbers
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "Invalid id: expected string or number, got {other}"
        ))),
    }
}

/// Optional number: numeric strings are coerced, any other type reads as absent
fn deserialize_lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => None,
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            let parsed = s.trim().parse::<f64>().ok();
            if parsed.is_none() {
                trace!(value = %s, "ignoring non-numeric string in numeric field");
            }
            parsed
        }
        other => {
            trace!(value = %other, "ignoring wrongly typed numeric field");
            None
        }
    })
}

/// Optional text: objects and arrays keep their JSON text, scalars of any
/// other type read as absent
fn deserialize_lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        structured @ (serde_json::Value::Object(_) | serde_json::Value::Array(_)) => {
            Some(structured.to_string())
        }
        other => {
            trace!(value = %other, "ignoring wrongly typed text field");
            None
        }
    })
}

/// A journal log record as served by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Unique record identifier
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Calendar date (YYYY-MM-DD, or an RFC 3339 timestamp whose date is used)
    pub date: String,
    /// "morning", "evening", or anything else
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub log_type: Option<String>,
    /// Creation timestamp (RFC 3339)
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub logged_at: Option<String>,
    /// Symptom map, either an object or a JSON-encoded object string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms_json: Option<serde_json::Value>,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub mood: Option<f64>,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub energy: Option<f64>,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub sleep_hours: Option<f64>,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub sleep_quality: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub disruptions: Option<f64>,
    /// Array of labels, or a string holding a JSON array / comma list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_tags: Option<serde_json::Value>,
    /// Free text, or a JSON-encoded journal object
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

impl LogRecord {
    /// Create a minimal record
    pub fn new(id: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            date: date.into(),
            log_type: None,
            logged_at: None,
            symptoms_json: None,
            mood: None,
            energy: None,
            sleep_hours: None,
            sleep_quality: None,
            disruptions: None,
            context_tags: None,
            notes: None,
        }
    }

    /// Parse the record's calendar date
    pub fn parsed_date(&self) -> Result<NaiveDate, ValidationError> {
        parse_calendar_date(&self.date).ok_or_else(|| ValidationError::InvalidDate {
            value: self.date.clone(),
        })
    }

    /// Validate the fields the metrics layer cannot do without
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        self.parsed_date()?;
        Ok(())
    }
}

/// Parse "YYYY-MM-DD" or an RFC 3339 timestamp into a calendar date
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }
    // "2024-01-15T00:00:00" without an offset
    trimmed
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Validation errors for log records
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Record id is empty")]
    EmptyId,

    #[error("Invalid date: {value}")]
    InvalidDate { value: String },
}
