//! Adapter for converting log records to log entries
//!
//! Parses API payloads, validates records, and normalizes every optional field
//! (symptom maps, tags, notes, numeric ranges) exactly once.

use crate::error::InsightError;
use crate::labels::{clamp_level, clamp_sleep_hours, normalize_key};
use crate::schema::log_record::*;
use crate::types::{
    Comparison, JournalNote, LogEntry, LogType, Severity, SleepQuality, SymptomKey,
    SymptomReading,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{trace, warn};

/// Adapter for converting API log records to entries
pub struct LogRecordAdapter;

impl LogRecordAdapter {
    /// Parse a JSON string containing an array of log records
    pub fn parse_array(json: &str) -> Result<Vec<LogRecord>, InsightError> {
        let records: Vec<LogRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing log records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<LogRecord>, InsightError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<LogRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(InsightError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Convert records to entries.
    ///
    /// Records that fail validation are skipped rather than failing the batch;
    /// a single bad row from the API should not blank every chart.
    pub fn to_entries(records: &[LogRecord]) -> Vec<LogEntry> {
        records
            .iter()
            .filter_map(|record| match Self::to_entry(record) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(record_id = %record.id, error = %e, "skipping invalid log record");
                    None
                }
            })
            .collect()
    }

    /// Convert records to entries, failing on the first invalid record.
    pub fn to_entries_strict(records: &[LogRecord]) -> Result<Vec<LogEntry>, InsightError> {
        records
            .iter()
            .map(|record| {
                Self::to_entry(record).map_err(|e| match e {
                    ValidationError::EmptyId => {
                        InsightError::InvalidRecord(format!("empty id ({})", record.date))
                    }
                    other => InsightError::from(other),
                })
            })
            .collect()
    }

    /// Convert a single record to an entry
    pub fn to_entry(record: &LogRecord) -> Result<LogEntry, ValidationError> {
        record.validate()?;
        let date = record.parsed_date()?;
        let log_type = LogType::parse(record.log_type.as_deref());

        Ok(LogEntry {
            id: record.id.clone(),
            date,
            log_type,
            logged_at: record.logged_at.as_deref().and_then(parse_timestamp),
            symptoms: parse_symptoms(record.symptoms_json.as_ref()),
            mood: record.mood.and_then(|m| clamp_level(m, 5)),
            energy: record.energy.and_then(|e| clamp_level(e, 3)),
            sleep_hours: record.sleep_hours.and_then(clamp_sleep_hours),
            sleep_quality: record.sleep_quality.as_deref().and_then(SleepQuality::parse),
            disruptions: record
                .disruptions
                .filter(|d| d.is_finite())
                .map(|d| d.max(0.0).round() as u32),
            context_tags: parse_tags(record.context_tags.as_ref()),
            note: record
                .notes
                .as_deref()
                .and_then(|raw| parse_note(raw, log_type)),
        })
    }

    /// Validate a batch of records
    pub fn validate_records(records: &[LogRecord]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .map(|(idx, record)| ValidationResult {
                index: idx,
                record_id: record.id.clone(),
                result: record.validate().err(),
            })
            .filter(|r| r.result.is_some())
            .collect()
    }
}

/// Result of record validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub record_id: String,
    pub result: Option<ValidationError>,
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            trace!(value = raw, error = %e, "ignoring unparseable loggedAt");
            None
        }
    }
}

/// Parse a symptom map.
///
/// Accepts `{key: severity}`, `{key: {severity, comparison}}`, or either of
/// those encoded as a JSON string. Keys are normalized; when two raw keys
/// normalize to the same key the worse severity wins.
pub fn parse_symptoms(value: Option<&Value>) -> BTreeMap<SymptomKey, SymptomReading> {
    let mut symptoms = BTreeMap::new();

    let owned;
    let map = match value {
        Some(Value::Object(map)) => map,
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Object(map)) => {
                owned = map;
                &owned
            }
            _ => {
                trace!("ignoring symptomsJson string that is not a JSON object");
                return symptoms;
            }
        },
        _ => return symptoms,
    };

    for (raw_key, raw_value) in map {
        let key = normalize_key(raw_key);
        if key.is_empty() {
            continue;
        }
        let Some(reading) = parse_reading(raw_value) else {
            trace!(symptom = %raw_key, "dropping symptom without a usable severity");
            continue;
        };
        symptoms
            .entry(key)
            .and_modify(|existing: &mut SymptomReading| {
                if reading.severity > existing.severity {
                    *existing = reading;
                }
            })
            .or_insert(reading);
    }

    symptoms
}

fn parse_reading(value: &Value) -> Option<SymptomReading> {
    match value {
        Value::Object(obj) => {
            let severity = obj.get("severity").and_then(severity_from_value)?;
            let comparison = obj
                .get("comparison")
                .and_then(Value::as_str)
                .and_then(Comparison::parse);
            Some(SymptomReading {
                severity,
                comparison,
            })
        }
        other => severity_from_value(other).map(SymptomReading::new),
    }
}

fn severity_from_value(value: &Value) -> Option<Severity> {
    match value {
        Value::Number(n) => n.as_f64().and_then(Severity::from_f64),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(Severity::from_f64),
        _ => None,
    }
}

/// Parse context tags into trimmed, lower-cased, de-duplicated labels
pub fn parse_tags(value: Option<&Value>) -> Vec<String> {
    let raw: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => match serde_json::from_str::<Vec<String>>(s) {
            Ok(items) => items,
            Err(_) => s.split(',').map(str::to_string).collect(),
        },
        _ => Vec::new(),
    };

    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Parse a notes field into a journal note.
///
/// JSON objects become the morning or evening shape (the one matching
/// `log_type` is tried first); anything else, including malformed JSON, is
/// kept as plain text.
pub fn parse_note(raw: &str, log_type: LogType) -> Option<JournalNote> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let text = || JournalNote::Text {
        text: trimmed.to_string(),
    };

    if !trimmed.starts_with('{') {
        return Some(text());
    }

    let map = match serde_json::from_str::<Map<String, Value>>(trimmed) {
        Ok(map) => map,
        Err(e) => {
            trace!(error = %e, "notes look like JSON but do not parse; keeping as text");
            return Some(text());
        }
    };

    let field = |name: &str| {
        map.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let morning = (field("grateful"), field("intention"));
    let evening = (field("highlight"), field("learned"));
    let has_morning = morning.0.is_some() || morning.1.is_some();
    let has_evening = evening.0.is_some() || evening.1.is_some();

    let as_morning = || JournalNote::Morning {
        grateful: morning.0.clone(),
        intention: morning.1.clone(),
    };
    let as_evening = || JournalNote::Evening {
        highlight: evening.0.clone(),
        learned: evening.1.clone(),
    };

    let note = match log_type {
        LogType::Evening if has_evening => as_evening(),
        _ if has_morning => as_morning(),
        _ if has_evening => as_evening(),
        _ => text(),
    };
    Some(note)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn create_test_records() -> Vec<LogRecord> {
        let mut morning = LogRecord::new("1", "2024-01-15");
        morning.log_type = Some("morning".to_string());
        morning.symptoms_json = Some(json!({"Hot Flash": 3, "brain fog": 1}));
        morning.mood = Some(4.0);
        morning.sleep_hours = Some(7.5);
        morning.sleep_quality = Some("Good".to_string());
        morning.context_tags = Some(json!(["Yoga", "coffee", "yoga"]));
        morning.notes = Some(r#"{"grateful":"sunshine","intention":"rest"}"#.to_string());

        let mut evening = LogRecord::new("2", "2024-01-15");
        evening.log_type = Some("evening".to_string());
        evening.symptoms_json = Some(json!({
            "hot_flash": {"severity": 2, "comparison": "better"}
        }));
        evening.mood = Some(7.0);

        vec![morning, evening]
    }

    #[test]
    fn test_to_entries() {
        let entries = LogRecordAdapter::to_entries(&create_test_records());
        assert_eq!(entries.len(), 2);

        let morning = &entries[0];
        assert_eq!(morning.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(morning.log_type, LogType::Morning);
        assert_eq!(morning.severity_of("hot_flash"), Some(Severity::SEVERE));
        assert_eq!(morning.severity_of("brain_fog"), Some(Severity::MILD));
        assert_eq!(morning.sleep_quality, Some(SleepQuality::Good));
        assert_eq!(morning.context_tags, vec!["yoga", "coffee"]);
        assert_eq!(
            morning.note,
            Some(JournalNote::Morning {
                grateful: Some("sunshine".to_string()),
                intention: Some("rest".to_string()),
            })
        );

        let evening = &entries[1];
        assert_eq!(evening.mood, Some(5));
        assert_eq!(
            evening.symptoms.get("hot_flash").and_then(|r| r.comparison),
            Some(Comparison::Better)
        );
    }

    #[test]
    fn test_invalid_records_are_skipped() {
        let mut records = create_test_records();
        records.push(LogRecord::new("3", "not-a-date"));
        records.push(LogRecord::new(" ", "2024-01-16"));

        let entries = LogRecordAdapter::to_entries(&records);
        assert_eq!(entries.len(), 2);

        let failures = LogRecordAdapter::validate_records(&records);
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].index, 2);
        assert_eq!(failures[0].record_id, "3");
    }

    #[test]
    fn test_bad_optional_field_keeps_batch() {
        let json = r#"[
            {"id": 1, "date": "2024-01-15", "mood": 4, "sleepHours": 7.5},
            {"id": 2, "date": "2024-01-16", "mood": "4", "sleepHours": null,
             "notes": {"grateful": "tea"}, "logType": "morning"},
            {"id": 3, "date": "2024-01-17", "mood": "great", "disruptions": "2"}
        ]"#;

        let records = LogRecordAdapter::parse_array(json).unwrap();
        let entries = LogRecordAdapter::to_entries(&records);
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].mood, Some(4));
        assert_eq!(entries[0].sleep_hours, Some(7.5));
        assert_eq!(entries[1].mood, Some(4));
        assert_eq!(
            entries[1].note,
            Some(JournalNote::Morning {
                grateful: Some("tea".to_string()),
                intention: None,
            })
        );
        assert_eq!(entries[2].mood, None);
        assert_eq!(entries[2].disruptions, Some(2));
    }

    #[test]
    fn test_to_entries_strict() {
        let records = create_test_records();
        assert_eq!(LogRecordAdapter::to_entries_strict(&records).unwrap().len(), 2);

        let mut bad_date = create_test_records();
        bad_date.push(LogRecord::new("3", "not-a-date"));
        let err = LogRecordAdapter::to_entries_strict(&bad_date).unwrap_err();
        assert!(matches!(err, InsightError::InvalidDate(ref v) if v == "not-a-date"));

        let mut no_id = create_test_records();
        no_id.push(LogRecord::new("", "2024-01-16"));
        let err = LogRecordAdapter::to_entries_strict(&no_id).unwrap_err();
        assert!(matches!(err, InsightError::InvalidRecord(_)));
    }

    #[test]
    fn test_parse_array_and_ndjson() {
        let array = r#"[{"id": 1, "date": "2024-01-15"}, {"id": 2, "date": "2024-01-16"}]"#;
        assert_eq!(LogRecordAdapter::parse_array(array).unwrap().len(), 2);

        let ndjson = "{\"id\": 1, \"date\": \"2024-01-15\"}\n\n{\"id\": 2, \"date\": \"2024-01-16\"}\n";
        assert_eq!(LogRecordAdapter::parse_ndjson(ndjson).unwrap().len(), 2);

        let broken = "{\"id\": 1, \"date\": \"2024-01-15\"}\n{oops";
        let err = LogRecordAdapter::parse_ndjson(broken).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_symptoms_tolerates_garbage() {
        assert!(parse_symptoms(None).is_empty());
        assert!(parse_symptoms(Some(&json!(null))).is_empty());
        assert!(parse_symptoms(Some(&json!("not json"))).is_empty());
        assert!(parse_symptoms(Some(&json!([1, 2]))).is_empty());

        let parsed = parse_symptoms(Some(&json!({
            "fatigue": "2",
            "anxiety": true,
            "joint pain": {"comparison": "worse"},
            "Night Sweats": 0,
            "night_sweats": 2
        })));
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["fatigue"].severity, Severity::MODERATE);
        assert_eq!(parsed["night_sweats"].severity, Severity::MODERATE);
    }

    #[test]
    fn test_parse_symptoms_from_encoded_string() {
        let encoded = json!("{\"hot_flash\": 2}");
        let parsed = parse_symptoms(Some(&encoded));
        assert_eq!(parsed["hot_flash"].severity, Severity::MODERATE);
    }

    #[test]
    fn test_parse_tags_variants() {
        assert_eq!(parse_tags(Some(&json!("[\"Wine\", \"work\"]"))), vec!["wine", "work"]);
        assert_eq!(parse_tags(Some(&json!("walk, Wine ,,"))), vec!["walk", "wine"]);
        assert!(parse_tags(Some(&json!(12))).is_empty());
    }

    #[test]
    fn test_parse_note_variants() {
        assert_eq!(parse_note("   ", LogType::Morning), None);
        assert_eq!(
            parse_note("slept badly", LogType::Morning),
            Some(JournalNote::Text {
                text: "slept badly".to_string()
            })
        );
        assert_eq!(
            parse_note("{broken json", LogType::Evening),
            Some(JournalNote::Text {
                text: "{broken json".to_string()
            })
        );
        assert_eq!(
            parse_note(r#"{"highlight":"walk","learned":""}"#, LogType::Unspecified),
            Some(JournalNote::Evening {
                highlight: Some("walk".to_string()),
                learned: None,
            })
        );
        assert_eq!(
            parse_note(r#"{"mood":"fine"}"#, LogType::Morning),
            Some(JournalNote::Text {
                text: r#"{"mood":"fine"}"#.to_string()
            })
        );
    }

    #[test]
    fn test_numeric_fields_clamped() {
        let mut record = LogRecord::new("9", "2024-02-01");
        record.mood = Some(0.2);
        record.energy = Some(8.0);
        record.sleep_hours = Some(-3.0);
        record.disruptions = Some(-1.0);
        record.logged_at = Some("garbage".to_string());

        let entry = LogRecordAdapter::to_entry(&record).unwrap();
        assert_eq!(entry.mood, Some(1));
        assert_eq!(entry.energy, Some(3));
        assert_eq!(entry.sleep_hours, None);
        assert_eq!(entry.disruptions, Some(0));
        assert_eq!(entry.logged_at, None);
    }
}
