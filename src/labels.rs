//! Shared key, label and rounding helpers
//!
//! Symptom keys come from user-entered text on the write path and from stored
//! JSON on the read path; both go through [`normalize_key`] so they agree.

use chrono::{Datelike, NaiveDate, Weekday};

/// Normalize free text into a symptom key.
///
/// Lower-cases, collapses every run of non-alphanumeric characters into a
/// single `_`, and strips leading/trailing underscores. Applying it twice
/// yields the same key.
pub fn normalize_key(text: &str) -> String {
    let mut key = String::with_capacity(text.len());
    let mut pending_sep = false;

    for ch in text.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !key.is_empty() {
                key.push('_');
            }
            pending_sep = false;
            // lower-casing may expand into combining marks ('İ' -> "i\u{307}")
            key.extend(ch.to_lowercase().filter(|c| c.is_alphanumeric()));
        } else {
            pending_sep = true;
        }
    }

    key
}

/// Display label for a symptom key: "hot_flash" -> "Hot flash"
pub fn symptom_label(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// "Mon", "Tue", ...
pub fn short_day_label(date: NaiveDate) -> String {
    let label = match date.weekday() {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    };
    label.to_string()
}

/// "Monday", "Tuesday", ...
pub fn long_day_label(date: NaiveDate) -> String {
    let label = match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    };
    label.to_string()
}

/// Round to the nearest integer (halves away from zero)
pub(crate) fn round_i32(value: f64) -> i32 {
    if value.is_finite() {
        value.round() as i32
    } else {
        0
    }
}

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round and clamp a 1..=max scale value; non-finite values are absent
pub(crate) fn clamp_level(raw: f64, max: u8) -> Option<u8> {
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(1.0, f64::from(max)) as u8)
}

/// Hours slept; negative or non-finite values are absent
pub(crate) fn clamp_sleep_hours(raw: f64) -> Option<f64> {
    (raw.is_finite() && raw >= 0.0).then_some(raw)
}

/// Mean of a slice, `None` when empty
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
