//! Tunable thresholds
//!
//! Defaults reproduce the app's built-in behavior. A config file only needs
//! the fields it overrides; everything else falls back to `Default`.

use crate::error::InsightError;
use serde::{Deserialize, Serialize};

/// Longest day span accepted for lookback and store windows (ten years)
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// Settings for the whole insights pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// Calendar days of entries fed to the readiness scorer
    pub readiness_lookback_days: u32,
    /// Maximum symptom trends reported
    pub trend_limit: usize,
    /// Maximum correlations reported
    pub correlation_limit: usize,
    /// Days of history kept by `EntryStore`
    pub store_window_days: u32,
    pub correlation: CorrelationSettings,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            readiness_lookback_days: 2,
            trend_limit: crate::trends::DEFAULT_TREND_LIMIT,
            correlation_limit: 4,
            store_window_days: crate::store::DEFAULT_STORE_WINDOW_DAYS,
            correlation: CorrelationSettings::default(),
        }
    }
}

impl InsightsConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, InsightError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, InsightError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), InsightError> {
        if !(1..=MAX_WINDOW_DAYS).contains(&self.readiness_lookback_days) {
            return Err(InsightError::InvalidConfig(format!(
                "readiness_lookback_days must be within 1..={MAX_WINDOW_DAYS}, got {}",
                self.readiness_lookback_days
            )));
        }
        if self.trend_limit == 0 {
            return Err(InsightError::InvalidConfig(
                "trend_limit must be at least 1".into(),
            ));
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.store_window_days) {
            return Err(InsightError::InvalidConfig(format!(
                "store_window_days must be within 1..={MAX_WINDOW_DAYS}, got {}",
                self.store_window_days
            )));
        }
        self.correlation.validate()
    }
}

/// Thresholds and tag vocabularies for the correlation heuristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationSettings {
    /// Entries required before any correlation is attempted
    pub min_entries: usize,
    /// Members required in each compared group
    pub min_group_size: usize,
    /// Alcohol-tagged entries required for the alcohol split
    pub min_alcohol_entries: usize,
    /// Rate difference (percentage points) that must be exceeded
    pub effect_threshold_pct: i32,
    /// Sample sizes above this are reported as high confidence
    pub high_confidence_samples: u32,
    /// Tag fragments that mark an exercise day
    pub exercise_keywords: Vec<String>,
    /// Tag fragments that mark an alcohol day
    pub alcohol_keywords: Vec<String>,
}

impl Default for CorrelationSettings {
    fn default() -> Self {
        Self {
            min_entries: 7,
            min_group_size: 3,
            min_alcohol_entries: 2,
            effect_threshold_pct: 15,
            high_confidence_samples: 20,
            exercise_keywords: to_strings(&[
                "exercise", "workout", "walk", "run", "yoga", "gym", "swim", "cycl", "hike",
            ]),
            alcohol_keywords: to_strings(&["alcohol", "wine", "beer", "drink", "cocktail"]),
        }
    }
}

impl CorrelationSettings {
    pub fn validate(&self) -> Result<(), InsightError> {
        if self.min_group_size == 0 || self.min_alcohol_entries == 0 {
            return Err(InsightError::InvalidConfig(
                "correlation group sizes must be at least 1".into(),
            ));
        }
        if !(0..=100).contains(&self.effect_threshold_pct) {
            return Err(InsightError::InvalidConfig(format!(
                "effect_threshold_pct must be within 0..=100, got {}",
                self.effect_threshold_pct
            )));
        }
        if self.exercise_keywords.iter().any(|k| k.trim().is_empty())
            || self.alcohol_keywords.iter().any(|k| k.trim().is_empty())
        {
            return Err(InsightError::InvalidConfig(
                "tag keywords must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}
