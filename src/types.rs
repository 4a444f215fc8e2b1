//! Core types for the insights core
//!
//! This module defines the data that flows through the metrics layer: the
//! immutable log entries produced at the data-access boundary, and the derived
//! summaries handed to presentation code.

use chrono::{DateTime, NaiveDate, Utc};
use crate::labels::{clamp_level, clamp_sleep_hours};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Normalized symptom identifier (see [`crate::labels::normalize_key`])
pub type SymptomKey = String;

/// Which daily check-in produced an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Morning,
    Evening,
    Unspecified,
}

impl LogType {
    /// Parse the wire value; anything unrecognized is `Unspecified`
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("morning") => LogType::Morning,
            Some("evening") => LogType::Evening,
            _ => LogType::Unspecified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Morning => "morning",
            LogType::Evening => "evening",
            LogType::Unspecified => "unspecified",
        }
    }

    /// Position within a single day when ordering newest-first
    pub(crate) fn recency_rank(&self) -> u8 {
        match self {
            LogType::Evening => 0,
            LogType::Morning => 1,
            LogType::Unspecified => 2,
        }
    }
}

/// Self-reported sleep quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepQuality {
    Terrible,
    Poor,
    Ok,
    Good,
    Great,
}

impl SleepQuality {
    /// Case-insensitive parse accepting the app's label variants
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "terrible" => Some(SleepQuality::Terrible),
            "poor" => Some(SleepQuality::Poor),
            "ok" | "okay" | "fair" => Some(SleepQuality::Ok),
            "good" => Some(SleepQuality::Good),
            "great" | "amazing" => Some(SleepQuality::Great),
            _ => None,
        }
    }

    /// Poor or terrible nights count against sleep scores
    pub fn is_poor(&self) -> bool {
        matches!(self, SleepQuality::Poor | SleepQuality::Terrible)
    }
}

/// Symptom severity, always within 1..=3
///
/// Deserializing clamps, so a stored value can never leave the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", from = "i64")]
pub struct Severity(u8);

impl From<i64> for Severity {
    fn from(raw: i64) -> Self {
        Severity::new(raw)
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.0
    }
}

impl Severity {
    pub const MILD: Severity = Severity(1);
    pub const MODERATE: Severity = Severity(2);
    pub const SEVERE: Severity = Severity(3);

    /// Clamp an arbitrary integer into the valid range
    pub fn new(raw: i64) -> Self {
        Severity(raw.clamp(1, 3) as u8)
    }

    /// Round and clamp a JSON number; NaN and infinities are rejected
    pub fn from_f64(raw: f64) -> Option<Self> {
        if !raw.is_finite() {
            return None;
        }
        Some(Self::new(raw.round() as i64))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

/// Evening comparison against the morning check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Better,
    Same,
    Worse,
}

impl Comparison {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "better" | "improved" => Some(Comparison::Better),
            "same" | "unchanged" => Some(Comparison::Same),
            "worse" => Some(Comparison::Worse),
            _ => None,
        }
    }
}

/// One symptom as recorded on an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomReading {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,
}

impl SymptomReading {
    pub fn new(severity: Severity) -> Self {
        Self {
            severity,
            comparison: None,
        }
    }
}

/// Journal note attached to a check-in, parsed once at ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalNote {
    Morning {
        #[serde(skip_serializing_if = "Option::is_none")]
        grateful: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        intention: Option<String>,
    },
    Evening {
        #[serde(skip_serializing_if = "Option::is_none")]
        highlight: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        learned: Option<String>,
    },
    Text { text: String },
}

/// A single daily check-in.
///
/// Entries are read-only once built; the metrics layer aggregates them but
/// never mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Identifier assigned by the API
    pub id: String,
    /// Calendar date the check-in belongs to
    pub date: NaiveDate,
    /// Morning or evening check-in
    pub log_type: LogType,
    /// When the entry was created
    pub logged_at: Option<DateTime<Utc>>,
    /// Symptom severities keyed by normalized symptom key
    #[serde(default)]
    pub symptoms: BTreeMap<SymptomKey, SymptomReading>,
    /// Mood, 1-5
    #[serde(default, deserialize_with = "deserialize_mood")]
    pub mood: Option<u8>,
    /// Energy, 1-3
    #[serde(default, deserialize_with = "deserialize_energy")]
    pub energy: Option<u8>,
    /// Hours slept the night before
    #[serde(default, deserialize_with = "deserialize_sleep_hours")]
    pub sleep_hours: Option<f64>,
    pub sleep_quality: Option<SleepQuality>,
    /// Number of night-time wake-ups
    pub disruptions: Option<u32>,
    /// Normalized context labels (activities, stressors, substances)
    #[serde(default)]
    pub context_tags: Vec<String>,
    pub note: Option<JournalNote>,
}

// Saved entries pass the same range checks as freshly parsed records.

fn deserialize_mood<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u8>, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.and_then(|m| clamp_level(m, 5)))
}

fn deserialize_energy<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u8>, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.and_then(|e| clamp_level(e, 3)))
}

fn deserialize_sleep_hours<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.and_then(clamp_sleep_hours))
}

impl LogEntry {
    /// Create an empty entry for a date
    pub fn new(id: impl Into<String>, date: NaiveDate, log_type: LogType) -> Self {
        Self {
            id: id.into(),
            date,
            log_type,
            logged_at: None,
            symptoms: BTreeMap::new(),
            mood: None,
            energy: None,
            sleep_hours: None,
            sleep_quality: None,
            disruptions: None,
            context_tags: Vec::new(),
            note: None,
        }
    }

    pub fn with_mood(mut self, mood: u8) -> Self {
        self.mood = Some(mood.clamp(1, 5));
        self
    }

    pub fn with_energy(mut self, energy: u8) -> Self {
        self.energy = Some(energy.clamp(1, 3));
        self
    }

    pub fn with_sleep(mut self, hours: f64, quality: Option<SleepQuality>) -> Self {
        self.sleep_hours = Some(hours.max(0.0));
        self.sleep_quality = quality;
        self
    }

    pub fn with_disruptions(mut self, disruptions: u32) -> Self {
        self.disruptions = Some(disruptions);
        self
    }

    pub fn with_symptom(mut self, key: &str, severity: i64) -> Self {
        self.symptoms.insert(
            crate::labels::normalize_key(key),
            SymptomReading::new(Severity::new(severity)),
        );
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !self.context_tags.contains(&tag) {
            self.context_tags.push(tag);
        }
        self
    }

    pub fn with_logged_at(mut self, logged_at: DateTime<Utc>) -> Self {
        self.logged_at = Some(logged_at);
        self
    }

    pub fn has_symptom(&self, key: &str) -> bool {
        self.symptoms.contains_key(key)
    }

    pub fn symptom_count(&self) -> usize {
        self.symptoms.len()
    }

    pub fn severity_of(&self, key: &str) -> Option<Severity> {
        self.symptoms.get(key).map(|r| r.severity)
    }

    /// True when any context tag contains one of the keywords
    pub fn has_tag_matching(&self, keywords: &[String]) -> bool {
        self.context_tags
            .iter()
            .any(|tag| keywords.iter().any(|kw| tag.contains(kw.as_str())))
    }
}

/// Readiness score with the component scores that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessBreakdown {
    /// Final score, 5-99
    pub score: u8,
    pub sleep_score: f64,
    pub mood_score: f64,
    pub symptom_score: f64,
    pub stressor_score: f64,
    /// Distinct symptoms across the window
    pub symptom_count: usize,
    /// Mean of each symptom's worst severity
    pub avg_severity: f64,
    /// Distinct context tags across the window
    pub stressor_count: usize,
}

/// Per-symptom trend summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomTrend {
    pub key: SymptomKey,
    /// Display name
    pub name: String,
    pub average_severity: f64,
    pub occurrence_count: u32,
    /// Newer half vs older half, percent
    pub trend_percent: i32,
    /// Eight buckets oldest to newest, or empty when data is sparse
    pub sparkline: Vec<f64>,
}

/// One bar of the weekly sleep chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepBar {
    pub date: NaiveDate,
    pub hours: f64,
    /// Short weekday, e.g. "Mon"
    pub day_label: String,
}

/// Sleep score and chart data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSummary {
    /// 10-100
    pub score: u8,
    pub avg_hours: f64,
    pub avg_disruptions: f64,
    /// Up to seven bars, oldest first
    pub weekly_bars: Vec<SleepBar>,
    pub total_nights_tracked: u32,
    pub poor_nights: u32,
}

/// Whether a factor goes with more or fewer symptom days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

/// Coarse sample-size heuristic; not a statistical test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Moderate,
    Building,
}

impl Confidence {
    pub fn label(&self) -> &'static str {
        match self {
            Confidence::High => "High confidence",
            Confidence::Moderate => "Moderate confidence",
            Confidence::Building => "Building confidence",
        }
    }

    /// Map a service-provided level; unknown levels are treated as building
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" | "strong" => Confidence::High,
            "medium" | "moderate" => Confidence::Moderate,
            _ => Confidence::Building,
        }
    }
}

/// Where a correlation was computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationSource {
    Local,
    Remote,
}

/// Factor/symptom association in the shape presentation code consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    /// Machine name of the factor, e.g. "sleep"
    pub factor: String,
    pub factor_label: String,
    pub symptom_key: SymptomKey,
    pub symptom_label: String,
    pub direction: Direction,
    /// Signed difference in symptom rate, percentage points: the factor
    /// group's rate minus the comparison group's. For sleep that is good
    /// nights (7h+) minus poor nights (<6h), so a negative value means the
    /// symptom was rarer after good sleep.
    pub effect_percent: i32,
    pub sample_size: u32,
    pub confidence: Confidence,
    pub confidence_label: String,
    pub lag_days: u32,
    pub human_label: String,
    pub source: CorrelationSource,
}

/// Natural-language weekly recap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyNarrative {
    pub text: String,
    /// Long weekday, e.g. "Tuesday"
    pub best_day_label: String,
    pub worst_day_label: String,
    pub best_mood: Option<u8>,
    pub worst_mood: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_symptom: Option<SymptomKey>,
}

/// Every metric derived from one window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub readiness_breakdown: Option<ReadinessBreakdown>,
    pub symptom_trends: Vec<SymptomTrend>,
    pub sleep: Option<SleepSummary>,
    pub correlations: Vec<Correlation>,
    pub weekly_story: Option<WeeklyNarrative>,
}

/// Data-quality flags attached to a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    NoEntries,
    MissingSleepData,
    MissingMoodData,
    InsufficientForCorrelations,
    InsufficientForNarrative,
}

/// Insights report envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub quality: ReportQuality,
    pub readiness: Option<u8>,
    pub readiness_breakdown: Option<ReadinessBreakdown>,
    pub symptom_trends: Vec<SymptomTrend>,
    pub sleep: Option<SleepSummary>,
    pub correlations: Vec<Correlation>,
    pub weekly_story: Option<WeeklyNarrative>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportProvenance {
    pub entry_count: usize,
    pub newest_date: Option<NaiveDate>,
    pub oldest_date: Option<NaiveDate>,
    pub computed_at_utc: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportQuality {
    /// Share of entries carrying mood, sleep or symptoms (0-1)
    pub coverage: f64,
    pub flags: Vec<QualityFlag>,
}
