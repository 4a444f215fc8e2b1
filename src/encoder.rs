//! Report encoding
//!
//! This module wraps derived metrics into the `InsightsReport` envelope:
//! producer metadata, provenance of the window and data-quality flags.

use crate::config::InsightsConfig;
use crate::error::InsightError;
use crate::narrative::MIN_STORY_ENTRIES;
use crate::types::{
    Insights, InsightsReport, QualityFlag, ReportProducer, ReportProvenance, ReportQuality,
};
use crate::window::EntryWindow;
use crate::{INSIGHTS_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Encoder for insights reports
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode metrics computed from `window`, stamped with the current time
    pub fn encode(
        &self,
        window: &EntryWindow,
        insights: Insights,
        config: &InsightsConfig,
    ) -> InsightsReport {
        self.encode_at(window, insights, config, Utc::now())
    }

    /// Encode with an explicit computation timestamp
    pub fn encode_at(
        &self,
        window: &EntryWindow,
        insights: Insights,
        config: &InsightsConfig,
        computed_at: DateTime<Utc>,
    ) -> InsightsReport {
        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: INSIGHTS_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let provenance = ReportProvenance {
            entry_count: window.len(),
            newest_date: window.latest().map(|e| e.date),
            oldest_date: window.oldest().map(|e| e.date),
            computed_at_utc: computed_at.to_rfc3339(),
        };

        InsightsReport {
            report_version: REPORT_VERSION.to_string(),
            producer,
            provenance,
            quality: build_quality(window, config),
            readiness: insights.readiness_breakdown.as_ref().map(|b| b.score),
            readiness_breakdown: insights.readiness_breakdown,
            symptom_trends: insights.symptom_trends,
            sleep: insights.sleep,
            correlations: insights.correlations,
            weekly_story: insights.weekly_story,
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(
        &self,
        window: &EntryWindow,
        insights: Insights,
        config: &InsightsConfig,
    ) -> Result<String, InsightError> {
        let report = self.encode(window, insights, config);
        serde_json::to_string_pretty(&report).map_err(|e| InsightError::EncodingError(e.to_string()))
    }
}

fn build_quality(window: &EntryWindow, config: &InsightsConfig) -> ReportQuality {
    if window.is_empty() {
        return ReportQuality {
            coverage: 0.0,
            flags: vec![QualityFlag::NoEntries],
        };
    }

    let informative = window
        .iter()
        .filter(|e| e.mood.is_some() || e.sleep_hours.is_some() || !e.symptoms.is_empty())
        .count();
    let coverage = informative as f64 / window.len() as f64;

    let mut flags = Vec::new();
    if window.iter().all(|e| e.sleep_hours.is_none()) {
        flags.push(QualityFlag::MissingSleepData);
    }
    if window.iter().all(|e| e.mood.is_none()) {
        flags.push(QualityFlag::MissingMoodData);
    }
    if window.len() < config.correlation.min_entries {
        flags.push(QualityFlag::InsufficientForCorrelations);
    }
    if window.len() < MIN_STORY_ENTRIES {
        flags.push(QualityFlag::InsufficientForNarrative);
    }

    ReportQuality { coverage, flags }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LogEntry, LogType, ReadinessBreakdown};
    use chrono::{NaiveDate, TimeZone};
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn sample_window() -> EntryWindow {
        EntryWindow::new(vec![
            LogEntry::new("a", day(3), LogType::Morning).with_symptom("hot_flash", 2),
            LogEntry::new("b", day(1), LogType::Morning).with_symptom("fatigue", 1),
            LogEntry::new("c", day(2), LogType::Evening),
            LogEntry::new("d", day(2), LogType::Morning).with_symptom("fatigue", 2),
        ])
    }

    #[test]
    fn test_encode_report() {
        let window = sample_window();
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let computed_at = Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap();
        let insights = Insights {
            readiness_breakdown: Some(ReadinessBreakdown {
                score: 61,
                sleep_score: 50.0,
                mood_score: 50.0,
                symptom_score: 75.0,
                stressor_score: 100.0,
                symptom_count: 2,
                avg_severity: 2.0,
                stressor_count: 0,
            }),
            ..Insights::default()
        };

        let report = encoder.encode_at(&window, insights, &InsightsConfig::default(), computed_at);

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.version, INSIGHTS_VERSION);
        assert_eq!(report.producer.instance_id, "test-instance");

        assert_eq!(report.provenance.entry_count, 4);
        assert_eq!(report.provenance.newest_date, Some(day(3)));
        assert_eq!(report.provenance.oldest_date, Some(day(1)));
        assert_eq!(report.provenance.computed_at_utc, "2024-01-03T12:00:00+00:00");

        assert!((report.quality.coverage - 0.75).abs() < 1e-9);
        assert_eq!(
            report.quality.flags,
            vec![
                QualityFlag::MissingSleepData,
                QualityFlag::MissingMoodData,
                QualityFlag::InsufficientForCorrelations,
            ]
        );
        assert_eq!(report.readiness, Some(61));
    }

    #[test]
    fn test_empty_window_flags() {
        let encoder = ReportEncoder::new();
        let report = encoder.encode(
            &EntryWindow::default(),
            Insights::default(),
            &InsightsConfig::default(),
        );

        assert_eq!(report.quality.flags, vec![QualityFlag::NoEntries]);
        assert_eq!(report.quality.coverage, 0.0);
        assert_eq!(report.readiness, None);
        assert_eq!(report.provenance.newest_date, None);
        assert!(Uuid::parse_str(&report.producer.instance_id).is_ok());
    }

    #[test]
    fn test_encode_to_json() {
        let encoder = ReportEncoder::new();
        let json = encoder
            .encode_to_json(&sample_window(), Insights::default(), &InsightsConfig::default())
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("report_version").is_some());
        assert!(parsed.get("producer").is_some());
        assert!(parsed.get("provenance").is_some());
        assert!(parsed.get("quality").is_some());
        assert_eq!(parsed["quality"]["flags"][0], "missing_sleep_data");
        assert!(parsed["symptom_trends"].is_array());
    }
}
