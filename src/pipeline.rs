//! Pipeline orchestration
//!
//! This module provides the public API of the insights core. It runs the
//! full pipeline from the `/logs` JSON payload to an encoded report:
//! record parsing → entry normalization → newest-first window → metrics →
//! report encoding.

use crate::config::{InsightsConfig, MAX_WINDOW_DAYS};
use crate::correlation::{compute_correlations_with, merge_correlations, RemoteCorrelation};
use crate::encoder::ReportEncoder;
use crate::error::InsightError;
use crate::narrative::compute_weekly_story;
use crate::readiness::compute_readiness_breakdown;
use crate::schema::LogRecordAdapter;
use crate::sleep::compute_sleep_score;
use crate::store::{EntryStore, MergeSummary};
use crate::trends::compute_symptom_trends_limited;
use crate::types::{Insights, InsightsReport, LogEntry};
use crate::window::EntryWindow;
use tracing::debug;

/// Convert a `/logs` JSON array into an insights report.
///
/// # Arguments
/// * `logs_json` - JSON array of log records as served by the API
///
/// # Returns
/// The pretty-printed `InsightsReport` JSON
///
/// # Example
/// ```ignore
/// let report = compute_insights(logs_json)?;
/// ```
pub fn compute_insights(logs_json: String) -> Result<String, InsightError> {
    compute_insights_with_config(&logs_json, &InsightsConfig::default())
}

/// Convert a `/logs` JSON array into a report using explicit settings
pub fn compute_insights_with_config(
    logs_json: &str,
    config: &InsightsConfig,
) -> Result<String, InsightError> {
    config.validate()?;
    let records = LogRecordAdapter::parse_array(logs_json)?;
    let window = EntryWindow::new(LogRecordAdapter::to_entries(&records));

    let insights = compute_all(&window, config);
    ReportEncoder::new().encode_to_json(&window, insights, config)
}

/// Run every metric component over one window.
///
/// Readiness only sees the last `readiness_lookback_days` calendar days;
/// the other components see the whole window.
pub fn compute_all(window: &EntryWindow, config: &InsightsConfig) -> Insights {
    let recent = window.recent_days(config.readiness_lookback_days);

    Insights {
        readiness_breakdown: compute_readiness_breakdown(&recent),
        symptom_trends: compute_symptom_trends_limited(window, config.trend_limit),
        sleep: compute_sleep_score(window),
        correlations: compute_correlations_with(
            window,
            &config.correlation,
            config.correlation_limit,
        ),
        weekly_story: compute_weekly_story(window),
    }
}

/// Stateful processor that keeps fetched entries across calls.
///
/// Use this when the host fetches logs incrementally (one day, then a range)
/// and wants every report computed over the combined history.
pub struct InsightsProcessor {
    config: InsightsConfig,
    store: EntryStore,
    encoder: ReportEncoder,
    remote_correlations: Vec<RemoteCorrelation>,
}

impl Default for InsightsProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightsProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self::build(InsightsConfig::default())
    }

    /// Create a processor keeping `window_days` of history, clamped to
    /// `1..=MAX_WINDOW_DAYS`
    pub fn with_store_window(window_days: u32) -> Self {
        Self::build(InsightsConfig {
            store_window_days: window_days.clamp(1, MAX_WINDOW_DAYS),
            ..InsightsConfig::default()
        })
    }

    /// Create a processor from a validated config
    pub fn with_config(config: InsightsConfig) -> Result<Self, InsightError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: InsightsConfig) -> Self {
        Self {
            store: EntryStore::new(config.store_window_days),
            encoder: ReportEncoder::new(),
            remote_correlations: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &InsightsConfig {
        &self.config
    }

    /// Number of stored entries
    pub fn entry_count(&self) -> usize {
        self.store.len()
    }

    /// Fold a `/logs` JSON array into the store
    pub fn ingest_json(&mut self, logs_json: &str) -> Result<MergeSummary, InsightError> {
        let records = LogRecordAdapter::parse_array(logs_json)?;
        Ok(self.ingest_entries(LogRecordAdapter::to_entries(&records)))
    }

    /// Fold NDJSON log records into the store
    pub fn ingest_ndjson(&mut self, ndjson: &str) -> Result<MergeSummary, InsightError> {
        let records = LogRecordAdapter::parse_ndjson(ndjson)?;
        Ok(self.ingest_entries(LogRecordAdapter::to_entries(&records)))
    }

    /// Fold already-converted entries into the store
    pub fn ingest_entries(&mut self, entries: Vec<LogEntry>) -> MergeSummary {
        let summary = self.store.merge(entries);
        debug!(?summary, stored = self.store.len(), "ingested entries");
        summary
    }

    /// Replace the service-provided correlations used in reports
    pub fn set_remote_correlations(&mut self, json: &str) -> Result<(), InsightError> {
        self.remote_correlations = serde_json::from_str(json)?;
        debug!(count = self.remote_correlations.len(), "remote correlations set");
        Ok(())
    }

    /// Compute a report over the stored history
    pub fn insights_report(&self) -> InsightsReport {
        let window = self.store.window();
        let insights = self.insights(&window);
        self.encoder.encode(&window, insights, &self.config)
    }

    /// Compute a report over the stored history as JSON
    pub fn report(&self) -> Result<String, InsightError> {
        let window = self.store.window();
        let insights = self.insights(&window);
        self.encoder.encode_to_json(&window, insights, &self.config)
    }

    fn insights(&self, window: &EntryWindow) -> Insights {
        let mut insights = compute_all(window, &self.config);
        if !self.remote_correlations.is_empty() {
            insights.correlations = merge_correlations(
                self.remote_correlations.clone(),
                insights.correlations,
                self.config.correlation_limit,
            );
        }
        insights
    }

    /// Load store state from JSON
    pub fn load_store(&mut self, json: &str) -> Result<(), InsightError> {
        self.store =
            EntryStore::from_json(json).map_err(|e| InsightError::ParseError(e.to_string()))?;
        Ok(())
    }

    /// Save store state to JSON
    pub fn save_store(&self) -> Result<String, InsightError> {
        self.store
            .to_json()
            .map_err(|e| InsightError::EncodingError(e.to_string()))
    }
}
