//! Meno Insights - On-device metrics core for a menopause symptom journal
//!
//! Turns daily check-ins fetched from the journal API into derived wellness
//! metrics through a deterministic pipeline: record parsing → entry
//! normalization → newest-first window → metrics → report encoding.
//!
//! ## Components
//!
//! - **Readiness**: 5-99 wellness score from sleep, mood, symptoms and stressors
//! - **Trends**: most frequent symptoms with trend percent and sparkline
//! - **Sleep**: sleep score, averages and weekly bars
//! - **Correlations**: heuristic factor/symptom associations
//! - **Narrative**: natural-language weekly recap

pub mod config;
pub mod correlation;
pub mod encoder;
pub mod error;
pub mod labels;
pub mod narrative;
pub mod pipeline;
pub mod readiness;
pub mod schema;
pub mod sleep;
pub mod store;
pub mod trends;
pub mod types;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{CorrelationSettings, InsightsConfig};
pub use correlation::{
    compute_correlations, compute_correlations_with, merge_correlations, RemoteCorrelation,
};
pub use encoder::ReportEncoder;
pub use error::InsightError;
pub use labels::normalize_key;
pub use narrative::compute_weekly_story;
pub use pipeline::{compute_all, compute_insights, compute_insights_with_config, InsightsProcessor};
pub use readiness::{compute_readiness, compute_readiness_breakdown};
pub use sleep::compute_sleep_score;
pub use store::EntryStore;
pub use trends::{compute_sparkline, compute_symptom_trends};
pub use window::EntryWindow;

// Schema exports
pub use schema::{LogRecord, LogRecordAdapter, SCHEMA_VERSION};

/// Library version embedded in every report
pub const INSIGHTS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "meno-insights";
