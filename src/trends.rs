//! Symptom trend aggregation
//!
//! Merges symptom severities across the window, compares the newer half with
//! the older half, and builds an eight-bucket sparkline per symptom.

use crate::labels::{round_i32, symptom_label};
use crate::types::{LogEntry, SymptomTrend};
use crate::window::EntryWindow;
use std::collections::BTreeMap;
use tracing::debug;

/// Maximum number of trends returned
pub const DEFAULT_TREND_LIMIT: usize = 6;

/// Number of sparkline buckets
pub const SPARKLINE_BUCKETS: usize = 8;

/// Symptoms seen fewer times than this get no sparkline
const MIN_SPARKLINE_OCCURRENCES: usize = 3;

struct Tally<'a> {
    key: &'a str,
    total_severity: u32,
    occurrences: u32,
}

/// Compute the six most frequent symptom trends
pub fn compute_symptom_trends(window: &EntryWindow) -> Vec<SymptomTrend> {
    compute_symptom_trends_limited(window, DEFAULT_TREND_LIMIT)
}

/// Compute symptom trends, most frequent first, capped at `limit`.
///
/// Ties on occurrence count keep first-seen order (newest entry first, keys
/// alphabetical within an entry).
pub fn compute_symptom_trends_limited(window: &EntryWindow, limit: usize) -> Vec<SymptomTrend> {
    let mut tallies: Vec<Tally<'_>> = Vec::new();
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();

    for entry in window {
        for (key, reading) in &entry.symptoms {
            let idx = *index.entry(key.as_str()).or_insert_with(|| {
                tallies.push(Tally {
                    key: key.as_str(),
                    total_severity: 0,
                    occurrences: 0,
                });
                tallies.len() - 1
            });
            let tally = &mut tallies[idx];
            tally.total_severity += u32::from(reading.severity.value());
            tally.occurrences += 1;
        }
    }

    if tallies.is_empty() {
        debug!(entries = window.len(), "symptom trends: no symptoms logged");
        return Vec::new();
    }

    // stable: equal counts stay in first-seen order
    tallies.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
    tallies.truncate(limit);

    tallies
        .into_iter()
        .map(|tally| SymptomTrend {
            key: tally.key.to_string(),
            name: symptom_label(tally.key),
            average_severity: tally.total_severity as f64 / tally.occurrences as f64,
            occurrence_count: tally.occurrences,
            trend_percent: trend_percent(window, tally.key),
            sparkline: compute_sparkline(window, tally.key),
        })
        .collect()
}

/// Percent change in occurrences between the older and newer halves.
///
/// The newer half is the first `len / 2` entries of the newest-first window;
/// the older half is the remainder. Returns 0 when the older half never saw
/// the symptom.
pub fn trend_percent(window: &EntryWindow, key: &str) -> i32 {
    let mid = window.len() / 2;
    let newer = count_with(window.slice(0..mid), key);
    let older = count_with(window.slice(mid..window.len()), key);

    if older == 0 {
        return 0;
    }
    round_i32((newer as f64 - older as f64) / older as f64 * 100.0)
}

/// Eight-bucket severity series for one symptom, oldest bucket first.
///
/// Entries are split into buckets of `ceil(len / 8)`; each bucket holds the
/// mean severity of the entries that logged the symptom, or 0. Returns an
/// empty series when the symptom appears fewer than three times.
pub fn compute_sparkline(window: &EntryWindow, key: &str) -> Vec<f64> {
    let total = window.len();
    if count_with(window.as_slice(), key) < MIN_SPARKLINE_OCCURRENCES {
        return Vec::new();
    }

    let chronological: Vec<&LogEntry> = window.iter().rev().collect();
    let bucket_size = total.div_ceil(SPARKLINE_BUCKETS);

    (0..SPARKLINE_BUCKETS)
        .map(|bucket| {
            let start = (bucket * bucket_size).min(total);
            let end = ((bucket + 1) * bucket_size).min(total);
            let severities: Vec<f64> = chronological[start..end]
                .iter()
                .filter_map(|e| e.severity_of(key))
                .map(|s| s.value() as f64)
                .collect();
            if severities.is_empty() {
                0.0
            } else {
                severities.iter().sum::<f64>() / severities.len() as f64
            }
        })
        .collect()
}

fn count_with(entries: &[LogEntry], key: &str) -> usize {
    entries.iter().filter(|e| e.has_symptom(key)).count()
}
