//! Correlation engine
//!
//! Offline heuristic that compares symptom rates between groups of entries
//! split by a contextual factor: good vs poor sleep, exercise vs none,
//! alcohol vs none. Confidence is a sample-size rule of thumb, not a
//! significance test.
//!
//! The three tests are deliberately one-sided in different ways. Sleep
//! reports either direction; exercise only reports a reduction; alcohol only
//! reports an increase.
//!
//! Correlations computed by the remote insights service arrive as
//! [`RemoteCorrelation`] and convert into the same [`Correlation`] shape.

use crate::config::CorrelationSettings;
use crate::labels::{normalize_key, round_i32, symptom_label};
use crate::types::{Confidence, Correlation, CorrelationSource, Direction, LogEntry};
use crate::window::EntryWindow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Default number of correlations reported
pub const DEFAULT_CORRELATION_LIMIT: usize = 4;

/// Nights at or above this count as good sleep
const GOOD_SLEEP_HOURS: f64 = 7.0;
/// Nights below this count as poor sleep
const POOR_SLEEP_HOURS: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Factor {
    Sleep,
    Exercise,
    Alcohol,
}

impl Factor {
    fn name(self) -> &'static str {
        match self {
            Factor::Sleep => "sleep",
            Factor::Exercise => "exercise",
            Factor::Alcohol => "alcohol",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Factor::Sleep => "Good sleep (7h+)",
            Factor::Exercise => "Exercise",
            Factor::Alcohol => "Alcohol",
        }
    }

    fn context(self) -> &'static str {
        match self {
            Factor::Sleep => "after 7h+ of sleep",
            Factor::Exercise => "on exercise days",
            Factor::Alcohol => "on alcohol days",
        }
    }
}

/// Compute the top correlations with default settings
pub fn compute_correlations(window: &EntryWindow) -> Vec<Correlation> {
    compute_correlations_with(
        window,
        &CorrelationSettings::default(),
        DEFAULT_CORRELATION_LIMIT,
    )
}

/// Compute correlations, strongest first, capped at `limit`.
///
/// Returns nothing when the window holds fewer than `min_entries` entries.
/// `effect_percent` is the factor group's symptom rate minus the comparison
/// group's, in percentage points; its sign matches `direction`.
pub fn compute_correlations_with(
    window: &EntryWindow,
    settings: &CorrelationSettings,
    limit: usize,
) -> Vec<Correlation> {
    if window.len() < settings.min_entries {
        debug!(
            entries = window.len(),
            required = settings.min_entries,
            "correlations: not enough entries"
        );
        return Vec::new();
    }

    let good_sleep: Vec<&LogEntry> = window
        .iter()
        .filter(|e| e.sleep_hours.is_some_and(|h| h >= GOOD_SLEEP_HOURS))
        .collect();
    let poor_sleep: Vec<&LogEntry> = window
        .iter()
        .filter(|e| e.sleep_hours.is_some_and(|h| h < POOR_SLEEP_HOURS))
        .collect();
    let (exercise, rest): (Vec<&LogEntry>, Vec<&LogEntry>) = window
        .iter()
        .partition(|e| e.has_tag_matching(&settings.exercise_keywords));
    let (alcohol, sober): (Vec<&LogEntry>, Vec<&LogEntry>) = window
        .iter()
        .partition(|e| e.has_tag_matching(&settings.alcohol_keywords));

    let min_group = settings.min_group_size;
    let sleep_ready = good_sleep.len() >= min_group && poor_sleep.len() >= min_group;
    let exercise_ready = exercise.len() >= min_group && rest.len() >= min_group;
    let alcohol_ready = alcohol.len() >= settings.min_alcohol_entries && sober.len() >= min_group;
    let threshold = settings.effect_threshold_pct;

    let mut results = Vec::new();
    for key in symptom_keys(window) {
        if sleep_ready {
            let effect = rate_difference(&good_sleep, &poor_sleep, key);
            if effect.abs() > threshold {
                let samples = good_sleep.len() + poor_sleep.len();
                results.push(local(Factor::Sleep, key, effect, samples, settings));
            }
        }
        if exercise_ready {
            let effect = rate_difference(&exercise, &rest, key);
            if effect < -threshold {
                let samples = exercise.len() + rest.len();
                results.push(local(Factor::Exercise, key, effect, samples, settings));
            }
        }
        if alcohol_ready {
            let effect = rate_difference(&alcohol, &sober, key);
            if effect > threshold {
                let samples = alcohol.len() + sober.len();
                results.push(local(Factor::Alcohol, key, effect, samples, settings));
            }
        }
    }

    // stable: equal effects keep symptom first-seen order
    results.sort_by(|a, b| b.effect_percent.abs().cmp(&a.effect_percent.abs()));
    results.truncate(limit);
    results
}

/// Distinct symptom keys, newest entry first
fn symptom_keys(window: &EntryWindow) -> Vec<&str> {
    let mut seen = BTreeSet::new();
    window
        .iter()
        .flat_map(|e| e.symptoms.keys())
        .map(String::as_str)
        .filter(|key| seen.insert(*key))
        .collect()
}

/// Share of entries in `group` that logged `key`
fn symptom_rate(group: &[&LogEntry], key: &str) -> f64 {
    if group.is_empty() {
        return 0.0;
    }
    group.iter().filter(|e| e.has_symptom(key)).count() as f64 / group.len() as f64
}

fn rate_difference(factor: &[&LogEntry], comparison: &[&LogEntry], key: &str) -> i32 {
    round_i32((symptom_rate(factor, key) - symptom_rate(comparison, key)) * 100.0)
}

fn local(
    factor: Factor,
    key: &str,
    effect: i32,
    samples: usize,
    settings: &CorrelationSettings,
) -> Correlation {
    let sample_size = samples as u32;
    let confidence = if sample_size > settings.high_confidence_samples {
        Confidence::High
    } else {
        Confidence::Building
    };
    let direction = if effect > 0 {
        Direction::Positive
    } else {
        Direction::Negative
    };
    let symptom = symptom_label(key);

    Correlation {
        factor: factor.name().to_string(),
        factor_label: factor.label().to_string(),
        symptom_key: key.to_string(),
        human_label: describe(&symptom, effect, factor.context()),
        symptom_label: symptom,
        direction,
        effect_percent: effect,
        sample_size,
        confidence,
        confidence_label: confidence.label().to_string(),
        lag_days: 0,
        source: CorrelationSource::Local,
    }
}

fn describe(symptom: &str, effect: i32, context: &str) -> String {
    let trend = if effect > 0 { "more" } else { "less" };
    format!(
        "{symptom} showed up {}% {trend} often {context}",
        effect.unsigned_abs()
    )
}

/// Correlation record as served by the insights service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCorrelation {
    pub factor: String,
    pub symptom: String,
    /// "positive"/"negative" (also accepts "increase"/"decrease")
    pub direction: String,
    /// "high", "medium", "low"...
    pub confidence: String,
    pub effect_size_pct: f64,
    pub occurrences: u32,
    #[serde(default)]
    pub lag_days: u32,
    #[serde(default)]
    pub human_label: Option<String>,
}

impl From<RemoteCorrelation> for Correlation {
    fn from(remote: RemoteCorrelation) -> Self {
        let magnitude = round_i32(remote.effect_size_pct).abs();
        let direction = match remote.direction.trim().to_ascii_lowercase().as_str() {
            "positive" | "increase" | "worse" => Direction::Positive,
            "negative" | "decrease" | "better" => Direction::Negative,
            _ if remote.effect_size_pct > 0.0 => Direction::Positive,
            _ => Direction::Negative,
        };
        let effect_percent = match direction {
            Direction::Positive => magnitude,
            Direction::Negative => -magnitude,
        };

        let factor_key = normalize_key(&remote.factor);
        let symptom_key = normalize_key(&remote.symptom);
        let factor_label = symptom_label(&factor_key);
        let symptom = symptom_label(&symptom_key);
        let confidence = Confidence::parse(&remote.confidence);
        let human_label = remote
            .human_label
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| {
                let context = format!("with {}", factor_label.to_lowercase());
                describe(&symptom, effect_percent, &context)
            });

        Correlation {
            factor: factor_key,
            factor_label,
            symptom_key,
            symptom_label: symptom,
            direction,
            effect_percent,
            sample_size: remote.occurrences,
            confidence,
            confidence_label: confidence.label().to_string(),
            lag_days: remote.lag_days,
            human_label,
            source: CorrelationSource::Remote,
        }
    }
}

/// Combine service results with the local fallback.
///
/// Remote correlations win for any (factor, symptom) pair both sources
/// report; local results fill the remaining slots. Strongest first, capped at
/// `limit`.
pub fn merge_correlations(
    remote: Vec<RemoteCorrelation>,
    local: Vec<Correlation>,
    limit: usize,
) -> Vec<Correlation> {
    let mut merged: Vec<Correlation> = remote.into_iter().map(Correlation::from).collect();
    let covered: BTreeSet<(String, String)> = merged
        .iter()
        .map(|c| (c.factor.clone(), c.symptom_key.clone()))
        .collect();

    merged.extend(
        local
            .into_iter()
            .filter(|c| !covered.contains(&(c.factor.clone(), c.symptom_key.clone()))),
    );
    merged.sort_by(|a, b| b.effect_percent.abs().cmp(&a.effect_percent.abs()));
    merged.truncate(limit);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogType;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn entry(d: u32) -> LogEntry {
        LogEntry::new(format!("e{d}"), day(d), LogType::Morning)
    }

    #[test]
    fn test_requires_seven_entries() {
        let window = EntryWindow::new(
            (1..=6)
                .map(|d| entry(d).with_sleep(5.0, None).with_symptom("hot_flash", 2))
                .collect(),
        );
        assert!(compute_correlations(&window).is_empty());
        assert!(compute_correlations(&EntryWindow::default()).is_empty());
    }

    #[test]
    fn test_good_sleep_reduces_symptom() {
        let mut entries: Vec<LogEntry> = (1..=4).map(|d| entry(d).with_sleep(8.0, None)).collect();
        entries.extend((5..=8).map(|d| entry(d).with_sleep(5.0, None).with_symptom("hot_flash", 2)));

        let correlations = compute_correlations(&EntryWindow::new(entries));
        assert_eq!(correlations.len(), 1);

        let c = &correlations[0];
        assert_eq!(c.factor, "sleep");
        assert_eq!(c.factor_label, "Good sleep (7h+)");
        assert_eq!(c.symptom_key, "hot_flash");
        assert_eq!(c.direction, Direction::Negative);
        assert_eq!(c.effect_percent, -100);
        assert_eq!(c.sample_size, 8);
        assert_eq!(c.confidence, Confidence::Building);
        assert_eq!(c.confidence_label, "Building confidence");
        assert_eq!(c.lag_days, 0);
        assert_eq!(c.source, CorrelationSource::Local);
        assert_eq!(c.human_label, "Hot flash showed up 100% less often after 7h+ of sleep");
    }

    #[test]
    fn test_sleep_effect_is_good_minus_poor() {
        // symptom only after good nights: positive effect
        let mut entries: Vec<LogEntry> = (1..=4)
            .map(|d| entry(d).with_sleep(8.0, None).with_symptom("night_sweats", 1))
            .collect();
        entries.extend((5..=8).map(|d| entry(d).with_sleep(5.0, None)));

        let correlations = compute_correlations(&EntryWindow::new(entries));
        assert_eq!(correlations.len(), 1);
        assert_eq!(correlations[0].effect_percent, 100);
        assert_eq!(correlations[0].direction, Direction::Positive);
        assert_eq!(
            correlations[0].human_label,
            "Night sweats showed up 100% more often after 7h+ of sleep"
        );
    }

    #[test]
    fn test_poor_sleep_groups_too_small() {
        let mut entries: Vec<LogEntry> = (1..=6).map(|d| entry(d).with_sleep(8.0, None)).collect();
        entries.extend((7..=8).map(|d| entry(d).with_sleep(4.0, None).with_symptom("hot_flash", 2)));
        assert!(compute_correlations(&EntryWindow::new(entries)).is_empty());
    }

    #[test]
    fn test_exercise_only_reports_reduction() {
        // 6.5h sits between the sleep groups, so only the tag split applies
        let mut helps: Vec<LogEntry> = (1..=4)
            .map(|d| entry(d).with_sleep(6.5, None).with_tag("morning walk"))
            .collect();
        helps.extend((5..=8).map(|d| entry(d).with_sleep(6.5, None).with_symptom("fatigue", 1)));

        let correlations = compute_correlations(&EntryWindow::new(helps));
        assert_eq!(correlations.len(), 1);
        assert_eq!(correlations[0].factor, "exercise");
        assert_eq!(correlations[0].effect_percent, -100);
        assert_eq!(correlations[0].direction, Direction::Negative);

        let mut hurts: Vec<LogEntry> = (1..=4)
            .map(|d| entry(d).with_tag("gym").with_symptom("fatigue", 1))
            .collect();
        hurts.extend((5..=8).map(entry));
        assert!(compute_correlations(&EntryWindow::new(hurts)).is_empty());
    }

    #[test]
    fn test_alcohol_only_reports_increase() {
        let mut harms: Vec<LogEntry> = (1..=2)
            .map(|d| entry(d).with_tag("wine").with_symptom("night_sweats", 3))
            .collect();
        harms.extend((3..=8).map(entry));

        let correlations = compute_correlations(&EntryWindow::new(harms));
        assert_eq!(correlations.len(), 1);
        assert_eq!(correlations[0].factor, "alcohol");
        assert_eq!(correlations[0].direction, Direction::Positive);
        assert_eq!(correlations[0].effect_percent, 100);
        assert_eq!(
            correlations[0].human_label,
            "Night sweats showed up 100% more often on alcohol days"
        );

        let mut protects: Vec<LogEntry> = (1..=3).map(|d| entry(d).with_tag("beer")).collect();
        protects.extend((4..=8).map(|d| entry(d).with_symptom("night_sweats", 3)));
        assert!(compute_correlations(&EntryWindow::new(protects)).is_empty());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // 3 of 20 good nights had the symptom, none of the poor nights: 15 points
        let mut entries: Vec<LogEntry> = (1..=20)
            .map(|d| {
                let e = entry(d).with_sleep(8.0, None);
                if d <= 3 {
                    e.with_symptom("anxiety", 1)
                } else {
                    e
                }
            })
            .collect();
        entries.extend((21..=28).map(|d| entry(d).with_sleep(5.0, None)));
        assert!(compute_correlations(&EntryWindow::new(entries)).is_empty());
    }

    #[test]
    fn test_sorted_by_strength_and_capped() {
        let mut entries = Vec::new();
        for d in 1..=12 {
            let mut e = entry(d).with_sleep(if d <= 6 { 8.0 } else { 5.0 }, None);
            if d > 6 {
                e = e.with_symptom("hot_flash", 2);
            }
            if d > 8 {
                e = e.with_symptom("brain_fog", 1);
            }
            if d > 9 {
                e = e.with_symptom("anxiety", 1);
            }
            if d > 10 {
                e = e.with_symptom("joint_pain", 1);
            }
            if d == 12 {
                e = e.with_symptom("headache", 1);
            }
            entries.push(e);
        }

        let correlations = compute_correlations(&EntryWindow::new(entries));
        assert_eq!(correlations.len(), DEFAULT_CORRELATION_LIMIT);
        let effects: Vec<i32> = correlations.iter().map(|c| c.effect_percent).collect();
        assert_eq!(effects, vec![-100, -67, -50, -33]);
        assert_eq!(correlations[0].symptom_key, "hot_flash");
    }

    #[test]
    fn test_high_confidence_above_twenty_samples() {
        let mut entries: Vec<LogEntry> = (1..=11).map(|d| entry(d).with_sleep(8.0, None)).collect();
        entries.extend((12..=22).map(|d| entry(d).with_sleep(5.0, None).with_symptom("insomnia", 2)));

        let correlations = compute_correlations(&EntryWindow::new(entries));
        assert_eq!(correlations[0].sample_size, 22);
        assert_eq!(correlations[0].confidence, Confidence::High);
    }

    #[test]
    fn test_custom_keywords() {
        let settings = CorrelationSettings {
            exercise_keywords: vec!["pilates".to_string()],
            ..CorrelationSettings::default()
        };
        let mut entries: Vec<LogEntry> = (1..=4).map(|d| entry(d).with_tag("Pilates")).collect();
        entries.extend((5..=8).map(|d| entry(d).with_symptom("back_pain", 2)));

        let window = EntryWindow::new(entries);
        assert!(compute_correlations(&window).is_empty());
        assert_eq!(compute_correlations_with(&window, &settings, 4).len(), 1);
    }

    #[test]
    fn test_remote_conversion() {
        let json = r#"{
            "factor": "Caffeine",
            "symptom": "Hot Flash",
            "direction": "positive",
            "confidence": "medium",
            "effectSizePct": 27.6,
            "occurrences": 18,
            "lagDays": 1,
            "humanLabel": "Hot flashes are more common the day after caffeine"
        }"#;
        let remote: RemoteCorrelation = serde_json::from_str(json).unwrap();
        let c = Correlation::from(remote);

        assert_eq!(c.factor, "caffeine");
        assert_eq!(c.factor_label, "Caffeine");
        assert_eq!(c.symptom_key, "hot_flash");
        assert_eq!(c.effect_percent, 28);
        assert_eq!(c.direction, Direction::Positive);
        assert_eq!(c.confidence, Confidence::Moderate);
        assert_eq!(c.sample_size, 18);
        assert_eq!(c.lag_days, 1);
        assert_eq!(c.source, CorrelationSource::Remote);
    }

    #[test]
    fn test_remote_negative_without_label() {
        let remote = RemoteCorrelation {
            factor: "exercise".to_string(),
            symptom: "fatigue".to_string(),
            direction: "decrease".to_string(),
            confidence: "low".to_string(),
            effect_size_pct: 40.0,
            occurrences: 9,
            lag_days: 0,
            human_label: None,
        };
        let c = Correlation::from(remote);
        assert_eq!(c.effect_percent, -40);
        assert_eq!(c.direction, Direction::Negative);
        assert_eq!(c.confidence, Confidence::Building);
        assert_eq!(c.human_label, "Fatigue showed up 40% less often with exercise");
    }

    #[test]
    fn test_merge_prefers_remote() {
        let mut entries: Vec<LogEntry> = (1..=4).map(|d| entry(d).with_sleep(8.0, None)).collect();
        entries.extend((5..=8).map(|d| {
            entry(d)
                .with_sleep(5.0, None)
                .with_symptom("hot_flash", 2)
                .with_symptom("insomnia", 1)
        }));
        let local = compute_correlations(&EntryWindow::new(entries));
        assert_eq!(local.len(), 2);

        let remote = vec![RemoteCorrelation {
            factor: "sleep".to_string(),
            symptom: "hot_flash".to_string(),
            direction: "negative".to_string(),
            confidence: "high".to_string(),
            effect_size_pct: 55.0,
            occurrences: 60,
            lag_days: 0,
            human_label: Some("Better sleep, fewer hot flashes".to_string()),
        }];

        let merged = merge_correlations(remote, local, 4);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].symptom_key, "insomnia");
        assert_eq!(merged[0].source, CorrelationSource::Local);
        assert_eq!(merged[1].symptom_key, "hot_flash");
        assert_eq!(merged[1].source, CorrelationSource::Remote);
        assert_eq!(merged[1].effect_percent, -55);

        assert!(merge_correlations(Vec::new(), Vec::new(), 4).is_empty());
    }
}
