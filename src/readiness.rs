//! Readiness scoring
//!
//! Blends last night's sleep, the latest mood, the symptom load and the
//! number of distinct stressors into a single 5-99 wellness score.

use crate::labels::round_i32;
use crate::types::{LogEntry, ReadinessBreakdown, SleepQuality};
use crate::window::EntryWindow;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Component weights (sum to 1.0)
const SLEEP_WEIGHT: f64 = 0.40;
const MOOD_WEIGHT: f64 = 0.25;
const SYMPTOM_WEIGHT: f64 = 0.20;
const STRESSOR_WEIGHT: f64 = 0.15;

/// Score used for a component with no data
const NEUTRAL_SCORE: f64 = 50.0;

const COMPONENT_MIN: f64 = 10.0;
const COMPONENT_MAX: f64 = 100.0;

/// Final score bounds
const READINESS_MIN: i32 = 5;
const READINESS_MAX: i32 = 99;

/// Compute the readiness score, or `None` when there are no entries
pub fn compute_readiness(window: &EntryWindow) -> Option<u8> {
    compute_readiness_breakdown(window).map(|b| b.score)
}

/// Compute the readiness score together with its component scores.
///
/// Sleep and mood come from the most recent entry carrying each field.
/// Symptoms are aggregated over the whole window using each symptom's worst
/// severity, so one bad day is not averaged away by calmer ones.
pub fn compute_readiness_breakdown(window: &EntryWindow) -> Option<ReadinessBreakdown> {
    if window.is_empty() {
        debug!("readiness: no entries");
        return None;
    }

    let mood = window.iter().find_map(|e| e.mood);
    let sleep_entry = window.iter().find(|e| e.sleep_hours.is_some());

    let sleep_score = sleep_component(sleep_entry);
    let mood_score = mood
        .map(|m| (m as f64 * 20.0).clamp(COMPONENT_MIN, COMPONENT_MAX))
        .unwrap_or(NEUTRAL_SCORE);

    let mut worst: BTreeMap<&str, u8> = BTreeMap::new();
    let mut stressors: BTreeSet<&str> = BTreeSet::new();
    for entry in window {
        for (key, reading) in &entry.symptoms {
            let slot = worst.entry(key.as_str()).or_insert(0);
            *slot = (*slot).max(reading.severity.value());
        }
        stressors.extend(entry.context_tags.iter().map(String::as_str));
    }

    let symptom_count = worst.len();
    let avg_severity = if symptom_count == 0 {
        0.0
    } else {
        worst.values().map(|&s| s as f64).sum::<f64>() / symptom_count as f64
    };
    let stressor_count = stressors.len();

    let symptom_score =
        (COMPONENT_MAX - symptom_count as f64 * 10.0 - avg_severity * 3.0).max(COMPONENT_MIN);
    let stressor_score = (COMPONENT_MAX - stressor_count as f64 * 12.0).max(COMPONENT_MIN);

    let weighted = sleep_score * SLEEP_WEIGHT
        + mood_score * MOOD_WEIGHT
        + symptom_score * SYMPTOM_WEIGHT
        + stressor_score * STRESSOR_WEIGHT;
    let score = round_i32(weighted).clamp(READINESS_MIN, READINESS_MAX) as u8;

    Some(ReadinessBreakdown {
        score,
        sleep_score,
        mood_score,
        symptom_score,
        stressor_score,
        symptom_count,
        avg_severity,
        stressor_count,
    })
}

/// Sleep component: duration scaled so 8h = 85, adjusted for quality and
/// wake-ups
fn sleep_component(entry: Option<&LogEntry>) -> f64 {
    let Some(entry) = entry else {
        return NEUTRAL_SCORE;
    };
    let hours = entry.sleep_hours.unwrap_or(0.0);

    let mut score = (hours / 8.0 * 85.0).clamp(COMPONENT_MIN, COMPONENT_MAX);
    match entry.sleep_quality {
        Some(SleepQuality::Great) => score += 15.0,
        Some(SleepQuality::Poor) => score -= 15.0,
        Some(SleepQuality::Terrible) => score -= 25.0,
        _ => {}
    }
    let disruptions = entry.disruptions.unwrap_or(0) as f64;
    score -= (disruptions * 7.0).min(20.0);

    score.clamp(COMPONENT_MIN, COMPONENT_MAX)
}
