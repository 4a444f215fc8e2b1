//! Weekly narrative
//!
//! Turns the last seven entries into a short recap: best and toughest day,
//! how the most frequent symptom moved against the week before, and a
//! sleep remark when the week was clearly good or clearly rough.

use crate::labels::{long_day_label, round_i32, symptom_label};
use crate::types::{LogEntry, WeeklyNarrative};
use crate::window::EntryWindow;
use std::collections::BTreeMap;
use tracing::debug;

/// Entries needed before a story is written
pub const MIN_STORY_ENTRIES: usize = 3;

/// Entries per story window
pub const STORY_WINDOW: usize = 7;

/// Mood assumed for an entry without one
const DEFAULT_MOOD: f64 = 3.0;
const SYMPTOM_PENALTY: f64 = 0.5;

const GOOD_NIGHT_HOURS: f64 = 7.0;
const GREAT_SLEEP_NIGHTS: usize = 5;
const ROUGH_SLEEP_NIGHTS: usize = 2;

/// "Showed up N of M days" phrasing starts at this many occurrences
const FREQUENT_OCCURRENCES: usize = 4;

/// Write the weekly story, or `None` with fewer than three entries.
///
/// Best and worst days are picked by `mood - 0.5 * symptom_count`. On a tie
/// the more recent day wins.
pub fn compute_weekly_story(window: &EntryWindow) -> Option<WeeklyNarrative> {
    if window.len() < MIN_STORY_ENTRIES {
        debug!(entries = window.len(), "weekly story: not enough entries");
        return None;
    }

    let week = window.newest(STORY_WINDOW);
    let previous = window.slice(STORY_WINDOW..STORY_WINDOW * 2);

    let (best, worst) = best_and_worst(week)?;
    let best_day_label = long_day_label(best.date);
    let worst_day_label = long_day_label(worst.date);

    let mut sentences = vec![format!(
        "Your best day was {best_day_label} and your toughest was {worst_day_label}."
    )];

    let top_symptom = most_frequent_symptom(week);
    if let Some(key) = top_symptom {
        sentences.push(symptom_sentence(key, week, previous));
    }
    if let Some(sentence) = sleep_sentence(week) {
        sentences.push(sentence);
    }

    Some(WeeklyNarrative {
        text: sentences.join(" "),
        best_day_label,
        worst_day_label,
        best_mood: best.mood,
        worst_mood: worst.mood,
        top_symptom: top_symptom.map(str::to_string),
    })
}

fn day_score(entry: &LogEntry) -> f64 {
    entry.mood.map(f64::from).unwrap_or(DEFAULT_MOOD)
        - SYMPTOM_PENALTY * entry.symptom_count() as f64
}

fn best_and_worst(week: &[LogEntry]) -> Option<(&LogEntry, &LogEntry)> {
    let first = week.first()?;
    let (mut best, mut worst) = (first, first);
    for entry in &week[1..] {
        let score = day_score(entry);
        if score > day_score(best) {
            best = entry;
        }
        if score < day_score(worst) {
            worst = entry;
        }
    }
    Some((best, worst))
}

/// Most frequent symptom; ties go to the one seen first
fn most_frequent_symptom(entries: &[LogEntry]) -> Option<&str> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for key in entries.iter().flat_map(|e| e.symptoms.keys()) {
        let count = counts.entry(key.as_str()).or_insert(0);
        if *count == 0 {
            order.push(key.as_str());
        }
        *count += 1;
    }

    let mut top: Option<(&str, usize)> = None;
    for key in order {
        let count = counts.get(key).copied().unwrap_or(0);
        if top.map_or(true, |(_, best)| count > best) {
            top = Some((key, count));
        }
    }
    top.map(|(key, _)| key)
}

fn occurrences(entries: &[LogEntry], key: &str) -> usize {
    entries.iter().filter(|e| e.has_symptom(key)).count()
}

fn symptom_sentence(key: &str, week: &[LogEntry], previous: &[LogEntry]) -> String {
    let label = symptom_label(key);
    let recent = occurrences(week, key);
    let older = occurrences(previous, key);

    if older > 0 && recent < older {
        let drop = round_i32((older - recent) as f64 / older as f64 * 100.0);
        format!("{label} dropped {drop}% compared with the week before.")
    } else if recent >= FREQUENT_OCCURRENCES {
        format!("{label} showed up {recent} of {} days.", week.len())
    } else if recent == 1 {
        format!("{label} appeared once.")
    } else {
        format!("{label} appeared {recent} times.")
    }
}

fn sleep_sentence(week: &[LogEntry]) -> Option<String> {
    if week.iter().all(|e| e.sleep_hours.is_none()) {
        return None;
    }
    let good_nights = week
        .iter()
        .filter(|e| e.sleep_hours.is_some_and(|h| h >= GOOD_NIGHT_HOURS))
        .count();

    if good_nights >= GREAT_SLEEP_NIGHTS {
        Some(format!("Great sleep, with {good_nights} nights of 7h or more."))
    } else if good_nights <= ROUGH_SLEEP_NIGHTS {
        Some("Sleep was rough this week.".to_string())
    } else {
        None
    }
}
