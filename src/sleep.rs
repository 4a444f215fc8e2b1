//! Sleep scoring
//!
//! Summarizes the nights in the window that carry `sleep_hours`: average
//! duration, poor-night count, a 10-100 score and the weekly bar chart.

use crate::labels::{mean, round_i32, round_one_decimal, short_day_label};
use crate::types::{LogEntry, SleepBar, SleepQuality, SleepSummary};
use crate::window::EntryWindow;
use tracing::debug;

/// Bars shown in the weekly chart
pub const WEEKLY_BAR_COUNT: usize = 7;

const SCORE_MIN: f64 = 10.0;
const SCORE_MAX: f64 = 100.0;

/// Bonus when at least half the tracked nights were rated great
const GREAT_SLEEP_BONUS: f64 = 15.0;
const POOR_NIGHT_PENALTY: f64 = 3.0;
const MAX_POOR_NIGHT_PENALTY: f64 = 20.0;

/// Compute the sleep summary, or `None` when no entry has sleep hours
pub fn compute_sleep_score(window: &EntryWindow) -> Option<SleepSummary> {
    let nights: Vec<&LogEntry> = window.iter().filter(|e| e.sleep_hours.is_some()).collect();
    if nights.is_empty() {
        debug!(entries = window.len(), "sleep: no sleep data");
        return None;
    }

    let hours: Vec<f64> = nights.iter().filter_map(|e| e.sleep_hours).collect();
    let disruptions: Vec<f64> = nights
        .iter()
        .map(|e| e.disruptions.unwrap_or(0) as f64)
        .collect();
    let avg_hours = mean(&hours).unwrap_or(0.0);
    let avg_disruptions = mean(&disruptions).unwrap_or(0.0);

    let poor_nights = nights
        .iter()
        .filter(|e| e.sleep_quality.is_some_and(|q| q.is_poor()))
        .count();
    let great_nights = nights
        .iter()
        .filter(|e| e.sleep_quality == Some(SleepQuality::Great))
        .count();

    let mut base = avg_hours / 8.0 * 85.0;
    if great_nights * 2 >= nights.len() {
        base += GREAT_SLEEP_BONUS;
    }
    let penalty = (poor_nights as f64 * POOR_NIGHT_PENALTY).min(MAX_POOR_NIGHT_PENALTY);
    let raw = base.clamp(SCORE_MIN, SCORE_MAX) - penalty;
    let score = round_i32(raw).max(SCORE_MIN as i32) as u8;

    let weekly_bars = nights
        .iter()
        .take(WEEKLY_BAR_COUNT)
        .rev()
        .map(|e| SleepBar {
            date: e.date,
            hours: e.sleep_hours.unwrap_or(0.0),
            day_label: short_day_label(e.date),
        })
        .collect();

    Some(SleepSummary {
        score,
        avg_hours: round_one_decimal(avg_hours),
        avg_disruptions: round_one_decimal(avg_disruptions),
        weekly_bars,
        total_nights_tracked: nights.len() as u32,
        poor_nights: poor_nights as u32,
    })
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

    fn night(d: u32, hours: f64, quality: Option<SleepQuality>) -> LogEntry {
        LogEntry::new(format!("n{d}"), day(d), LogType::Morning).with_sleep(hours, quality)
    }

    #[test]
    fn test_no_sleep_data() {
        assert_eq!(compute_sleep_score(&EntryWindow::default()), None);

        let window = EntryWindow::new(vec![LogEntry::new("a", day(1), LogType::Evening).with_mood(3)]);
        assert_eq!(compute_sleep_score(&window), None);
    }

    #[test]
    fn test_great_eight_hours_scores_100() {
        let window = EntryWindow::new(
            (1..=5)
                .map(|d| night(d, 8.0, Some(SleepQuality::Great)))
                .collect(),
        );
        let summary = compute_sleep_score(&window).unwrap();
        assert_eq!(summary.score, 100);
        assert_eq!(summary.avg_hours, 8.0);
        assert_eq!(summary.poor_nights, 0);
    }

    #[test]
    fn test_poor_nights_penalized() {
        let window = EntryWindow::new(vec![
            night(1, 6.0, Some(SleepQuality::Poor)),
            night(2, 6.0, Some(SleepQuality::Terrible)),
            night(3, 6.0, Some(SleepQuality::Ok)),
            night(4, 6.0, None),
        ]);
        let summary = compute_sleep_score(&window).unwrap();
        // 6/8 * 85 = 63.75, minus 2 * 3
        assert_eq!(summary.score, 58);
        assert_eq!(summary.poor_nights, 2);
        assert_eq!(summary.total_nights_tracked, 4);
    }

    #[test]
    fn test_score_floor() {
        let window = EntryWindow::new(
            (1..=10)
                .map(|d| night(d, 1.0, Some(SleepQuality::Terrible)))
                .collect(),
        );
        assert_eq!(compute_sleep_score(&window).unwrap().score, 10);
    }

    #[test]
    fn test_averages_rounded_and_disruptions_default_zero() {
        let window = EntryWindow::new(vec![
            night(1, 7.0, None).with_disruptions(3),
            night(2, 6.5, None),
            night(3, 5.0, None).with_disruptions(1),
        ]);
        let summary = compute_sleep_score(&window).unwrap();
        assert_eq!(summary.avg_hours, 6.2);
        assert_eq!(summary.avg_disruptions, 1.3);
    }

    #[test]
    fn test_weekly_bars_are_last_seven_chronological() {
        let mut entries: Vec<LogEntry> = (1..=10).map(|d| night(d, d as f64, None)).collect();
        entries.push(LogEntry::new("no-sleep", day(11), LogType::Morning));
        let summary = compute_sleep_score(&EntryWindow::new(entries)).unwrap();

        let dates: Vec<NaiveDate> = summary.weekly_bars.iter().map(|b| b.date).collect();
        assert_eq!(dates, (4..=10).map(day).collect::<Vec<_>>());
        assert_eq!(summary.weekly_bars[0].hours, 4.0);
        // 2024-01-04 was a Thursday
        assert_eq!(summary.weekly_bars[0].day_label, "Thu");
        assert_eq!(summary.total_nights_tracked, 10);
    }
}
