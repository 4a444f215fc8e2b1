//! Newest-first entry window
//!
//! Every metric component reads "the most recent" entries by position, so the
//! ordering is established here once instead of being trusted from callers.

use crate::types::LogEntry;
use chrono::Duration;
use serde::Serialize;
use std::cmp::Ordering;
use std::ops::Range;

/// Log entries ordered newest-first.
///
/// Ordering: date descending, then evening before morning before
/// unspecified, then `logged_at` descending (missing timestamps last).
/// The sort is stable, so fully tied entries keep their input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EntryWindow {
    entries: Vec<LogEntry>,
}

impl EntryWindow {
    /// Build a window, sorting entries newest-first
    pub fn new(mut entries: Vec<LogEntry>) -> Self {
        entries.sort_by(newest_first);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Most recent entry, if any
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.first()
    }

    /// Oldest entry, if any
    pub fn oldest(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// The `n` most recent entries (fewer if the window is shorter)
    pub fn newest(&self, n: usize) -> &[LogEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Positional sub-slice, clamped to the window bounds
    pub fn slice(&self, range: Range<usize>) -> &[LogEntry] {
        let len = self.entries.len();
        let start = range.start.min(len);
        let end = range.end.clamp(start, len);
        &self.entries[start..end]
    }

    /// Entries dated within `days` calendar days of the newest entry
    pub fn recent_days(&self, days: u32) -> EntryWindow {
        let Some(latest) = self.latest() else {
            return EntryWindow::default();
        };
        if days == 0 {
            return EntryWindow::default();
        }
        // a span reaching past the calendar's start keeps everything
        let Some(cutoff) = latest
            .date
            .checked_sub_signed(Duration::days(i64::from(days) - 1))
        else {
            return self.clone();
        };
        EntryWindow {
            entries: self
                .entries
                .iter()
                .take_while(|e| e.date >= cutoff)
                .cloned()
                .collect(),
        }
    }

    pub fn into_inner(self) -> Vec<LogEntry> {
        self.entries
    }
}

impl From<Vec<LogEntry>> for EntryWindow {
    fn from(entries: Vec<LogEntry>) -> Self {
        Self::new(entries)
    }
}

impl<'a> IntoIterator for &'a EntryWindow {
    type Item = &'a LogEntry;
    type IntoIter = std::slice::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

pub(crate) fn newest_first(a: &LogEntry, b: &LogEntry) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| a.log_type.recency_rank().cmp(&b.log_type.recency_rank()))
        .then_with(|| match (a.logged_at, b.logged_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}
