//! Entry store
//!
//! Keeps a rolling, de-duplicated history of fetched check-ins so repeated
//! fetches (`/logs?date=...`, `/logs?range=28d`) can be folded together
//! before the metrics run.

use crate::config::MAX_WINDOW_DAYS;
use crate::types::{LogEntry, LogType};
use crate::window::EntryWindow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Default history window in days
pub const DEFAULT_STORE_WINDOW_DAYS: u32 = 90;

/// Outcome of folding a batch into the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Entries with no stored counterpart
    pub inserted: usize,
    /// Stored entries replaced by a newer (or equally new) incoming entry
    pub replaced: usize,
    /// Incoming entries discarded because the stored one is newer
    pub ignored: usize,
    /// Entries dropped for falling outside the window
    pub pruned: usize,
}

/// Rolling store of log entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryStore {
    entries: Vec<LogEntry>,
    window_days: u32,
}

impl Default for EntryStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_WINDOW_DAYS)
    }
}

impl EntryStore {
    /// Create an empty store keeping `window_days` of history
    pub fn new(window_days: u32) -> Self {
        Self {
            entries: Vec::new(),
            window_days: window_days.max(1),
        }
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Date of the newest stored entry
    pub fn newest_date(&self) -> Option<NaiveDate> {
        self.entries.iter().map(|e| e.date).max()
    }

    /// Fold a batch of entries into the store.
    ///
    /// Morning and evening check-ins are unique per date; unspecified entries
    /// are matched by id. When both sides exist the one with the later
    /// `logged_at` is kept (a missing timestamp counts as oldest) and ties go
    /// to the incoming entry. Afterwards anything older than the window,
    /// measured back from the newest date, is dropped.
    pub fn merge(&mut self, incoming: Vec<LogEntry>) -> MergeSummary {
        let mut summary = MergeSummary::default();

        for entry in incoming {
            match self.entries.iter().position(|e| same_slot(e, &entry)) {
                None => {
                    self.entries.push(entry);
                    summary.inserted += 1;
                }
                Some(idx) => {
                    if is_at_least_as_new(&entry, &self.entries[idx]) {
                        self.entries[idx] = entry;
                        summary.replaced += 1;
                    } else {
                        summary.ignored += 1;
                    }
                }
            }
        }

        let before = self.entries.len();
        let retained = EntryWindow::new(std::mem::take(&mut self.entries)).recent_days(self.window_days);
        self.entries = retained.into_inner();
        summary.pruned = before - self.entries.len();

        debug!(
            inserted = summary.inserted,
            replaced = summary.replaced,
            ignored = summary.ignored,
            pruned = summary.pruned,
            stored = self.entries.len(),
            "entry store merged"
        );
        summary
    }

    /// Stored entries, newest first
    pub fn window(&self) -> EntryWindow {
        EntryWindow::new(self.entries.clone())
    }

    /// Load an entry store from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut store: Self = serde_json::from_str(json)?;
        store.window_days = store.window_days.clamp(1, MAX_WINDOW_DAYS);
        Ok(store)
    }

    /// Serialize the entry store to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn same_slot(a: &LogEntry, b: &LogEntry) -> bool {
    if a.date != b.date || a.log_type != b.log_type {
        return false;
    }
    match a.log_type {
        LogType::Morning | LogType::Evening => true,
        LogType::Unspecified => a.id == b.id,
    }
}

fn is_at_least_as_new(incoming: &LogEntry, stored: &LogEntry) -> bool {
    match (incoming.logged_at, stored.logged_at) {
        (Some(a), Some(b)) => a.cmp(&b) != Ordering::Less,
        (None, Some(_)) => false,
        (_, None) => true,
    }
}
