//! Selectable pickup days and time slots.

use chrono::{Days, Local, NaiveDate};

/// Fixed ordered slot catalog.
pub const DEFAULT_SLOTS: [&str; 5] = ["09:00", "11:00", "14:00", "16:00", "18:00"];

/// One offerable pickup day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayOption {
    pub date: NaiveDate,
    pub label: String,
}

/// Enumerates the selectable days/slots and validates chosen combinations.
///
/// The day window is regenerated from "today" on every call, so a selection
/// is only accepted while its date is still inside the rolling window.
#[derive(Debug, Clone)]
pub struct ScheduleCatalog {
    days_ahead: usize,
    slots: Vec<String>,
}

impl ScheduleCatalog {
    pub fn new(days_ahead: usize) -> Self {
        Self {
            days_ahead,
            slots: DEFAULT_SLOTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// The next `days_ahead` consecutive dates starting today, each with a
    /// short display label.
    pub fn days(&self) -> Vec<DayOption> {
        let today = Local::now().date_naive();
        (0..self.days_ahead as u64)
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .map(|date| DayOption {
                date,
                label: day_label(date),
            })
            .collect()
    }

    /// The fixed slot catalog, in offer order.
    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    /// A day is selectable only while it sits inside the generated window.
    pub fn is_valid_day(&self, date: NaiveDate) -> bool {
        self.days().iter().any(|d| d.date == date)
    }

    /// A time is selectable only if it is one of the catalog slots.
    pub fn is_valid_slot(&self, slot: &str) -> bool {
        self.slots.iter().any(|s| s == slot)
    }
}

impl Default for ScheduleCatalog {
    fn default() -> Self {
        Self::new(7)
    }
}

/// Short label for a pickup day, e.g. `Thu 28 Aug`.
pub fn day_label(date: NaiveDate) -> String {
    date.format("%a %d %b").to_string()
}
