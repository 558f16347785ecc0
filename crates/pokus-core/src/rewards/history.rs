//! Rolling per-day focus history.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Days kept in the history.
pub const HISTORY_DAYS: usize = 7;

/// Focus seconds per calendar day, stored as `{"YYYY-MM-DD": seconds}`.
///
/// Holds the most recent [`HISTORY_DAYS`] days that have any focus time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FocusHistory {
    days: BTreeMap<NaiveDate, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayFocus {
    pub date: NaiveDate,
    /// Short weekday name, `Mon` .. `Sun`.
    pub day: String,
    pub seconds: u64,
}

impl FocusHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, date: NaiveDate) -> u64 {
        self.days.get(&date).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Saturates instead of overflowing on corrupt stored values.
    pub fn sum(&self) -> u64 {
        self.days.values().copied().fold(0, u64::saturating_add)
    }

    /// Add seconds to a day and drop everything older than the most recent
    /// [`HISTORY_DAYS`] entries.
    pub fn add(&mut self, date: NaiveDate, seconds: u64) {
        let day = self.days.entry(date).or_insert(0);
        *day = day.saturating_add(seconds);
        while self.days.len() > HISTORY_DAYS {
            self.days.pop_first();
        }
    }

    /// The seven calendar days ending at `today`, oldest first, with gaps
    /// filled by zero.
    pub fn week_ending(&self, today: NaiveDate) -> Vec<DayFocus> {
        (0..HISTORY_DAYS as i64)
            .rev()
            .map(|back| {
                let date = today - Duration::days(back);
                DayFocus {
                    date,
                    day: date.weekday().to_string(),
                    seconds: self.get(date),
                }
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u64)> + '_ {
        self.days.iter().map(|(d, s)| (*d, *s))
    }
}
