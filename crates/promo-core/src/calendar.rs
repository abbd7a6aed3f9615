//! Working-day calendar.
//!
//! Schedules are computed on working-day offsets: Saturdays, Sundays and
//! configured holidays are skipped. Intervals are half-open `[start, end)`.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkingCalendar {
    /// Non-working dates on top of weekends.
    #[serde(default)]
    pub holidays: BTreeSet<NaiveDate>,
}

impl WorkingCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// Working days in `[start, end)`. Negative when `end` precedes `start`.
    pub fn working_days_between(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        if end < start {
            return -self.working_days_between(end, start);
        }
        let mut count = 0;
        let mut day = start;
        while day < end {
            if self.is_working_day(day) {
                count += 1;
            }
            day += Duration::days(1);
        }
        count
    }

    /// The date sitting `offset` working days away from `anchor`.
    ///
    /// Offset 0 is the first working day on or after the anchor, so that
    /// `working_days_between(anchor, date_at(anchor, n)) == n`.
    pub fn date_at(&self, anchor: NaiveDate, offset: i64) -> NaiveDate {
        let mut day = anchor;
        if offset >= 0 {
            let mut count = 0;
            loop {
                if self.is_working_day(day) {
                    if count == offset {
                        return day;
                    }
                    count += 1;
                }
                day += Duration::days(1);
            }
        }
        let mut count = 0;
        loop {
            day -= Duration::days(1);
            if self.is_working_day(day) {
                count -= 1;
                if count == offset {
                    return day;
                }
            }
        }
    }
}
