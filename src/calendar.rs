//! Calendar helpers: day-of-week index and the day key used for the
//! one-rating-per-day rule.

use chrono::{Datelike, Local, NaiveDate};

/// What "today" means for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayInfo {
    /// 0 = Sunday .. 6 = Saturday.
    pub weekday_index: u32,
    /// `YYYY-M-D`, no zero padding (e.g. `2024-3-7`).
    pub day_key: String,
}

impl DayInfo {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            weekday_index: date.weekday().num_days_from_sunday(),
            day_key: day_key(date),
        }
    }

    /// Server local time.
    pub fn today() -> Self {
        Self::from_date(Local::now().date_naive())
    }
}

pub fn day_key(date: NaiveDate) -> String {
    format!("{}-{}-{}", date.year(), date.month(), date.day())
}
