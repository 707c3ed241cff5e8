//! Calendar arithmetic shared by the reconciliation, decomposition and
//! imputation stages.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// First year of the reference data; day indices count from its 1st of January.
pub const EPOCH_YEAR: i32 = 2013;

/// Strictly increasing day index: day-of-year plus 365 per year since
/// [`EPOCH_YEAR`], counted as elapsed days so leap years never collide.
///
/// ```
/// use chrono::NaiveDate;
/// use store_forecast::core::calendar::day_index;
///
/// let d = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap();
/// assert_eq!(day_index(d), 1 + 365);
/// ```
pub fn day_index(date: NaiveDate) -> i64 {
    let epoch = NaiveDate::from_ymd_opt(EPOCH_YEAR, 1, 1).unwrap_or(NaiveDate::MIN);
    (date - epoch).num_days() + 1
}

/// Swap day and month. `None` when the day cannot be a month (day > 12).
pub fn transpose_day_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.day() > 12 {
        return None;
    }
    NaiveDate::from_ymd_opt(date.year(), date.day(), date.month())
}

/// Weekday numbered 1 (Monday) to 7 (Sunday).
pub fn weekday_number(date: NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}

/// Key of the same weekday in the same ISO week one year earlier.
pub fn prior_year_key(date: NaiveDate) -> (i32, u32, Weekday) {
    let iso = date.iso_week();
    (iso.year() - 1, iso.week(), date.weekday())
}

/// ISO (year, week, weekday) key of a date.
pub fn iso_key(date: NaiveDate) -> (i32, u32, Weekday) {
    let iso = date.iso_week();
    (iso.year(), iso.week(), date.weekday())
}

/// Inclusive list of days from `start` to `end`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
        days.push(current);
        current += Duration::days(1);
    }
    days
}

/// True when the sorted dates form one unbroken run of consecutive days.
pub fn is_contiguous(sorted: &[NaiveDate]) -> bool {
    sorted
        .windows(2)
        .all(|pair| pair[1] - pair[0] == Duration::days(1))
}
