//! Calendar date helpers for the maintenance plan
//!
//! All plan dates are `chrono::NaiveDate`. Month arithmetic clamps the day of
//! month to the last valid day of the target month (Jan 31 + 1 month is Feb 28
//! or Feb 29) and rolls over year boundaries.

use chrono::{Datelike, Local, Months, NaiveDate};

/// Get the current date in local timezone
pub fn local_date_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Add a number of calendar months to a date, clamping the day of month
///
/// Returns `None` only when the result falls outside chrono's representable range.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// Number of whole months elapsed between `from` and `to`
///
/// This is the largest `m` such that `add_months(from, m) <= to`, and 0 when
/// `to` is before `from`.
pub fn whole_months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if to <= from {
        return 0;
    }

    let estimate = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    let mut months = estimate.max(0) as u32;

    // The estimate overshoots by one when the day of month has not been reached yet
    while months > 0 && add_months(from, months).is_none_or(|d| d > to) {
        months -= 1;
    }
    months
}

/// Last day of the given calendar year
pub fn year_end(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 12, 31)
}

/// Parse a `YYYY-MM-DD` date string
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}
