//! Calendar arithmetic for the projection engine.
//!
//! Everything here works on `chrono::NaiveDate` — a plain calendar date with
//! no time-of-day or timezone, so a parsed date round-trips exactly and can
//! never drift across a midnight boundary.

use chrono::{Datelike, NaiveDate};

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    const DAYS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    if month == 2 && is_leap_year(year) {
        29
    } else {
        DAYS[(month - 1) as usize]
    }
}

/// Parse a strict `YYYY-MM-DD` date.
///
/// Returns `None` for anything that is not exactly four digits, a dash, two
/// digits, a dash, two digits — and for shapes that pass but name an
/// impossible date (2023-02-30, 2023-04-31, Feb 29 off leap years).
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits = |range: std::ops::Range<usize>| -> Option<u32> {
        let mut value = 0u32;
        for &b in &bytes[range] {
            if !b.is_ascii_digit() {
                return None;
            }
            value = value * 10 + u32::from(b - b'0');
        }
        Some(value)
    };
    let year = digits(0..4)? as i32;
    let month = digits(5..7)?;
    let day = digits(8..10)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Add whole years, clamping the day when the source day does not exist in
/// the target month.
///
/// Feb 29 plus a year lands on Feb 28, not Mar 1: the clamp goes to the last
/// valid day of the *same* month. This moves the reported target date one day
/// earlier across leap-to-non-leap transitions, which is the intended policy.
pub fn add_years(date: NaiveDate, years: i32) -> NaiveDate {
    checked_add_years(date, years).expect("target year within supported range")
}

/// Fallible form of [`add_years`]: `None` when the target year overflows or
/// leaves the range `NaiveDate` can represent.
///
/// Validation uses this to turn absurd year sums into errors instead of
/// letting `add_years` panic.
pub fn checked_add_years(date: NaiveDate, years: i32) -> Option<NaiveDate> {
    let year = date.year().checked_add(years)?;
    let month = date.month();
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Add whole months with the same day-clamping policy as [`add_years`].
///
/// Used to stamp timeline points with real dates (Jan 31 + 1 month = Feb 28
/// or 29).
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let zero_based = date.year() * 12 + date.month() as i32 - 1 + months as i32;
    let year = zero_based.div_euclid(12);
    let month = (zero_based.rem_euclid(12) + 1) as u32;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).expect("clamped day exists in month")
}

/// Count whole calendar months from `start` up to, but not including, a
/// partial final month. Returns 0 when `end <= start`.
///
/// Steps by calendar fields rather than dividing a day count, so 28-, 30- and
/// 31-day months all weigh the same.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    if end <= start {
        return 0;
    }
    let mut months =
        (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if end.day() < start.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// Age in completed years at `reference`: the year difference, minus one if
/// this year's birthday has not happened yet.
pub fn age_in_years(reference: NaiveDate, birth: NaiveDate) -> i32 {
    let mut age = reference.year() - birth.year();
    if (reference.month(), reference.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// Age someone born on `birth` turns during `target_year`, or `None` when the
/// target year is before the birth year.
pub fn year_to_age(birth: NaiveDate, target_year: i32) -> Option<i32> {
    let age = target_year - birth.year();
    if age < 0 { None } else { Some(age) }
}
