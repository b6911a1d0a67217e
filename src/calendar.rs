//! canonical calendar-date arithmetic for the engine.
//!
//! All dates here are timezone-less `NaiveDate`s. Day counts are inclusive of
//! both endpoints, and month stepping re-derives the day-of-month per target
//! month rather than applying fixed day offsets.

use chrono::{Datelike, Duration, NaiveDate};

use crate::errors::{EngineError, Result};
use crate::types::InstallmentFrequency;

/// inclusive day count between two dates (`end - start + 1`)
///
/// `days_between(d, d)` is 1: a loan disbursed and repaid the same day still
/// accrues one day of interest.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> Result<u32> {
    if end < start {
        return Err(EngineError::InvalidDateRange { start, end });
    }
    Ok((end - start).num_days() as u32 + 1)
}

/// whole days by which `as_of` is past `due_date`, zero when not yet due
pub fn days_overdue(due_date: NaiveDate, as_of: NaiveDate) -> u32 {
    (as_of - due_date).num_days().max(0) as u32
}

/// next calendar date strictly after `from` whose day-of-month equals
/// `salary_day`, clamped to the last day of short months
pub fn next_salary_date(from: NaiveDate, salary_day: u8) -> Result<NaiveDate> {
    if !(1..=31).contains(&salary_day) {
        return Err(EngineError::InvalidSalaryDay { day: salary_day });
    }

    let candidate = date_with_clamped_day(from.year(), from.month(), salary_day as u32);
    if candidate > from {
        Ok(candidate)
    } else {
        let (year, month) = next_month(from.year(), from.month());
        Ok(date_with_clamped_day(year, month, salary_day as u32))
    }
}

/// first due date for a salary-date plan: the next salary date, advanced by
/// whole months until it is at least `min_duration_days` from the anchor
/// (inclusive count)
pub fn resolve_first_due_date(
    anchor: NaiveDate,
    salary_day: u8,
    min_duration_days: u32,
) -> Result<NaiveDate> {
    let mut due = next_salary_date(anchor, salary_day)?;
    while days_between(anchor, due)? < min_duration_days {
        due = next_salary_date(due, salary_day)?;
    }
    Ok(due)
}

/// add calendar months, recovering `preferred_day` where the target month
/// allows it (so a 31st-of-month schedule clamps through February and returns
/// to the 31st in March)
pub fn add_months(date: NaiveDate, months: u32, preferred_day: u32) -> NaiveDate {
    let total = date.year() * 12 + date.month() as i32 - 1 + months as i32;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    date_with_clamped_day(year, month, preferred_day)
}

/// step a due date forward by one plan interval
pub fn step(date: NaiveDate, frequency: InstallmentFrequency, preferred_day: u32) -> NaiveDate {
    match frequency {
        InstallmentFrequency::Daily => date + Duration::days(1),
        InstallmentFrequency::Weekly => date + Duration::days(7),
        InstallmentFrequency::Biweekly => date + Duration::days(14),
        InstallmentFrequency::Monthly => add_months(date, 1, preferred_day),
    }
}

/// number of days in a month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

/// check if year is a leap year
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn date_with_clamped_day(year: i32, month: u32, day: u32) -> NaiveDate {
    let day = day.min(days_in_month(year, month));
    // day is clamped into the valid range for (year, month)
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}
