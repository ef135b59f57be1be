//! Required-hours projection
//!
//! Computes how many payable hours a schedule expects for a month, and how
//! many should already be on the books at a given wall-clock moment.

use chrono::{Datelike, NaiveDateTime};

use crate::models::{MonthRef, MultiplierBuckets, WeekdayMultipliers};
use crate::schedule::{DayResolution, ScheduleResolver};

/// Occurrences of each weekday in the month, indexed Monday..Sunday.
pub fn weekday_counts(month: MonthRef) -> [u32; 7] {
    let mut counts = [0u32; 7];
    for day in month.days() {
        counts[day.weekday().num_days_from_monday() as usize] += 1;
    }
    counts
}

/// Total payable hours the schedule expects for the month.
///
/// Weekday schedules are uniform per weekday, so each weekday type is
/// resolved once and multiplied by its occurrence count.
pub fn project_month(resolver: &ScheduleResolver<'_>, month: MonthRef) -> f64 {
    let counts = weekday_counts(month);
    month
        .days()
        .take(7)
        .map(|day| {
            let index = day.weekday().num_days_from_monday() as usize;
            resolver.resolve(day).payable_hours() * f64::from(counts[index])
        })
        .sum()
}

/// Required hours for the month bucketed by pay multiplier, so potential
/// income reuses the same tier arithmetic as worked hours.
pub fn project_month_buckets(
    resolver: &ScheduleResolver<'_>,
    month: MonthRef,
    multipliers: &WeekdayMultipliers,
) -> MultiplierBuckets {
    let counts = weekday_counts(month);
    let mut buckets = MultiplierBuckets::new();
    for day in month.days().take(7) {
        let index = day.weekday().num_days_from_monday() as usize;
        let hours = resolver.resolve(day).payable_hours() * f64::from(counts[index]);
        buckets.add(multipliers[index], hours);
    }
    buckets
}

/// Hours the schedule says should already be on the books at `now`.
///
/// Days before today always count in full. Today counts only once `now`
/// is at or past the day's scheduled end, so an employee is never marked
/// behind for a shift that has not finished yet. The cutover is taken
/// from the resolved schedule itself, overnight ends landing on the
/// following calendar day.
pub fn project_past_due(
    resolver: &ScheduleResolver<'_>,
    month: MonthRef,
    now: NaiveDateTime,
) -> f64 {
    let today = now.date();
    let mut hours = 0.0;
    for day in month.days() {
        if day > today {
            break;
        }
        let resolved = match resolver.resolve(day) {
            DayResolution::Scheduled(resolved) => resolved,
            DayResolution::Off | DayResolution::Invalid => continue,
        };
        if day < today || now >= resolved.end_on(day) {
            hours += resolved.payable_hours();
        }
    }
    hours
}
