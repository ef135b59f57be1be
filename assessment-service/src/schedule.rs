//! Schedule resolution
//!
//! Resolves the applicable day schedule for an employee and calendar day,
//! preferring the assigned shift and falling back to the business-wide
//! defaults.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::{parse_hhmm, BusinessDefaults, DaySchedule, Shift};

/// A day schedule with parsed times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedDay {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub break_minutes: u32,
}

impl ResolvedDay {
    /// Scheduled span in hours. An overnight day (end numerically before
    /// start) crosses midnight and counts as `end + 24h`.
    pub fn span_hours(&self) -> f64 {
        let mut minutes = self.end.signed_duration_since(self.start).num_minutes();
        if minutes < 0 {
            minutes += 24 * 60;
        }
        minutes as f64 / 60.0
    }

    /// Hours payable for the day after break deduction.
    pub fn payable_hours(&self) -> f64 {
        (self.span_hours() - f64::from(self.break_minutes) / 60.0).max(0.0)
    }

    /// The wall-clock moment this schedule ends when worked on `date`.
    /// Lands on the following calendar day for overnight schedules.
    pub fn end_on(&self, date: NaiveDate) -> NaiveDateTime {
        if self.end < self.start {
            (date + chrono::Duration::days(1)).and_time(self.end)
        } else {
            date.and_time(self.end)
        }
    }
}

/// Outcome of resolving one calendar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DayResolution {
    /// A schedule applies to the day.
    Scheduled(ResolvedDay),
    /// No schedule is enabled for the weekday.
    Off,
    /// Schedule data failed `HH:MM` validation. The day counts as zero
    /// scheduled hours and is flagged for manual review, never defaulted
    /// to a guessed time.
    Invalid,
}

impl DayResolution {
    pub fn payable_hours(&self) -> f64 {
        match self {
            DayResolution::Scheduled(day) => day.payable_hours(),
            DayResolution::Off | DayResolution::Invalid => 0.0,
        }
    }

    pub fn as_scheduled(&self) -> Option<&ResolvedDay> {
        match self {
            DayResolution::Scheduled(day) => Some(day),
            _ => None,
        }
    }
}

fn parse_day(day: &DaySchedule) -> Option<ResolvedDay> {
    let start = parse_hhmm(&day.start)?;
    let end = parse_hhmm(&day.end)?;
    Some(ResolvedDay {
        start,
        end,
        break_minutes: day.break_minutes,
    })
}

/// Resolves day schedules for one employee: the assigned shift when the
/// weekday is enabled there, the business defaults otherwise. An inactive
/// or missing shift degrades to the defaults.
#[derive(Debug, Clone)]
pub struct ScheduleResolver<'a> {
    shift: Option<&'a Shift>,
    defaults: &'a BusinessDefaults,
}

impl<'a> ScheduleResolver<'a> {
    pub fn new(shift: Option<&'a Shift>, defaults: &'a BusinessDefaults) -> Self {
        Self {
            shift: shift.filter(|s| s.active),
            defaults,
        }
    }

    pub fn resolve(&self, date: NaiveDate) -> DayResolution {
        let weekday = date.weekday();
        let day = self
            .shift
            .and_then(|shift| shift.day(weekday))
            .or_else(|| self.defaults.day(weekday));

        match day {
            None => DayResolution::Off,
            Some(day) => match parse_day(day) {
                Some(resolved) => DayResolution::Scheduled(resolved),
                None => {
                    tracing::warn!(
                        %weekday,
                        start = %day.start,
                        end = %day.end,
                        "invalid day schedule, treating as zero hours"
                    );
                    DayResolution::Invalid
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Weekday};

    fn defaults() -> BusinessDefaults {
        BusinessDefaults::default()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    #[test]
    fn overnight_shift_spans_midnight() {
        let day = ResolvedDay {
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            break_minutes: 30,
        };
        assert!((day.span_hours() - 8.0).abs() < 1e-9);
        assert!((day.payable_hours() - 7.5).abs() < 1e-9);
    }

    #[test]
    fn overnight_end_lands_on_next_day() {
        let day = ResolvedDay {
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            break_minutes: 0,
        };
        let end = day.end_on(monday());
        assert_eq!(end.date(), NaiveDate::from_ymd_opt(2026, 6, 2).unwrap());
        assert_eq!(end.time(), NaiveTime::from_hms_opt(6, 0, 0).unwrap());
    }

    #[test]
    fn break_deduction_never_goes_negative() {
        let day = ResolvedDay {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            break_minutes: 60,
        };
        assert_eq!(day.payable_hours(), 0.0);
    }

    #[test]
    fn assigned_shift_wins_over_defaults() {
        let mut shift = Shift::new("early", "Early crew");
        shift.set_day(Weekday::Mon, DaySchedule::new("06:00", "14:00", 30));
        let defaults = defaults();
        let resolver = ScheduleResolver::new(Some(&shift), &defaults);

        let resolved = resolver.resolve(monday());
        let day = resolved.as_scheduled().unwrap();
        assert_eq!(day.start, NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        assert!((resolved.payable_hours() - 7.5).abs() < 1e-9);
    }

    #[test]
    fn disabled_weekday_falls_back_to_defaults() {
        // Shift only enables Tuesday; Monday resolves from the defaults.
        let mut shift = Shift::new("tue", "Tuesday only");
        shift.set_day(Weekday::Tue, DaySchedule::new("06:00", "14:00", 30));
        let defaults = defaults();
        let resolver = ScheduleResolver::new(Some(&shift), &defaults);

        let resolved = resolver.resolve(monday());
        assert!((resolved.payable_hours() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn inactive_shift_is_ignored() {
        let mut shift = Shift::new("old", "Retired shift");
        shift.set_day(Weekday::Mon, DaySchedule::new("06:00", "14:00", 0));
        shift.active = false;
        let defaults = defaults();
        let resolver = ScheduleResolver::new(Some(&shift), &defaults);

        let resolved = resolver.resolve(monday());
        assert!((resolved.payable_hours() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn sunday_is_off_under_standard_defaults() {
        let defaults = defaults();
        let resolver = ScheduleResolver::new(None, &defaults);
        let sunday = NaiveDate::from_ymd_opt(2026, 6, 7).unwrap();
        assert_eq!(resolver.resolve(sunday), DayResolution::Off);
    }

    #[test]
    fn malformed_time_degrades_to_invalid() {
        let mut shift = Shift::new("typo", "Typo shift");
        shift.set_day(Weekday::Mon, DaySchedule::new("8h30", "17:30", 60));
        let defaults = defaults();
        let resolver = ScheduleResolver::new(Some(&shift), &defaults);

        let resolved = resolver.resolve(monday());
        assert_eq!(resolved, DayResolution::Invalid);
        assert_eq!(resolved.payable_hours(), 0.0);
    }
}
