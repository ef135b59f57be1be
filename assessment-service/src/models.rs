//! Attendance domain models
//!
//! Core types shared by the reconciliation and assessment modules.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Direction of a raw clock punch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunchDirection {
    In,
    Out,
}

impl fmt::Display for PunchDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PunchDirection::In => write!(f, "in"),
            PunchDirection::Out => write!(f, "out"),
        }
    }
}

/// Reason a punch was rejected by the duplicate guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MispunchReason {
    DuplicateClockIn,
    DuplicateClockOut,
}

impl fmt::Display for MispunchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MispunchReason::DuplicateClockIn => write!(f, "duplicate_clock_in"),
            MispunchReason::DuplicateClockOut => write!(f, "duplicate_clock_out"),
        }
    }
}

/// A normalized punch as produced at the ingestion boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Punch {
    pub slot: u32,
    pub direction: PunchDirection,
    pub timestamp: NaiveDateTime,
    pub device_id: String,
    pub source_serial: String,
    pub manual: bool,
    pub test_mode: bool,
}

/// Immutable attendance fact, persisted once per physical punch or manual
/// correction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub slot: u32,
    pub timestamp: NaiveDateTime,
    pub direction: PunchDirection,
    pub device_id: String,
    pub source_serial: String,
    pub manual: bool,
    pub test_mode: bool,
    /// Present when the duplicate guard rejected the punch. Flagged events
    /// are retained for audit and excluded from hour calculations.
    pub mispunch: Option<MispunchReason>,
}

impl AttendanceEvent {
    /// Event for a punch the guard admitted.
    pub fn accepted(punch: Punch) -> Self {
        Self::from_punch(punch, None)
    }

    /// Flagged event for a punch the guard rejected.
    pub fn rejected(punch: Punch, reason: MispunchReason) -> Self {
        Self::from_punch(punch, Some(reason))
    }

    fn from_punch(punch: Punch, mispunch: Option<MispunchReason>) -> Self {
        Self {
            slot: punch.slot,
            timestamp: punch.timestamp,
            direction: punch.direction,
            device_id: punch.device_id,
            source_serial: punch.source_serial,
            manual: punch.manual,
            test_mode: punch.test_mode,
            mispunch,
        }
    }

    /// Calendar day the event belongs to.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Whether the event counts toward hour calculations.
    pub fn is_valid(&self) -> bool {
        self.mispunch.is_none()
    }
}

/// Per-weekday pay multipliers indexed Monday..Sunday.
pub type WeekdayMultipliers = [f64; 7];

/// Standard multipliers: flat weekdays, 1.25x Saturday, 1.5x Sunday.
pub fn default_multipliers() -> WeekdayMultipliers {
    [1.0, 1.0, 1.0, 1.0, 1.0, 1.25, 1.5]
}

/// An employee slot within a business.
///
/// Slots are never hard-deleted while they hold history; departed
/// employees are soft-deactivated instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub slot: u32,
    pub name: String,
    pub pay_rate: f64,
    pub multipliers: WeekdayMultipliers,
    pub shift_id: Option<String>,
    pub active: bool,
}

impl Employee {
    pub fn new(slot: u32, name: impl Into<String>, pay_rate: f64) -> Self {
        Self {
            slot,
            name: name.into(),
            pay_rate,
            multipliers: default_multipliers(),
            shift_id: None,
            active: true,
        }
    }

    /// Pay multiplier applying to the given weekday.
    pub fn multiplier_for(&self, weekday: Weekday) -> f64 {
        self.multipliers[weekday.num_days_from_monday() as usize]
    }

    /// True while the slot still carries the unconfigured provisioning
    /// name ("Employee 1", "Employee 2", ...).
    pub fn is_placeholder(&self) -> bool {
        match self.name.strip_prefix("Employee ") {
            Some(rest) => !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()),
            None => false,
        }
    }
}

/// Raw schedule for one weekday as stored: `HH:MM` strings and break
/// minutes. Times are validated at resolution, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub start: String,
    pub end: String,
    pub break_minutes: u32,
}

impl DaySchedule {
    pub fn new(start: impl Into<String>, end: impl Into<String>, break_minutes: u32) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            break_minutes,
        }
    }
}

/// Shift validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShiftValidationError {
    #[error("shift has no enabled days")]
    NoDaysEnabled,

    #[error("invalid time {value:?} on {weekday}")]
    BadTime { weekday: Weekday, value: String },

    #[error("break does not fit inside the day span on {weekday}")]
    BreakTooLong { weekday: Weekday },
}

/// A named weekly template: one optional day schedule per weekday,
/// indexed Monday..Sunday. A `None` entry means the weekday is disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub name: String,
    pub days: [Option<DaySchedule>; 7],
    pub is_default: bool,
    pub active: bool,
}

impl Shift {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            days: Default::default(),
            is_default: false,
            active: true,
        }
    }

    /// Schedule for the given weekday, if enabled.
    pub fn day(&self, weekday: Weekday) -> Option<&DaySchedule> {
        self.days[weekday.num_days_from_monday() as usize].as_ref()
    }

    pub fn set_day(&mut self, weekday: Weekday, schedule: DaySchedule) -> &mut Self {
        self.days[weekday.num_days_from_monday() as usize] = Some(schedule);
        self
    }

    /// Enforce the template invariants: at least one enabled day, valid
    /// 24-hour times, and a break strictly shorter than the day span.
    pub fn validate(&self) -> Result<(), ShiftValidationError> {
        let mut any_enabled = false;
        for (index, day) in self.days.iter().enumerate() {
            let Some(day) = day else { continue };
            any_enabled = true;
            let weekday = weekday_from_index(index);
            let start = parse_hhmm(&day.start).ok_or_else(|| ShiftValidationError::BadTime {
                weekday,
                value: day.start.clone(),
            })?;
            let end = parse_hhmm(&day.end).ok_or_else(|| ShiftValidationError::BadTime {
                weekday,
                value: day.end.clone(),
            })?;
            let mut span = end.signed_duration_since(start).num_minutes();
            if span < 0 {
                span += 24 * 60;
            }
            if i64::from(day.break_minutes) >= span {
                return Err(ShiftValidationError::BreakTooLong { weekday });
            }
        }
        if !any_enabled {
            return Err(ShiftValidationError::NoDaysEnabled);
        }
        Ok(())
    }
}

/// Business-wide fallback schedules, one optional entry per weekday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessDefaults {
    pub days: [Option<DaySchedule>; 7],
}

impl BusinessDefaults {
    pub fn day(&self, weekday: Weekday) -> Option<&DaySchedule> {
        self.days[weekday.num_days_from_monday() as usize].as_ref()
    }

    pub fn set_day(&mut self, weekday: Weekday, schedule: DaySchedule) -> &mut Self {
        self.days[weekday.num_days_from_monday() as usize] = Some(schedule);
        self
    }
}

impl Default for BusinessDefaults {
    /// Mon-Fri 08:30-17:30 with a one-hour break, Saturday 08:30-14:30
    /// with a one-hour break, Sunday off.
    fn default() -> Self {
        let weekday = DaySchedule::new("08:30", "17:30", 60);
        let saturday = DaySchedule::new("08:30", "14:30", 60);
        Self {
            days: [
                Some(weekday.clone()),
                Some(weekday.clone()),
                Some(weekday.clone()),
                Some(weekday.clone()),
                Some(weekday),
                Some(saturday),
                None,
            ],
        }
    }
}

/// Strict 24-hour `HH:MM` parsing shared by validation and resolution.
pub(crate) fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

pub(crate) fn weekday_from_index(index: usize) -> Weekday {
    match index {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

/// Calendar month reference used to key assessments and recompute jobs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MonthRef {
    pub year: i32,
    pub month: u32,
}

impl MonthRef {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Month containing the given date.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("valid month")
    }

    /// Every calendar day of the month, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let month = *self;
        self.first_day()
            .iter_days()
            .take_while(move |day| MonthRef::of(*day) == month)
    }
}

impl fmt::Display for MonthRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Payable hours bucketed by pay multiplier.
///
/// Keys are the multiplier scaled by 100 (150 = 1.5x) so buckets stay
/// ordered and income per tier never re-derives the weekday from a date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiplierBuckets(BTreeMap<u32, f64>);

impl MultiplierBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate payable hours under the given multiplier.
    pub fn add(&mut self, multiplier: f64, hours: f64) {
        if hours <= 0.0 {
            return;
        }
        let key = (multiplier * 100.0).round() as u32;
        *self.0.entry(key).or_insert(0.0) += hours;
    }

    pub fn total_hours(&self) -> f64 {
        self.0.values().sum()
    }

    /// Income due across all tiers at the given base rate.
    pub fn income(&self, pay_rate: f64) -> f64 {
        self.0
            .iter()
            .map(|(key, hours)| hours * pay_rate * (f64::from(*key) / 100.0))
            .sum()
    }

    /// Hours recorded under the given multiplier, zero when absent.
    pub fn hours_at(&self, multiplier: f64) -> f64 {
        let key = (multiplier * 100.0).round() as u32;
        self.0.get(&key).copied().unwrap_or(0.0)
    }
}

/// A shortfall above this many hours is classified `Critical`.
pub const CRITICAL_SHORTFALL_HOURS: f64 = 40.0;

/// Shortfall classification for one employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssessmentStatus {
    Critical,
    Behind,
    #[serde(rename = "On Track")]
    OnTrack,
}

impl AssessmentStatus {
    pub fn classify(hours_short: f64) -> Self {
        if hours_short > CRITICAL_SHORTFALL_HOURS {
            AssessmentStatus::Critical
        } else if hours_short > 0.0 {
            AssessmentStatus::Behind
        } else {
            AssessmentStatus::OnTrack
        }
    }
}

impl fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssessmentStatus::Critical => write!(f, "Critical"),
            AssessmentStatus::Behind => write!(f, "Behind"),
            AssessmentStatus::OnTrack => write!(f, "On Track"),
        }
    }
}

/// Assessment row for a single employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeAssessment {
    pub slot: u32,
    pub name: String,
    pub current_hours: f64,
    pub required_hours: f64,
    pub past_due_hours: f64,
    pub hours_short: f64,
    pub current_income_due: f64,
    pub potential_income: f64,
    pub days_worked: u32,
    pub hours_by_multiplier: MultiplierBuckets,
    pub status: AssessmentStatus,
}

/// Business-wide totals for a monthly assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSummary {
    pub total_employees: u32,
    pub total_hours_worked: f64,
    pub total_hours_short: f64,
    pub total_income_due: f64,
    pub total_potential_income: f64,
}

/// Derived monthly snapshot keyed by (business, month).
///
/// Fully recomputable from events, employees and shifts; a cache, never a
/// source of truth, and always replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAssessment {
    pub business_id: String,
    pub month: MonthRef,
    pub per_employee: Vec<EmployeeAssessment>,
    pub summary: AssessmentSummary,
    pub last_updated: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_multipliers_scale_weekends() {
        let employee = Employee::new(1, "Dana Reyes", 100.0);
        assert_eq!(employee.multiplier_for(Weekday::Wed), 1.0);
        assert_eq!(employee.multiplier_for(Weekday::Sat), 1.25);
        assert_eq!(employee.multiplier_for(Weekday::Sun), 1.5);
    }

    #[test]
    fn placeholder_names_are_detected() {
        assert!(Employee::new(3, "Employee 3", 0.0).is_placeholder());
        assert!(Employee::new(12, "Employee 12", 0.0).is_placeholder());
        assert!(!Employee::new(1, "Employee", 0.0).is_placeholder());
        assert!(!Employee::new(1, "Employee 3b", 0.0).is_placeholder());
        assert!(!Employee::new(1, "Dana Reyes", 0.0).is_placeholder());
    }

    #[test]
    fn shift_validation_accepts_overnight_days() {
        let mut shift = Shift::new("night", "Night crew");
        shift.set_day(Weekday::Mon, DaySchedule::new("22:00", "06:00", 30));
        assert!(shift.validate().is_ok());
    }

    #[test]
    fn shift_validation_rejects_empty_template() {
        let shift = Shift::new("empty", "Empty");
        assert_eq!(shift.validate(), Err(ShiftValidationError::NoDaysEnabled));
    }

    #[test]
    fn shift_validation_rejects_bad_time() {
        let mut shift = Shift::new("typo", "Typo");
        shift.set_day(Weekday::Tue, DaySchedule::new("8h30", "17:30", 60));
        assert!(matches!(
            shift.validate(),
            Err(ShiftValidationError::BadTime { .. })
        ));
    }

    #[test]
    fn shift_validation_rejects_break_swallowing_the_day() {
        let mut shift = Shift::new("short", "Short");
        shift.set_day(Weekday::Wed, DaySchedule::new("09:00", "10:00", 60));
        assert_eq!(
            shift.validate(),
            Err(ShiftValidationError::BreakTooLong {
                weekday: Weekday::Wed
            })
        );
    }

    #[test]
    fn month_ref_iterates_every_day() {
        let june = MonthRef::new(2026, 6);
        let days: Vec<_> = june.days().collect();
        assert_eq!(days.len(), 30);
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2026, 6, 1).unwrap());
        assert_eq!(days[29], NaiveDate::from_ymd_opt(2026, 6, 30).unwrap());

        let february = MonthRef::new(2024, 2);
        assert_eq!(february.days().count(), 29);
    }

    #[test]
    fn buckets_accumulate_per_tier() {
        let mut buckets = MultiplierBuckets::new();
        buckets.add(1.0, 8.0);
        buckets.add(1.0, 8.0);
        buckets.add(1.25, 5.0);
        buckets.add(1.5, 0.0); // ignored

        assert!((buckets.total_hours() - 21.0).abs() < 1e-9);
        assert!((buckets.hours_at(1.0) - 16.0).abs() < 1e-9);
        // 16h * 100 + 5h * 100 * 1.25
        assert!((buckets.income(100.0) - 2225.0).abs() < 1e-9);
    }

    #[test]
    fn status_classification_thresholds() {
        assert_eq!(AssessmentStatus::classify(0.0), AssessmentStatus::OnTrack);
        assert_eq!(AssessmentStatus::classify(0.5), AssessmentStatus::Behind);
        assert_eq!(AssessmentStatus::classify(40.0), AssessmentStatus::Behind);
        assert_eq!(AssessmentStatus::classify(40.1), AssessmentStatus::Critical);
    }

    #[test]
    fn status_serializes_with_spaces() {
        let json = serde_json::to_string(&AssessmentStatus::OnTrack).unwrap();
        assert_eq!(json, "\"On Track\"");
    }
}
