//! Daily hours calculation
//!
//! Pairs one day's punches chronologically into work periods and applies
//! break deduction and the schedule cap.

use chrono::NaiveDateTime;

use crate::models::{AttendanceEvent, PunchDirection};
use crate::schedule::DayResolution;

/// Result of reconciling one employee-day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DayOutcome {
    /// At least one completed in/out pair.
    Worked { payable_hours: f64, raw_minutes: i64 },
    /// No completed pair. The day is not a working day at all and must
    /// not be counted as a zero-hour one.
    NotWorked,
}

impl DayOutcome {
    pub fn payable_hours(&self) -> f64 {
        match self {
            DayOutcome::Worked { payable_hours, .. } => *payable_hours,
            DayOutcome::NotWorked => 0.0,
        }
    }
}

/// Reconcile one day's events against the resolved schedule.
///
/// Events may arrive in any order; flagged mispunches are ignored. A
/// later `in` supersedes an open one and an `out` with no open `in`
/// contributes nothing, so stray punches degrade pairing gracefully
/// instead of corrupting it.
pub fn compute_day(events: &[AttendanceEvent], resolution: &DayResolution) -> DayOutcome {
    let mut valid: Vec<&AttendanceEvent> = events.iter().filter(|e| e.is_valid()).collect();
    valid.sort_by_key(|e| e.timestamp);

    let mut current_in: Option<NaiveDateTime> = None;
    let mut raw_minutes = 0i64;
    let mut pairs = 0u32;

    for event in valid {
        match event.direction {
            PunchDirection::In => current_in = Some(event.timestamp),
            PunchDirection::Out => {
                if let Some(started) = current_in.take() {
                    raw_minutes += event.timestamp.signed_duration_since(started).num_minutes();
                    pairs += 1;
                }
            }
        }
    }

    if pairs == 0 {
        return DayOutcome::NotWorked;
    }

    let (cap, break_minutes) = match resolution {
        DayResolution::Scheduled(day) => (day.payable_hours(), day.break_minutes),
        DayResolution::Off | DayResolution::Invalid => (0.0, 0),
    };
    // Break time comes out of the worked hours, not on top of the cap.
    let worked = (raw_minutes as f64 / 60.0 - f64::from(break_minutes) / 60.0).max(0.0);

    DayOutcome::Worked {
        payable_hours: worked.min(cap),
        raw_minutes,
    }
}
