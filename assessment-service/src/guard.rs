//! Duplicate-punch guard
//!
//! Two-state clock machine per employee. A punch is admitted only when it
//! matches the expected transition; anything else is a mispunch. This is
//! the sole gate against double-counted hours from a device retrying an
//! unacknowledged punch.

use std::fmt;

use chrono::NaiveDateTime;
use error::ErrorResponse;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{MispunchReason, PunchDirection};

/// Clock status for one employee. An employee with no prior record
/// starts `Out`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockState {
    In,
    #[default]
    Out,
}

impl fmt::Display for ClockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockState::In => write!(f, "in"),
            ClockState::Out => write!(f, "out"),
        }
    }
}

/// Per-employee record consulted before admitting a punch. Updated
/// exactly once per accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmployeeClockRecord {
    pub status: ClockState,
    pub last_punch: NaiveDateTime,
}

/// Transition table for the clock state machine.
///
/// `in` is admitted only from `Out`, `out` only from `In`.
pub fn transition(
    state: ClockState,
    direction: PunchDirection,
) -> Result<ClockState, MispunchReason> {
    match (state, direction) {
        (ClockState::Out, PunchDirection::In) => Ok(ClockState::In),
        (ClockState::In, PunchDirection::Out) => Ok(ClockState::Out),
        (ClockState::In, PunchDirection::In) => Err(MispunchReason::DuplicateClockIn),
        (ClockState::Out, PunchDirection::Out) => Err(MispunchReason::DuplicateClockOut),
    }
}

/// Rejection of a punch, named for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("punch rejected for slot {slot}: {reason}, employee is already clocked {prior}")]
pub struct MispunchError {
    pub slot: u32,
    pub prior: ClockState,
    pub reason: MispunchReason,
}

impl From<&MispunchError> for ErrorResponse {
    fn from(err: &MispunchError) -> Self {
        let code = match err.reason {
            MispunchReason::DuplicateClockIn => "DUPLICATE_CLOCK_IN",
            MispunchReason::DuplicateClockOut => "DUPLICATE_CLOCK_OUT",
        };
        ErrorResponse::new(code, err.to_string())
    }
}

/// Failures while applying a punch against the keyed clock-state store.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error(transparent)]
    Mispunch(#[from] MispunchError),

    #[error("clock state store error: {0}")]
    Store(String),
}
