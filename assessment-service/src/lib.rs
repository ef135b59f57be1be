//! Assessment Service
//!
//! Attendance reconciliation and assessment engine: duplicate-punch
//! guarding, schedule resolution, daily hour reconciliation, and monthly
//! assessment aggregation over abstract storage seams.

pub mod assess;
pub mod daily;
pub mod guard;
pub mod models;
pub mod projection;
pub mod schedule;
pub mod service;
pub mod store;

pub use assess::{AssessContext, Assessor};
pub use guard::{ClockState, MispunchError};
pub use models::{
    AttendanceEvent, Employee, MonthRef, MonthlyAssessment, Punch, PunchDirection, Shift,
};
pub use service::{AttendanceService, ServiceError};
pub use store::{AssessmentSink, AttendanceStore, ClockStateStore, InMemoryStore, ScheduleStore};
