//! Storage interfaces
//!
//! Abstract seams to the document store and the assessment cache, plus an
//! in-memory implementation for testing and development. The concrete
//! store behind these traits is a collaborator, not part of the engine.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::guard::{transition, ClockState, EmployeeClockRecord, GuardError, MispunchError};
use crate::models::{
    AttendanceEvent, BusinessDefaults, Employee, MonthRef, MonthlyAssessment, PunchDirection,
    Shift,
};

/// Read access to employees, shifts and business defaults.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn get_employee(&self, business_id: &str, slot: u32) -> Result<Option<Employee>>;

    async fn list_employees(&self, business_id: &str) -> Result<Vec<Employee>>;

    async fn get_shift(&self, business_id: &str, shift_id: &str) -> Result<Option<Shift>>;

    async fn business_defaults(&self, business_id: &str) -> Result<BusinessDefaults>;
}

/// Append-only store of raw attendance events, grouped by employee and
/// calendar day. Events are written once and never mutated.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn append_event(&self, business_id: &str, event: AttendanceEvent) -> Result<()>;

    async fn events_for_day(
        &self,
        business_id: &str,
        slot: u32,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceEvent>>;
}

/// Keyed per-employee clock state.
///
/// `apply_punch` performs the read-compare-write as one atomic operation;
/// implementations must consult [`transition`] under that atomicity so a
/// racing duplicate is rejected instead of silently admitted.
#[async_trait]
pub trait ClockStateStore: Send + Sync {
    async fn apply_punch(
        &self,
        business_id: &str,
        slot: u32,
        direction: PunchDirection,
        timestamp: NaiveDateTime,
    ) -> Result<ClockState, GuardError>;

    async fn clock_record(
        &self,
        business_id: &str,
        slot: u32,
    ) -> Result<Option<EmployeeClockRecord>>;
}

/// Cache of assessment snapshots. `write_assessment` is a wholesale
/// atomic replace; a failed write must leave the prior snapshot intact.
#[async_trait]
pub trait AssessmentSink: Send + Sync {
    async fn write_assessment(
        &self,
        business_id: &str,
        month: MonthRef,
        snapshot: MonthlyAssessment,
    ) -> Result<()>;

    async fn latest(&self, business_id: &str, month: MonthRef)
        -> Result<Option<MonthlyAssessment>>;
}

/// In-memory store for testing and development. Implements every seam.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    employees: RwLock<HashMap<(String, u32), Employee>>,
    shifts: RwLock<HashMap<(String, String), Shift>>,
    defaults: RwLock<HashMap<String, BusinessDefaults>>,
    events: RwLock<HashMap<(String, u32, NaiveDate), Vec<AttendanceEvent>>>,
    clock: RwLock<HashMap<(String, u32), EmployeeClockRecord>>,
    assessments: RwLock<HashMap<(String, MonthRef), MonthlyAssessment>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_employee(&self, business_id: &str, employee: Employee) {
        self.employees
            .write()
            .unwrap()
            .insert((business_id.to_string(), employee.slot), employee);
    }

    pub fn upsert_shift(&self, business_id: &str, shift: Shift) {
        self.shifts
            .write()
            .unwrap()
            .insert((business_id.to_string(), shift.id.clone()), shift);
    }

    pub fn set_defaults(&self, business_id: &str, defaults: BusinessDefaults) {
        self.defaults
            .write()
            .unwrap()
            .insert(business_id.to_string(), defaults);
    }
}

#[async_trait]
impl ScheduleStore for InMemoryStore {
    async fn get_employee(&self, business_id: &str, slot: u32) -> Result<Option<Employee>> {
        let employees = self.employees.read().unwrap();
        Ok(employees.get(&(business_id.to_string(), slot)).cloned())
    }

    async fn list_employees(&self, business_id: &str) -> Result<Vec<Employee>> {
        let employees = self.employees.read().unwrap();
        let mut list: Vec<Employee> = employees
            .iter()
            .filter(|((business, _), _)| business == business_id)
            .map(|(_, employee)| employee.clone())
            .collect();
        list.sort_by_key(|employee| employee.slot);
        Ok(list)
    }

    async fn get_shift(&self, business_id: &str, shift_id: &str) -> Result<Option<Shift>> {
        let shifts = self.shifts.read().unwrap();
        Ok(shifts
            .get(&(business_id.to_string(), shift_id.to_string()))
            .cloned())
    }

    async fn business_defaults(&self, business_id: &str) -> Result<BusinessDefaults> {
        if let Some(defaults) = self.defaults.read().unwrap().get(business_id) {
            return Ok(defaults.clone());
        }
        // A shift flagged as the business default doubles as the fallback
        // template when no explicit defaults are configured.
        let shifts = self.shifts.read().unwrap();
        let default_shift = shifts
            .iter()
            .filter(|((business, _), shift)| {
                business == business_id && shift.is_default && shift.active
            })
            .min_by(|(a, _), (b, _)| a.1.cmp(&b.1))
            .map(|(_, shift)| shift);
        if let Some(shift) = default_shift {
            return Ok(BusinessDefaults {
                days: shift.days.clone(),
            });
        }
        Ok(BusinessDefaults::default())
    }
}

#[async_trait]
impl AttendanceStore for InMemoryStore {
    async fn append_event(&self, business_id: &str, event: AttendanceEvent) -> Result<()> {
        let mut events = self.events.write().unwrap();
        events
            .entry((business_id.to_string(), event.slot, event.date()))
            .or_default()
            .push(event);
        Ok(())
    }

    async fn events_for_day(
        &self,
        business_id: &str,
        slot: u32,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceEvent>> {
        let events = self.events.read().unwrap();
        Ok(events
            .get(&(business_id.to_string(), slot, date))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ClockStateStore for InMemoryStore {
    async fn apply_punch(
        &self,
        business_id: &str,
        slot: u32,
        direction: PunchDirection,
        timestamp: NaiveDateTime,
    ) -> Result<ClockState, GuardError> {
        // Single lock scope: read, compare, write.
        let mut clock = self.clock.write().unwrap();
        let key = (business_id.to_string(), slot);
        let prior = clock.get(&key).map(|record| record.status).unwrap_or_default();
        match transition(prior, direction) {
            Ok(next) => {
                clock.insert(
                    key,
                    EmployeeClockRecord {
                        status: next,
                        last_punch: timestamp,
                    },
                );
                Ok(next)
            }
            Err(reason) => Err(MispunchError {
                slot,
                prior,
                reason,
            }
            .into()),
        }
    }

    async fn clock_record(
        &self,
        business_id: &str,
        slot: u32,
    ) -> Result<Option<EmployeeClockRecord>> {
        let clock = self.clock.read().unwrap();
        Ok(clock.get(&(business_id.to_string(), slot)).copied())
    }
}

#[async_trait]
impl AssessmentSink for InMemoryStore {
    async fn write_assessment(
        &self,
        business_id: &str,
        month: MonthRef,
        snapshot: MonthlyAssessment,
    ) -> Result<()> {
        let mut assessments = self.assessments.write().unwrap();
        assessments.insert((business_id.to_string(), month), snapshot);
        Ok(())
    }

    async fn latest(
        &self,
        business_id: &str,
        month: MonthRef,
    ) -> Result<Option<MonthlyAssessment>> {
        let assessments = self.assessments.read().unwrap();
        Ok(assessments.get(&(business_id.to_string(), month)).cloned())
    }
}
