//! Monthly assessment aggregation
//!
//! Fans out one independent computation per employee slot, joins the
//! results, and replaces the business's cached snapshot wholesale. A run
//! either completes and the cache is replaced, or it fails and the prior
//! snapshot stays authoritative.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDateTime};
use tokio::task::JoinSet;

use crate::daily::{compute_day, DayOutcome};
use crate::models::{
    AssessmentStatus, AssessmentSummary, Employee, EmployeeAssessment, MonthRef,
    MonthlyAssessment, MultiplierBuckets,
};
use crate::projection;
use crate::schedule::ScheduleResolver;
use crate::store::{AssessmentSink, AttendanceStore, ScheduleStore};

/// Inputs that parameterize one assessment run.
///
/// `now` is injected by the caller, so a run is a pure function of stored
/// data and this context: re-running with unchanged inputs yields an
/// identical snapshot.
#[derive(Debug, Clone, Copy)]
pub struct AssessContext {
    pub month: MonthRef,
    pub now: NaiveDateTime,
    /// Administrative override replacing each employee's projected
    /// required hours for this run.
    pub required_hours_override: Option<f64>,
}

impl AssessContext {
    pub fn new(month: MonthRef, now: NaiveDateTime) -> Self {
        Self {
            month,
            now,
            required_hours_override: None,
        }
    }

    pub fn with_required_hours(mut self, required_hours: f64) -> Self {
        self.required_hours_override = Some(required_hours);
        self
    }
}

/// Aggregates per-employee assessments into a business-wide snapshot.
pub struct Assessor {
    schedules: Arc<dyn ScheduleStore>,
    events: Arc<dyn AttendanceStore>,
    sink: Arc<dyn AssessmentSink>,
}

impl Assessor {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        events: Arc<dyn AttendanceStore>,
        sink: Arc<dyn AssessmentSink>,
    ) -> Self {
        Self {
            schedules,
            events,
            sink,
        }
    }

    /// Assess every employee slot of the business for the context month
    /// and replace the cached snapshot.
    ///
    /// Employees are computed independently and joined; one employee's
    /// failure is logged and that slot skipped, never fatal to the run.
    /// A failed snapshot write is fatal and leaves the prior one intact.
    pub async fn assess(&self, business_id: &str, ctx: AssessContext) -> Result<MonthlyAssessment> {
        let employees = self
            .schedules
            .list_employees(business_id)
            .await
            .context("listing employees")?;

        let mut tasks = JoinSet::new();
        for employee in employees {
            let schedules = Arc::clone(&self.schedules);
            let events = Arc::clone(&self.events);
            let business = business_id.to_string();
            tasks.spawn(async move {
                let slot = employee.slot;
                let result = assess_employee(schedules, events, &business, employee, ctx).await;
                (slot, result)
            });
        }

        let mut rows = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (slot, result) = match joined {
                Ok(pair) => pair,
                Err(join_error) => {
                    tracing::error!(error = %join_error, business_id, "assessment task panicked");
                    continue;
                }
            };
            match result {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => {} // no events this month, or an unassigned slot
                Err(error) => {
                    tracing::error!(
                        error = %error,
                        business_id,
                        slot,
                        "employee assessment failed, skipping slot"
                    );
                }
            }
        }

        // Completion order is arbitrary; ordering is imposed here.
        rows.sort_by_key(|row| row.slot);

        let mut summary = AssessmentSummary::default();
        for row in &rows {
            summary.total_employees += 1;
            summary.total_hours_worked += row.current_hours;
            summary.total_hours_short += row.hours_short;
            summary.total_income_due += row.current_income_due;
            summary.total_potential_income += row.potential_income;
        }

        let snapshot = MonthlyAssessment {
            business_id: business_id.to_string(),
            month: ctx.month,
            per_employee: rows,
            summary,
            last_updated: ctx.now,
        };

        self.sink
            .write_assessment(business_id, ctx.month, snapshot.clone())
            .await
            .context("writing assessment snapshot")?;

        tracing::info!(
            business_id,
            month = %ctx.month,
            employees = snapshot.summary.total_employees,
            "assessment snapshot replaced"
        );

        Ok(snapshot)
    }
}

async fn assess_employee(
    schedules: Arc<dyn ScheduleStore>,
    events: Arc<dyn AttendanceStore>,
    business_id: &str,
    employee: Employee,
    ctx: AssessContext,
) -> Result<Option<EmployeeAssessment>> {
    // An unassigned slot must not show up as a critically-behind employee.
    if employee.is_placeholder() {
        return Ok(None);
    }

    let shift = match &employee.shift_id {
        Some(shift_id) => schedules
            .get_shift(business_id, shift_id)
            .await
            .with_context(|| format!("loading shift {shift_id}"))?,
        None => None,
    };
    let defaults = schedules
        .business_defaults(business_id)
        .await
        .context("loading business defaults")?;
    let resolver = ScheduleResolver::new(shift.as_ref(), &defaults);

    let mut buckets = MultiplierBuckets::new();
    let mut current_hours = 0.0;
    let mut days_worked = 0u32;
    let mut any_events = false;

    for day in ctx.month.days() {
        let day_events = events
            .events_for_day(business_id, employee.slot, day)
            .await
            .with_context(|| format!("loading events for {day}"))?;
        if day_events.is_empty() {
            continue;
        }
        any_events = true;

        match compute_day(&day_events, &resolver.resolve(day)) {
            DayOutcome::Worked { payable_hours, .. } => {
                days_worked += 1;
                current_hours += payable_hours;
                buckets.add(employee.multiplier_for(day.weekday()), payable_hours);
            }
            DayOutcome::NotWorked => {}
        }
    }

    // Zero attendance for the month: skipped, not zero-filled.
    if !any_events {
        return Ok(None);
    }

    let required_buckets =
        projection::project_month_buckets(&resolver, ctx.month, &employee.multipliers);
    let required_hours = ctx
        .required_hours_override
        .unwrap_or_else(|| required_buckets.total_hours());
    let potential_income = match ctx.required_hours_override {
        Some(hours) => hours * employee.pay_rate,
        None => required_buckets.income(employee.pay_rate),
    };

    let past_due_hours = projection::project_past_due(&resolver, ctx.month, ctx.now);
    let hours_short = (past_due_hours - current_hours).max(0.0);
    let current_income_due = buckets.income(employee.pay_rate);
    let status = AssessmentStatus::classify(hours_short);

    Ok(Some(EmployeeAssessment {
        slot: employee.slot,
        name: employee.name,
        current_hours,
        required_hours,
        past_due_hours,
        hours_short,
        current_income_due,
        potential_income,
        days_worked,
        hours_by_multiplier: buckets,
        status,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AttendanceEvent, BusinessDefaults, Punch, PunchDirection, Shift,
    };
    use crate::store::InMemoryStore;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::{Datelike, NaiveDate, Weekday};

    fn punch(slot: u32, day: u32, hour: u32, minute: u32, direction: PunchDirection) -> Punch {
        Punch {
            slot,
            direction,
            timestamp: NaiveDate::from_ymd_opt(2026, 6, day)
                .unwrap()
                .and_hms_opt(hour, minute, 0)
                .unwrap(),
            device_id: "dev-1".to_string(),
            source_serial: "SN100".to_string(),
            manual: false,
            test_mode: false,
        }
    }

    async fn seed_full_month(store: &InMemoryStore, slot: u32) {
        // Work every scheduled day of June 2026 exactly to schedule.
        for day in MonthRef::new(2026, 6).days() {
            let (in_event, out_event) = match day.weekday() {
                Weekday::Sun => continue,
                Weekday::Sat => (
                    punch(slot, day.day(), 8, 30, PunchDirection::In),
                    punch(slot, day.day(), 14, 30, PunchDirection::Out),
                ),
                _ => (
                    punch(slot, day.day(), 8, 30, PunchDirection::In),
                    punch(slot, day.day(), 17, 30, PunchDirection::Out),
                ),
            };
            store
                .append_event("biz", AttendanceEvent::accepted(in_event))
                .await
                .unwrap();
            store
                .append_event("biz", AttendanceEvent::accepted(out_event))
                .await
                .unwrap();
        }
    }

    fn end_of_june() -> AssessContext {
        let now = NaiveDate::from_ymd_opt(2026, 6, 30)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        AssessContext::new(MonthRef::new(2026, 6), now)
    }

    fn assessor(store: &Arc<InMemoryStore>) -> Assessor {
        Assessor::new(store.clone(), store.clone(), store.clone())
    }

    #[tokio::test]
    async fn full_month_lands_on_track() {
        let store = Arc::new(InMemoryStore::new());
        store.upsert_employee("biz", Employee::new(1, "Dana Reyes", 100.0));
        seed_full_month(&store, 1).await;

        let snapshot = assessor(&store).assess("biz", end_of_june()).await.unwrap();
        assert_eq!(snapshot.summary.total_employees, 1);

        let row = &snapshot.per_employee[0];
        assert!((row.current_hours - 196.0).abs() < 1e-9);
        assert!((row.required_hours - 196.0).abs() < 1e-9);
        assert!((row.past_due_hours - 196.0).abs() < 1e-9);
        assert_eq!(row.hours_short, 0.0);
        assert_eq!(row.status, AssessmentStatus::OnTrack);
        assert_eq!(row.days_worked, 26);
        // 176h flat + 20h at 1.25x, rate 100
        assert!((row.current_income_due - 20100.0).abs() < 1e-9);
        assert!((row.potential_income - 20100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn zero_event_and_placeholder_slots_are_skipped() {
        let store = Arc::new(InMemoryStore::new());
        store.upsert_employee("biz", Employee::new(1, "Dana Reyes", 100.0));
        store.upsert_employee("biz", Employee::new(2, "Employee 2", 0.0));
        store.upsert_employee("biz", Employee::new(3, "Idle Ivan", 80.0));
        seed_full_month(&store, 1).await;
        // Slot 2 is a placeholder; slot 3 has no events at all.

        let snapshot = assessor(&store).assess("biz", end_of_june()).await.unwrap();
        assert_eq!(snapshot.summary.total_employees, 1);
        assert_eq!(snapshot.per_employee.len(), 1);
        assert_eq!(snapshot.per_employee[0].slot, 1);
    }

    #[tokio::test]
    async fn reassessment_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        store.upsert_employee("biz", Employee::new(1, "Dana Reyes", 100.0));
        store.upsert_employee("biz", Employee::new(2, "Omar Nassif", 90.0));
        seed_full_month(&store, 1).await;
        store
            .append_event(
                "biz",
                AttendanceEvent::accepted(punch(2, 2, 9, 0, PunchDirection::In)),
            )
            .await
            .unwrap();
        store
            .append_event(
                "biz",
                AttendanceEvent::accepted(punch(2, 2, 15, 0, PunchDirection::Out)),
            )
            .await
            .unwrap();

        let assessor = assessor(&store);
        let first = assessor.assess("biz", end_of_june()).await.unwrap();
        let second = assessor.assess("biz", end_of_june()).await.unwrap();
        assert_eq!(first, second);

        let cached = store
            .latest("biz", MonthRef::new(2026, 6))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached, second);
    }

    #[tokio::test]
    async fn behind_employee_is_classified() {
        let store = Arc::new(InMemoryStore::new());
        store.upsert_employee("biz", Employee::new(1, "Dana Reyes", 100.0));
        // One 8h day worked, then nothing for the rest of the month.
        store
            .append_event(
                "biz",
                AttendanceEvent::accepted(punch(1, 1, 8, 30, PunchDirection::In)),
            )
            .await
            .unwrap();
        store
            .append_event(
                "biz",
                AttendanceEvent::accepted(punch(1, 1, 17, 30, PunchDirection::Out)),
            )
            .await
            .unwrap();

        let snapshot = assessor(&store).assess("biz", end_of_june()).await.unwrap();
        let row = &snapshot.per_employee[0];
        assert!((row.hours_short - 188.0).abs() < 1e-9);
        assert_eq!(row.status, AssessmentStatus::Critical);
    }

    #[tokio::test]
    async fn required_hours_override_replaces_projection() {
        let store = Arc::new(InMemoryStore::new());
        store.upsert_employee("biz", Employee::new(1, "Dana Reyes", 100.0));
        seed_full_month(&store, 1).await;

        let ctx = end_of_june().with_required_hours(150.0);
        let snapshot = assessor(&store).assess("biz", ctx).await.unwrap();
        let row = &snapshot.per_employee[0];
        assert!((row.required_hours - 150.0).abs() < 1e-9);
        assert!((row.potential_income - 15000.0).abs() < 1e-9);
        // Past due stays schedule-derived.
        assert!((row.past_due_hours - 196.0).abs() < 1e-9);
    }

    /// Schedule store that fails shift loads for one poisoned employee.
    struct PoisonedShifts {
        inner: Arc<InMemoryStore>,
        poisoned_slot: u32,
    }

    #[async_trait]
    impl ScheduleStore for PoisonedShifts {
        async fn get_employee(&self, business_id: &str, slot: u32) -> Result<Option<Employee>> {
            self.inner.get_employee(business_id, slot).await
        }

        async fn list_employees(&self, business_id: &str) -> Result<Vec<Employee>> {
            self.inner.list_employees(business_id).await
        }

        async fn get_shift(&self, business_id: &str, shift_id: &str) -> Result<Option<Shift>> {
            if shift_id == format!("shift-{}", self.poisoned_slot) {
                return Err(anyhow!("malformed shift document"));
            }
            self.inner.get_shift(business_id, shift_id).await
        }

        async fn business_defaults(&self, business_id: &str) -> Result<BusinessDefaults> {
            self.inner.business_defaults(business_id).await
        }
    }

    #[tokio::test]
    async fn one_bad_employee_never_aborts_the_business() {
        let store = Arc::new(InMemoryStore::new());
        let mut broken = Employee::new(2, "Pat Broken", 100.0);
        broken.shift_id = Some("shift-2".to_string());
        store.upsert_employee("biz", Employee::new(1, "Dana Reyes", 100.0));
        store.upsert_employee("biz", broken);
        seed_full_month(&store, 1).await;
        seed_full_month(&store, 2).await;

        let schedules = Arc::new(PoisonedShifts {
            inner: store.clone(),
            poisoned_slot: 2,
        });
        let assessor = Assessor::new(schedules, store.clone(), store.clone());

        let snapshot = assessor.assess("biz", end_of_june()).await.unwrap();
        // Slot 2's fault is contained; slot 1 is still assessed.
        assert_eq!(snapshot.summary.total_employees, 1);
        assert_eq!(snapshot.per_employee[0].slot, 1);
    }
}
