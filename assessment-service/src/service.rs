//! Attendance service
//!
//! Facade over the stores: admits punches through the duplicate guard and
//! runs monthly assessments.

use std::sync::Arc;

use thiserror::Error;

use crate::assess::{AssessContext, Assessor};
use crate::guard::{GuardError, MispunchError};
use crate::models::{AttendanceEvent, MonthRef, MonthlyAssessment, Punch};
use crate::store::{
    AssessmentSink, AttendanceStore, ClockStateStore, InMemoryStore, ScheduleStore,
};

/// Service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unknown employee slot {slot} for business {business_id}")]
    UnknownEmployee { business_id: String, slot: u32 },

    #[error(transparent)]
    Mispunch(#[from] MispunchError),

    #[error("store error: {0}")]
    Store(String),

    #[error("assessment failed: {0}")]
    Assessment(String),
}

/// Attendance service for punch admission and assessment runs.
pub struct AttendanceService {
    schedules: Arc<dyn ScheduleStore>,
    events: Arc<dyn AttendanceStore>,
    clock: Arc<dyn ClockStateStore>,
    assessor: Assessor,
}

impl AttendanceService {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        events: Arc<dyn AttendanceStore>,
        clock: Arc<dyn ClockStateStore>,
        sink: Arc<dyn AssessmentSink>,
    ) -> Self {
        let assessor = Assessor::new(Arc::clone(&schedules), Arc::clone(&events), sink);
        Self {
            schedules,
            events,
            clock,
            assessor,
        }
    }

    /// Wire every seam to one in-memory store, for tests and development.
    pub fn with_store(store: Arc<InMemoryStore>) -> Self {
        Self::new(store.clone(), store.clone(), store.clone(), store)
    }

    /// Admit one punch through the duplicate guard.
    ///
    /// An admitted punch is persisted as a valid event. A rejected punch
    /// is persisted as a flagged mispunch for audit and the rejection is
    /// returned to the caller, naming the slot and its prior state.
    pub async fn record_punch(
        &self,
        business_id: &str,
        punch: Punch,
    ) -> Result<AttendanceEvent, ServiceError> {
        let employee = self
            .schedules
            .get_employee(business_id, punch.slot)
            .await
            .map_err(|e| ServiceError::Store(e.to_string()))?;
        if employee.is_none() {
            return Err(ServiceError::UnknownEmployee {
                business_id: business_id.to_string(),
                slot: punch.slot,
            });
        }

        match self
            .clock
            .apply_punch(business_id, punch.slot, punch.direction, punch.timestamp)
            .await
        {
            Ok(state) => {
                let event = AttendanceEvent::accepted(punch);
                self.events
                    .append_event(business_id, event.clone())
                    .await
                    .map_err(|e| ServiceError::Store(e.to_string()))?;
                tracing::debug!(
                    business_id,
                    slot = event.slot,
                    direction = %event.direction,
                    %state,
                    "punch admitted"
                );
                Ok(event)
            }
            Err(GuardError::Mispunch(mispunch)) => {
                // Retained for audit, then failed loudly to the caller.
                let event = AttendanceEvent::rejected(punch, mispunch.reason);
                self.events
                    .append_event(business_id, event)
                    .await
                    .map_err(|e| ServiceError::Store(e.to_string()))?;
                tracing::warn!(
                    business_id,
                    slot = mispunch.slot,
                    prior = %mispunch.prior,
                    reason = %mispunch.reason,
                    "mispunch recorded"
                );
                Err(ServiceError::Mispunch(mispunch))
            }
            Err(GuardError::Store(message)) => Err(ServiceError::Store(message)),
        }
    }

    /// Run a full assessment for the business and month in `ctx`,
    /// replacing the cached snapshot.
    pub async fn assess(
        &self,
        business_id: &str,
        ctx: AssessContext,
    ) -> Result<MonthlyAssessment, ServiceError> {
        self.assessor
            .assess(business_id, ctx)
            .await
            .map_err(|e| ServiceError::Assessment(e.to_string()))
    }

    /// Assess the month containing the current wall clock.
    pub async fn assess_current_month(
        &self,
        business_id: &str,
    ) -> Result<MonthlyAssessment, ServiceError> {
        let now = chrono::Local::now().naive_local();
        let ctx = AssessContext::new(MonthRef::of(now.date()), now);
        self.assess(business_id, ctx).await
    }
}
