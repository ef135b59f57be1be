//! Punch router
//!
//! Routes device payloads into the engine: directory lookup, boundary
//! normalization, guard admission, and the follow-up recompute request.
//! The punch is the primary business fact; recompute scheduling can never
//! fail the acknowledgment.

use std::sync::Arc;

use assessment_service::models::MonthRef;
use assessment_service::{AssessContext, AttendanceService, PunchDirection, ServiceError};
use error::{AppError, ErrorResponse};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::IngestConfig;
use crate::normalize::{DeviceDirectory, DevicePayload};
use crate::recompute::{RecomputeKey, RecomputeQueue};

/// Acknowledgment returned to the webhook collaborator for an admitted
/// punch.
#[derive(Debug, Clone, Serialize)]
pub struct PunchAck {
    pub business_id: String,
    pub slot: u32,
    pub direction: PunchDirection,
    /// Recompute job scheduled by this punch, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recompute_job: Option<String>,
}

/// Router that manages the punch ingestion path.
pub struct PunchRouter {
    directory: Arc<dyn DeviceDirectory>,
    service: Arc<AttendanceService>,
    queue: Arc<RwLock<RecomputeQueue>>,
    config: IngestConfig,
}

impl PunchRouter {
    pub fn new(
        directory: Arc<dyn DeviceDirectory>,
        service: Arc<AttendanceService>,
        queue: Arc<RwLock<RecomputeQueue>>,
        config: IngestConfig,
    ) -> Self {
        Self {
            directory,
            service,
            queue,
            config,
        }
    }

    /// Handle one device payload end to end.
    ///
    /// A rejected punch surfaces as an [`ErrorResponse`] naming the
    /// mispunch; the flagged audit event is already on record by then. An
    /// accepted clock-out additionally enqueues a coalesced recompute for
    /// the punch's month.
    pub async fn handle_punch(&self, payload: &DevicePayload) -> Result<PunchAck, ErrorResponse> {
        let business_id = self
            .directory
            .business_for(&payload.serial)
            .await
            .ok_or_else(|| {
                ErrorResponse::from(AppError::NotFound(format!(
                    "device serial {}",
                    payload.serial
                )))
            })?;

        let punch = payload
            .normalize()
            .map_err(|e| ErrorResponse::from(AppError::Validation(e.to_string())))?;
        let slot = punch.slot;
        let direction = punch.direction;
        let month = MonthRef::of(punch.timestamp.date());

        match self.service.record_punch(&business_id, punch).await {
            Ok(_event) => {
                let recompute_job = if direction == PunchDirection::Out {
                    Some(self.schedule_recompute(&business_id, month).await)
                } else {
                    None
                };
                Ok(PunchAck {
                    business_id,
                    slot,
                    direction,
                    recompute_job,
                })
            }
            Err(ServiceError::Mispunch(mispunch)) => Err(ErrorResponse::from(&mispunch)),
            Err(ServiceError::UnknownEmployee { business_id, slot }) => {
                Err(ErrorResponse::from(AppError::NotFound(format!(
                    "employee slot {slot} in business {business_id}"
                ))))
            }
            Err(other) => Err(ErrorResponse::from(AppError::Internal(other.to_string()))),
        }
    }

    /// Run a synchronous administrative recompute.
    pub async fn admin_recompute(
        &self,
        business_id: &str,
        month: MonthRef,
        required_hours_override: Option<f64>,
    ) -> error::Result<assessment_service::MonthlyAssessment> {
        let now = chrono::Local::now().naive_local();
        let mut ctx = AssessContext::new(month, now);
        ctx.required_hours_override = required_hours_override;
        self.service
            .assess(business_id, ctx)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    async fn schedule_recompute(&self, business_id: &str, month: MonthRef) -> String {
        let key = RecomputeKey {
            business_id: business_id.to_string(),
            month,
        };
        let job_id = self
            .queue
            .write()
            .await
            .enqueue(key, self.config.debounce());
        tracing::debug!(business_id, %month, job_id = %job_id, "recompute queued");
        job_id
    }
}
