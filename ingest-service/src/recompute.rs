//! Coalesced recompute queue
//!
//! Every accepted clock-out asks for a full business recompute. Bursts of
//! punches collapse into one pending job per (business, month); a job
//! only becomes due after its debounce window passes without another
//! request, preserving the compute-then-replace-wholesale property while
//! shedding redundant runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use assessment_service::models::MonthRef;
use assessment_service::{AssessContext, AttendanceService};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::IngestConfig;

/// Job status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Job is queued and waiting out its debounce window
    Queued,
    /// Job is currently running
    Running,
    /// Job completed successfully
    Completed,
    /// Job failed with an error
    Failed,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Queued
    }
}

/// Key identifying the snapshot a job recomputes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecomputeKey {
    pub business_id: String,
    pub month: MonthRef,
}

/// State of a single recompute job.
#[derive(Debug, Clone)]
pub struct RecomputeJob {
    /// Unique job ID
    pub job_id: String,
    /// Snapshot key
    pub key: RecomputeKey,
    /// Current status
    pub status: JobStatus,
    /// Number of requests coalesced into this job
    pub coalesced: u32,
    /// Moment the debounce window elapses
    pub due_at: Instant,
    /// Job creation time
    pub created_at: Instant,
    /// Error message (if failed)
    pub error_message: Option<String>,
}

/// Queue of recompute jobs, keyed for coalescing.
#[derive(Debug, Default)]
pub struct RecomputeQueue {
    /// All jobs (keyed by job_id)
    jobs: HashMap<String, RecomputeJob>,
    /// Pending job per snapshot key (the coalescing index)
    pending: HashMap<RecomputeKey, String>,
}

impl RecomputeQueue {
    /// Create a new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a recompute for `key`, returning the job ID.
    ///
    /// An already-queued job for the same key absorbs the request and its
    /// debounce deadline moves out.
    pub fn enqueue(&mut self, key: RecomputeKey, debounce: Duration) -> String {
        if let Some(job_id) = self.pending.get(&key) {
            if let Some(job) = self.jobs.get_mut(job_id) {
                job.coalesced += 1;
                job.due_at = Instant::now() + debounce;
                return job_id.clone();
            }
        }

        let job_id = Uuid::new_v4().to_string();
        let now = Instant::now();
        self.jobs.insert(
            job_id.clone(),
            RecomputeJob {
                job_id: job_id.clone(),
                key: key.clone(),
                status: JobStatus::Queued,
                coalesced: 1,
                due_at: now + debounce,
                created_at: now,
                error_message: None,
            },
        );
        self.pending.insert(key, job_id.clone());
        job_id
    }

    /// Take every job whose debounce window has elapsed, marking each as
    /// running and removing it from the pending index.
    pub fn take_due(&mut self, now: Instant) -> Vec<RecomputeJob> {
        let jobs = &self.jobs;
        let due_keys: Vec<(RecomputeKey, String)> = self
            .pending
            .iter()
            .filter(|(_, job_id)| {
                jobs.get(*job_id)
                    .map(|job| job.due_at <= now)
                    .unwrap_or(false)
            })
            .map(|(key, job_id)| (key.clone(), job_id.clone()))
            .collect();

        let mut due = Vec::new();
        for (key, job_id) in due_keys {
            self.pending.remove(&key);
            if let Some(job) = self.jobs.get_mut(&job_id) {
                job.status = JobStatus::Running;
                due.push(job.clone());
            }
        }
        due.sort_by_key(|job| job.created_at);
        due
    }

    /// Mark a job as completed
    pub fn mark_completed(&mut self, job_id: &str) {
        if let Some(job) = self.jobs.get_mut(job_id) {
            job.status = JobStatus::Completed;
        }
    }

    /// Mark a job as failed with an error message
    pub fn mark_failed(&mut self, job_id: &str, error: String) {
        if let Some(job) = self.jobs.get_mut(job_id) {
            job.status = JobStatus::Failed;
            job.error_message = Some(error);
        }
    }

    /// Get a job by ID
    pub fn get_job(&self, job_id: &str) -> Option<&RecomputeJob> {
        self.jobs.get(job_id)
    }

    /// Get pending job count
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Remove finished jobs older than the specified duration
    pub fn cleanup_old_jobs(&mut self, max_age: Duration) {
        let now = Instant::now();
        self.jobs.retain(|_, job| match job.status {
            JobStatus::Completed | JobStatus::Failed => {
                now.duration_since(job.created_at) < max_age
            }
            JobStatus::Queued | JobStatus::Running => true,
        });
    }
}

/// Drive the queue against the engine until the task is aborted.
///
/// A failed recompute marks the job failed and is logged; the prior
/// snapshot for that business stays authoritative.
pub async fn run_worker(
    queue: Arc<RwLock<RecomputeQueue>>,
    service: Arc<AttendanceService>,
    config: IngestConfig,
) {
    let mut tick = tokio::time::interval(config.worker_tick());
    loop {
        tick.tick().await;

        let due = queue.write().await.take_due(Instant::now());
        for job in due {
            let now = chrono::Local::now().naive_local();
            let ctx = AssessContext::new(job.key.month, now);
            match service.assess(&job.key.business_id, ctx).await {
                Ok(snapshot) => {
                    tracing::info!(
                        job_id = %job.job_id,
                        business_id = %job.key.business_id,
                        month = %job.key.month,
                        employees = snapshot.summary.total_employees,
                        coalesced = job.coalesced,
                        "recompute completed"
                    );
                    queue.write().await.mark_completed(&job.job_id);
                }
                Err(error) => {
                    tracing::error!(
                        job_id = %job.job_id,
                        business_id = %job.key.business_id,
                        error = %error,
                        "recompute failed, prior snapshot remains"
                    );
                    queue.write().await.mark_failed(&job.job_id, error.to_string());
                }
            }
        }

        queue.write().await.cleanup_old_jobs(config.job_retention());
    }
}
