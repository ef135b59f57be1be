//! Attendance Ingest Service
//!
//! Boundary normalization of device punches, the device directory, and
//! the coalesced recompute queue that keeps assessment snapshots fresh.

pub mod config;
pub mod normalize;
pub mod recompute;
pub mod router;

pub use config::IngestConfig;
pub use normalize::{DeviceDirectory, DevicePayload, InMemoryDirectory, NormalizeError};
pub use recompute::{run_worker, JobStatus, RecomputeJob, RecomputeKey, RecomputeQueue};
pub use router::{PunchAck, PunchRouter};
