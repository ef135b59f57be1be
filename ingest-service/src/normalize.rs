//! Boundary normalization of device payloads
//!
//! Field-name variants across device firmwares are absorbed here with
//! serde aliases; everything past this module only ever sees a normalized
//! [`Punch`].

use std::collections::HashMap;
use std::sync::RwLock;

use assessment_service::models::{Punch, PunchDirection};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use thiserror::Error;

/// Normalization failures
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("unrecognized punch direction: {0}")]
    Direction(String),

    #[error("invalid timestamp: {0}")]
    Timestamp(String),
}

/// Raw webhook payload as devices send it. Older firmwares report the
/// same fields under different names.
#[derive(Debug, Clone, Deserialize)]
pub struct DevicePayload {
    #[serde(alias = "employeeId", alias = "empId", alias = "slotNumber")]
    pub slot: u32,

    #[serde(alias = "checkTime", alias = "punchTime")]
    pub timestamp: String,

    #[serde(alias = "checkType", alias = "status")]
    pub direction: String,

    #[serde(alias = "sn", alias = "serialNumber")]
    pub serial: String,

    #[serde(default, alias = "deviceId")]
    pub device_id: Option<String>,

    #[serde(default)]
    pub manual: bool,

    #[serde(default, alias = "testMode")]
    pub test_mode: bool,
}

impl DevicePayload {
    /// Produce the single normalized punch record used by the engine.
    pub fn normalize(&self) -> Result<Punch, NormalizeError> {
        let direction = parse_direction(&self.direction)?;
        let timestamp = parse_timestamp(&self.timestamp)?;
        Ok(Punch {
            slot: self.slot,
            direction,
            timestamp,
            device_id: self
                .device_id
                .clone()
                .unwrap_or_else(|| self.serial.clone()),
            source_serial: self.serial.clone(),
            manual: self.manual,
            test_mode: self.test_mode,
        })
    }
}

fn parse_direction(raw: &str) -> Result<PunchDirection, NormalizeError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "in" | "i" | "0" | "checkin" | "check-in" => Ok(PunchDirection::In),
        "out" | "o" | "1" | "checkout" | "check-out" => Ok(PunchDirection::Out),
        other => Err(NormalizeError::Direction(other.to_string())),
    }
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, NormalizeError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| NormalizeError::Timestamp(raw.to_string()))
}

/// Maps device serial numbers to the owning business.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    async fn business_for(&self, serial: &str) -> Option<String>;
}

/// In-memory directory for testing and development.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    map: RwLock<HashMap<String, String>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, serial: impl Into<String>, business_id: impl Into<String>) {
        self.map
            .write()
            .unwrap()
            .insert(serial.into(), business_id.into());
    }
}

#[async_trait]
impl DeviceDirectory for InMemoryDirectory {
    async fn business_for(&self, serial: &str) -> Option<String> {
        self.map.read().unwrap().get(serial).cloned()
    }
}
