use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::snapshot::models::{PollStatus, Reading, Snapshot};

/// Body of `GET /get`: the snapshot as-is, no envelope.
///
/// Sensor fields are `null` until the first poll succeeds.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SnapshotDto {
    /// Acidity (pH)
    pub ph: Option<f64>,
    /// Total dissolved solids, ppm
    pub tds: Option<f64>,
    /// Degrees Celsius
    pub temp: Option<f64>,
    /// Relative humidity percentage
    pub humidity: Option<f64>,
    pub pump: bool,
    /// Capture time of the reading (RFC3339), or process start while unset.
    pub time: DateTime<Utc>,
}

impl From<Snapshot> for SnapshotDto {
    fn from(s: Snapshot) -> Self {
        match s {
            Snapshot::Complete(r) => Self {
                ph: Some(r.fields.ph),
                tds: Some(r.fields.tds),
                temp: Some(r.fields.temp),
                humidity: Some(r.fields.humidity),
                pump: r.fields.pump,
                time: r.time,
            },
            Snapshot::Unset { since } => Self {
                ph: None,
                tds: None,
                temp: None,
                humidity: None,
                pump: false,
                time: since,
            },
        }
    }
}

/// Body of a successful `GET /api`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiReadingDto {
    /// Always `true`.
    pub success: bool,
    pub ph: f64,
    pub tds: f64,
    pub temp: f64,
    pub humidity: f64,
    pub pump: bool,
    pub time: DateTime<Utc>,
}

impl From<Reading> for ApiReadingDto {
    fn from(r: Reading) -> Self {
        Self {
            success: true,
            ph: r.fields.ph,
            tds: r.fields.tds,
            temp: r.fields.temp,
            humidity: r.fields.humidity,
            pump: r.fields.pump,
            time: r.time,
        }
    }
}

/// Body of a failed `GET /api`. `time` is when the failure was reported.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiFailureDto {
    /// Always `false`.
    pub success: bool,
    pub error: String,
    pub time: DateTime<Utc>,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthDto {
    pub status: String,
    /// Whether a poll has succeeded since the process started.
    pub snapshot_valid: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub seconds_since_success: Option<i64>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u64,
    pub total_successes: u64,
    pub total_failures: u64,
}

impl HealthDto {
    pub fn new(snapshot: &Snapshot, status: PollStatus, now: DateTime<Utc>) -> Self {
        Self {
            status: "ok".to_owned(),
            snapshot_valid: snapshot.is_valid(),
            seconds_since_success: status.seconds_since_success(now),
            last_success: status.last_success,
            last_failure: status.last_failure,
            last_error: status.last_error,
            consecutive_failures: status.consecutive_failures,
            total_successes: status.total_successes,
            total_failures: status.total_failures,
        }
    }
}
