use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::device::models::SensorFields;

/// One complete set of sensor values plus the gateway's capture time.
///
/// Serialized flat, in the same shape `GET /get` returns and the mirror file
/// stores: `ph, tds, temp, humidity, pump, time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(flatten)]
    pub fields: SensorFields,
    /// Stamped by the gateway when the poll succeeded.
    pub time: DateTime<Utc>,
}

impl Reading {
    /// Stamp `fields` with the current time, truncated to milliseconds.
    pub fn capture(fields: SensorFields) -> Self {
        Self {
            fields,
            time: now(),
        }
    }
}

/// The single live reading held by the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Snapshot {
    /// No poll has succeeded yet. `since` is when the store was created.
    Unset { since: DateTime<Utc> },
    Complete(Reading),
}

impl Snapshot {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    pub fn reading(&self) -> Option<&Reading> {
        match self {
            Self::Complete(r) => Some(r),
            Self::Unset { .. } => None,
        }
    }
}

/// Outcome bookkeeping for the poller, exposed on `/health`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollStatus {
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u64,
    pub total_successes: u64,
    pub total_failures: u64,
}

impl PollStatus {
    pub fn seconds_since_success(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_success.map(|t| (now - t).num_seconds())
    }
}

/// Gateway clock, at the precision readings are stamped with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
