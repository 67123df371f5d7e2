//! Persisted countdown record

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::PersistenceError, storage::TIMER_KEY};

/// Snapshot written when a countdown starts and read back on resume.
///
/// Remaining time is never stored; it is derived from `start_time` and the
/// current wall clock. A record is replaced wholesale on restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRecord {
    /// Epoch milliseconds at which the countdown started
    pub start_time: i64,
    /// Total countdown length in seconds, always > 0
    pub duration: u64,
    /// Deliver through the alarm channel instead of a plain notification
    #[serde(default)]
    pub alarm_enabled: bool,
}

impl TimerRecord {
    pub fn new(start_time: i64, duration: u64, alarm_enabled: bool) -> Self {
        Self {
            start_time,
            duration,
            alarm_enabled,
        }
    }

    /// Whole seconds since the start; a start time in the future counts as 0
    pub fn elapsed_secs(&self, now_millis: i64) -> u64 {
        let delta = now_millis.saturating_sub(self.start_time);
        if delta <= 0 {
            return 0;
        }
        (delta / 1000) as u64
    }

    pub fn remaining_secs(&self, now_millis: i64) -> u64 {
        self.duration.saturating_sub(self.elapsed_secs(now_millis))
    }

    pub fn is_elapsed(&self, now_millis: i64) -> bool {
        self.elapsed_secs(now_millis) >= self.duration
    }

    /// Elapsed second at which the halfway event fires.
    ///
    /// `None` for a one second countdown, whose midpoint would be its start.
    pub fn halfway_point(&self) -> Option<u64> {
        let half = self.duration / 2;
        (half > 0).then_some(half)
    }

    pub fn halfway_passed(&self, now_millis: i64) -> bool {
        self.halfway_point()
            .is_some_and(|half| self.elapsed_secs(now_millis) >= half)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.start_time).single()
    }

    pub fn encode(&self) -> Result<String, PersistenceError> {
        serde_json::to_string(self).map_err(|source| PersistenceError::Encode {
            key: TIMER_KEY.to_string(),
            source,
        })
    }

    /// Decode a stored record, rejecting a zero duration or a start time
    /// outside the representable calendar range.
    ///
    /// Extra fields written by older versions (`maxTime`, `timerRunning`) are ignored.
    pub fn decode(raw: &str) -> Result<Self, PersistenceError> {
        let record: Self = serde_json::from_str(raw).map_err(|e| PersistenceError::Malformed {
            key: TIMER_KEY.to_string(),
            message: e.to_string(),
        })?;
        if record.duration == 0 {
            return Err(PersistenceError::Malformed {
                key: TIMER_KEY.to_string(),
                message: "duration must be greater than zero".to_string(),
            });
        }
        if record.started_at().is_none() {
            return Err(PersistenceError::Malformed {
                key: TIMER_KEY.to_string(),
                message: format!("startTime {} is out of range", record.start_time),
            });
        }
        Ok(record)
    }
}
