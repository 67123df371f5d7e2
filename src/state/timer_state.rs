//! Timer state snapshot published to listeners and the API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TimerRecord;

/// Countdown engine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
}

/// Point-in-time view of the countdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub phase: TimerPhase,
    pub duration_seconds: Option<u64>,
    pub remaining_seconds: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    pub alarm_enabled: bool,
    pub halfway_passed: bool,
    /// Share of the countdown already elapsed, 0..=100
    pub progress_percent: u64,
}

impl TimerState {
    /// Create a new idle timer state
    pub fn new() -> Self {
        Self::idle()
    }

    pub fn idle() -> Self {
        Self {
            phase: TimerPhase::Idle,
            duration_seconds: None,
            remaining_seconds: None,
            started_at: None,
            alarm_enabled: false,
            halfway_passed: false,
            progress_percent: 0,
        }
    }

    /// Create a running timer state for `record` with `remaining` seconds left
    pub fn running(record: &TimerRecord, remaining: u64, halfway_passed: bool) -> Self {
        let progress_percent = (record.duration - remaining.min(record.duration)) * 100 / record.duration;
        Self {
            phase: TimerPhase::Running,
            duration_seconds: Some(record.duration),
            remaining_seconds: Some(remaining),
            started_at: record.started_at(),
            alarm_enabled: record.alarm_enabled,
            halfway_passed,
            progress_percent,
        }
    }

    /// Check if the timer is running
    pub fn is_active(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    /// Get remaining seconds if the timer is running
    pub fn remaining_seconds(&self) -> Option<u64> {
        if self.is_active() {
            self.remaining_seconds
        } else {
            None
        }
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}
