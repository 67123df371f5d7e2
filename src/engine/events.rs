//! Lifecycle events emitted by the countdown engine

use serde::{Deserialize, Serialize};

/// Everything listeners (notifications, UI) need to react to the countdown.
///
/// The engine never talks to the notification backend itself; it only
/// broadcasts these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TimerEvent {
    /// A new countdown was started (or an old one replaced)
    Started {
        duration: u64,
        alarm_enabled: bool,
        started_at: i64,
    },
    /// A persisted countdown was picked up again after a restart
    Resumed {
        duration: u64,
        remaining: u64,
        alarm_enabled: bool,
        halfway_passed: bool,
    },
    /// Remaining seconds recomputed from the wall clock
    Tick { remaining: u64, duration: u64 },
    /// Elapsed time reached half the duration; once per run
    Halfway { duration: u64 },
    /// The countdown ran out. `overdue` when it ran out while nothing was
    /// ticking; `alarm_enabled` is taken from the run's record
    Completed { overdue: bool, alarm_enabled: bool },
    /// The countdown was stopped by the user
    Stopped,
    /// Pending notifications/alarms for the previous run must be cancelled
    CancelExternal,
}

impl TimerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TimerEvent::Started { .. } => "started",
            TimerEvent::Resumed { .. } => "resumed",
            TimerEvent::Tick { .. } => "tick",
            TimerEvent::Halfway { .. } => "halfway",
            TimerEvent::Completed { .. } => "completed",
            TimerEvent::Stopped => "stopped",
            TimerEvent::CancelExternal => "cancelExternal",
        }
    }
}
