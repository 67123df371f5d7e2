//! Notification listener background task
//!
//! Turns countdown lifecycle events into scheduled or cancelled
//! notifications. The engine never calls the notifier itself.

use std::{sync::Arc, time::Duration};

use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{debug, info, warn};

use crate::{
    config::HourRange,
    engine::TimerEvent,
    services::{Notification, NotificationKind, Notifier},
    state::AppState,
};

/// What an event asks of the notifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationPlan {
    Schedule(Vec<Notification>),
    CancelAll,
    Nothing,
}

/// Last whole hour reported for the current run.
///
/// Set from `Started` and `Resumed`, so hours that passed while nothing was
/// running are never reported after a reconcile.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTracker {
    last_hour: Option<u64>,
}

/// Background task that keeps scheduled notifications in line with the countdown
pub async fn notification_listener_task(
    state: Arc<AppState>,
    notifier: Arc<dyn Notifier>,
    mut events: Receiver<TimerEvent>,
) {
    info!("Starting notification listener task");
    let mut progress = ProgressTracker::default();

    loop {
        match events.recv().await {
            Ok(event) => handle_event(&state, notifier.as_ref(), &mut progress, &event),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Notification listener skipped {} events", skipped);
            }
            Err(RecvError::Closed) => {
                info!("Countdown event channel closed, stopping notification listener");
                break;
            }
        }
    }
}

/// Apply one event to the notifier, recording scheduling failures
pub fn handle_event(state: &AppState, notifier: &dyn Notifier, progress: &mut ProgressTracker, event: &TimerEvent) {
    match plan_notifications(&state.hours, progress, event) {
        NotificationPlan::Schedule(notifications) => {
            for notification in notifications {
                let kind = notification.kind;
                if let Err(e) = notifier.schedule(notification) {
                    warn!("Failed to schedule {:?} notification: {}", kind, e);
                    if let Err(e) = state.add_error(format!("notification: {}", e)) {
                        warn!("Failed to record notification error: {}", e);
                    }
                }
            }
        }
        NotificationPlan::CancelAll => notifier.cancel_all(),
        NotificationPlan::Nothing => {
            debug!("No notification work for {} event", event.name());
        }
    }
}

/// Decide which notifications an event schedules or cancels
pub fn plan_notifications(hours: &HourRange, progress: &mut ProgressTracker, event: &TimerEvent) -> NotificationPlan {
    match *event {
        TimerEvent::Started { duration, alarm_enabled, .. } => {
            progress.last_hour = Some(0);
            let mut notifications = Vec::new();
            let half = duration / 2;
            if half > 0 {
                notifications.push(halfway_notification(hours, duration, half, alarm_enabled));
            }
            notifications.push(completed_notification(hours, duration, duration, alarm_enabled));
            NotificationPlan::Schedule(notifications)
        }
        TimerEvent::Resumed { duration, remaining, alarm_enabled, halfway_passed } => {
            let elapsed = duration - remaining;
            progress.last_hour = Some(hours.to_hours(elapsed));
            let mut notifications = Vec::new();
            let half = duration / 2;
            if !halfway_passed && half > elapsed {
                notifications.push(halfway_notification(hours, duration, half - elapsed, alarm_enabled));
            }
            notifications.push(completed_notification(hours, duration, remaining, alarm_enabled));
            NotificationPlan::Schedule(notifications)
        }
        TimerEvent::Tick { remaining, duration } => {
            let Some(last_hour) = progress.last_hour else {
                return NotificationPlan::Nothing;
            };
            let elapsed_hours = hours.to_hours(duration.saturating_sub(remaining));
            if remaining == 0 || elapsed_hours <= last_hour {
                return NotificationPlan::Nothing;
            }
            progress.last_hour = Some(elapsed_hours);
            NotificationPlan::Schedule(vec![progress_notification(hours, elapsed_hours, remaining)])
        }
        TimerEvent::Completed { overdue: true, alarm_enabled } => {
            progress.last_hour = None;
            // Ran out while nothing was running; tell the user now
            NotificationPlan::Schedule(vec![Notification {
                kind: NotificationKind::Completed,
                delay: Duration::ZERO,
                alarm: alarm_enabled,
                title: COMPLETED_TITLE.to_string(),
                body: "Your countdown finished while the timer was not running.".to_string(),
            }])
        }
        TimerEvent::Completed { overdue: false, .. } => {
            progress.last_hour = None;
            NotificationPlan::Nothing
        }
        TimerEvent::Stopped | TimerEvent::CancelExternal => {
            progress.last_hour = None;
            NotificationPlan::CancelAll
        }
        TimerEvent::Halfway { .. } => NotificationPlan::Nothing,
    }
}

const COMPLETED_TITLE: &str = "Time to clean up!";

fn completed_notification(hours: &HourRange, duration: u64, delay: u64, alarm: bool) -> Notification {
    Notification {
        kind: NotificationKind::Completed,
        delay: Duration::from_secs(delay),
        alarm,
        title: COMPLETED_TITLE.to_string(),
        body: format!("{} have passed.", describe(hours, duration)),
    }
}

fn progress_notification(hours: &HourRange, elapsed_hours: u64, remaining: u64) -> Notification {
    let title = if elapsed_hours == 1 {
        "1 hour has passed.".to_string()
    } else {
        format!("{} hours have passed.", elapsed_hours)
    };
    Notification {
        kind: NotificationKind::Progress,
        delay: Duration::ZERO,
        alarm: false,
        title,
        body: format!("{} left.", describe(hours, remaining)),
    }
}

fn halfway_notification(hours: &HourRange, duration: u64, delay: u64, alarm: bool) -> Notification {
    Notification {
        kind: NotificationKind::Halfway,
        delay: Duration::from_secs(delay),
        alarm,
        title: "Halfway there".to_string(),
        body: format!("{} left.", describe(hours, duration - duration / 2)),
    }
}

/// Human readable length, in hours when it is a whole number of them
fn describe(hours: &HourRange, seconds: u64) -> String {
    let whole_hours = hours.to_hours(seconds);
    if whole_hours > 0 && hours.to_seconds(whole_hours as u32) == seconds {
        if whole_hours == 1 {
            "1 hour".to_string()
        } else {
            format!("{} hours", whole_hours)
        }
    } else if seconds == 1 {
        "1 second".to_string()
    } else {
        format!("{} seconds", seconds)
    }
}
