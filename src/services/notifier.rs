//! Notification/alarm scheduling collaborator

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
    time::Duration,
};

use serde::Serialize;
use tokio::{task::JoinHandle, time::sleep};
use tracing::{debug, error, info};

use crate::{error::NotificationError, state::app_state::ErrorLog};

use super::system::run_notification_command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Another whole hour has elapsed; shown immediately
    Progress,
    Halfway,
    Completed,
}

/// A notification to deliver `delay` from now
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub delay: Duration,
    /// Deliver through the alarm channel
    pub alarm: bool,
    pub title: String,
    pub body: String,
}

/// Schedules and cancels notifications on behalf of the countdown
pub trait Notifier: Send + Sync {
    /// Queue a notification for delivery after its delay
    fn schedule(&self, notification: Notification) -> Result<(), NotificationError>;

    /// Drop every delivery that has not happened yet
    fn cancel_all(&self);

    /// Number of deliveries still waiting
    fn pending(&self) -> usize;
}

/// Delivers notifications by running a desktop notification program.
///
/// Each scheduled delivery is a sleeping tokio task; cancelling aborts them.
pub struct CommandNotifier {
    notify_command: String,
    alarm_command: Option<String>,
    available: AtomicBool,
    pending: Mutex<Vec<JoinHandle<()>>>,
    errors: Option<ErrorLog>,
}

impl CommandNotifier {
    pub fn new(notify_command: String, alarm_command: Option<String>) -> Self {
        Self {
            notify_command,
            alarm_command,
            available: AtomicBool::new(true),
            pending: Mutex::new(Vec::new()),
            errors: None,
        }
    }

    /// Record delivery failures in the shared error list
    pub fn with_error_log(mut self, errors: ErrorLog) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Mark the notification program as missing; scheduling then fails fast
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn program_for(&self, alarm: bool) -> String {
        match (&self.alarm_command, alarm) {
            (Some(alarm_command), true) => alarm_command.clone(),
            _ => self.notify_command.clone(),
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Notifier for CommandNotifier {
    fn schedule(&self, notification: Notification) -> Result<(), NotificationError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(NotificationError::Unavailable(self.notify_command.clone()));
        }

        let program = self.program_for(notification.alarm);
        let errors = self.errors.clone();
        debug!(
            "Scheduling {:?} notification in {}s via {}",
            notification.kind,
            notification.delay.as_secs(),
            program
        );

        let handle = tokio::spawn(async move {
            sleep(notification.delay).await;
            if let Err(e) = run_notification_command(&program, &notification.title, &notification.body).await {
                error!("Failed to deliver {:?} notification: {}", notification.kind, e);
                if let Some(errors) = errors {
                    if let Ok(mut errors) = errors.lock() {
                        errors.push(format!("notification: {}", e));
                    }
                }
            }
        });

        let mut pending = self.lock_pending();
        pending.retain(|handle| !handle.is_finished());
        pending.push(handle);
        Ok(())
    }

    fn cancel_all(&self) {
        let mut pending = self.lock_pending();
        let cancelled = pending.iter().filter(|handle| !handle.is_finished()).count();
        for handle in pending.drain(..) {
            handle.abort();
        }
        if cancelled > 0 {
            info!("Cancelled {} pending notifications", cancelled);
        }
    }

    fn pending(&self) -> usize {
        let mut pending = self.lock_pending();
        pending.retain(|handle| !handle.is_finished());
        pending.len()
    }
}

impl Drop for CommandNotifier {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
