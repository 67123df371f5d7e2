//! External collaborator module
//!
//! This module contains the notification/alarm scheduling collaborator and
//! the helpers that run external notification programs.

pub mod notifier;
pub mod system;

// Re-export main types and functions
pub use notifier::{CommandNotifier, Notification, NotificationKind, Notifier};
pub use system::*;
