//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod notification_listener;
pub mod wake_up_recovery;

// Re-export main functions
pub use notification_listener::notification_listener_task;
pub use wake_up_recovery::wake_up_recovery_task;
