//! Countdown engine module
//!
//! The engine owns the single countdown, persists it through the storage
//! collaborator and broadcasts lifecycle events for notification and UI
//! listeners.

pub mod countdown;
pub mod events;

// Re-export main types
pub use countdown::{CountdownEngine, TICK_INTERVAL};
pub use events::TimerEvent;
