//! Countdown Keeper - a persisted countdown timer daemon
//!
//! This library provides a countdown engine whose state survives restarts
//! and host suspension, plus the collaborators around it: key-value storage,
//! notification/alarm scheduling and an HTTP control surface.

pub mod api;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod services;
pub mod state;
pub mod storage;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use engine::{CountdownEngine, TimerEvent};
pub use state::AppState;
pub use api::create_router;
pub use utils::signals::shutdown_signal;
