//! State management module
//!
//! This module contains the persisted timer record, the published timer
//! snapshot, user settings, and the shared application state.

pub mod app_state;
pub mod settings;
pub mod timer_record;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use settings::Settings;
pub use timer_record::TimerRecord;
pub use timer_state::{TimerPhase, TimerState};
