//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::{config::HourRange, engine::CountdownEngine, storage::Storage};

use super::Settings;

/// Shared list of user-visible error messages
pub type ErrorLog = Arc<Mutex<Vec<String>>>;

/// Main application state shared by the HTTP handlers and background tasks
pub struct AppState {
    /// The single countdown of this installation
    pub engine: CountdownEngine,
    /// Storage shared with the engine (settings live next to the timer record)
    pub storage: Arc<dyn Storage>,
    /// Selectable countdown range
    pub hours: HourRange,
    pub settings: Arc<Mutex<Settings>>,
    /// Current errors for client visibility
    pub errors: ErrorLog,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    pub fn new(
        engine: CountdownEngine,
        storage: Arc<dyn Storage>,
        hours: HourRange,
        settings: Settings,
        port: u16,
        host: String,
    ) -> Self {
        Self {
            engine,
            storage,
            hours,
            settings: Arc::new(Mutex::new(settings)),
            errors: Arc::new(Mutex::new(Vec::new())),
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        }
    }

    /// Remember the last user action for the status endpoint
    pub fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Add an error to the state
    pub fn add_error(&self, error: String) -> Result<(), String> {
        let mut errors = self.errors.lock()
            .map_err(|e| format!("Failed to lock error list: {}", e))?;

        warn!("Adding error to state: {}", error);
        errors.push(error);
        Ok(())
    }

    /// Clear errors for a specific component
    pub fn clear_errors_for(&self, component: &str) -> Result<(), String> {
        let mut errors = self.errors.lock()
            .map_err(|e| format!("Failed to lock error list: {}", e))?;

        let initial_count = errors.len();
        let prefix = format!("{}:", component);
        errors.retain(|error| !error.starts_with(&prefix));

        if errors.len() != initial_count {
            info!("Cleared {} errors for component: {}", initial_count - errors.len(), component);
        }
        Ok(())
    }

    /// Get current errors
    pub fn get_errors(&self) -> Result<Vec<String>, String> {
        self.errors.lock()
            .map(|errors| errors.clone())
            .map_err(|e| format!("Failed to lock error list: {}", e))
    }

    /// Get current settings
    pub fn get_settings(&self) -> Result<Settings, String> {
        self.settings.lock()
            .map(|settings| *settings)
            .map_err(|e| format!("Failed to lock settings: {}", e))
    }

    /// Persist and apply new settings
    pub fn update_settings(&self, new_settings: Settings) -> Result<Settings, String> {
        let mut settings = self.settings.lock()
            .map_err(|e| format!("Failed to lock settings: {}", e))?;

        new_settings
            .save(self.storage.as_ref())
            .map_err(|e| format!("Failed to save settings: {}", e))?;
        *settings = new_settings;
        info!("Settings updated: alarm={}, hours={}", new_settings.alarm_enabled, new_settings.selected_hours);
        Ok(new_settings)
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
