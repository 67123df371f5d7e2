//! User settings persisted next to the timer record

use serde::{Deserialize, Serialize};

use crate::{
    config::HourRange,
    error::PersistenceError,
    storage::{Storage, SETTINGS_KEY},
};

/// Preferences applied to starts that do not override them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Deliver through the alarm channel instead of a plain notification
    pub alarm_enabled: bool,
    /// Countdown length selected for the next start, in hours
    pub selected_hours: u32,
}

impl Settings {
    pub fn defaults(range: &HourRange) -> Self {
        Self {
            alarm_enabled: false,
            selected_hours: range.max,
        }
    }

    /// Load stored settings, falling back to defaults when none are stored.
    ///
    /// A stored hour selection outside the current range is clamped into it.
    pub fn load(storage: &dyn Storage, range: &HourRange) -> Result<Self, PersistenceError> {
        let Some(raw) = storage.get(SETTINGS_KEY)? else {
            return Ok(Self::defaults(range));
        };
        let mut settings: Self = serde_json::from_str(&raw).map_err(|e| PersistenceError::Malformed {
            key: SETTINGS_KEY.to_string(),
            message: e.to_string(),
        })?;
        settings.selected_hours = settings.selected_hours.clamp(range.min, range.max);
        Ok(settings)
    }

    pub fn save(&self, storage: &dyn Storage) -> Result<(), PersistenceError> {
        let encoded = serde_json::to_string(self).map_err(|source| PersistenceError::Encode {
            key: SETTINGS_KEY.to_string(),
            source,
        })?;
        storage.set(SETTINGS_KEY, &encoded)
    }
}
