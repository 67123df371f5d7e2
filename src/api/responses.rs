//! API request and response structures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{Settings, TimerState};

/// Body of `POST /timer/start`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartRequest {
    /// Countdown length in selectable hours
    pub hours: Option<u32>,
    /// Exact countdown length in seconds; wins over `hours`
    pub duration_secs: Option<u64>,
    /// Alarm delivery; defaults to the stored setting
    pub alarm: Option<bool>,
    /// Required to replace a running countdown
    #[serde(default)]
    pub confirm: bool,
}

/// Body of `POST /timer/stop`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopRequest {
    #[serde(default)]
    pub confirm: bool,
}

/// Body of `PUT /settings`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub alarm_enabled: Option<bool>,
    pub selected_hours: Option<u32>,
}

/// Response for countdown operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerState,
}

impl TimerResponse {
    pub fn new(status: &str, message: String, timer: TimerState) -> Self {
        Self {
            status: status.to_string(),
            message,
            timestamp: Utc::now(),
            timer,
        }
    }

    /// Response reflecting the timer's own phase
    pub fn from_timer(message: String, timer: TimerState) -> Self {
        let status = if timer.is_active() { "running" } else { "idle" };
        Self::new(status, message, timer)
    }
}

/// A confirmation the client has to show before a destructive action.
///
/// One parameterised dialog covers every confirmation; the client repeats
/// the request with `confirm: true` once the user accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationPrompt {
    pub action: String,
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: String,
    pub destructive: bool,
}

impl ConfirmationPrompt {
    pub fn new(action: &str, title: &str, message: &str, confirm_label: &str, destructive: bool) -> Self {
        Self {
            action: action.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            confirm_label: confirm_label.to_string(),
            cancel_label: "Cancel".to_string(),
            destructive,
        }
    }

    pub fn restart() -> Self {
        Self::new(
            "restart",
            "Restart countdown",
            "Are you sure you want to restart? The running countdown will be replaced.",
            "Restart",
            true,
        )
    }

    pub fn stop() -> Self {
        Self::new(
            "stop",
            "Stop countdown",
            "Are you sure you want to stop the countdown? Pending notifications will be cancelled.",
            "Stop",
            true,
        )
    }
}

/// Settings response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub settings: Settings,
    pub min_hours: u32,
    pub max_hours: u32,
}

/// Status response with timer and server information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub timer: TimerState,
    pub settings: Settings,
    pub errors: Vec<String>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<ConfirmationPrompt>,
}

/// Handler failures and the status codes they map to
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    ConfirmationRequired(ConfirmationPrompt),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, confirmation) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, None),
            ApiError::ConfirmationRequired(prompt) => (
                StatusCode::CONFLICT,
                format!("Confirmation required: {}", prompt.message),
                Some(prompt),
            ),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message, None),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message, None),
        };

        let body = ErrorResponse {
            status: "error".to_string(),
            message,
            timestamp: Utc::now(),
            confirmation,
        };
        (status, Json(body)).into_response()
    }
}
