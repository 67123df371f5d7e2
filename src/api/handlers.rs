//! HTTP endpoint handlers

use std::{convert::Infallible, sync::Arc};
use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::{
    error::EngineError,
    state::{AppState, Settings},
};
use super::responses::{
    ApiError, ConfirmationPrompt, HealthResponse, SettingsResponse, SettingsUpdate, StartRequest,
    StatusResponse, StopRequest, TimerResponse,
};

/// Record a storage failure for the status endpoint and turn it into a 500
fn persistence_failure(state: &AppState, action: &str, e: EngineError) -> ApiError {
    error!("Failed to {} countdown: {}", action, e);
    if let Err(e) = state.add_error(format!("storage: {}", e)) {
        error!("Failed to add error to state: {}", e);
    }
    ApiError::Internal(format!("Failed to {} countdown: {}", action, e))
}

/// Handle POST /timer/start - Start (or, confirmed, restart) the countdown
pub async fn start_timer_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartRequest>,
) -> Result<Json<TimerResponse>, ApiError> {
    let settings = state.get_settings().map_err(ApiError::Internal)?;

    let duration = match (request.duration_secs, request.hours) {
        (Some(0), _) => {
            return Err(ApiError::BadRequest("duration_secs must be greater than zero".to_string()));
        }
        (Some(seconds), _) => seconds,
        (None, Some(hours)) => {
            if !state.hours.contains(hours) {
                return Err(ApiError::BadRequest(format!(
                    "hours must be between {} and {}",
                    state.hours.min, state.hours.max
                )));
            }
            state.hours.to_seconds(hours)
        }
        (None, None) => state.hours.to_seconds(settings.selected_hours),
    };
    let alarm = request.alarm.unwrap_or(settings.alarm_enabled);

    // Unconfirmed starts go through `start_when_idle`, so the running check
    // and the start happen under the engine lock
    let (restarting, result) = if request.confirm {
        (state.engine.is_running(), state.engine.start(duration, alarm))
    } else {
        (false, state.engine.start_when_idle(duration, alarm))
    };

    match result {
        Ok(timer) => {
            let action = if restarting { "restart" } else { "start" };
            state.record_action(action);
            if let Err(e) = state.clear_errors_for("storage") {
                warn!("Failed to clear storage errors: {}", e);
            }
            info!("Timer {} endpoint called - {}s countdown running", action, duration);
            Ok(Json(TimerResponse::from_timer(
                format!("Countdown of {}s started", duration),
                timer,
            )))
        }
        Err(EngineError::AlreadyRunning { remaining }) => {
            info!("Restart requested without confirmation ({}s left)", remaining);
            Err(ApiError::ConfirmationRequired(ConfirmationPrompt::restart()))
        }
        Err(EngineError::InvalidDuration) => {
            Err(ApiError::BadRequest(EngineError::InvalidDuration.to_string()))
        }
        Err(e) => Err(persistence_failure(&state, "start", e)),
    }
}

/// Handle POST /timer/stop - Stop the countdown after confirmation
pub async fn stop_timer_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StopRequest>,
) -> Result<Json<TimerResponse>, ApiError> {
    if !request.confirm {
        if state.engine.is_running() {
            info!("Stop requested without confirmation");
            return Err(ApiError::ConfirmationRequired(ConfirmationPrompt::stop()));
        }
        return Ok(Json(TimerResponse::from_timer(
            "No countdown running".to_string(),
            state.engine.snapshot(),
        )));
    }

    match state.engine.stop() {
        Ok(true) => {
            state.record_action("stop");
            info!("Timer stop endpoint called - countdown stopped");
            Ok(Json(TimerResponse::from_timer(
                "Countdown stopped".to_string(),
                state.engine.snapshot(),
            )))
        }
        Ok(false) => Ok(Json(TimerResponse::from_timer(
            "No countdown running".to_string(),
            state.engine.snapshot(),
        ))),
        Err(e) => Err(persistence_failure(&state, "stop", e)),
    }
}

/// Handle GET /timer - Current countdown state
pub async fn timer_handler(State(state): State<Arc<AppState>>) -> Json<TimerResponse> {
    let timer = state.engine.snapshot();
    let message = match timer.remaining_seconds() {
        Some(remaining) => format!("{}s remaining", remaining),
        None => "No countdown running".to_string(),
    };
    Json(TimerResponse::from_timer(message, timer))
}

/// Handle GET /timer/events - Stream countdown events as server-sent events
pub async fn timer_events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = state.engine.subscribe();

    let stream = stream::unfold(events, |mut events| async move {
        loop {
            match events.recv().await {
                Ok(event) => match Event::default().event(event.name()).json_data(&event) {
                    Ok(sse_event) => return Some((Ok::<_, Infallible>(sse_event), events)),
                    Err(e) => warn!("Failed to encode {} event: {}", event.name(), e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event stream client lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Handle GET /settings
pub async fn get_settings_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let settings = state.get_settings().map_err(ApiError::Internal)?;
    Ok(Json(SettingsResponse {
        settings,
        min_hours: state.hours.min,
        max_hours: state.hours.max,
    }))
}

/// Handle PUT /settings - Update alarm preference and hour selection
pub async fn update_settings_handler(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let current = state.get_settings().map_err(ApiError::Internal)?;

    let selected_hours = update.selected_hours.unwrap_or(current.selected_hours);
    if !state.hours.contains(selected_hours) {
        return Err(ApiError::BadRequest(format!(
            "selectedHours must be between {} and {}",
            state.hours.min, state.hours.max
        )));
    }
    if selected_hours != current.selected_hours && state.engine.is_running() {
        return Err(ApiError::Conflict(
            "The countdown length cannot change while a countdown is running".to_string(),
        ));
    }

    let new_settings = Settings {
        alarm_enabled: update.alarm_enabled.unwrap_or(current.alarm_enabled),
        selected_hours,
    };
    let settings = state.update_settings(new_settings).map_err(|e| {
        error!("{}", e);
        if let Err(e) = state.add_error(format!("storage: {}", e)) {
            error!("Failed to add error to state: {}", e);
        }
        ApiError::Internal(e)
    })?;
    state.record_action("settings");

    Ok(Json(SettingsResponse {
        settings,
        min_hours: state.hours.min,
        max_hours: state.hours.max,
    }))
}

/// Handle GET /status - Return current countdown and server status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let settings = state.get_settings().map_err(ApiError::Internal)?;
    let errors = state.get_errors().map_err(ApiError::Internal)?;
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer: state.engine.snapshot(),
        settings,
        errors,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
