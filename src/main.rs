//! Countdown Keeper - a persisted countdown timer daemon
//!
//! This is the main entry point for the countdown-keeper application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use countdown_keeper::{
    api::create_router,
    clock::{Clock, SystemClock},
    config::Config,
    engine::CountdownEngine,
    services::{check_command_available, CommandNotifier, Notifier},
    state::{AppState, Settings},
    storage::{FileStorage, MemoryStorage, Storage},
    tasks::{notification_listener_task, wake_up_recovery_task},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("countdown_keeper={},tower_http=info", config.log_level()))
        .init();

    config.validate()?;

    info!("Starting countdown-keeper server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, hours={}..={}, hour={}s",
          config.host, config.port, config.min_hours, config.max_hours, config.seconds_per_hour);

    let storage: Arc<dyn Storage> = if config.in_memory {
        warn!("Using in-memory storage; the countdown will not survive a restart");
        Arc::new(MemoryStorage::new())
    } else {
        let storage = FileStorage::open(config.storage_path())?;
        info!("Persisting countdown in {}", storage.path().display());
        Arc::new(storage)
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let engine = CountdownEngine::new(Arc::clone(&storage), Arc::clone(&clock));

    let hours = config.hour_range();
    let settings = Settings::load(storage.as_ref(), &hours).unwrap_or_else(|e| {
        warn!("Failed to load settings, using defaults: {}", e);
        Settings::defaults(&hours)
    });

    // Create application state
    let state = Arc::new(AppState::new(
        engine.clone(),
        Arc::clone(&storage),
        hours,
        settings,
        config.port,
        config.host.clone(),
    ));

    // Notifications are optional: a missing program is reported, not fatal
    let notifier = CommandNotifier::new(config.notify_command.clone(), config.alarm_command.clone())
        .with_error_log(Arc::clone(&state.errors));
    if let Err(e) = check_command_available(&config.notify_command).await {
        warn!("{}; notifications disabled", e);
        notifier.set_available(false);
        if let Err(e) = state.add_error(format!("notification: {}", e)) {
            error!("Failed to add notification error: {}", e);
        }
    }
    if config.alarm_command.is_none() {
        info!("No alarm command configured; alarms are delivered as notifications");
    }
    let notifier: Arc<dyn Notifier> = Arc::new(notifier);

    // Subscribe before reconciling so a resumed or overdue countdown is seen
    let events = engine.subscribe();
    let listener_state = Arc::clone(&state);
    tokio::spawn(async move {
        notification_listener_task(listener_state, notifier, events).await;
    });

    match engine.reconcile() {
        Ok(timer) => match timer.remaining_seconds() {
            Some(remaining) => info!("Resumed persisted countdown with {}s remaining", remaining),
            None => info!("No countdown running"),
        },
        Err(e) => {
            error!("Failed to reconcile persisted countdown: {}", e);
            if let Err(e) = state.add_error(format!("storage: {}", e)) {
                error!("Failed to add reconcile error: {}", e);
            }
        }
    }

    // Start the wake-up recovery background task
    let recovery_engine = engine.clone();
    let recovery_clock = Arc::clone(&clock);
    tokio::spawn(async move {
        wake_up_recovery_task(recovery_engine, recovery_clock).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /timer/start  - Start or (confirmed) restart the countdown");
    info!("  POST /timer/stop   - Stop the countdown (confirmed)");
    info!("  GET  /timer        - Current countdown state");
    info!("  GET  /timer/events - Countdown event stream (SSE)");
    info!("  GET  /settings     - Alarm and hour selection");
    info!("  PUT  /settings     - Update settings");
    info!("  GET  /status       - Server status and errors");
    info!("  GET  /health       - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // Keep the record so the next start resumes the countdown
    engine.detach();
    info!("Server shutdown complete");
    Ok(())
}
