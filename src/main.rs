//! Study Timer - A state-managed study timer daemon
//!
//! This is the main entry point for the study-timer application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use study_timer::{
    api::create_router,
    client::HttpSessionApi,
    config::Config,
    state::{AppState, TimerState},
    tasks::{state_writer_task, timer_driver_task},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("study_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting study-timer v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, api={}, pomodoro={}min",
        config.host, config.port, config.api_url, config.duration
    );

    let session_api = HttpSessionApi::new(&config.api_url, config.token.clone())?;

    // Restore the timer from the last run
    let state_file = config.state_file();
    info!("State file: {}", state_file.path().display());
    let initial = state_file.load_or(TimerState::with_planned_duration(
        config.planned_duration_seconds(),
    ));

    let state = Arc::new(AppState::new(
        Arc::new(session_api),
        initial,
        config.port,
        config.host.clone(),
    ));

    // Mirror every change to the state file
    let writer = tokio::spawn(state_writer_task(state_file.clone(), state.subscribe()));

    // Start the timer driver background task
    let driver_state = Arc::clone(&state);
    let driver = tokio::spawn(async move {
        timer_driver_task(driver_state).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /timer/start    - Start a study session");
    info!("  POST /timer/pause    - Pause the running session");
    info!("  POST /timer/resume   - Resume the paused session");
    info!("  POST /timer/finish   - Record the session and stop");
    info!("  POST /timer/reset    - Discard the session");
    info!("  PUT  /timer/type     - Switch Pomodoro / Normal");
    info!("  PUT  /timer/duration - Set the Pomodoro length");
    info!("  PUT  /timer/topic    - Select the topic");
    info!("  GET  /status         - Current timer status");
    info!("  GET  /health         - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    driver.abort();
    writer.abort();

    // Flush the final state so a running timer picks up where it left off.
    // A save the writer already started finishes first.
    match state.snapshot() {
        Ok(last) => {
            if let Err(e) = state_file.save(&last) {
                tracing::error!("Failed to save timer state on shutdown: {}", e);
            }
        }
        Err(e) => tracing::error!("Failed to read timer state on shutdown: {}", e),
    }
    info!("Server shutdown complete");
    Ok(())
}
