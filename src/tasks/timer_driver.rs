//! Timer driver background task

use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::state::{AppState, SessionId, TimerState};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Background task that ticks the timer once per second while it is running
/// and finishes Pomodoro sessions that reach zero.
pub async fn timer_driver_task(state: Arc<AppState>) {
    info!("Starting timer driver task");

    let mut timer_rx = state.subscribe();
    // Session already handed to finish_session, so it is attempted only once
    let mut auto_finished: Option<SessionId> = None;

    loop {
        let running = timer_rx.borrow_and_update().is_running;

        if running {
            debug!("Timer running, arming tick interval");
            if !drive_running(&state, &mut timer_rx, &mut auto_finished).await {
                break;
            }
            continue;
        }

        // Wait for the next state change
        if timer_rx.changed().await.is_err() {
            break;
        }
    }

    info!("Timer driver task stopped");
}

/// Tick until the timer stops running. Returns false once the store is gone.
async fn drive_running(
    state: &AppState,
    timer_rx: &mut watch::Receiver<TimerState>,
    auto_finished: &mut Option<SessionId>,
) -> bool {
    let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let current = match state.tick() {
                    Ok(current) => current,
                    Err(e) => {
                        error!("Failed to tick timer: {}", e);
                        continue;
                    }
                };

                if current.is_pomodoro_complete() {
                    auto_finish(state, &current, auto_finished).await;
                }
            }

            changed = timer_rx.changed() => {
                if changed.is_err() {
                    return false;
                }
                if !timer_rx.borrow_and_update().is_running {
                    debug!("Timer stopped running, disarming tick interval");
                    return true;
                }
            }
        }
    }
}

async fn auto_finish(state: &AppState, current: &TimerState, auto_finished: &mut Option<SessionId>) {
    let Some(session_id) = current.current_session_id else {
        return;
    };
    if *auto_finished == Some(session_id) {
        return;
    }
    *auto_finished = Some(session_id);

    info!("Pomodoro session {} reached zero, finishing", session_id);
    match state.finish_session_if(session_id).await {
        Ok(Some(finished)) => {
            info!(
                "Pomodoro session {} recorded with {}s",
                finished.session_id, finished.duration_seconds
            );
        }
        Ok(None) => debug!("Session {} was already finished elsewhere", session_id),
        Err(e) => {
            warn!(
                "Automatic finish of session {} failed, waiting for a manual finish or reset: {}",
                session_id, e
            );
        }
    }
}
