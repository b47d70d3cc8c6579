//! State writer background task

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::{persist::StateFile, state::TimerState};

/// Background task that mirrors published timer states to the state file.
///
/// Writes run on the blocking pool one at a time. States published while a
/// write is in progress collapse into the latest one.
pub async fn state_writer_task(state_file: StateFile, mut timer_rx: watch::Receiver<TimerState>) {
    info!("Starting state writer task for {}", state_file.path().display());

    while timer_rx.changed().await.is_ok() {
        let snapshot = timer_rx.borrow_and_update().clone();
        let file = state_file.clone();

        match tokio::task::spawn_blocking(move || file.save(&snapshot)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Failed to persist timer state: {}", e),
            Err(e) => error!("State writer failed to join: {}", e),
        }
    }

    debug!("Timer state channel closed, state writer stopping");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{client::fake::FakeSessionApi, state::AppState};
    use std::{sync::Arc, time::Duration};
    use tempfile::tempdir;

    async fn wait_for_file(file: &StateFile, expected: &TimerState) -> TimerState {
        let mut restored = file.load_or(TimerState::new());
        for _ in 0..200 {
            if &restored == expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            restored = file.load_or(TimerState::new());
        }
        restored
    }

    #[tokio::test]
    async fn writes_the_latest_published_state() {
        let dir = tempdir().unwrap();
        let file = StateFile::new(dir.path().join("state.json"));
        let store = AppState::new(
            Arc::new(FakeSessionApi::new()),
            TimerState::new(),
            0,
            "127.0.0.1".to_string(),
        );
        let writer = tokio::spawn(state_writer_task(file.clone(), store.subscribe()));

        store.set_planned_duration(120).unwrap();
        store.start_session(None).await.unwrap();
        for _ in 0..5 {
            store.tick().unwrap();
        }

        let expected = store.snapshot().unwrap();
        let restored = wait_for_file(&file, &expected).await;
        assert_eq!(restored, expected);
        assert_eq!(restored.time_left, 115);
        assert!(restored.is_running);
        writer.abort();
    }

    #[tokio::test]
    async fn stops_when_the_store_is_dropped() {
        let dir = tempdir().unwrap();
        let file = StateFile::new(dir.path().join("state.json"));
        let store = AppState::new(
            Arc::new(FakeSessionApi::new()),
            TimerState::new(),
            0,
            "127.0.0.1".to_string(),
        );
        let writer = tokio::spawn(state_writer_task(file, store.subscribe()));

        drop(store);
        tokio::time::timeout(Duration::from_secs(5), writer)
            .await
            .unwrap()
            .unwrap();
    }
}
