//! Main application state: the timer store

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

use super::{SessionId, SessionType, TimerState, TopicId};
use crate::{client::SessionApi, error::TimerError};

/// Result of a successful `finish_session`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedSession {
    pub session_id: SessionId,
    pub duration_seconds: u64,
}

/// Owner of the study timer.
///
/// Every change is published on a watch channel; the timer driver and the
/// state writer listen to it.
pub struct AppState {
    timer_state: Mutex<TimerState>,
    session_api: Arc<dyn SessionApi>,
    /// Serializes transitions that wait on the session API
    transition: AsyncMutex<()>,
    timer_update_tx: watch::Sender<TimerState>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    last_action: Mutex<Option<(String, DateTime<Utc>)>>,
}

impl AppState {
    /// Create the store from an already restored timer state
    pub fn new(
        session_api: Arc<dyn SessionApi>,
        initial: TimerState,
        port: u16,
        host: String,
    ) -> Self {
        let (timer_update_tx, _) = watch::channel(initial.clone());

        Self {
            timer_state: Mutex::new(initial),
            session_api,
            transition: AsyncMutex::new(()),
            timer_update_tx,
            start_time: Instant::now(),
            port,
            host,
            last_action: Mutex::new(None),
        }
    }

    /// Receive every published timer state
    pub fn subscribe(&self) -> watch::Receiver<TimerState> {
        self.timer_update_tx.subscribe()
    }

    /// Get current timer state
    pub fn snapshot(&self) -> Result<TimerState, TimerError> {
        self.timer_state
            .lock()
            .map(|state| state.clone())
            .map_err(|_| TimerError::Poisoned)
    }

    /// Apply `updater` to a copy of the state and commit it only on success
    fn update<T, F>(&self, action: &str, updater: F) -> Result<(TimerState, T), TimerError>
    where
        F: FnOnce(&mut TimerState) -> Result<T, TimerError>,
    {
        let mut state = self.timer_state.lock().map_err(|_| TimerError::Poisoned)?;

        let mut next = state.clone();
        let output = updater(&mut next)?;
        *state = next.clone();
        self.publish(&next);
        drop(state);

        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some((action.to_string(), Utc::now()));
        }

        Ok((next, output))
    }

    /// Broadcast a new state. Called with the state lock held so receivers see changes in order.
    fn publish(&self, state: &TimerState) {
        self.timer_update_tx.send_replace(state.clone());
    }

    /// Switch between Pomodoro and Normal (idle only)
    pub fn set_session_type(&self, session_type: SessionType) -> Result<TimerState, TimerError> {
        info!("Setting session type to: {}", session_type);
        self.update("set-type", |state| state.set_session_type(session_type))
            .map(|(state, _)| state)
    }

    /// Set the Pomodoro length in seconds (idle only)
    pub fn set_planned_duration(&self, seconds: u64) -> Result<TimerState, TimerError> {
        info!("Setting planned duration to: {}s", seconds);
        self.update("set-duration", |state| state.set_planned_duration(seconds))
            .map(|(state, _)| state)
    }

    /// Choose the topic for the next session
    pub fn set_topic_id(&self, topic_id: Option<TopicId>) -> Result<TimerState, TimerError> {
        info!("Setting topic to: {:?}", topic_id);
        self.update("set-topic", |state| {
            state.set_topic_id(topic_id);
            Ok(())
        })
        .map(|(state, _)| state)
    }

    /// Create a server-side session and start the timer.
    ///
    /// `topic_id` overrides the selected topic and becomes the new selection.
    /// On API failure the state is left idle and the error is returned.
    pub async fn start_session(&self, topic_id: Option<TopicId>) -> Result<TimerState, TimerError> {
        let _guard = self.transition.lock().await;

        let current = self.snapshot()?;
        current.ensure_can_start()?;
        let topic = topic_id.or(current.selected_topic_id);

        let session_id = self
            .session_api
            .create_session(current.session_type, topic)
            .await?;

        let started = self.update("start", |state| {
            // Run with the type the server recorded, even if the mode was switched meanwhile
            state.session_type = current.session_type;
            if topic_id.is_some() {
                state.set_topic_id(topic_id);
            }
            state.begin(session_id, Utc::now())
        });

        match started {
            Ok((state, _)) => {
                info!(
                    "Started {} session {} (topic {:?}, time_left={}s)",
                    state.session_type, session_id, topic, state.time_left
                );
                Ok(state)
            }
            Err(e) => {
                warn!("Session {} created but could not be started locally: {}", session_id, e);
                if let Err(e) = self.session_api.delete_session(session_id).await {
                    warn!("Failed to delete orphaned session {}: {}", session_id, e);
                }
                Err(e)
            }
        }
    }

    /// Pause a running timer. Local only.
    pub fn pause_session(&self) -> Result<TimerState, TimerError> {
        let (state, _) = self.update("pause", TimerState::pause)?;
        info!("Paused session {:?} at {}s", state.current_session_id, state.time_left);
        Ok(state)
    }

    /// Resume a paused timer. Local only.
    pub fn resume_session(&self) -> Result<TimerState, TimerError> {
        let (state, _) = self.update("resume", TimerState::resume)?;
        info!("Resumed session {:?} at {}s", state.current_session_id, state.time_left);
        Ok(state)
    }

    /// Discard the current session.
    ///
    /// The server record is deleted on a best-effort basis; the local state
    /// always returns to idle.
    pub async fn reset_session(&self) -> Result<TimerState, TimerError> {
        let _guard = self.transition.lock().await;

        if let Some(session_id) = self.snapshot()?.current_session_id {
            if let Err(e) = self.session_api.delete_session(session_id).await {
                warn!("Failed to delete session {} on reset: {}", session_id, e);
            }
        }

        let (state, _) = self.update("reset", |state| {
            state.clear_session();
            Ok(())
        })?;
        info!("Timer reset");
        Ok(state)
    }

    /// Report the elapsed time to the server and return to idle.
    ///
    /// Returns `None` when no session is active. On API failure the session
    /// stays active so the caller can retry.
    pub async fn finish_session(&self) -> Result<Option<FinishedSession>, TimerError> {
        self.finish_matching(None).await
    }

    /// Finish `expected` only if it is still the active session.
    ///
    /// Returns `None` when that session already ended, even if another one has
    /// started since.
    pub async fn finish_session_if(
        &self,
        expected: SessionId,
    ) -> Result<Option<FinishedSession>, TimerError> {
        self.finish_matching(Some(expected)).await
    }

    async fn finish_matching(
        &self,
        expected: Option<SessionId>,
    ) -> Result<Option<FinishedSession>, TimerError> {
        let _guard = self.transition.lock().await;

        let current = self.snapshot()?;
        let Some(session_id) = current.current_session_id else {
            debug!("Finish requested with no active session");
            return Ok(None);
        };
        if expected.is_some_and(|id| id != session_id) {
            debug!(
                "Finish for session {:?} skipped, session {} is active",
                expected, session_id
            );
            return Ok(None);
        }
        let duration_seconds = current.elapsed_seconds();

        self.session_api
            .end_session(session_id, duration_seconds)
            .await?;

        self.update("finish", |state| {
            if state.current_session_id == Some(session_id) {
                state.clear_session();
            }
            Ok(())
        })?;

        info!("Finished session {} after {}s", session_id, duration_seconds);
        Ok(Some(FinishedSession {
            session_id,
            duration_seconds,
        }))
    }

    /// Advance the timer by one second when running
    pub fn tick(&self) -> Result<TimerState, TimerError> {
        let mut state = self.timer_state.lock().map_err(|_| TimerError::Poisoned)?;

        if state.tick() {
            debug!("Tick: time_left={}s", state.time_left);
            self.publish(&state);
        }
        Ok(state.clone())
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
        match self.last_action.lock().ok().and_then(|a| a.clone()) {
            Some((action, at)) => (Some(action), Some(at)),
            None => (None, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::fake::{Call, FakeSessionApi},
        state::Phase,
    };
    use std::sync::atomic::Ordering;

    fn store_with(initial: TimerState) -> (Arc<FakeSessionApi>, AppState) {
        let api = Arc::new(FakeSessionApi::new());
        let state = AppState::new(api.clone(), initial, 0, "127.0.0.1".to_string());
        (api, state)
    }

    fn store() -> (Arc<FakeSessionApi>, AppState) {
        store_with(TimerState::new())
    }

    #[tokio::test]
    async fn start_allocates_a_server_session() {
        let (api, store) = store();
        store.set_topic_id(Some(TopicId(5))).unwrap();

        let state = store.start_session(None).await.unwrap();
        assert_eq!(state.phase(), Phase::Running);
        assert_eq!(state.current_session_id, Some(SessionId(100)));
        assert_eq!(state.time_left, 1500);
        assert!(state.start_time.is_some());
        assert_eq!(
            api.calls(),
            vec![Call::Create(SessionType::Pomodoro, Some(TopicId(5)))]
        );
    }

    #[tokio::test]
    async fn start_topic_overrides_selection() {
        let (api, store) = store();
        store.set_topic_id(Some(TopicId(1))).unwrap();

        let state = store.start_session(Some(TopicId(2))).await.unwrap();
        assert_eq!(state.selected_topic_id, Some(TopicId(2)));
        assert_eq!(
            api.calls(),
            vec![Call::Create(SessionType::Pomodoro, Some(TopicId(2)))]
        );
    }

    #[tokio::test]
    async fn failed_start_leaves_store_idle() {
        let (api, store) = store();
        api.fail_create.store(true, Ordering::SeqCst);

        let err = store.start_session(None).await.unwrap_err();
        assert!(matches!(err, TimerError::Api(_)));
        assert_eq!(store.snapshot().unwrap(), TimerState::new());
    }

    #[tokio::test]
    async fn start_twice_is_rejected_without_a_request() {
        let (api, store) = store();
        store.start_session(None).await.unwrap();

        let err = store.start_session(None).await.unwrap_err();
        assert!(matches!(err, TimerError::InvalidTransition { .. }));
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn finish_pomodoro_reports_planned_minus_left() {
        let (api, store) = store();
        store.start_session(None).await.unwrap();
        for _ in 0..600 {
            store.tick().unwrap();
        }
        assert_eq!(store.snapshot().unwrap().time_left, 900);

        let finished = store.finish_session().await.unwrap().unwrap();
        assert_eq!(finished.duration_seconds, 600);
        assert_eq!(api.ends(), vec![(SessionId(100), 600)]);

        let state = store.snapshot().unwrap();
        assert!(state.is_idle());
        assert!(state.current_session_id.is_none());
        assert_eq!(state.time_left, 1500);
    }

    #[tokio::test]
    async fn finish_normal_reports_elapsed_with_one_second_floor() {
        let (api, store) = store();
        store.set_session_type(SessionType::Normal).unwrap();

        store.start_session(None).await.unwrap();
        for _ in 0..45 {
            store.tick().unwrap();
        }
        store.finish_session().await.unwrap();

        store.start_session(None).await.unwrap();
        store.finish_session().await.unwrap();

        assert_eq!(api.ends(), vec![(SessionId(100), 45), (SessionId(101), 1)]);
        assert_eq!(store.snapshot().unwrap().time_left, 0);
    }

    #[tokio::test]
    async fn finish_without_session_is_a_noop() {
        let (api, store) = store();
        assert!(store.finish_session().await.unwrap().is_none());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_finish_keeps_session_for_retry() {
        let (api, store) = store();
        store.start_session(None).await.unwrap();
        store.tick().unwrap();
        store.pause_session().unwrap();
        let before = store.snapshot().unwrap();

        api.fail_end.store(true, Ordering::SeqCst);
        assert!(store.finish_session().await.is_err());
        assert_eq!(store.snapshot().unwrap(), before);

        api.fail_end.store(false, Ordering::SeqCst);
        let finished = store.finish_session().await.unwrap().unwrap();
        assert_eq!(finished.duration_seconds, 1);
        assert!(store.snapshot().unwrap().is_idle());
    }

    #[tokio::test]
    async fn reset_clears_even_when_delete_fails() {
        let (api, store) = store();
        store.start_session(None).await.unwrap();
        store.tick().unwrap();
        api.fail_delete.store(true, Ordering::SeqCst);

        let state = store.reset_session().await.unwrap();
        assert!(state.current_session_id.is_none());
        assert!(!state.is_running);
        assert!(!state.is_paused);
        assert_eq!(state.time_left, 1500);
        assert!(api.calls().contains(&Call::Delete(SessionId(100))));
        assert!(api.ends().is_empty());
    }

    #[tokio::test]
    async fn reset_while_idle_makes_no_request() {
        let (api, store) = store();
        store.reset_session().await.unwrap();
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn paused_timer_ignores_ticks() {
        let (_api, store) = store();
        store.start_session(None).await.unwrap();
        store.tick().unwrap();
        store.pause_session().unwrap();
        for _ in 0..10 {
            store.tick().unwrap();
        }
        assert_eq!(store.snapshot().unwrap().time_left, 1499);

        store.resume_session().unwrap();
        store.tick().unwrap();
        assert_eq!(store.snapshot().unwrap().time_left, 1498);
    }

    #[tokio::test]
    async fn mode_changes_are_rejected_while_active() {
        let (_api, store) = store();
        store.start_session(None).await.unwrap();
        assert!(store.set_session_type(SessionType::Normal).is_err());
        assert!(store.set_planned_duration(60).is_err());
        assert!(store.set_topic_id(Some(TopicId(9))).is_ok());

        let state = store.snapshot().unwrap();
        assert_eq!(state.session_type, SessionType::Pomodoro);
        assert_eq!(state.planned_duration, 1500);
    }

    #[tokio::test]
    async fn changes_are_published_in_order() {
        let (_api, store) = store();
        let mut rx = store.subscribe();

        store.set_planned_duration(120).unwrap();
        store.start_session(None).await.unwrap();
        store.tick().unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), store.snapshot().unwrap());
        assert_eq!(store.snapshot().unwrap().time_left, 119);
        assert_eq!(store.get_last_action().0.as_deref(), Some("start"));
    }

    #[tokio::test]
    async fn finish_if_ignores_a_session_that_already_ended() {
        let (api, store) = store();
        store.start_session(None).await.unwrap();
        store.finish_session().await.unwrap();
        store.start_session(None).await.unwrap();

        assert!(store.finish_session_if(SessionId(100)).await.unwrap().is_none());
        let state = store.snapshot().unwrap();
        assert_eq!(state.current_session_id, Some(SessionId(101)));
        assert!(state.is_running);
        assert_eq!(api.ends(), vec![(SessionId(100), 1)]);

        let finished = store.finish_session_if(SessionId(101)).await.unwrap().unwrap();
        assert_eq!(finished.session_id, SessionId(101));
        assert!(store.snapshot().unwrap().is_idle());
    }
}
