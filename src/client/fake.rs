//! Recording in-memory `SessionApi` for tests

use std::{
    sync::{
        atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use super::SessionApi;
use crate::{
    error::ApiError,
    state::{SessionId, SessionType, TopicId},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(SessionType, Option<TopicId>),
    End(SessionId, u64),
    Delete(SessionId),
}

#[derive(Debug, Default)]
pub struct FakeSessionApi {
    next_id: AtomicI64,
    pub fail_create: AtomicBool,
    pub fail_end: AtomicBool,
    pub fail_delete: AtomicBool,
    /// Milliseconds `end_session` waits before answering
    pub end_delay_ms: AtomicU64,
    calls: Mutex<Vec<Call>>,
}

impl FakeSessionApi {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ends(&self) -> Vec<(SessionId, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::End(id, secs) => Some((id, secs)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn refused(what: &str) -> ApiError {
        ApiError::Status {
            url: format!("fake://{}", what),
            status: 503,
            body: "unavailable".to_string(),
        }
    }
}

#[async_trait]
impl SessionApi for FakeSessionApi {
    async fn create_session(
        &self,
        session_type: SessionType,
        topic_id: Option<TopicId>,
    ) -> Result<SessionId, ApiError> {
        self.record(Call::Create(session_type, topic_id));
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Self::refused("start-session"));
        }
        Ok(SessionId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn end_session(&self, id: SessionId, duration_seconds: u64) -> Result<(), ApiError> {
        self.record(Call::End(id, duration_seconds));
        let delay = self.end_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_end.load(Ordering::SeqCst) {
            return Err(Self::refused("end-session"));
        }
        Ok(())
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), ApiError> {
        self.record(Call::Delete(id));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::refused("delete"));
        }
        Ok(())
    }
}
