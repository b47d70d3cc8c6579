//! Session API client module
//!
//! The timer store only needs three calls from the study platform; they are
//! behind `SessionApi` so the store can be driven by a fake in tests.

pub mod http;
#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;

use crate::{
    error::ApiError,
    state::{SessionId, SessionType, TopicId},
};

pub use http::HttpSessionApi;

/// Server-side study session lifecycle
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Create a session record and return its id
    async fn create_session(
        &self,
        session_type: SessionType,
        topic_id: Option<TopicId>,
    ) -> Result<SessionId, ApiError>;

    /// Close a session with its final duration
    async fn end_session(&self, id: SessionId, duration_seconds: u64) -> Result<(), ApiError>;

    /// Remove a session record entirely
    async fn delete_session(&self, id: SessionId) -> Result<(), ApiError>;
}
