//! API request and response structures

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::TimerError,
    state::{format_clock, FinishedSession, Phase, SessionType, TimerState, TopicId},
};

/// Body of `POST /timer/start`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub topic_id: Option<TopicId>,
}

/// Body of `PUT /timer/type`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTypeRequest {
    pub session_type: SessionType,
}

/// Body of `PUT /timer/duration`
#[derive(Debug, Clone, Deserialize)]
pub struct DurationRequest {
    pub seconds: u64,
}

/// Body of `PUT /timer/topic`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRequest {
    pub topic_id: Option<TopicId>,
}

/// Timer state as shown to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub phase: Phase,
    /// `timeLeft` rendered as a clock face
    pub clock: String,
    #[serde(flatten)]
    pub state: TimerState,
}

impl From<TimerState> for TimerView {
    fn from(state: TimerState) -> Self {
        Self {
            phase: state.phase(),
            clock: format_clock(state.time_left),
            state,
        }
    }
}

/// API response structure for state change endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished: Option<FinishedSession>,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(message: impl Into<String>, timer: TimerState) -> Self {
        Self {
            status: timer.phase().to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            timer: timer.into(),
            finished: None,
        }
    }

    /// Attach the outcome of a finished session
    pub fn with_finished(mut self, finished: Option<FinishedSession>) -> Self {
        self.finished = finished;
        self
    }
}

/// Status response with server information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub timer: TimerView,
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

/// Error body returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

/// Handler failure rendered as an HTTP response
#[derive(Debug)]
pub enum HttpError {
    Timer(TimerError),
    /// Request body could not be decoded
    BadRequest(JsonRejection),
}

impl From<TimerError> for HttpError {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

impl From<JsonRejection> for HttpError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(e)
    }
}

impl HttpError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HttpError::Timer(TimerError::InvalidTransition { .. }) => StatusCode::CONFLICT,
            HttpError::Timer(TimerError::Api(_)) => StatusCode::BAD_GATEWAY,
            HttpError::Timer(TimerError::Poisoned) => StatusCode::INTERNAL_SERVER_ERROR,
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> String {
        match self {
            HttpError::Timer(e) => e.to_string(),
            HttpError::BadRequest(rejection) => rejection.body_text(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            status: "error".to_string(),
            message: self.message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
