//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{body::Bytes, extract::State, response::Json};
use tracing::{error, info};

use crate::state::AppState;
use super::responses::{
    ApiResponse, DurationRequest, HealthResponse, HttpError, SessionTypeRequest, StartRequest,
    StatusResponse, TopicRequest,
};

type HandlerResult<T> = Result<Json<T>, HttpError>;

/// Handle POST /timer/start - Create a server session and start the timer
///
/// An empty body starts with the selected topic; a body that is present must
/// be a valid `StartRequest`.
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> HandlerResult<ApiResponse> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        StartRequest::default()
    } else {
        let Json(request) = Json::<StartRequest>::from_bytes(&body)?;
        request
    };

    match state.start_session(request.topic_id).await {
        Ok(timer) => {
            info!("Start endpoint called - session started");
            Ok(Json(ApiResponse::new("Study session started", timer)))
        }
        Err(e) => {
            error!("Failed to start study session: {}", e);
            Err(e.into())
        }
    }
}

/// Handle POST /timer/pause - Pause the running timer
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> HandlerResult<ApiResponse> {
    let timer = state.pause_session()?;
    Ok(Json(ApiResponse::new("Study session paused", timer)))
}

/// Handle POST /timer/resume - Resume the paused timer
pub async fn resume_handler(State(state): State<Arc<AppState>>) -> HandlerResult<ApiResponse> {
    let timer = state.resume_session()?;
    Ok(Json(ApiResponse::new("Study session resumed", timer)))
}

/// Handle POST /timer/finish - Record the elapsed time and stop
pub async fn finish_handler(State(state): State<Arc<AppState>>) -> HandlerResult<ApiResponse> {
    let finished = match state.finish_session().await {
        Ok(finished) => finished,
        Err(e) => {
            error!("Failed to finish study session: {}", e);
            return Err(e.into());
        }
    };

    let message = match &finished {
        Some(f) => format!("Study session recorded with {}s", f.duration_seconds),
        None => "No active study session".to_string(),
    };
    Ok(Json(
        ApiResponse::new(message, state.snapshot()?).with_finished(finished),
    ))
}

/// Handle POST /timer/reset - Discard the current session
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> HandlerResult<ApiResponse> {
    let timer = state.reset_session().await?;
    Ok(Json(ApiResponse::new("Timer reset", timer)))
}

/// Handle PUT /timer/type - Switch between Pomodoro and Normal
pub async fn session_type_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SessionTypeRequest>,
) -> HandlerResult<ApiResponse> {
    let timer = state.set_session_type(request.session_type)?;
    Ok(Json(ApiResponse::new(
        format!("Session type set to {}", request.session_type),
        timer,
    )))
}

/// Handle PUT /timer/duration - Set the Pomodoro length
pub async fn duration_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DurationRequest>,
) -> HandlerResult<ApiResponse> {
    let timer = state.set_planned_duration(request.seconds)?;
    let message = format!("Planned duration set to {}s", timer.planned_duration);
    Ok(Json(ApiResponse::new(message, timer)))
}

/// Handle PUT /timer/topic - Select the topic for the next session
pub async fn topic_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TopicRequest>,
) -> HandlerResult<ApiResponse> {
    let timer = state.set_topic_id(request.topic_id)?;
    let message = match request.topic_id {
        Some(topic) => format!("Topic set to {}", topic),
        None => "Topic cleared".to_string(),
    };
    Ok(Json(ApiResponse::new(message, timer)))
}

/// Handle GET /status - Return current timer status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> HandlerResult<StatusResponse> {
    let timer = state.snapshot()?;
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer: timer.into(),
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
