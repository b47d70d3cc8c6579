//! HTTP implementation of the session API

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::SessionApi;
use crate::{
    error::ApiError,
    state::{SessionId, SessionType, TopicId},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionRequest {
    session_type: SessionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic_id: Option<TopicId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionResponse {
    session_id: SessionId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EndSessionRequest {
    id: SessionId,
    duration_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: Option<String>,
}

/// Session API client for the study platform REST API
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    base_url: String,
    token: Option<String>,
    http_client: Client,
}

impl HttpSessionApi {
    /// Create a client for `base_url` (e.g. `https://platform.example/api`)
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::BaseUrl(base_url.to_string()));
        }

        Ok(Self {
            base_url: base_url.to_string(),
            token: token.filter(|t| !t.is_empty()),
            http_client: Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/study-sessions/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn create_session(
        &self,
        session_type: SessionType,
        topic_id: Option<TopicId>,
    ) -> Result<SessionId, ApiError> {
        let url = self.url("start-session");
        let body = StartSessionRequest {
            session_type,
            topic_id,
        };
        debug!("POST {} {:?}", url, body);

        let response = self.send(&url, self.http_client.post(&url).json(&body)).await?;
        let created: StartSessionResponse =
            response.json().await.map_err(|source| ApiError::Decode {
                url: url.clone(),
                source,
            })?;

        info!("Created {} session {}", session_type, created.session_id);
        Ok(created.session_id)
    }

    async fn end_session(&self, id: SessionId, duration_seconds: u64) -> Result<(), ApiError> {
        let url = self.url("end-session");
        let body = EndSessionRequest {
            id,
            duration_seconds,
        };
        debug!("PUT {} {:?}", url, body);

        let response = self.send(&url, self.http_client.put(&url).json(&body)).await?;
        // The acknowledgement body is informational; an empty body is fine
        let ack = response.json::<MessageResponse>().await.ok();

        info!(
            "Ended session {} after {}s{}",
            id,
            duration_seconds,
            ack.and_then(|a| a.message)
                .map(|m| format!(" ({})", m))
                .unwrap_or_default()
        );
        Ok(())
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), ApiError> {
        let url = self.url(&id.to_string());
        debug!("DELETE {}", url);

        self.send(&url, self.http_client.delete(&url)).await?;
        info!("Deleted session {}", id);
        Ok(())
    }
}
