//! REST client for the workflow backend.
//!
//! Endpoints, relative to `api_base_url`:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | Snapshot | `GET /sessions/{id}` |
//! | Resume | `POST /sessions/{id}/resume` with `{session_id, payload}` |
//! | List | `GET /sessions?page=&page_size=` |
//! | Create | `POST /sessions` with `{user_input}` |
//! | Rename / pin | `PATCH /sessions/{id}` with `{display_name}` / `{pinned}` |
//! | Delete | `DELETE /sessions/{id}` |
//!
//! Every request carries `Authorization: Bearer <token>`.

use crate::config::ClientConfig;
use crate::dto::{
    CreateSessionRequest, PinRequest, RenameRequest, SessionPageDto, SessionSummaryDto,
    SnapshotDto,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use stagewatch_core::credential::CredentialProvider;
use stagewatch_core::error::NetworkErrorKind;
use stagewatch_core::interrupt::ResumeRequest;
use stagewatch_core::registry::{SessionListGateway, SessionPage, SessionSummary};
use stagewatch_core::session::{ResumeGateway, SessionSnapshot, SnapshotGateway};
use stagewatch_core::{Result, SyncError};
use std::sync::Arc;

#[derive(Clone)]
pub struct HttpWorkflowApi {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpWorkflowApi {
    pub fn new(config: &ClientConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SyncError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, config.api_base(), credentials))
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn session_url(&self, session_id: &str) -> String {
        format!("{}/sessions/{}", self.base_url, session_id)
    }

    /// Attaches the bearer token, sends, and classifies non-2xx statuses.
    async fn send(&self, request: RequestBuilder, session_id: &str) -> Result<Response> {
        let token = self.credentials.bearer_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body, session_id))
    }
}

/// Maps a non-2xx response to the error taxonomy.
pub fn classify_status(status: StatusCode, body: &str, session_id: &str) -> SyncError {
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    });
    match status {
        StatusCode::NOT_FOUND => SyncError::not_found("Session", session_id),
        StatusCode::GONE => SyncError::stale(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            SyncError::validation(message)
        }
        s if s.is_server_error() => SyncError::server(s.as_u16(), message),
        s => SyncError::internal(format!("unexpected status {}: {}", s.as_u16(), message)),
    }
}

/// Extracts `detail` or `message` from a JSON error body, or the raw text.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return Some(text.to_string());
            }
        }
    }
    Some(body.to_string())
}

fn map_transport_error(err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        SyncError::network(NetworkErrorKind::Timeout, err.to_string())
    } else if err.is_connect() {
        SyncError::network(NetworkErrorKind::Offline, err.to_string())
    } else if err.is_decode() {
        SyncError::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    } else {
        SyncError::network(NetworkErrorKind::Other, err.to_string())
    }
}

#[async_trait]
impl SnapshotGateway for HttpWorkflowApi {
    async fn fetch_snapshot(&self, session_id: &str) -> Result<SessionSnapshot> {
        let request = self.client.get(self.session_url(session_id));
        let response = self.send(request, session_id).await?;
        let dto: SnapshotDto = response.json().await.map_err(map_transport_error)?;
        dto.into_domain(session_id)
    }
}

#[async_trait]
impl ResumeGateway for HttpWorkflowApi {
    async fn submit_resume(&self, request: &ResumeRequest) -> Result<()> {
        let url = format!("{}/resume", self.session_url(&request.session_id));
        let http = self.client.post(url).json(request);
        self.send(http, &request.session_id).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionListGateway for HttpWorkflowApi {
    async fn list_sessions(&self, page: u32, page_size: u32) -> Result<SessionPage> {
        let request = self
            .client
            .get(format!("{}/sessions", self.base_url))
            .query(&[("page", page), ("page_size", page_size)]);
        let response = self.send(request, "").await?;
        let dto: SessionPageDto = response.json().await.map_err(map_transport_error)?;
        Ok(dto.into_domain())
    }

    async fn create_session(&self, user_input: &str) -> Result<SessionSummary> {
        let request = self
            .client
            .post(format!("{}/sessions", self.base_url))
            .json(&CreateSessionRequest { user_input });
        let response = self.send(request, "").await?;
        let dto: SessionSummaryDto = response.json().await.map_err(map_transport_error)?;
        let mut summary = dto.into_domain();
        if summary.user_input.is_empty() {
            summary.user_input = user_input.to_string();
        }
        Ok(summary)
    }

    async fn rename_session(&self, session_id: &str, display_name: &str) -> Result<()> {
        let request = self
            .client
            .patch(self.session_url(session_id))
            .json(&RenameRequest { display_name });
        self.send(request, session_id).await?;
        Ok(())
    }

    async fn set_pinned(&self, session_id: &str, pinned: bool) -> Result<()> {
        let request = self
            .client
            .patch(self.session_url(session_id))
            .json(&PinRequest { pinned });
        self.send(request, session_id).await?;
        Ok(())
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let request = self.client.delete(self.session_url(session_id));
        match self.send(request, session_id).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::debug!(
                    "[HttpWorkflowApi] Session {} already deleted",
                    session_id
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
