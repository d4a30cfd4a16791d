use serde::{Deserialize, Serialize};
use stagewatch_core::registry::{SessionPage, SessionSummary};
use stagewatch_core::session::SessionStatus;

/// One element of the session list response.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSummaryDto {
    #[serde(alias = "id")]
    pub session_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub user_input: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub pinned: bool,
}

impl SessionSummaryDto {
    pub fn into_domain(self) -> SessionSummary {
        let status = match self.status.as_deref() {
            Some(raw) => SessionStatus::parse(raw).unwrap_or_else(|| {
                tracing::warn!(
                    "[SessionSummaryDto] Unknown status '{}' for session {}",
                    raw,
                    self.session_id
                );
                SessionStatus::default()
            }),
            None => SessionStatus::default(),
        };
        SessionSummary {
            session_id: self.session_id,
            status,
            created_at: self.created_at.unwrap_or_default(),
            user_input: self.user_input.unwrap_or_default(),
            display_name: self.display_name,
            pinned: self.pinned,
        }
    }
}

/// Session list response page.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionPageDto {
    #[serde(default)]
    pub sessions: Vec<SessionSummaryDto>,
    #[serde(default)]
    pub has_next: bool,
}

impl SessionPageDto {
    pub fn into_domain(self) -> SessionPage {
        SessionPage {
            sessions: self
                .sessions
                .into_iter()
                .map(SessionSummaryDto::into_domain)
                .collect(),
            has_next: self.has_next,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest<'a> {
    pub user_input: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameRequest<'a> {
    pub display_name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PinRequest {
    pub pinned: bool,
}
