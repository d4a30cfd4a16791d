use crate::session::{SessionStatus, is_placeholder_id, new_placeholder_id};
use serde::{Deserialize, Serialize};

/// One entry of the session list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub status: SessionStatus,
    /// Timestamp when the session was created (ISO 8601 format)
    pub created_at: String,
    /// The request text that started the analysis
    pub user_input: String,
    /// User-chosen name, if the session was renamed
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub pinned: bool,
}

impl SessionSummary {
    pub fn new(
        session_id: impl Into<String>,
        status: SessionStatus,
        user_input: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            status,
            created_at: chrono::Utc::now().to_rfc3339(),
            user_input: user_input.into(),
            display_name: None,
            pinned: false,
        }
    }

    /// Optimistic entry shown while a new analysis is being created.
    pub fn placeholder(user_input: impl Into<String>) -> Self {
        Self::new(new_placeholder_id(), SessionStatus::Initializing, user_input)
    }

    pub fn is_placeholder(&self) -> bool {
        is_placeholder_id(&self.session_id)
    }

    /// Name shown in the list: the display name, falling back to the input text.
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.user_input)
    }
}
