use super::model::SessionSummary;
use crate::error::Result;
use async_trait::async_trait;

/// One page of the session list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPage {
    pub sessions: Vec<SessionSummary>,
    /// Server-side "more pages exist" flag
    pub has_next: bool,
}

/// Backend operations on the current user's sessions.
#[async_trait]
pub trait SessionListGateway: Send + Sync {
    /// Fetches one page (zero-based) of the session list, newest first.
    async fn list_sessions(&self, page: u32, page_size: u32) -> Result<SessionPage>;

    /// Starts a new analysis and returns the server-confirmed session.
    async fn create_session(&self, user_input: &str) -> Result<SessionSummary>;

    async fn rename_session(&self, session_id: &str, display_name: &str) -> Result<()>;

    async fn set_pinned(&self, session_id: &str, pinned: bool) -> Result<()>;

    /// Deletes a session.
    ///
    /// Deleting a session that no longer exists succeeds.
    async fn delete_session(&self, session_id: &str) -> Result<()>;
}
