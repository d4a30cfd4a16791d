//! Session list service.
//!
//! `SessionRegistry` is the only state shared by all active session views.
//! It is cheap to clone; every clone sees the same list. The lock is never
//! held across a network call.

use stagewatch_core::Result;
use stagewatch_core::registry::{SessionList, SessionListGateway, SessionSummary};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct SessionRegistry {
    gateway: Arc<dyn SessionListGateway>,
    list: Arc<RwLock<SessionList>>,
    page_size: u32,
}

impl SessionRegistry {
    pub fn new(gateway: Arc<dyn SessionListGateway>, page_size: u32) -> Self {
        Self {
            gateway,
            list: Arc::new(RwLock::new(SessionList::new())),
            page_size: page_size.max(1),
        }
    }

    /// Current entries, in display order.
    pub async fn sessions(&self) -> Vec<SessionSummary> {
        self.list.read().await.entries().to_vec()
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionSummary> {
        self.list.read().await.get(session_id).cloned()
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.list.read().await.contains(session_id)
    }

    pub async fn has_more(&self) -> bool {
        self.list.read().await.has_more()
    }

    /// Merges the server's first page into the list, keeping every page
    /// already loaded. Returns the number of listed sessions.
    pub async fn refresh(&self) -> Result<usize> {
        let page = self.gateway.list_sessions(0, self.page_size).await?;
        let mut list = self.list.write().await;
        let added = list.merge_first_page(page.sessions, page.has_next);
        tracing::debug!(
            "[SessionRegistry] Refreshed: {} new, {} sessions",
            added,
            list.len()
        );
        Ok(list.len())
    }

    /// Replaces the list with the server's first page.
    async fn resync(&self) -> Result<usize> {
        let page = self.gateway.list_sessions(0, self.page_size).await?;
        let mut list = self.list.write().await;
        list.reset_with(page.sessions, page.has_next);
        tracing::debug!("[SessionRegistry] Resynced: {} sessions", list.len());
        Ok(list.len())
    }

    /// Fetches the next page. Returns the number of new entries.
    pub async fn load_more(&self) -> Result<usize> {
        let page_index = {
            let list = self.list.read().await;
            if !list.has_more() {
                return Ok(0);
            }
            list.next_page()
        };

        let page = self.gateway.list_sessions(page_index, self.page_size).await?;

        let mut list = self.list.write().await;
        let added = if list.next_page() == page_index {
            list.record_page(page.sessions, page.has_next)
        } else {
            // Another caller already recorded this page.
            list.merge(page.sessions)
        };
        tracing::debug!(
            "[SessionRegistry] Page {}: {} new sessions, has_more={}",
            page_index,
            added,
            list.has_more()
        );
        Ok(added)
    }

    /// Fetches pages until the server has no more.
    pub async fn load_all(&self) -> Result<usize> {
        let mut total = 0;
        while self.has_more().await {
            total += self.load_more().await?;
        }
        Ok(total)
    }

    /// Starts a new analysis.
    ///
    /// A placeholder is listed immediately and replaced in place by the
    /// confirmed session, or removed if creation fails.
    pub async fn create(&self, user_input: &str) -> Result<SessionSummary> {
        let placeholder = SessionSummary::placeholder(user_input);
        let placeholder_id = placeholder.session_id.clone();
        self.list.write().await.prepend_placeholder(placeholder);

        match self.gateway.create_session(user_input).await {
            Ok(confirmed) => {
                tracing::info!(
                    "[SessionRegistry] Created session {}",
                    confirmed.session_id
                );
                let replaced = self
                    .list
                    .write()
                    .await
                    .confirm_placeholder(&placeholder_id, confirmed.clone());
                if !replaced {
                    tracing::debug!(
                        "[SessionRegistry] Placeholder for {} was gone; listed at the front",
                        confirmed.session_id
                    );
                }
                Ok(confirmed)
            }
            Err(e) => {
                tracing::warn!("[SessionRegistry] Create failed: {}", e);
                self.list.write().await.forget(&placeholder_id);
                Err(e)
            }
        }
    }

    /// Renames a session, reverting the local change if the server refuses.
    pub async fn rename(&self, session_id: &str, display_name: &str) -> Result<()> {
        let previous = self
            .list
            .write()
            .await
            .rename(session_id, Some(display_name.to_string()))?;

        if let Err(e) = self.gateway.rename_session(session_id, display_name).await {
            tracing::warn!(
                "[SessionRegistry] Rename of {} failed, reverting: {}",
                session_id,
                e
            );
            let _ = self.list.write().await.rename(session_id, previous);
            return Err(e);
        }
        Ok(())
    }

    /// Pins or unpins a session, reverting the local change if the server refuses.
    pub async fn set_pinned(&self, session_id: &str, pinned: bool) -> Result<()> {
        let undo = self.list.write().await.set_pinned(session_id, pinned)?;

        if let Err(e) = self.gateway.set_pinned(session_id, pinned).await {
            tracing::warn!(
                "[SessionRegistry] Pin of {} failed, reverting: {}",
                session_id,
                e
            );
            self.list.write().await.restore_pin(undo);
            return Err(e);
        }
        Ok(())
    }

    /// Deletes a session once the server confirms.
    ///
    /// On failure the list is re-fetched from the server instead of being
    /// filtered locally.
    pub async fn delete(&self, session_id: &str) -> Result<()> {
        match self.gateway.delete_session(session_id).await {
            Ok(()) => {
                self.list.write().await.forget(session_id);
                tracing::info!("[SessionRegistry] Deleted session {}", session_id);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    "[SessionRegistry] Delete of {} failed, resyncing: {}",
                    session_id,
                    e
                );
                if let Err(resync_err) = self.resync().await {
                    tracing::warn!("[SessionRegistry] Resync failed: {}", resync_err);
                }
                Err(e)
            }
        }
    }

    /// Drops a session the backend reported as gone.
    pub async fn forget(&self, session_id: &str) -> bool {
        self.list.write().await.forget(session_id).is_some()
    }

    /// Lists a session a view discovered but the list does not show yet.
    pub async fn upsert(&self, summary: SessionSummary) -> bool {
        self.list.write().await.upsert_front(summary)
    }
}
