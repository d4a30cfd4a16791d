//! Snapshot loading with the derived-session grace window.

use stagewatch_core::Result;
use stagewatch_core::retry::RetryPolicy;
use stagewatch_core::session::{DerivedSessionRule, SessionSnapshot, SnapshotGateway};
use std::sync::Arc;

/// Fetches the one-shot snapshot a session view starts from.
///
/// Ordinary sessions get a single attempt: "not found" is final. Sessions
/// whose id marks them as derived get the grace policy, because the backend
/// may still be materializing them when the view opens.
pub struct SnapshotLoader {
    gateway: Arc<dyn SnapshotGateway>,
    derived_rule: DerivedSessionRule,
    grace: RetryPolicy,
}

impl SnapshotLoader {
    pub fn new(
        gateway: Arc<dyn SnapshotGateway>,
        derived_rule: DerivedSessionRule,
        grace: RetryPolicy,
    ) -> Self {
        Self {
            gateway,
            derived_rule,
            grace,
        }
    }

    /// The policy that applies to `session_id`.
    pub fn policy_for(&self, session_id: &str) -> RetryPolicy {
        if self.derived_rule.is_derived(session_id) {
            self.grace.clone()
        } else {
            RetryPolicy::none()
        }
    }

    /// Loads the snapshot of `session_id`.
    ///
    /// # Errors
    ///
    /// - `SyncError::NotFound`: no such session (after the grace window, for derived ids)
    /// - `SyncError::Stale`: the workflow was superseded
    /// - `SyncError::Server` / `SyncError::Network`: transient, the caller may retry
    pub async fn load(&self, session_id: &str) -> Result<SessionSnapshot> {
        let policy = self.policy_for(session_id);
        tracing::debug!(
            "[SnapshotLoader] Loading {} (max {} attempts)",
            session_id,
            policy.max_attempts
        );

        let result = policy
            .run(|attempt| async move {
                if attempt > 1 {
                    tracing::info!(
                        "[SnapshotLoader] {} not materialized yet, attempt {}",
                        session_id,
                        attempt
                    );
                }
                self.gateway.fetch_snapshot(session_id).await
            })
            .await;

        match &result {
            Ok(snapshot) => tracing::info!(
                "[SnapshotLoader] Loaded {}: status={}, progress={:.2}, {} history entries",
                session_id,
                snapshot.status,
                snapshot.progress,
                snapshot.history.len()
            ),
            Err(e) if e.is_transient() => {
                tracing::warn!("[SnapshotLoader] Transient failure for {}: {}", session_id, e)
            }
            Err(e) => tracing::error!("[SnapshotLoader] Failed to load {}: {}", session_id, e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use stagewatch_core::SyncError;
    use stagewatch_core::session::SessionStatus;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedGateway {
        responses: Mutex<VecDeque<Result<SessionSnapshot>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedGateway {
        fn new(responses: Vec<Result<SessionSnapshot>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl SnapshotGateway for ScriptedGateway {
        async fn fetch_snapshot(&self, session_id: &str) -> Result<SessionSnapshot> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(SyncError::not_found("Session", session_id)))
        }
    }

    fn loader(gateway: Arc<ScriptedGateway>) -> SnapshotLoader {
        SnapshotLoader::new(
            gateway,
            DerivedSessionRule::default(),
            RetryPolicy::derived_session_grace(3, Duration::from_secs(2)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_derived_session_loads_within_grace_window() {
        let gateway = ScriptedGateway::new(vec![
            Err(SyncError::not_found("Session", "abc-followup-1")),
            Err(SyncError::not_found("Session", "abc-followup-1")),
            Ok(SessionSnapshot::new("abc-followup-1", SessionStatus::Running)),
        ]);

        let snapshot = loader(Arc::clone(&gateway))
            .load("abc-followup-1")
            .await
            .unwrap();

        assert_eq!(snapshot.status, SessionStatus::Running);
        assert_eq!(gateway.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ordinary_session_not_found_is_final() {
        let gateway = ScriptedGateway::new(vec![
            Err(SyncError::not_found("Session", "abc")),
            Ok(SessionSnapshot::new("abc", SessionStatus::Running)),
        ]);

        let err = loader(Arc::clone(&gateway)).load("abc").await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_window_does_not_retry_server_errors() {
        let gateway = ScriptedGateway::new(vec![Err(SyncError::server(502, "bad gateway"))]);

        let err = loader(Arc::clone(&gateway))
            .load("abc-followup-2")
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_window_is_bounded() {
        let gateway = ScriptedGateway::new(Vec::new());

        let err = loader(Arc::clone(&gateway))
            .load("abc-followup-3")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(gateway.calls(), 3);
    }
}
