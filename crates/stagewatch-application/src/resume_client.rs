//! Resume submission and outcome classification.

use stagewatch_core::interrupt::{InteractionType, ResumePayload, ResumeRequest};
use stagewatch_core::session::ResumeGateway;
use stagewatch_core::{Result, SyncError};
use std::sync::Arc;

/// What the caller must do after a resume attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeOutcome {
    /// The backend accepted the decision
    Accepted,
    /// The workflow is stale; do not show the interrupt again
    RestartRequired(SyncError),
    /// Any other failure; show the same interrupt again
    Retryable(SyncError),
}

impl ResumeOutcome {
    pub fn classify(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::Accepted,
            Err(e) if e.is_stale() => Self::RestartRequired(e),
            Err(e) => Self::Retryable(e),
        }
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Accepted => Ok(()),
            Self::RestartRequired(e) | Self::Retryable(e) => Err(e),
        }
    }
}

pub struct ResumeClient {
    gateway: Arc<dyn ResumeGateway>,
}

impl ResumeClient {
    pub fn new(gateway: Arc<dyn ResumeGateway>) -> Self {
        Self { gateway }
    }

    /// Rejects payloads whose shape the interaction cannot accept, before
    /// anything is sent.
    pub fn check_shape(kind: InteractionType, payload: &ResumePayload) -> Result<()> {
        if payload.is_shape_valid_for(kind) {
            Ok(())
        } else {
            Err(SyncError::validation(format!(
                "this response cannot answer a {} prompt",
                kind
            )))
        }
    }

    /// Submits `payload` for `session_id` and classifies the result.
    pub async fn resume(&self, session_id: &str, payload: ResumePayload) -> ResumeOutcome {
        let request = ResumeRequest::new(session_id, payload);
        tracing::debug!("[ResumeClient] Submitting resume for {}", session_id);

        let outcome = ResumeOutcome::classify(self.gateway.submit_resume(&request).await);
        match &outcome {
            ResumeOutcome::Accepted => {
                tracing::info!("[ResumeClient] Resume accepted for {}", session_id)
            }
            ResumeOutcome::RestartRequired(e) => tracing::warn!(
                "[ResumeClient] Workflow {} is stale, restart required: {}",
                session_id,
                e
            ),
            ResumeOutcome::Retryable(e) => {
                tracing::warn!("[ResumeClient] Resume for {} failed: {}", session_id, e)
            }
        }
        outcome
    }
}
