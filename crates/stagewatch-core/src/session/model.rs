//! Session domain model.
//!
//! This module contains the core Session entity that represents one run of
//! the backend analysis pipeline as seen by this client.

use crate::interrupt::InterruptPayload;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a workflow session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Initializing,
    Running,
    WaitingForInput,
    Rejected,
    Completed,
    Failed,
}

impl SessionStatus {
    /// Parses the wire representation. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "initializing" => Some(Self::Initializing),
            "running" => Some(Self::Running),
            "waiting_for_input" => Some(Self::WaitingForInput),
            "rejected" => Some(Self::Rejected),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::WaitingForInput => "waiting_for_input",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Completed, failed and rejected sessions never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Rejected)
    }

    /// Statuses for which the current stage is considered "active".
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::WaitingForInput)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents one workflow session in the client's domain layer.
///
/// A session contains:
/// - Lifecycle status and monotonic progress
/// - The node currently executing and its free-text detail
/// - Terminal outcome fields (error, rejection reason, final report reference)
/// - The pending interrupt while the pipeline waits for a human decision
///
/// Sessions are only ever mutated through `StateReconciler`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Server-assigned session identifier (or a local placeholder id)
    pub id: String,
    pub status: SessionStatus,
    /// Fraction of the pipeline completed, within [0, 1]
    pub progress: f64,
    /// Node id of the stage currently executing
    pub current_stage: Option<String>,
    pub detail: String,
    pub error: Option<String>,
    pub rejection_reason: Option<String>,
    /// Reference to the final report once the pipeline completes
    pub final_report_ref: Option<String>,
    /// Present iff `status == WaitingForInput`
    pub interrupt_data: Option<InterruptPayload>,
    /// Timestamp when the session was created (ISO 8601 format)
    pub created_at: String,
}

impl Session {
    /// Creates a fresh session in the `initializing` state.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: SessionStatus::Initializing,
            progress: 0.0,
            current_stage: None,
            detail: String::new(),
            error: None,
            rejection_reason: None,
            final_report_ref: None,
            interrupt_data: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Creates the optimistic placeholder shown while a new analysis is being submitted.
    pub fn placeholder(id: impl Into<String>, user_input: impl Into<String>) -> Self {
        let mut session = Self::new(id);
        session.detail = user_input.into();
        session
    }

    pub fn is_waiting_for_input(&self) -> bool {
        self.status == SessionStatus::WaitingForInput
    }

    /// Returns a description of every violated state invariant.
    ///
    /// An empty vector means the session is consistent.
    pub fn check_invariants(&self) -> Vec<&'static str> {
        let mut violations = Vec::new();
        if !(0.0..=1.0).contains(&self.progress) {
            violations.push("progress outside [0, 1]");
        }
        if self.interrupt_data.is_some() != self.is_waiting_for_input() {
            violations.push("interrupt_data present iff status is waiting_for_input");
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_wire_names() {
        for status in [
            SessionStatus::Initializing,
            SessionStatus::Running,
            SessionStatus::WaitingForInput,
            SessionStatus::Rejected,
            SessionStatus::Completed,
            SessionStatus::Failed,
        ] {
            assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SessionStatus::parse("paused"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Rejected.is_terminal());
        assert!(!SessionStatus::WaitingForInput.is_terminal());
        assert!(SessionStatus::WaitingForInput.is_active());
    }

    #[test]
    fn test_new_session_is_consistent() {
        let session = Session::new("s-1");
        assert_eq!(session.status, SessionStatus::Initializing);
        assert!(session.check_invariants().is_empty());
    }

    #[test]
    fn test_waiting_without_interrupt_violates_invariant() {
        let mut session = Session::new("s-1");
        session.status = SessionStatus::WaitingForInput;
        assert_eq!(session.check_invariants().len(), 1);
    }
}
