use super::model::SessionStatus;
use crate::interrupt::InterruptPayload;

/// Fields carried by `status` / `status_update` events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusChange {
    pub status: Option<SessionStatus>,
    pub progress: Option<f64>,
    pub error: Option<String>,
    pub rejection_reason: Option<String>,
    pub final_report_ref: Option<String>,
    pub interrupt_data: Option<InterruptPayload>,
}

/// Canonical incremental event, normalized from any wire protocol version.
///
/// Each variant updates a strict subset of the session fields. Legacy field
/// aliases are resolved before an event gets here.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// Sent by the backend right after the stream connects.
    InitialStatus {
        status: Option<SessionStatus>,
        progress: Option<f64>,
        current_stage: Option<String>,
        detail: Option<String>,
        interrupt_data: Option<InterruptPayload>,
    },
    /// Both `status_update` and the older `status` kind.
    StatusUpdate(StatusChange),
    NodeUpdate {
        node: String,
        detail: String,
        timestamp: Option<String>,
    },
    Interrupt { payload: InterruptPayload },
    /// Any event kind this client does not understand
    Unsupported { kind: String },
}

impl WorkflowEvent {
    /// Event kind name used in diagnostics.
    pub fn kind(&self) -> &str {
        match self {
            Self::InitialStatus { .. } => "initial_status",
            Self::StatusUpdate(_) => "status_update",
            Self::NodeUpdate { .. } => "node_update",
            Self::Interrupt { .. } => "interrupt",
            Self::Unsupported { kind } => kind.as_str(),
        }
    }

    /// The status this event announces, if any.
    pub fn status(&self) -> Option<SessionStatus> {
        match self {
            Self::InitialStatus { status, .. } => *status,
            Self::StatusUpdate(change) => change.status,
            Self::NodeUpdate { .. } => Some(SessionStatus::Running),
            Self::Interrupt { .. } => Some(SessionStatus::WaitingForInput),
            Self::Unsupported { .. } => None,
        }
    }

    pub fn status_update(status: SessionStatus, progress: Option<f64>) -> Self {
        Self::StatusUpdate(StatusChange {
            status: Some(status),
            progress,
            ..StatusChange::default()
        })
    }

    pub fn node_update(node: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::NodeUpdate {
            node: node.into(),
            detail: detail.into(),
            timestamp: None,
        }
    }
}
