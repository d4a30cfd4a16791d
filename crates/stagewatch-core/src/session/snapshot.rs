//! Point-in-time session state, as returned by the snapshot endpoint.

use super::history::NodeHistoryEntry;
use super::model::SessionStatus;
use crate::interrupt::InterruptPayload;

/// A one-shot summary of a session, already normalized from the wire shape.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub status: SessionStatus,
    pub progress: f64,
    pub current_stage: Option<String>,
    pub detail: String,
    /// Full node history, oldest first
    pub history: Vec<NodeHistoryEntry>,
    pub interrupt_data: Option<InterruptPayload>,
    pub error: Option<String>,
    pub rejection_reason: Option<String>,
    pub final_report_ref: Option<String>,
    pub created_at: Option<String>,
}

impl SessionSnapshot {
    /// A snapshot with only the id and status set.
    pub fn new(session_id: impl Into<String>, status: SessionStatus) -> Self {
        Self {
            session_id: session_id.into(),
            status,
            progress: 0.0,
            current_stage: None,
            detail: String::new(),
            history: Vec::new(),
            interrupt_data: None,
            error: None,
            rejection_reason: None,
            final_report_ref: None,
            created_at: None,
        }
    }
}
