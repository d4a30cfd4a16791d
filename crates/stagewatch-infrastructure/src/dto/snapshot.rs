use serde::Deserialize;
use serde_json::Value;
use stagewatch_core::interrupt::InterruptPayload;
use stagewatch_core::session::{NodeHistoryEntry, SessionSnapshot, SessionStatus};
use stagewatch_core::{Result, SyncError};

/// One `history` element of a snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntryDto {
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HistoryEntryDto {
    fn into_domain(self) -> Option<NodeHistoryEntry> {
        let node = self.node.or(self.node_name)?;
        Some(NodeHistoryEntry::new(
            node,
            self.detail.unwrap_or_default(),
            self.time.or(self.timestamp).unwrap_or_default(),
        ))
    }
}

/// Response body of the snapshot endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotDto {
    #[serde(default)]
    pub session_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub current_stage: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntryDto>,
    #[serde(default)]
    pub interrupt_data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub rejection_message: Option<String>,
    #[serde(default)]
    pub final_report: Option<String>,
    #[serde(default)]
    pub final_report_ref: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl SnapshotDto {
    /// Normalizes into a domain snapshot for `requested_id`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Unsupported` when the status is unknown.
    pub fn into_domain(self, requested_id: &str) -> Result<SessionSnapshot> {
        let status = SessionStatus::parse(&self.status)
            .ok_or_else(|| SyncError::unsupported("session status", self.status.clone()))?;

        let history: Vec<NodeHistoryEntry> = self
            .history
            .into_iter()
            .filter_map(|entry| {
                let parsed = entry.into_domain();
                if parsed.is_none() {
                    tracing::warn!("[SnapshotDto] Skipping history entry without a node name");
                }
                parsed
            })
            .collect();

        Ok(SessionSnapshot {
            session_id: self.session_id.unwrap_or_else(|| requested_id.to_string()),
            status,
            progress: self.progress.unwrap_or_default(),
            current_stage: self.current_stage,
            detail: self.detail.unwrap_or_default(),
            history,
            interrupt_data: self
                .interrupt_data
                .filter(|value| !value.is_null())
                .map(InterruptPayload::from_value),
            error: self.error,
            rejection_reason: self.rejection_reason.or(self.rejection_message),
            final_report_ref: self.final_report_ref.or(self.final_report),
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> SessionSnapshot {
        let dto: SnapshotDto = serde_json::from_value(value).unwrap();
        dto.into_domain("s-1").unwrap()
    }

    #[test]
    fn test_full_snapshot() {
        let snapshot = parse(json!({
            "status": "waiting_for_input",
            "progress": 0.45,
            "current_stage": "requirements_analyst",
            "detail": "awaiting confirmation",
            "history": [
                {"node": "intake", "detail": "parsed", "time": "2024-05-01T10:00:00Z"},
                {"node_name": "requirements_analyst", "detail": "分析中", "timestamp": "2024-05-01T10:01:00Z"}
            ],
            "interrupt_data": {
                "interaction_type": "requirements_confirmation",
                "message": "Confirm?",
                "requirements_summary": {"scope": "EU"}
            },
            "rejection_message": "out of scope",
            "final_report": "reports/s-1.md"
        }));

        assert_eq!(snapshot.session_id, "s-1");
        assert_eq!(snapshot.status, SessionStatus::WaitingForInput);
        assert_eq!(snapshot.history.len(), 2);
        assert_eq!(snapshot.history[1].node, "requirements_analyst");
        assert_eq!(snapshot.history[1].timestamp, "2024-05-01T10:01:00Z");
        assert!(matches!(
            snapshot.interrupt_data,
            Some(InterruptPayload::RequirementsConfirmation(_))
        ));
        assert_eq!(snapshot.rejection_reason.as_deref(), Some("out of scope"));
        assert_eq!(snapshot.final_report_ref.as_deref(), Some("reports/s-1.md"));
    }

    #[test]
    fn test_minimal_snapshot() {
        let snapshot = parse(json!({"status": "initializing", "interrupt_data": null}));
        assert_eq!(snapshot.progress, 0.0);
        assert!(snapshot.history.is_empty());
        assert!(snapshot.interrupt_data.is_none());
    }

    #[test]
    fn test_unknown_status_is_unsupported() {
        let dto: SnapshotDto = serde_json::from_value(json!({"status": "paused"})).unwrap();
        assert!(matches!(
            dto.into_domain("s-1"),
            Err(SyncError::Unsupported { .. })
        ));
    }
}
