use serde::Deserialize;
use serde_json::Value;
use stagewatch_core::interrupt::InterruptPayload;
use stagewatch_core::session::{SessionStatus, StatusChange, WorkflowEvent};
use stagewatch_core::{Result, SyncError};

/// One text frame of the event stream, with every field alias it may carry.
#[derive(Debug, Clone, Deserialize)]
pub struct EventFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub current_stage: Option<String>,
    #[serde(default)]
    pub current_node: Option<String>,
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
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
    pub interrupt_data: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Parses and normalizes one text frame.
///
/// Unknown event kinds are not an error; they become `WorkflowEvent::Unsupported`.
///
/// # Errors
///
/// - `SyncError::Serialization`: the frame is not a JSON object with a `type`
/// - `SyncError::Unsupported`: the frame names an unknown status
/// - `SyncError::Validation`: a required field of a known kind is missing
pub fn parse_event(text: &str) -> Result<WorkflowEvent> {
    let frame: EventFrame = serde_json::from_str(text)?;
    frame.into_event()
}

impl EventFrame {
    pub fn into_event(self) -> Result<WorkflowEvent> {
        let status = match self.status.as_deref() {
            Some(raw) => Some(
                SessionStatus::parse(raw)
                    .ok_or_else(|| SyncError::unsupported("session status", raw))?,
            ),
            None => None,
        };
        let interrupt = self
            .interrupt_data
            .or(self.data)
            .filter(|value| !value.is_null())
            .map(InterruptPayload::from_value);
        let node = self.current_node.or(self.node_name).or(self.node);

        let event = match self.kind.as_str() {
            "initial_status" => WorkflowEvent::InitialStatus {
                status,
                progress: self.progress,
                current_stage: self.current_stage.or(node),
                detail: self.detail,
                interrupt_data: interrupt,
            },
            "status_update" | "status" => WorkflowEvent::StatusUpdate(StatusChange {
                status,
                progress: self.progress,
                error: self.error,
                rejection_reason: self.rejection_reason.or(self.rejection_message),
                final_report_ref: self.final_report_ref.or(self.final_report),
                interrupt_data: interrupt,
            }),
            "node_update" => WorkflowEvent::NodeUpdate {
                node: node.ok_or_else(|| SyncError::validation("node_update without a node"))?,
                detail: self.detail.unwrap_or_default(),
                timestamp: self.timestamp,
            },
            "interrupt" => WorkflowEvent::Interrupt {
                payload: interrupt
                    .ok_or_else(|| SyncError::validation("interrupt without interrupt_data"))?,
            },
            _ => WorkflowEvent::Unsupported { kind: self.kind },
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagewatch_core::interrupt::InteractionType;

    #[test]
    fn test_node_aliases_normalize() {
        for field in ["current_node", "node_name", "node"] {
            let text = format!(
                r#"{{"type":"node_update","{}":"requirements_analyst","detail":"分析中"}}"#,
                field
            );
            assert_eq!(
                parse_event(&text).unwrap(),
                WorkflowEvent::node_update("requirements_analyst", "分析中")
            );
        }
    }

    #[test]
    fn test_legacy_status_kind() {
        let event = parse_event(
            r#"{"type":"status","status":"rejected","progress":0.3,"rejection_message":"no data"}"#,
        )
        .unwrap();

        let WorkflowEvent::StatusUpdate(change) = event else {
            panic!("expected status update");
        };
        assert_eq!(change.status, Some(SessionStatus::Rejected));
        assert_eq!(change.progress, Some(0.3));
        assert_eq!(change.rejection_reason.as_deref(), Some("no data"));
    }

    #[test]
    fn test_interrupt_from_data_alias() {
        let event = parse_event(
            r#"{"type":"interrupt","data":{"interaction_type":"batch_confirmation","current_batch":1,"total_batches":3}}"#,
        )
        .unwrap();

        let WorkflowEvent::Interrupt { payload } = event else {
            panic!("expected interrupt");
        };
        assert_eq!(
            payload.interaction_type(),
            Some(InteractionType::BatchConfirmation)
        );
    }

    #[test]
    fn test_initial_status_uses_node_alias_for_stage() {
        let event = parse_event(
            r#"{"type":"initial_status","status":"running","progress":0.1,"current_node":"planner"}"#,
        )
        .unwrap();
        let WorkflowEvent::InitialStatus { current_stage, .. } = event else {
            panic!("expected initial status");
        };
        assert_eq!(current_stage.as_deref(), Some("planner"));
    }

    #[test]
    fn test_unknown_kind_is_unsupported_event() {
        assert_eq!(
            parse_event(r#"{"type":"heartbeat"}"#).unwrap(),
            WorkflowEvent::Unsupported {
                kind: "heartbeat".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_frames_are_errors() {
        assert!(parse_event("not json").is_err());
        assert!(parse_event(r#"{"detail":"no type"}"#).is_err());
        assert!(parse_event(r#"{"type":"node_update"}"#).unwrap_err().is_validation());
        assert!(parse_event(r#"{"type":"interrupt"}"#).unwrap_err().is_validation());
        assert!(matches!(
            parse_event(r#"{"type":"status_update","status":"paused"}"#),
            Err(SyncError::Unsupported { .. })
        ));
    }
}
