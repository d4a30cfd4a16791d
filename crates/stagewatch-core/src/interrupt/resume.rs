//! Resume payloads.
//!
//! The client only chooses the payload *shape* for the interrupt being
//! answered: a bare sentinel string or a structured object. The backend is
//! the sole interpreter of what the payload means.

use super::payload::InteractionType;
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Opaque sentinel answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeSentinel {
    Confirm,
    Skip,
    Approve,
}

impl ResumeSentinel {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "confirm" => Some(Self::Confirm),
            "skip" => Some(Self::Skip),
            "approve" => Some(Self::Approve),
            _ => None,
        }
    }
}

/// Body of a resume submission: a sentinel string or a structured object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResumePayload {
    Sentinel(ResumeSentinel),
    Structured(Value),
}

impl ResumePayload {
    pub fn confirm() -> Self {
        Self::Sentinel(ResumeSentinel::Confirm)
    }

    pub fn skip() -> Self {
        Self::Sentinel(ResumeSentinel::Skip)
    }

    pub fn approve() -> Self {
        Self::Sentinel(ResumeSentinel::Approve)
    }

    /// Answers to a questionnaire, keyed by question id.
    pub fn questionnaire_answers<I, K>(answers: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let answers: Map<String, Value> = answers
            .into_iter()
            .map(|(id, answer)| (id.into(), answer))
            .collect();
        Self::Structured(json!({ "answers": answers }))
    }

    /// An edited requirements summary instead of a plain confirmation.
    pub fn requirements_edit(modifications: Value) -> Self {
        Self::Structured(json!({ "intent": "modify", "modifications": modifications }))
    }

    /// Approval of the role/task review with modifications applied.
    pub fn review_modifications(modifications: Value) -> Self {
        Self::Structured(json!({
            "action": "approve_with_modifications",
            "modifications": modifications,
        }))
    }

    /// Answer to a free-form user question.
    pub fn question_answer(answer: impl Into<String>) -> Self {
        Self::Structured(json!({ "answer": answer.into() }))
    }

    /// Interprets a line typed by a user.
    ///
    /// Sentinel words map to sentinels, `{...}` is parsed as a structured
    /// object, and any other text becomes a question answer.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Validation` for empty input or malformed JSON objects.
    pub fn from_user_input(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SyncError::validation("empty response"));
        }
        if let Some(sentinel) = ResumeSentinel::parse(&input.to_lowercase()) {
            return Ok(Self::Sentinel(sentinel));
        }
        if input.starts_with('{') {
            let value: Value = serde_json::from_str(input)
                .map_err(|e| SyncError::validation(format!("invalid JSON object: {}", e)))?;
            return Ok(Self::Structured(value));
        }
        Ok(Self::question_answer(input))
    }

    /// Checks that the payload has a shape the given interaction accepts.
    ///
    /// Only the sentinel/object distinction is checked; field contents are the
    /// backend's business.
    pub fn is_shape_valid_for(&self, kind: InteractionType) -> bool {
        match (kind, self) {
            (_, Self::Structured(value)) => {
                value.is_object() && kind != InteractionType::BatchConfirmation
            }
            (InteractionType::Questionnaire, Self::Sentinel(s)) => *s == ResumeSentinel::Skip,
            (InteractionType::RequirementsConfirmation, Self::Sentinel(s)) => {
                *s == ResumeSentinel::Confirm
            }
            (InteractionType::RoleAndTaskUnifiedReview, Self::Sentinel(s)) => {
                *s == ResumeSentinel::Approve
            }
            (InteractionType::UserQuestion, Self::Sentinel(s)) => *s == ResumeSentinel::Skip,
            (InteractionType::BatchConfirmation, Self::Sentinel(s)) => {
                *s == ResumeSentinel::Approve
            }
        }
    }
}

/// A human decision addressed to a paused session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeRequest {
    pub session_id: String,
    pub payload: ResumePayload,
}

impl ResumeRequest {
    pub fn new(session_id: impl Into<String>, payload: ResumePayload) -> Self {
        Self {
            session_id: session_id.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_serializes_as_bare_string() {
        let request = ResumeRequest::new("abc", ResumePayload::approve());
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"session_id": "abc", "payload": "approve"}));
    }

    #[test]
    fn test_structured_serializes_as_object() {
        let payload = ResumePayload::questionnaire_answers([("q1", json!("high"))]);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value, json!({"answers": {"q1": "high"}}));
    }

    #[test]
    fn test_from_user_input() {
        assert_eq!(ResumePayload::from_user_input(" Confirm ").unwrap(), ResumePayload::confirm());
        assert_eq!(
            ResumePayload::from_user_input(r#"{"answer": "EU"}"#).unwrap(),
            ResumePayload::Structured(json!({"answer": "EU"}))
        );
        assert_eq!(
            ResumePayload::from_user_input("Europe first").unwrap(),
            ResumePayload::question_answer("Europe first")
        );
        assert!(ResumePayload::from_user_input("   ").unwrap_err().is_validation());
        assert!(ResumePayload::from_user_input("{oops").unwrap_err().is_validation());
    }

    #[test]
    fn test_shape_validation() {
        use InteractionType::*;
        assert!(ResumePayload::confirm().is_shape_valid_for(RequirementsConfirmation));
        assert!(!ResumePayload::confirm().is_shape_valid_for(RoleAndTaskUnifiedReview));
        assert!(ResumePayload::approve().is_shape_valid_for(BatchConfirmation));
        assert!(ResumePayload::question_answer("x").is_shape_valid_for(UserQuestion));
        assert!(!ResumePayload::question_answer("x").is_shape_valid_for(BatchConfirmation));
        assert!(ResumePayload::skip().is_shape_valid_for(Questionnaire));
    }
}
