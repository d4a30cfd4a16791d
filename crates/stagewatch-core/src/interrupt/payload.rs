//! Interrupt payloads.
//!
//! An interrupt pauses the pipeline until a human decides something. The
//! payload is a union discriminated by `interaction_type`; every known kind
//! carries its own structured fields, and fields this client does not know
//! about are preserved in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Discriminator of an interrupt payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Questionnaire,
    RequirementsConfirmation,
    RoleAndTaskUnifiedReview,
    UserQuestion,
    BatchConfirmation,
}

impl InteractionType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "questionnaire" => Some(Self::Questionnaire),
            "requirements_confirmation" => Some(Self::RequirementsConfirmation),
            "role_and_task_unified_review" => Some(Self::RoleAndTaskUnifiedReview),
            "user_question" => Some(Self::UserQuestion),
            "batch_confirmation" => Some(Self::BatchConfirmation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Questionnaire => "questionnaire",
            Self::RequirementsConfirmation => "requirements_confirmation",
            Self::RoleAndTaskUnifiedReview => "role_and_task_unified_review",
            Self::UserQuestion => "user_question",
            Self::BatchConfirmation => "batch_confirmation",
        }
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireItem {
    pub id: String,
    pub question: String,
    /// e.g. "single_choice", "multiple_choice", "open_ended"
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

/// Calibration questionnaire the user fills in before analysis continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionnaireItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Summary of the understood requirements, to confirm or edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementsConfirmation {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub requirements_summary: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role_id: String,
    #[serde(default)]
    pub role_name: Option<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
}

/// Combined review of the proposed roles and their task lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleTaskReview {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Free-form question from the pipeline to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserQuestion {
    pub question: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Progress checkpoint between processing batches; approved automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfirmation {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub current_batch: Option<u32>,
    #[serde(default)]
    pub total_batches: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Structured payload of an interrupt, discriminated by `interaction_type`.
#[derive(Debug, Clone, PartialEq)]
pub enum InterruptPayload {
    Questionnaire(Questionnaire),
    RequirementsConfirmation(RequirementsConfirmation),
    RoleAndTaskUnifiedReview(RoleTaskReview),
    UserQuestion(UserQuestion),
    BatchConfirmation(BatchConfirmation),
    /// Unknown or malformed payload, kept verbatim
    Unsupported { interaction_type: String, raw: Value },
}

impl InterruptPayload {
    /// Builds a payload from its wire JSON. Never fails.
    ///
    /// Both `interaction_type` and `interactionType` are accepted as the
    /// discriminator. Unknown kinds, and known kinds whose fields do not parse,
    /// become `Unsupported` so a future payload can never crash the view.
    pub fn from_value(raw: Value) -> Self {
        let tag = raw
            .get("interaction_type")
            .or_else(|| raw.get("interactionType"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let Some(kind) = InteractionType::parse(&tag) else {
            return Self::Unsupported {
                interaction_type: tag,
                raw,
            };
        };

        let mut body = raw.clone();
        if let Some(object) = body.as_object_mut() {
            object.remove("interaction_type");
            object.remove("interactionType");
        }

        let parsed = match kind {
            InteractionType::Questionnaire => {
                serde_json::from_value(body).map(Self::Questionnaire)
            }
            InteractionType::RequirementsConfirmation => {
                serde_json::from_value(body).map(Self::RequirementsConfirmation)
            }
            InteractionType::RoleAndTaskUnifiedReview => {
                serde_json::from_value(body).map(Self::RoleAndTaskUnifiedReview)
            }
            InteractionType::UserQuestion => serde_json::from_value(body).map(Self::UserQuestion),
            InteractionType::BatchConfirmation => {
                serde_json::from_value(body).map(Self::BatchConfirmation)
            }
        };

        parsed.unwrap_or_else(|e| {
            tracing::warn!(
                "[InterruptPayload] Malformed '{}' payload, treating as unsupported: {}",
                tag,
                e
            );
            Self::Unsupported {
                interaction_type: tag,
                raw,
            }
        })
    }

    /// The known interaction type, or `None` for unsupported payloads.
    pub fn interaction_type(&self) -> Option<InteractionType> {
        match self {
            Self::Questionnaire(_) => Some(InteractionType::Questionnaire),
            Self::RequirementsConfirmation(_) => Some(InteractionType::RequirementsConfirmation),
            Self::RoleAndTaskUnifiedReview(_) => Some(InteractionType::RoleAndTaskUnifiedReview),
            Self::UserQuestion(_) => Some(InteractionType::UserQuestion),
            Self::BatchConfirmation(_) => Some(InteractionType::BatchConfirmation),
            Self::Unsupported { .. } => None,
        }
    }

    /// Wire name of the discriminator, including unknown ones.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Unsupported {
                interaction_type, ..
            } => interaction_type.as_str(),
            other => other
                .interaction_type()
                .map(|kind| kind.as_str())
                .unwrap_or_default(),
        }
    }

    /// Headline text to show with the prompt, if the payload has one.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Questionnaire(q) => q.message.as_deref(),
            Self::RequirementsConfirmation(r) => r.message.as_deref(),
            Self::RoleAndTaskUnifiedReview(r) => r.message.as_deref(),
            Self::UserQuestion(q) => Some(q.question.as_str()),
            Self::BatchConfirmation(b) => b.message.as_deref(),
            Self::Unsupported { .. } => None,
        }
    }
}
