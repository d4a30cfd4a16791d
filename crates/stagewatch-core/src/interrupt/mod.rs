//! Interrupt domain module.
//!
//! - `payload`: Typed interrupt payloads (`InterruptPayload`, `InteractionType`)
//! - `router`: Dispatch of an interrupt to exactly one interaction (`InterruptRouter`)
//! - `resume`: Human decisions sent back to the backend (`ResumePayload`, `ResumeRequest`)

mod payload;
mod resume;
mod router;

pub use payload::{
    BatchConfirmation, InteractionType, InterruptPayload, Questionnaire, QuestionnaireItem,
    RequirementsConfirmation, RoleAssignment, RoleTaskReview, UserQuestion,
};
pub use resume::{ResumePayload, ResumeRequest, ResumeSentinel};
pub use router::{ActivePrompt, InterruptRouter, RouteDecision};
