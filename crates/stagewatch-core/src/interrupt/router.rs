//! Interrupt routing.
//!
//! The router decides what a pause means for the view: show exactly one
//! interaction, approve automatically, or ignore a kind this client does not
//! understand.

use super::payload::{InteractionType, InterruptPayload};

/// The interaction currently shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivePrompt {
    pub kind: InteractionType,
    pub payload: InterruptPayload,
}

/// Outcome of routing one interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// A prompt of this kind is now shown
    Prompt(InteractionType),
    /// No prompt; the caller must resume with the `approve` sentinel
    AutoApprove,
    /// Unsupported kind; nothing is shown
    Ignored,
}

/// Holds the single active prompt of a session view.
///
/// Exclusivity is structural: there is one slot, so at most one
/// "show this interaction" flag can be true. A second interrupt arriving
/// before the first is resolved replaces it (last writer wins).
#[derive(Debug, Clone, Default)]
pub struct InterruptRouter {
    active: Option<ActivePrompt>,
}

impl InterruptRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Examines the payload's interaction type and activates exactly one handler.
    pub fn route(&mut self, payload: InterruptPayload) -> RouteDecision {
        let Some(kind) = payload.interaction_type() else {
            tracing::warn!(
                "[InterruptRouter] Ignoring unsupported interaction type '{}'",
                payload.type_name()
            );
            return RouteDecision::Ignored;
        };

        if kind == InteractionType::BatchConfirmation {
            if let Some(previous) = self.active.take() {
                tracing::debug!(
                    "[InterruptRouter] Closing '{}' superseded by batch_confirmation",
                    previous.kind
                );
            }
            tracing::debug!("[InterruptRouter] batch_confirmation will be auto-approved");
            return RouteDecision::AutoApprove;
        }

        if let Some(previous) = &self.active {
            tracing::warn!(
                "[InterruptRouter] '{}' arrived while '{}' is still open; replacing it",
                kind,
                previous.kind
            );
        }

        self.active = Some(ActivePrompt { kind, payload });
        RouteDecision::Prompt(kind)
    }

    pub fn active(&self) -> Option<&ActivePrompt> {
        self.active.as_ref()
    }

    /// The per-kind "show this interaction" flag.
    pub fn is_showing(&self, kind: InteractionType) -> bool {
        self.active.as_ref().is_some_and(|prompt| prompt.kind == kind)
    }

    /// Clears the active prompt, returning it.
    pub fn dismiss(&mut self) -> Option<ActivePrompt> {
        self.active.take()
    }

    /// Puts a prompt back after a retryable resume failure.
    pub fn restore(&mut self, prompt: ActivePrompt) {
        if self.active.is_none() {
            self.active = Some(prompt);
        }
    }
}
