//! Session views.
//!
//! # Module Structure
//!
//! - `state`: What a view publishes (`ViewState`, `ViewPhase`, `ConnectionState`)
//! - `handle`: The caller's side of a running view (`SessionViewHandle`)
//! - `actor`: The task that owns the channel, the reconciler and the router

mod actor;
mod handle;
mod state;

pub use handle::SessionViewHandle;
pub use state::{ConnectionState, ViewPhase, ViewState};

use crate::registry::SessionRegistry;
use crate::resume_client::ResumeClient;
use crate::snapshot_loader::SnapshotLoader;
use actor::{SessionView, ViewContext};
use stagewatch_core::session::{EventSource, Session};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Text shown between an accepted resume and the next streamed update.
pub const DEFAULT_PROCESSING_DETAIL: &str = "Processing your response...";

const COMMAND_BUFFER: usize = 16;

/// Invoked exactly once per view when its session reaches `completed`.
pub trait TerminalAction: Send + Sync {
    fn on_completed(&self, session: &Session);
}

/// Builds and spawns session views that share one set of collaborators.
#[derive(Clone)]
pub struct SessionViewFactory {
    ctx: ViewContext,
}

impl SessionViewFactory {
    pub fn new(
        loader: Arc<SnapshotLoader>,
        resume: Arc<ResumeClient>,
        events: Arc<dyn EventSource>,
    ) -> Self {
        Self {
            ctx: ViewContext {
                loader,
                resume,
                events,
                registry: None,
                terminal: None,
                processing_detail: DEFAULT_PROCESSING_DETAIL.to_string(),
            },
        }
    }

    /// Keeps `registry` in step with what views learn (missing or vanished sessions).
    pub fn with_registry(mut self, registry: SessionRegistry) -> Self {
        self.ctx.registry = Some(registry);
        self
    }

    pub fn with_terminal_action(mut self, action: Arc<dyn TerminalAction>) -> Self {
        self.ctx.terminal = Some(action);
        self
    }

    pub fn with_processing_detail(mut self, detail: impl Into<String>) -> Self {
        self.ctx.processing_detail = detail.into();
        self
    }

    /// Spawns a view for `session_id` on the current tokio runtime.
    ///
    /// The snapshot load and the event stream start immediately and in
    /// parallel; the returned handle publishes `ViewPhase::Loading` until the
    /// snapshot arrives.
    pub fn activate(&self, session_id: &str) -> SessionViewHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (state_tx, state_rx) = watch::channel(ViewState::loading(session_id));
        let cancel = CancellationToken::new();

        let view = SessionView::new(
            session_id.to_string(),
            self.ctx.clone(),
            command_rx,
            state_tx,
            cancel.clone(),
        );
        tokio::spawn(view.run());

        SessionViewHandle::new(session_id.to_string(), command_tx, state_rx, cancel)
    }
}
