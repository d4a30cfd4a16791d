use stagewatch_core::SyncError;
use stagewatch_core::interrupt::ActivePrompt;
use stagewatch_core::session::{HistoryLog, Session};

/// Lifecycle of a session view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewPhase {
    /// Waiting for the first snapshot
    Loading,
    Ready,
    /// The snapshot could not be loaded; `retry_load` starts over
    LoadFailed(SyncError),
    /// The workflow was superseded and must be restarted from the entry point
    RestartRequired,
    /// The view was torn down; nothing will change any more
    Deactivated,
}

/// Connectivity indicator of the event stream. Never blocks the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected { reason: String },
}

/// Everything a renderer needs to draw one session view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub phase: ViewPhase,
    pub session: Session,
    pub history: HistoryLog,
    /// The single interaction currently shown, if any
    pub prompt: Option<ActivePrompt>,
    pub connection: ConnectionState,
    /// Inline error of the last failed resume, shown next to the prompt
    pub resume_error: Option<String>,
    /// A resume submission is in flight
    pub submitting: bool,
}

impl ViewState {
    pub fn loading(session_id: &str) -> Self {
        Self {
            phase: ViewPhase::Loading,
            session: Session::new(session_id),
            history: HistoryLog::new(),
            prompt: None,
            connection: ConnectionState::Connecting,
            resume_error: None,
            submitting: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase == ViewPhase::Ready
    }
}
