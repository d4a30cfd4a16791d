use super::state::ViewState;
use stagewatch_core::interrupt::ResumePayload;
use stagewatch_core::{Result, SyncError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

pub(crate) enum ViewCommand {
    Resume {
        payload: ResumePayload,
        reply: oneshot::Sender<Result<()>>,
    },
    RetryLoad {
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Cheap, cloneable handle to a running session view.
///
/// Dropping every handle stops the view; `deactivate` stops it immediately.
#[derive(Clone)]
pub struct SessionViewHandle {
    session_id: String,
    commands: mpsc::Sender<ViewCommand>,
    state: watch::Receiver<ViewState>,
    cancel: CancellationToken,
}

impl SessionViewHandle {
    pub(crate) fn new(
        session_id: String,
        commands: mpsc::Sender<ViewCommand>,
        state: watch::Receiver<ViewState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            commands,
            state,
            cancel,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// A receiver that observes every published state.
    pub fn state(&self) -> watch::Receiver<ViewState> {
        self.state.clone()
    }

    pub fn current(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Submits the user's decision for the active prompt.
    ///
    /// # Errors
    ///
    /// - `SyncError::Validation`: no prompt is active, a submission is already
    ///   in flight, or the payload does not fit the prompt
    /// - `SyncError::Stale`: the workflow must be restarted
    /// - `SyncError::Cancelled`: the view was deactivated
    /// - any transport error of the resume request (the prompt is shown again)
    pub async fn resume(&self, payload: ResumePayload) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(ViewCommand::Resume { payload, reply }).await?;
        response.await.map_err(|_| SyncError::Cancelled)?
    }

    /// Starts the snapshot load again after a failure.
    pub async fn retry_load(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(ViewCommand::RetryLoad { reply }).await?;
        response.await.map_err(|_| SyncError::Cancelled)?
    }

    /// Stops the view. Results that arrive afterwards are dropped.
    pub fn deactivate(&self) {
        self.cancel.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.commands.is_closed()
    }

    /// Waits until the published state satisfies `predicate`.
    pub async fn wait_until<F>(&self, predicate: F) -> Result<ViewState>
    where
        F: FnMut(&ViewState) -> bool,
    {
        let mut receiver = self.state.clone();
        let state = receiver
            .wait_for(predicate)
            .await
            .map_err(|_| SyncError::Cancelled)?;
        Ok((*state).clone())
    }

    async fn send(&self, command: ViewCommand) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        self.commands
            .send(command)
            .await
            .map_err(|_| SyncError::Cancelled)
    }
}

impl std::fmt::Debug for SessionViewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionViewHandle")
            .field("session_id", &self.session_id)
            .field("active", &self.is_active())
            .finish()
    }
}
