//! Collaborator interfaces for a session view.
//!
//! These traits decouple the synchronization core from the transports
//! (HTTP, websocket) so the core can be driven by in-memory fakes.

use super::event::WorkflowEvent;
use super::snapshot::SessionSnapshot;
use crate::error::Result;
use crate::interrupt::ResumeRequest;
use async_trait::async_trait;

/// One-shot fetch of the current session state.
#[async_trait]
pub trait SnapshotGateway: Send + Sync {
    /// Fetches a snapshot of the session.
    ///
    /// # Returns
    ///
    /// - `Ok(SessionSnapshot)`: Current state
    /// - `Err(SyncError::NotFound)`: No such session (yet)
    /// - `Err(SyncError::Stale)`: The workflow was superseded
    /// - `Err(SyncError::Server | SyncError::Network)`: Transient failure
    async fn fetch_snapshot(&self, session_id: &str) -> Result<SessionSnapshot>;
}

/// Submission of human decisions to a paused session.
#[async_trait]
pub trait ResumeGateway: Send + Sync {
    /// Submits the decision.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The backend accepted the decision
    /// - `Err(SyncError::Stale)`: The workflow is no longer resumable
    /// - `Err(_)`: Any other failure; the same interrupt may be answered again
    async fn submit_resume(&self, request: &ResumeRequest) -> Result<()>;
}

/// Connectivity and data signals delivered by an event channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSignal {
    /// The underlying connection is (re)established
    Connected,
    Event(WorkflowEvent),
    /// The connection dropped; the channel keeps reconnecting on its own
    Disconnected { reason: String },
}

/// A persistent per-session stream of events, delivered in receipt order.
#[async_trait]
pub trait EventChannel: Send {
    /// Waits for the next signal.
    ///
    /// Returns `None` once the channel is closed; nothing is delivered after
    /// `close()` returns, even if it was already in flight.
    async fn next_signal(&mut self) -> Option<ChannelSignal>;

    /// Closes the channel. Idempotent.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// Opens event channels.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn open(&self, session_id: &str) -> Result<Box<dyn EventChannel>>;
}
