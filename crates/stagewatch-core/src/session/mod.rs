//! Session domain module.
//!
//! This module contains the session state model, the canonical workflow
//! event shape, the per-node history trace and the reconciliation logic that
//! merges snapshots and streamed events into one consistent view.
//!
//! # Module Structure
//!
//! - `model`: Core session domain model (`Session`, `SessionStatus`)
//! - `history`: Append-only node execution trace (`HistoryLog`)
//! - `event`: Canonical workflow events (`WorkflowEvent`)
//! - `snapshot`: Point-in-time session state (`SessionSnapshot`)
//! - `identity`: Placeholder and derived-session id conventions
//! - `gateway`: Traits for the snapshot, resume and event-stream collaborators
//! - `reconciler`: The merge function (`StateReconciler`)

mod event;
mod gateway;
mod history;
mod identity;
mod model;
mod reconciler;
mod snapshot;

// Re-export public API
pub use event::{StatusChange, WorkflowEvent};
pub use gateway::{ChannelSignal, EventChannel, EventSource, ResumeGateway, SnapshotGateway};
pub use history::{AppendOutcome, HistoryLog, NodeHistoryEntry, NodeState};
pub use identity::{
    DEFAULT_DERIVED_PATTERN, DerivedSessionRule, PLACEHOLDER_PREFIX, is_placeholder_id,
    new_placeholder_id,
};
pub use model::{Session, SessionStatus};
pub use reconciler::{
    DiscardReason, ReconcileEffect, ReconciledState, Reconciliation, StateReconciler,
};
pub use snapshot::SessionSnapshot;
