//! Application layer for stagewatch.
//!
//! This crate wires the pure synchronization core to its collaborators:
//! it loads snapshots, runs one `SessionView` task per watched session,
//! submits resume decisions, and maintains the shared session list.

pub mod cache;
pub mod client;
pub mod registry;
pub mod resume_client;
pub mod snapshot_loader;
pub mod view;

pub use cache::ActiveViews;
pub use client::{Collaborators, StagewatchClient};
pub use registry::SessionRegistry;
pub use resume_client::{ResumeClient, ResumeOutcome};
pub use snapshot_loader::SnapshotLoader;
pub use view::{
    ConnectionState, SessionViewFactory, SessionViewHandle, TerminalAction, ViewPhase, ViewState,
};
