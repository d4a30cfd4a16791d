//! Wire shapes of the workflow backend.
//!
//! These DTOs are private to the infrastructure layer. Each one tolerates the
//! field aliases used across backend versions and normalizes into the single
//! canonical domain type, so nothing above this layer sees a legacy name.
//!
//! - `snapshot`: Snapshot endpoint response -> `SessionSnapshot`
//! - `event`: Event stream frames -> `WorkflowEvent`
//! - `session`: Session list and mutation bodies -> `SessionSummary`

mod event;
mod session;
mod snapshot;

pub use event::{EventFrame, parse_event};
pub use session::{
    CreateSessionRequest, PinRequest, RenameRequest, SessionPageDto, SessionSummaryDto,
};
pub use snapshot::{HistoryEntryDto, SnapshotDto};

