//! Session registry domain module.
//!
//! # Module Structure
//!
//! - `model`: One row of the session list (`SessionSummary`)
//! - `list`: The de-duplicated, paginated list with optimistic edits (`SessionList`)
//! - `gateway`: Trait for the session-list backend (`SessionListGateway`)

mod gateway;
mod list;
mod model;

pub use gateway::{SessionListGateway, SessionPage};
pub use list::{PinUndo, SessionList};
pub use model::SessionSummary;
