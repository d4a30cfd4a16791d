pub mod credential;
pub mod error;
pub mod interrupt;
pub mod registry;
pub mod retry;
pub mod session;

// Re-export common error type
pub use error::{Result, SyncError};
