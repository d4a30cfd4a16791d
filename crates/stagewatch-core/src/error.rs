//! Error types for the stagewatch client.

use thiserror::Error;

/// Distinguishes the transient network failures that get their own user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The backend could not be reached at all (DNS, refused connection, offline).
    Offline,
    /// The request was sent but no response arrived in time.
    Timeout,
    /// Any other transport-level failure.
    Other,
}

/// A shared error type for the whole workflow-sync client.
///
/// Variants follow the failure taxonomy every component reports against:
/// terminal conditions (`NotFound`, `Stale`), transient ones (`Server`, `Network`),
/// input rejections (`Validation`) and forward-compatibility guards (`Unsupported`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound { entity_type: &'static str, id: String },

    /// The workflow was superseded on the backend and must be restarted.
    #[error("Workflow is stale: {0}")]
    Stale(String),

    /// The backend answered with a 5xx status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The request never produced an HTTP response.
    #[error("Network error ({kind:?}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    /// The backend rejected the submitted payload.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An event or interrupt kind this client does not know.
    #[error("Unsupported {what}: '{kind}'")]
    Unsupported { what: &'static str, kind: String },

    /// IO error (config file access)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The owning session view was deactivated before the operation finished.
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Stale error
    pub fn stale(message: impl Into<String>) -> Self {
        Self::Stale(message.into())
    }

    /// Creates a Server error
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Creates a Network error of the given kind
    pub fn network(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self::Network {
            kind,
            message: message.into(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an Unsupported error
    pub fn unsupported(what: &'static str, kind: impl Into<String>) -> Self {
        Self::Unsupported {
            what,
            kind: kind.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a Stale error
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error came from the view being torn down
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true for failures that may succeed when retried later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Network { .. })
    }

    /// Returns true for failures that no retry will fix.
    ///
    /// `NotFound` is terminal here; the derived-session grace window is a
    /// retry policy decision layered on top, not a property of the error.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Stale(_))
    }

    /// Short text suitable for an error banner.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { .. } => "This analysis could not be found.".to_string(),
            Self::Stale(_) => {
                "This workflow is no longer valid. Please restart the analysis.".to_string()
            }
            Self::Server { .. } => "The server ran into a problem. Please try again.".to_string(),
            Self::Network {
                kind: NetworkErrorKind::Offline,
                ..
            } => "You appear to be offline. Check your connection and retry.".to_string(),
            Self::Network {
                kind: NetworkErrorKind::Timeout,
                ..
            } => "The server took too long to respond. Please retry.".to_string(),
            Self::Network { .. } => "A network error occurred. Please retry.".to_string(),
            Self::Validation(message) => format!("Your response was not accepted: {}", message),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<regex::Error> for SyncError {
    fn from(err: regex::Error) -> Self {
        Self::Config(format!("invalid pattern: {}", err))
    }
}

/// Conversion from anyhow::Error (transitional, should be removed eventually)
impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, SyncError>`.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(SyncError::not_found("Session", "abc").is_terminal());
        assert!(SyncError::stale("superseded").is_terminal());
        assert!(SyncError::server(503, "busy").is_transient());
        assert!(SyncError::network(NetworkErrorKind::Timeout, "slow").is_transient());
        assert!(!SyncError::validation("bad").is_transient());
        assert!(!SyncError::validation("bad").is_terminal());
    }

    #[test]
    fn test_network_messages_are_distinct() {
        let offline = SyncError::network(NetworkErrorKind::Offline, "refused").user_message();
        let timeout = SyncError::network(NetworkErrorKind::Timeout, "elapsed").user_message();
        assert_ne!(offline, timeout);
        assert!(offline.contains("offline"));
    }
}
