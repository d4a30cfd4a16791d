//! Credential provider trait.
//!
//! Defines the interface to the external authentication collaborator that
//! hands out bearer credentials.

use crate::error::Result;

/// Source of the bearer credential attached to every backend request.
///
/// # Security Note
///
/// Implementations should ensure that:
/// - Tokens are never logged or exposed in error messages
/// - Tokens are treated as opaque; refreshing is the provider's concern
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns the current bearer token.
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: Token to send as `Authorization: Bearer <token>`
    /// - `Err(SyncError::Config)`: No credential is available
    async fn bearer_token(&self) -> Result<String>;
}
