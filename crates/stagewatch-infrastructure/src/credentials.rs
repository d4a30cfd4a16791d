//! Bearer credential providers.
//!
//! Tokens are treated as opaque strings: never logged, parsed or refreshed here.

use crate::config::{ClientConfig, TOKEN_ENV_VAR};
use async_trait::async_trait;
use stagewatch_core::credential::CredentialProvider;
use stagewatch_core::{Result, SyncError};
use std::fmt;
use std::sync::Arc;

/// A token fixed at construction time.
#[derive(Clone)]
pub struct StaticCredential {
    token: String,
}

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredential")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn bearer_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Reads the token from an environment variable on every request, so an
/// external login helper can rotate it without restarting the client.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredential {
    fn default() -> Self {
        Self::new(TOKEN_ENV_VAR)
    }
}

#[async_trait]
impl CredentialProvider for EnvCredential {
    async fn bearer_token(&self) -> Result<String> {
        match std::env::var(&self.var) {
            Ok(token) if !token.is_empty() => Ok(token),
            _ => Err(SyncError::config(format!(
                "no bearer token: set {} or `token` in config.toml",
                self.var
            ))),
        }
    }
}

/// The configured token if present, otherwise the environment.
pub fn credential_from_config(config: &ClientConfig) -> Arc<dyn CredentialProvider> {
    match &config.token {
        Some(token) => Arc::new(StaticCredential::new(token.clone())),
        None => Arc::new(EnvCredential::default()),
    }
}
