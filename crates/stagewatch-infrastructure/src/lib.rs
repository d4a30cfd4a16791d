//! Transports and configuration for the stagewatch client.
//!
//! - `http_api`: REST client implementing the snapshot, resume and session-list gateways
//! - `event_channel`: Websocket event stream with automatic reconnection
//! - `dto`: Wire shapes and their normalization into domain types
//! - `config` / `paths` / `credentials`: Client configuration and bearer credentials

pub mod config;
pub mod credentials;
pub mod dto;
pub mod event_channel;
pub mod http_api;
pub mod paths;

pub use config::ClientConfig;
pub use credentials::{EnvCredential, StaticCredential, credential_from_config};
pub use event_channel::{WebSocketEventChannel, WebSocketEventSource};
pub use http_api::HttpWorkflowApi;
pub use paths::StagewatchPaths;
