//! Top-level wiring of the synchronization client.

use crate::cache::ActiveViews;
use crate::registry::SessionRegistry;
use crate::resume_client::ResumeClient;
use crate::snapshot_loader::SnapshotLoader;
use crate::view::{SessionViewFactory, TerminalAction};
use stagewatch_core::Result;
use stagewatch_core::registry::SessionListGateway;
use stagewatch_core::session::{EventSource, ResumeGateway, SnapshotGateway};
use stagewatch_infrastructure::{
    ClientConfig, HttpWorkflowApi, WebSocketEventSource, credential_from_config,
};
use std::sync::Arc;

/// The backend collaborators a client talks to.
pub struct Collaborators {
    pub snapshots: Arc<dyn SnapshotGateway>,
    pub resumes: Arc<dyn ResumeGateway>,
    pub sessions: Arc<dyn SessionListGateway>,
    pub events: Arc<dyn EventSource>,
}

/// Owns the shared session registry and the running session views.
pub struct StagewatchClient {
    config: ClientConfig,
    registry: SessionRegistry,
    views: ActiveViews,
}

impl StagewatchClient {
    /// Builds a client that talks to the HTTP and WebSocket endpoints in `config`.
    pub fn from_config(
        config: ClientConfig,
        terminal: Option<Arc<dyn TerminalAction>>,
    ) -> Result<Self> {
        let credentials = credential_from_config(&config);
        let api = Arc::new(HttpWorkflowApi::new(&config, Arc::clone(&credentials))?);
        let events = Arc::new(WebSocketEventSource::from_config(&config, credentials));

        let collaborators = Collaborators {
            snapshots: api.clone(),
            resumes: api.clone(),
            sessions: api,
            events,
        };
        Self::with_collaborators(config, collaborators, terminal)
    }

    /// Builds a client over arbitrary collaborators.
    pub fn with_collaborators(
        config: ClientConfig,
        collaborators: Collaborators,
        terminal: Option<Arc<dyn TerminalAction>>,
    ) -> Result<Self> {
        let loader = SnapshotLoader::new(
            collaborators.snapshots,
            config.derived_rule()?,
            config.derived_retry_policy(),
        );
        let resume = ResumeClient::new(collaborators.resumes);
        let registry = SessionRegistry::new(collaborators.sessions, config.page_size);

        let mut factory =
            SessionViewFactory::new(Arc::new(loader), Arc::new(resume), collaborators.events)
                .with_registry(registry.clone())
                .with_processing_detail(config.processing_detail.clone());
        if let Some(action) = terminal {
            factory = factory.with_terminal_action(action);
        }

        tracing::info!("[StagewatchClient] Using API at {}", config.api_base());
        Ok(Self {
            config,
            registry,
            views: ActiveViews::new(factory),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn views(&self) -> &ActiveViews {
        &self.views
    }

    /// Stops every running view.
    pub async fn shutdown(&self) {
        self.views.deactivate_all().await;
    }
}
