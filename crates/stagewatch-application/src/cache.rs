use crate::view::{SessionViewFactory, SessionViewHandle};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The session views that are currently running, keyed by session id.
///
/// Activating an id that already has a running view returns the existing
/// handle, so one session never has two competing event streams.
#[derive(Clone)]
pub struct ActiveViews {
    factory: SessionViewFactory,
    views: Arc<RwLock<HashMap<String, SessionViewHandle>>>,
}

impl ActiveViews {
    pub fn new(factory: SessionViewFactory) -> Self {
        Self {
            factory,
            views: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the running view of `session_id`, spawning one if needed.
    pub async fn activate(&self, session_id: &str) -> SessionViewHandle {
        let mut views = self.views.write().await;
        if let Some(handle) = views.get(session_id)
            && handle.is_active()
        {
            return handle.clone();
        }

        let handle = self.factory.activate(session_id);
        views.insert(session_id.to_string(), handle.clone());
        handle
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionViewHandle> {
        let views = self.views.read().await;
        views.get(session_id).filter(|h| h.is_active()).cloned()
    }

    /// Stops and forgets the view of `session_id`.
    ///
    /// Returns `false` if no view was registered.
    pub async fn deactivate(&self, session_id: &str) -> bool {
        let mut views = self.views.write().await;
        match views.remove(session_id) {
            Some(handle) => {
                handle.deactivate();
                true
            }
            None => false,
        }
    }

    pub async fn deactivate_all(&self) {
        let mut views = self.views.write().await;
        for (_, handle) in views.drain() {
            handle.deactivate();
        }
    }

    pub async fn len(&self) -> usize {
        self.views.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.views.read().await.is_empty()
    }
}
