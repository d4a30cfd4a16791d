#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use stagewatch_application::{
    SessionRegistry, SessionViewFactory, SessionViewHandle, TerminalAction, ViewState,
};
use stagewatch_application::{ResumeClient, SnapshotLoader};
use stagewatch_core::interrupt::{InterruptPayload, ResumeRequest};
use stagewatch_core::registry::{SessionListGateway, SessionPage, SessionSummary};
use stagewatch_core::retry::RetryPolicy;
use stagewatch_core::session::{
    ChannelSignal, DerivedSessionRule, EventChannel, EventSource, ResumeGateway, Session,
    SessionSnapshot, SnapshotGateway, WorkflowEvent,
};
use stagewatch_core::{Result, SyncError};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};

/// Blocks calls until the test releases them, one permit per call.
pub struct Gate {
    closed: Mutex<bool>,
    permits: Semaphore,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            closed: Mutex::new(false),
            permits: Semaphore::new(0),
        }
    }
}

impl Gate {
    pub fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }

    pub fn release(&self) {
        self.permits.add_permits(1);
    }

    async fn pass(&self) {
        let closed = *self.closed.lock().unwrap();
        if closed {
            self.permits.acquire().await.unwrap().forget();
        }
    }
}

// ============================================================================
// Snapshots
// ============================================================================

#[derive(Default)]
pub struct ScriptedSnapshots {
    responses: Mutex<VecDeque<Result<SessionSnapshot>>>,
    calls: Mutex<u32>,
    pub gate: Gate,
}

impl ScriptedSnapshots {
    pub fn new(responses: Vec<Result<SessionSnapshot>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        })
    }

    pub fn push(&self, response: Result<SessionSnapshot>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl SnapshotGateway for ScriptedSnapshots {
    async fn fetch_snapshot(&self, session_id: &str) -> Result<SessionSnapshot> {
        *self.calls.lock().unwrap() += 1;
        self.gate.pass().await;
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SyncError::not_found("Session", session_id)))
    }
}

// ============================================================================
// Resumes
// ============================================================================

#[derive(Default)]
pub struct ScriptedResumes {
    results: Mutex<VecDeque<Result<()>>>,
    requests: Mutex<Vec<ResumeRequest>>,
}

impl ScriptedResumes {
    pub fn new(results: Vec<Result<()>>) -> Arc<Self> {
        Arc::new(Self {
            results: Mutex::new(results.into()),
            ..Self::default()
        })
    }

    pub fn requests(&self) -> Vec<ResumeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResumeGateway for ScriptedResumes {
    async fn submit_resume(&self, request: &ResumeRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        self.results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

// ============================================================================
// Event stream
// ============================================================================

/// Event source whose channels are fed by the test.
#[derive(Default)]
pub struct MemoryEvents {
    feeds: Mutex<HashMap<String, mpsc::UnboundedReceiver<ChannelSignal>>>,
    senders: Mutex<HashMap<String, mpsc::UnboundedSender<ChannelSignal>>>,
}

impl MemoryEvents {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The sending side of the stream of `session_id`.
    pub fn feed(&self, session_id: &str) -> Feed {
        let mut senders = self.senders.lock().unwrap();
        let sender = senders.entry(session_id.to_string()).or_insert_with(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            self.feeds.lock().unwrap().insert(session_id.to_string(), rx);
            tx
        });
        Feed {
            sender: sender.clone(),
        }
    }
}

#[async_trait]
impl EventSource for MemoryEvents {
    async fn open(&self, session_id: &str) -> Result<Box<dyn EventChannel>> {
        let _ = self.feed(session_id);
        let receiver = self
            .feeds
            .lock()
            .unwrap()
            .remove(session_id)
            .ok_or_else(|| SyncError::internal("stream opened twice"))?;
        Ok(Box::new(MemoryChannel { receiver }))
    }
}

struct MemoryChannel {
    receiver: mpsc::UnboundedReceiver<ChannelSignal>,
}

#[async_trait]
impl EventChannel for MemoryChannel {
    async fn next_signal(&mut self) -> Option<ChannelSignal> {
        self.receiver.recv().await
    }

    fn close(&mut self) {
        self.receiver.close();
    }

    fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}

#[derive(Clone)]
pub struct Feed {
    sender: mpsc::UnboundedSender<ChannelSignal>,
}

impl Feed {
    pub fn connected(&self) {
        let _ = self.sender.send(ChannelSignal::Connected);
    }

    pub fn disconnected(&self) {
        let _ = self.sender.send(ChannelSignal::Disconnected {
            reason: "connection reset".to_string(),
        });
    }

    pub fn event(&self, event: WorkflowEvent) {
        let _ = self.sender.send(ChannelSignal::Event(event));
    }
}

// ============================================================================
// Session list
// ============================================================================

#[derive(Default)]
pub struct FixedList {
    sessions: Vec<SessionSummary>,
}

impl FixedList {
    pub fn new(sessions: Vec<SessionSummary>) -> Arc<Self> {
        Arc::new(Self { sessions })
    }
}

#[async_trait]
impl SessionListGateway for FixedList {
    async fn list_sessions(&self, page: u32, _page_size: u32) -> Result<SessionPage> {
        Ok(SessionPage {
            sessions: if page == 0 {
                self.sessions.clone()
            } else {
                Vec::new()
            },
            has_next: false,
        })
    }

    async fn create_session(&self, user_input: &str) -> Result<SessionSummary> {
        Ok(SessionSummary::new(
            "created-1",
            stagewatch_core::session::SessionStatus::Initializing,
            user_input,
        ))
    }

    async fn rename_session(&self, _session_id: &str, _display_name: &str) -> Result<()> {
        Ok(())
    }

    async fn set_pinned(&self, _session_id: &str, _pinned: bool) -> Result<()> {
        Ok(())
    }

    async fn delete_session(&self, _session_id: &str) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Terminal action
// ============================================================================

#[derive(Default)]
pub struct RecordingTerminal {
    completed: Mutex<Vec<String>>,
}

impl RecordingTerminal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }
}

impl TerminalAction for RecordingTerminal {
    fn on_completed(&self, session: &Session) {
        self.completed.lock().unwrap().push(session.id.clone());
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub struct Harness {
    pub snapshots: Arc<ScriptedSnapshots>,
    pub resumes: Arc<ScriptedResumes>,
    pub events: Arc<MemoryEvents>,
    pub terminal: Arc<RecordingTerminal>,
    pub registry: SessionRegistry,
    pub factory: SessionViewFactory,
}

impl Harness {
    pub fn new(snapshots: Arc<ScriptedSnapshots>, resumes: Arc<ScriptedResumes>) -> Self {
        Self::with_list(snapshots, resumes, FixedList::new(Vec::new()))
    }

    pub fn with_list(
        snapshots: Arc<ScriptedSnapshots>,
        resumes: Arc<ScriptedResumes>,
        list: Arc<FixedList>,
    ) -> Self {
        let events = MemoryEvents::new();
        let terminal = RecordingTerminal::new();
        let registry = SessionRegistry::new(list, 20);

        let loader = SnapshotLoader::new(
            snapshots.clone(),
            DerivedSessionRule::default(),
            RetryPolicy::derived_session_grace(3, Duration::from_secs(2)),
        );
        let factory = SessionViewFactory::new(
            Arc::new(loader),
            Arc::new(ResumeClient::new(resumes.clone())),
            events.clone(),
        )
        .with_registry(registry.clone())
        .with_terminal_action(terminal.clone());

        Self {
            snapshots,
            resumes,
            events,
            terminal,
            registry,
            factory,
        }
    }
}

/// Waits for `predicate`, failing instead of hanging when it never holds.
pub async fn wait_for<F>(handle: &SessionViewHandle, predicate: F) -> ViewState
where
    F: FnMut(&ViewState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(60), handle.wait_until(predicate))
        .await
        .expect("view never reached the expected state")
        .expect("view stopped")
}

/// Lets every spawned task run until it blocks. Needs a paused clock.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub fn interrupt(kind: &str) -> WorkflowEvent {
    WorkflowEvent::Interrupt {
        payload: payload(kind),
    }
}

pub fn payload(kind: &str) -> InterruptPayload {
    match kind {
        "questionnaire" => InterruptPayload::from_value(json!({
            "interaction_type": "questionnaire",
            "questions": [{"id": "q1", "question": "Which region?", "type": "open_ended"}],
        })),
        "user_question" => InterruptPayload::from_value(json!({
            "interaction_type": "user_question",
            "question": "Which region?",
        })),
        other => InterruptPayload::from_value(json!({ "interaction_type": other })),
    }
}
