//! The per-session actor.
//!
//! One task per activated session. It owns the event channel, the reconciled
//! state and the interrupt router, and is the only writer of the published
//! `ViewState`. The snapshot fetch, the event stream, resume submissions and
//! handle commands are all awaited in one `select!` loop, so their
//! completions interleave in any order without shared mutable state.

use super::TerminalAction;
use super::handle::ViewCommand;
use super::state::{ConnectionState, ViewPhase, ViewState};
use crate::registry::SessionRegistry;
use crate::resume_client::{ResumeClient, ResumeOutcome};
use crate::snapshot_loader::SnapshotLoader;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use stagewatch_core::interrupt::{ActivePrompt, InterruptRouter, ResumePayload, RouteDecision};
use stagewatch_core::registry::SessionSummary;
use stagewatch_core::session::{
    ChannelSignal, EventChannel, EventSource, ReconcileEffect, ReconciledState, Reconciliation,
    SessionSnapshot, StateReconciler,
};
use stagewatch_core::{Result, SyncError};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

/// Collaborators shared by every view.
#[derive(Clone)]
pub(crate) struct ViewContext {
    pub loader: Arc<SnapshotLoader>,
    pub resume: Arc<ResumeClient>,
    pub events: Arc<dyn EventSource>,
    pub registry: Option<SessionRegistry>,
    pub terminal: Option<Arc<dyn TerminalAction>>,
    pub processing_detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadKind {
    /// First load, or an explicit retry; failures become `LoadFailed`
    Initial,
    /// Catch-up after the stream reconnected; failures are only logged
    Resync,
}

struct PendingResume {
    prompt: ActivePrompt,
    reply: oneshot::Sender<Result<()>>,
}

pub(crate) struct SessionView {
    session_id: String,
    ctx: ViewContext,
    reconciler: StateReconciler,
    state: ReconciledState,
    router: InterruptRouter,
    phase: ViewPhase,
    connection: ConnectionState,
    resume_error: Option<String>,
    /// Set on `Disconnected`; the next `Connected` triggers a re-sync
    stream_dropped: bool,
    channel: Option<Box<dyn EventChannel>>,
    load: Option<BoxFuture<'static, Result<SessionSnapshot>>>,
    load_kind: LoadKind,
    resume_task: Option<BoxFuture<'static, ResumeOutcome>>,
    pending_resume: Option<PendingResume>,
    auto_approvals: FuturesUnordered<BoxFuture<'static, ResumeOutcome>>,
    commands: mpsc::Receiver<ViewCommand>,
    publisher: watch::Sender<ViewState>,
    cancel: CancellationToken,
}

impl SessionView {
    pub(crate) fn new(
        session_id: String,
        ctx: ViewContext,
        commands: mpsc::Receiver<ViewCommand>,
        publisher: watch::Sender<ViewState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            reconciler: StateReconciler::new(session_id.clone()),
            state: ReconciledState::new(session_id.clone()),
            session_id,
            ctx,
            router: InterruptRouter::new(),
            phase: ViewPhase::Loading,
            connection: ConnectionState::Connecting,
            resume_error: None,
            stream_dropped: false,
            channel: None,
            load: None,
            load_kind: LoadKind::Initial,
            resume_task: None,
            pending_resume: None,
            auto_approvals: FuturesUnordered::new(),
            commands,
            publisher,
            cancel,
        }
    }

    pub(crate) async fn run(mut self) {
        tracing::info!("[SessionView] Activating {}", self.session_id);

        self.load = Some(self.fetch_snapshot());
        match self.ctx.events.open(&self.session_id).await {
            Ok(channel) => self.channel = Some(channel),
            Err(e) => {
                tracing::warn!(
                    "[SessionView] Could not open event stream for {}: {}",
                    self.session_id,
                    e
                );
                self.connection = ConnectionState::Disconnected {
                    reason: e.to_string(),
                };
            }
        }
        self.publish();

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = poll_slot(&mut self.load) => {
                    self.load = None;
                    self.on_snapshot(result);
                }
                signal = next_signal(&mut self.channel) => self.on_signal(signal),
                outcome = poll_slot(&mut self.resume_task) => {
                    self.resume_task = None;
                    self.on_resume_outcome(outcome);
                }
                Some(outcome) = self.auto_approvals.next(), if !self.auto_approvals.is_empty() => {
                    self.on_auto_approve_outcome(outcome);
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
            }
            self.publish();
        }

        self.shutdown();
    }

    // ========================================================================
    // Snapshot
    // ========================================================================

    fn fetch_snapshot(&self) -> BoxFuture<'static, Result<SessionSnapshot>> {
        let loader = Arc::clone(&self.ctx.loader);
        let session_id = self.session_id.clone();
        async move { loader.load(&session_id).await }.boxed()
    }

    fn on_snapshot(&mut self, result: Result<SessionSnapshot>) {
        let kind = std::mem::replace(&mut self.load_kind, LoadKind::Initial);
        match result {
            Ok(snapshot) => {
                self.reconcile(|reconciler, state| reconciler.apply_snapshot(state, &snapshot));
                if matches!(self.phase, ViewPhase::Loading | ViewPhase::LoadFailed(_)) {
                    self.phase = ViewPhase::Ready;
                }
                self.list_in_registry(&snapshot);
            }
            Err(e) if kind == LoadKind::Resync => {
                tracing::warn!(
                    "[SessionView] Re-sync of {} failed, keeping current state: {}",
                    self.session_id,
                    e
                );
            }
            Err(e) => {
                if e.is_not_found()
                    && let Some(registry) = self.ctx.registry.clone()
                {
                    let session_id = self.session_id.clone();
                    tokio::spawn(async move {
                        registry.forget(&session_id).await;
                    });
                }
                self.phase = if e.is_stale() {
                    ViewPhase::RestartRequired
                } else {
                    ViewPhase::LoadFailed(e)
                };
            }
        }
    }

    fn start_resync(&mut self) {
        if self.load.is_some() || self.phase != ViewPhase::Ready {
            return;
        }
        tracing::info!(
            "[SessionView] Stream for {} reconnected, re-syncing from snapshot",
            self.session_id
        );
        self.load_kind = LoadKind::Resync;
        self.load = Some(self.fetch_snapshot());
    }

    fn list_in_registry(&self, snapshot: &SessionSnapshot) {
        let Some(registry) = self.ctx.registry.clone() else {
            return;
        };
        let mut summary = SessionSummary::new(snapshot.session_id.clone(), snapshot.status, "");
        if let Some(created_at) = &snapshot.created_at {
            summary.created_at = created_at.clone();
        }
        tokio::spawn(async move {
            if registry.upsert(summary).await {
                tracing::debug!("[SessionView] Listed a session missing from the registry");
            }
        });
    }

    // ========================================================================
    // Event stream
    // ========================================================================

    fn on_signal(&mut self, signal: Option<ChannelSignal>) {
        match signal {
            Some(ChannelSignal::Event(event)) => {
                self.reconcile(|reconciler, state| reconciler.apply(state, &event));
            }
            Some(ChannelSignal::Connected) => {
                self.connection = ConnectionState::Connected;
                self.state.connected = true;
                if std::mem::take(&mut self.stream_dropped) {
                    self.start_resync();
                }
            }
            Some(ChannelSignal::Disconnected { reason }) => {
                self.connection = ConnectionState::Disconnected { reason };
                self.stream_dropped = true;
                let state = self.take_state();
                self.state = self.reconciler.mark_disconnected(state);
            }
            None => {
                tracing::debug!("[SessionView] Event stream of {} ended", self.session_id);
                self.channel = None;
                self.connection = ConnectionState::Disconnected {
                    reason: "event stream closed".to_string(),
                };
            }
        }
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    fn take_state(&mut self) -> ReconciledState {
        std::mem::replace(&mut self.state, ReconciledState::new(self.session_id.clone()))
    }

    fn reconcile<F>(&mut self, step: F)
    where
        F: FnOnce(&StateReconciler, ReconciledState) -> Reconciliation,
    {
        let state = self.take_state();
        let Reconciliation { state, effects } = step(&self.reconciler, state);
        self.state = state;
        self.handle_effects(effects);
    }

    fn handle_effects(&mut self, effects: Vec<ReconcileEffect>) {
        for effect in effects {
            match effect {
                ReconcileEffect::RouteInterrupt(payload) => {
                    if self.phase == ViewPhase::RestartRequired {
                        continue;
                    }
                    match self.router.route(payload) {
                        RouteDecision::Prompt(kind) => {
                            tracing::info!(
                                "[SessionView] {} waits for input: {}",
                                self.session_id,
                                kind
                            );
                            self.resume_error = None;
                        }
                        RouteDecision::AutoApprove => self.start_auto_approve(),
                        RouteDecision::Ignored => {}
                    }
                }
                ReconcileEffect::InterruptCleared => {
                    if let Some(prompt) = self.router.dismiss() {
                        tracing::debug!(
                            "[SessionView] Closing '{}' prompt of {}",
                            prompt.kind,
                            self.session_id
                        );
                    }
                }
                ReconcileEffect::Terminal => {
                    if let Some(action) = &self.ctx.terminal {
                        action.on_completed(&self.state.session);
                    }
                }
                ReconcileEffect::Discarded(reason) => {
                    tracing::trace!("[SessionView] {}: discarded {:?}", self.session_id, reason);
                }
            }
        }
    }

    // ========================================================================
    // Resume
    // ========================================================================

    fn submit(&self, payload: ResumePayload) -> BoxFuture<'static, ResumeOutcome> {
        let client = Arc::clone(&self.ctx.resume);
        let session_id = self.session_id.clone();
        async move { client.resume(&session_id, payload).await }.boxed()
    }

    fn start_resume(&mut self, payload: ResumePayload, reply: oneshot::Sender<Result<()>>) {
        if self.phase == ViewPhase::RestartRequired {
            let _ = reply.send(Err(SyncError::stale("workflow must be restarted")));
            return;
        }
        if self.resume_task.is_some() {
            let _ = reply.send(Err(SyncError::validation(
                "a response is already being submitted",
            )));
            return;
        }
        let Some(prompt) = self.router.active().cloned() else {
            let _ = reply.send(Err(SyncError::validation(
                "no interaction is waiting for a response",
            )));
            return;
        };
        if let Err(e) = ResumeClient::check_shape(prompt.kind, &payload) {
            self.resume_error = Some(e.user_message());
            let _ = reply.send(Err(e));
            return;
        }

        self.router.dismiss();
        self.resume_error = None;
        self.pending_resume = Some(PendingResume { prompt, reply });
        self.resume_task = Some(self.submit(payload));
    }

    fn on_resume_outcome(&mut self, outcome: ResumeOutcome) {
        let Some(PendingResume { prompt, reply }) = self.pending_resume.take() else {
            return;
        };
        match &outcome {
            ResumeOutcome::Accepted => self.show_processing(),
            ResumeOutcome::RestartRequired(_) => self.phase = ViewPhase::RestartRequired,
            ResumeOutcome::Retryable(e) => {
                self.resume_error = Some(e.user_message());
                if self.state.session.is_waiting_for_input() {
                    self.router.restore(prompt);
                }
            }
        }
        let _ = reply.send(outcome.into_result());
    }

    fn start_auto_approve(&mut self) {
        tracing::info!(
            "[SessionView] Auto-approving batch confirmation for {}",
            self.session_id
        );
        let task = self.submit(ResumePayload::approve());
        self.auto_approvals.push(task);
    }

    fn on_auto_approve_outcome(&mut self, outcome: ResumeOutcome) {
        match outcome {
            ResumeOutcome::Accepted => self.show_processing(),
            ResumeOutcome::RestartRequired(_) => self.phase = ViewPhase::RestartRequired,
            ResumeOutcome::Retryable(e) => tracing::warn!(
                "[SessionView] Auto-approval for {} failed; waiting for the backend to re-prompt: {}",
                self.session_id,
                e
            ),
        }
    }

    fn show_processing(&mut self) {
        let state = self.take_state();
        self.state = self
            .reconciler
            .apply_optimistic_detail(state, self.ctx.processing_detail.clone());
    }

    // ========================================================================
    // Commands and lifecycle
    // ========================================================================

    fn on_command(&mut self, command: ViewCommand) {
        match command {
            ViewCommand::Resume { payload, reply } => self.start_resume(payload, reply),
            ViewCommand::RetryLoad { reply } => {
                let result = match self.phase {
                    ViewPhase::LoadFailed(_) => {
                        tracing::info!("[SessionView] Retrying load of {}", self.session_id);
                        self.phase = ViewPhase::Loading;
                        self.load_kind = LoadKind::Initial;
                        self.load = Some(self.fetch_snapshot());
                        Ok(())
                    }
                    _ if self.load.is_some() => Ok(()),
                    _ => Err(SyncError::validation("the session view has nothing to retry")),
                };
                let _ = reply.send(result);
            }
        }
    }

    fn publish(&self) {
        // Results that complete after deactivation are never shown.
        if self.cancel.is_cancelled() {
            return;
        }
        let next = ViewState {
            phase: self.phase.clone(),
            session: self.state.session.clone(),
            history: self.state.history.clone(),
            prompt: self.router.active().cloned(),
            connection: self.connection.clone(),
            resume_error: self.resume_error.clone(),
            submitting: self.resume_task.is_some(),
        };
        self.publisher.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn shutdown(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.load = None;
        self.resume_task = None;
        if let Some(pending) = self.pending_resume.take() {
            let _ = pending.reply.send(Err(SyncError::Cancelled));
        }
        self.publisher.send_modify(|state| {
            state.phase = ViewPhase::Deactivated;
            state.prompt = None;
            state.submitting = false;
        });
        tracing::info!("[SessionView] Deactivated {}", self.session_id);
    }
}

async fn poll_slot<T>(slot: &mut Option<BoxFuture<'static, T>>) -> T {
    match slot.as_mut() {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

async fn next_signal(channel: &mut Option<Box<dyn EventChannel>>) -> Option<ChannelSignal> {
    match channel.as_mut() {
        Some(channel) => channel.next_signal().await,
        None => std::future::pending().await,
    }
}
