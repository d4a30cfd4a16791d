//! State reconciliation.
//!
//! `StateReconciler` merges two independent, unordered sources into one view
//! of a session: the one-shot snapshot and the incremental event stream. It is
//! a pure function over `ReconciledState`; side effects the caller must carry
//! out (routing an interrupt, firing the terminal action) are returned as
//! `ReconcileEffect`s.
//!
//! Guarantees, whatever the arrival order:
//! - progress never decreases
//! - a terminal status is never replaced by a different one
//! - `interrupt_data` is present iff the status is `waiting_for_input`
//! - at most one node carries the active marker
//! - the terminal action is requested at most once

use super::event::{StatusChange, WorkflowEvent};
use super::history::{AppendOutcome, HistoryLog, NodeHistoryEntry};
use super::model::{Session, SessionStatus};
use super::snapshot::SessionSnapshot;
use crate::interrupt::InterruptPayload;

/// Why (part of) an event was not applied.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscardReason {
    /// Incoming progress is lower than what is already shown
    ProgressRegression { current: f64, incoming: f64 },
    InvalidProgress,
    /// Consecutive update for the node that is already the last history entry
    SameNodeUpdate { node: String },
    UnsupportedKind { kind: String },
    /// The session already reached a terminal status
    TerminalRegression {
        current: SessionStatus,
        incoming: SessionStatus,
    },
    /// `waiting_for_input` announced without any interrupt payload
    MissingInterruptPayload,
    /// The stream already delivered a fresher value for this field
    StreamIsNewer { field: &'static str },
}

/// Work the caller must do after a reconciliation step.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileEffect {
    /// Hand this payload to the interrupt router
    RouteInterrupt(InterruptPayload),
    /// The session left `waiting_for_input`; close any open prompt
    InterruptCleared,
    /// The session completed; run the terminal action
    Terminal,
    Discarded(DiscardReason),
}

/// Everything a session view knows about its session.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledState {
    pub session: Session,
    pub history: HistoryLog,
    /// Set by `initial_status`, cleared when the stream reports a disconnect
    pub connected: bool,
    /// One-shot guard for the terminal action
    pub terminal_fired: bool,
    stream_status_seen: bool,
    stream_stage_seen: bool,
}

impl ReconciledState {
    /// State for a brand-new session id: progress starts again at zero.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self::from_session(Session::new(session_id))
    }

    pub fn from_session(session: Session) -> Self {
        Self {
            session,
            history: HistoryLog::new(),
            connected: false,
            terminal_fired: false,
            stream_status_seen: false,
            stream_stage_seen: false,
        }
    }
}

/// Result of one reconciliation step.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub state: ReconciledState,
    pub effects: Vec<ReconcileEffect>,
}

impl Reconciliation {
    pub fn fired_terminal(&self) -> bool {
        self.effects.contains(&ReconcileEffect::Terminal)
    }

    pub fn discarded(&self) -> impl Iterator<Item = &DiscardReason> {
        self.effects.iter().filter_map(|effect| match effect {
            ReconcileEffect::Discarded(reason) => Some(reason),
            _ => None,
        })
    }
}

/// Merge function for one session view.
///
/// Each view owns its own reconciler; state is passed in and returned by value.
#[derive(Debug, Clone)]
pub struct StateReconciler {
    session_id: String,
}

impl StateReconciler {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Applies one streamed event.
    pub fn apply(&self, state: ReconciledState, event: &WorkflowEvent) -> Reconciliation {
        let mut state = state;
        let mut effects = Vec::new();

        match event {
            WorkflowEvent::InitialStatus {
                status,
                progress,
                current_stage,
                detail,
                interrupt_data,
            } => {
                state.connected = true;
                if let Some(status) = status {
                    if !self.transition(&mut state, *status, interrupt_data.clone(), &mut effects)
                    {
                        return self.finish(state, effects);
                    }
                    state.stream_status_seen = true;
                }
                if let Some(progress) = progress {
                    self.adopt_progress(&mut state, *progress, &mut effects);
                }
                if let Some(stage) = current_stage {
                    state.session.current_stage = Some(stage.clone());
                    state.stream_stage_seen = true;
                    if state.session.status.is_active() {
                        state.history.mark_active(stage.clone());
                    }
                }
                if let Some(detail) = detail {
                    state.session.detail = detail.clone();
                }
            }
            WorkflowEvent::StatusUpdate(change) => {
                if !self.apply_status_change(&mut state, change, &mut effects) {
                    return self.finish(state, effects);
                }
            }
            WorkflowEvent::NodeUpdate {
                node,
                detail,
                timestamp,
            } => {
                if !self.transition(&mut state, SessionStatus::Running, None, &mut effects) {
                    return self.finish(state, effects);
                }
                state.stream_status_seen = true;
                state.stream_stage_seen = true;
                state.session.current_stage = Some(node.clone());
                state.session.detail = detail.clone();

                if let Some(previous) = state.history.mark_active(node.clone()) {
                    tracing::debug!(
                        "[StateReconciler] {}: node '{}' completed, '{}' active",
                        self.session_id,
                        previous,
                        node
                    );
                }

                let timestamp = timestamp
                    .clone()
                    .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());
                let entry = NodeHistoryEntry::new(node.clone(), detail.clone(), timestamp);
                if state.history.append(entry) == AppendOutcome::Absorbed {
                    tracing::debug!(
                        "[StateReconciler] {}: repeated node_update for '{}' absorbed into existing history entry",
                        self.session_id,
                        node
                    );
                    effects.push(ReconcileEffect::Discarded(DiscardReason::SameNodeUpdate {
                        node: node.clone(),
                    }));
                }
            }
            WorkflowEvent::Interrupt { payload } => {
                if self.transition(
                    &mut state,
                    SessionStatus::WaitingForInput,
                    Some(payload.clone()),
                    &mut effects,
                ) {
                    state.stream_status_seen = true;
                }
            }
            WorkflowEvent::Unsupported { kind } => {
                tracing::warn!(
                    "[StateReconciler] {}: ignoring unsupported event kind '{}'",
                    self.session_id,
                    kind
                );
                effects.push(ReconcileEffect::Discarded(DiscardReason::UnsupportedKind {
                    kind: kind.clone(),
                }));
            }
        }

        self.finish(state, effects)
    }

    /// Applies a freshly loaded snapshot.
    ///
    /// The snapshot may resolve before or after the first streamed events. Its
    /// history always backfills the log; its status, stage and detail are only
    /// adopted while the stream has not supplied fresher values, except that a
    /// terminal snapshot status always wins.
    pub fn apply_snapshot(
        &self,
        state: ReconciledState,
        snapshot: &SessionSnapshot,
    ) -> Reconciliation {
        let mut state = state;
        let mut effects = Vec::new();

        let added = state.history.backfill(snapshot.history.clone());
        if added > 0 {
            tracing::debug!(
                "[StateReconciler] {}: backfilled {} history entries from snapshot",
                self.session_id,
                added
            );
        }

        if !state.stream_status_seen || snapshot.status.is_terminal() {
            if !self.transition(
                &mut state,
                snapshot.status,
                snapshot.interrupt_data.clone(),
                &mut effects,
            ) {
                return self.finish(state, effects);
            }
        } else {
            tracing::debug!(
                "[StateReconciler] {}: keeping streamed status '{}' over snapshot '{}'",
                self.session_id,
                state.session.status,
                snapshot.status
            );
            effects.push(ReconcileEffect::Discarded(DiscardReason::StreamIsNewer {
                field: "status",
            }));
        }

        self.adopt_progress(&mut state, snapshot.progress, &mut effects);

        if state.session.error.is_none() {
            state.session.error = snapshot.error.clone();
        }
        if state.session.rejection_reason.is_none() {
            state.session.rejection_reason = snapshot.rejection_reason.clone();
        }
        if state.session.final_report_ref.is_none() {
            state.session.final_report_ref = snapshot.final_report_ref.clone();
        }
        if let Some(created_at) = &snapshot.created_at {
            state.session.created_at = created_at.clone();
        }

        if state.stream_stage_seen {
            effects.push(ReconcileEffect::Discarded(DiscardReason::StreamIsNewer {
                field: "current_stage",
            }));
        } else {
            state.session.current_stage = snapshot.current_stage.clone();
            state.session.detail = snapshot.detail.clone();
            if state.session.status.is_active()
                && let Some(stage) = &snapshot.current_stage
            {
                state.history.mark_active(stage.clone());
            }
        }

        self.finish(state, effects)
    }

    /// Records a connectivity drop reported by the event channel.
    ///
    /// Streamed values from before the gap no longer outrank a snapshot: the
    /// next snapshot is fetched after reconnecting, so it may carry a pause or
    /// stage change the stream never delivered.
    pub fn mark_disconnected(&self, state: ReconciledState) -> ReconciledState {
        let mut state = state;
        state.connected = false;
        state.stream_status_seen = false;
        state.stream_stage_seen = false;
        state
    }

    /// Writes the optimistic "processing" text shown after a resume is accepted.
    ///
    /// The next streamed `node_update` or `status_update` supersedes it.
    pub fn apply_optimistic_detail(
        &self,
        state: ReconciledState,
        detail: impl Into<String>,
    ) -> ReconciledState {
        let mut state = state;
        state.session.detail = detail.into();
        state
    }

    fn apply_status_change(
        &self,
        state: &mut ReconciledState,
        change: &StatusChange,
        effects: &mut Vec<ReconcileEffect>,
    ) -> bool {
        if let Some(status) = change.status {
            if !self.transition(state, status, change.interrupt_data.clone(), effects) {
                return false;
            }
            state.stream_status_seen = true;
        }
        if let Some(error) = &change.error {
            state.session.error = Some(error.clone());
        }
        if let Some(reason) = &change.rejection_reason {
            state.session.rejection_reason = Some(reason.clone());
        }
        if let Some(report) = &change.final_report_ref {
            state.session.final_report_ref = Some(report.clone());
        }
        if let Some(progress) = change.progress {
            self.adopt_progress(state, progress, effects);
        }
        true
    }

    /// Moves the session to `next`, keeping the interrupt invariant.
    ///
    /// Returns false when the whole event must be dropped (terminal regression).
    fn transition(
        &self,
        state: &mut ReconciledState,
        next: SessionStatus,
        interrupt: Option<InterruptPayload>,
        effects: &mut Vec<ReconcileEffect>,
    ) -> bool {
        let current = state.session.status;
        if current.is_terminal() && next != current {
            tracing::warn!(
                "[StateReconciler] {}: ignoring '{}' after terminal status '{}'",
                self.session_id,
                next,
                current
            );
            effects.push(ReconcileEffect::Discarded(
                DiscardReason::TerminalRegression {
                    current,
                    incoming: next,
                },
            ));
            return false;
        }

        if next == SessionStatus::WaitingForInput {
            match interrupt {
                Some(payload) => {
                    state.session.interrupt_data = Some(payload.clone());
                    effects.push(ReconcileEffect::RouteInterrupt(payload));
                }
                None if state.session.interrupt_data.is_some() => {}
                None => {
                    tracing::warn!(
                        "[StateReconciler] {}: waiting_for_input without interrupt payload; status left at '{}'",
                        self.session_id,
                        current
                    );
                    effects.push(ReconcileEffect::Discarded(
                        DiscardReason::MissingInterruptPayload,
                    ));
                    return true;
                }
            }
        } else if state.session.interrupt_data.take().is_some() {
            effects.push(ReconcileEffect::InterruptCleared);
        }

        state.session.status = next;
        if next.is_terminal() {
            state.history.complete_all();
        }
        if next == SessionStatus::Completed {
            if state.terminal_fired {
                tracing::debug!(
                    "[StateReconciler] {}: completion already handled",
                    self.session_id
                );
            } else {
                tracing::info!("[StateReconciler] {}: session completed", self.session_id);
                state.terminal_fired = true;
                effects.push(ReconcileEffect::Terminal);
            }
        }
        true
    }

    /// Monotonicity guard for progress.
    fn adopt_progress(
        &self,
        state: &mut ReconciledState,
        incoming: f64,
        effects: &mut Vec<ReconcileEffect>,
    ) {
        if incoming.is_nan() {
            effects.push(ReconcileEffect::Discarded(DiscardReason::InvalidProgress));
            return;
        }
        let incoming = incoming.clamp(0.0, 1.0);
        let current = state.session.progress;
        if incoming >= current {
            state.session.progress = incoming;
        } else {
            tracing::warn!(
                "[StateReconciler] {}: discarding stale progress {:.3} (current {:.3})",
                self.session_id,
                incoming,
                current
            );
            effects.push(ReconcileEffect::Discarded(
                DiscardReason::ProgressRegression { current, incoming },
            ));
        }
    }

    fn finish(&self, state: ReconciledState, effects: Vec<ReconcileEffect>) -> Reconciliation {
        debug_assert!(
            state.session.check_invariants().is_empty(),
            "session invariants violated: {:?}",
            state.session.check_invariants()
        );
        Reconciliation { state, effects }
    }
}
