use anyhow::Result;
use stagewatch_application::{
    ConnectionState, SessionViewHandle, StagewatchClient, TerminalAction, ViewPhase, ViewState,
};
use stagewatch_core::interrupt::{ActivePrompt, InteractionType, ResumePayload};
use stagewatch_core::session::Session;
use stagewatch_infrastructure::ClientConfig;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

struct AnnounceCompletion;

impl TerminalAction for AnnounceCompletion {
    fn on_completed(&self, session: &Session) {
        println!("\n✅ Analysis {} completed", session.id);
        if let Some(report) = &session.final_report_ref {
            println!("   Final report: {}", report);
        }
    }
}

pub async fn run(config: ClientConfig, session_id: &str) -> Result<()> {
    let terminal: Arc<dyn TerminalAction> = Arc::new(AnnounceCompletion);
    let client = StagewatchClient::from_config(config, Some(terminal))?;
    let handle = client.views().activate(session_id).await;
    let mut states = handle.state();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut printer = Printer::default();

    println!("👀 Watching {} (Ctrl-C to stop)", session_id);
    loop {
        let state = states.borrow_and_update().clone();
        printer.render(&state);
        if is_finished(&state) {
            break;
        }

        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            line = input.next_line(), if state.prompt.is_some() && !state.submitting => {
                match line? {
                    Some(line) => submit(&handle, &line).await,
                    None => {
                        tracing::warn!("[Watch] stdin closed while a prompt was open; stopping");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.shutdown().await;
    Ok(())
}

async fn submit(handle: &SessionViewHandle, line: &str) {
    let payload = match ResumePayload::from_user_input(line) {
        Ok(payload) => payload,
        Err(e) => {
            println!("  ✗ {}", e.user_message());
            return;
        }
    };
    match handle.resume(payload).await {
        Ok(()) => println!("  ↳ Sent"),
        Err(e) if e.is_stale() => {
            tracing::warn!("[Watch] Resume of {} rejected as stale", handle.session_id());
            println!("  ✗ This workflow was superseded. Start a new analysis to continue.")
        }
        Err(e) => {
            tracing::warn!("[Watch] Resume of {} failed: {}", handle.session_id(), e);
            println!("  ✗ {} (you can answer again)", e.user_message());
        }
    }
}

fn is_finished(state: &ViewState) -> bool {
    match &state.phase {
        ViewPhase::Deactivated | ViewPhase::RestartRequired | ViewPhase::LoadFailed(_) => true,
        ViewPhase::Ready => state.session.status.is_terminal(),
        ViewPhase::Loading => false,
    }
}

/// Prints only what changed since the previous state.
#[derive(Default)]
struct Printer {
    history_len: usize,
    status: Option<String>,
    progress_pct: u32,
    detail: String,
    connection: Option<ConnectionState>,
    prompt: Option<ActivePrompt>,
    phase: Option<ViewPhase>,
    notices: Vec<String>,
}

impl Printer {
    fn render(&mut self, state: &ViewState) {
        if self.phase.as_ref() != Some(&state.phase) {
            match &state.phase {
                ViewPhase::Loading => println!("⏳ Loading..."),
                ViewPhase::LoadFailed(e) => println!("❌ Could not load session: {}", e.user_message()),
                ViewPhase::RestartRequired => {
                    println!("⚠️  This workflow is stale and must be restarted.")
                }
                ViewPhase::Ready | ViewPhase::Deactivated => {}
            }
            self.phase = Some(state.phase.clone());
        }

        if self.connection.as_ref() != Some(&state.connection) {
            if let ConnectionState::Disconnected { reason } = &state.connection {
                println!("⚠️  Live updates interrupted ({}), reconnecting...", reason);
            } else if matches!(
                self.connection,
                Some(ConnectionState::Disconnected { .. })
            ) && state.connection == ConnectionState::Connected
            {
                println!("🔌 Live updates restored");
            }
            self.connection = Some(state.connection.clone());
        }

        for entry in state.history.entries().iter().skip(self.history_len) {
            println!("  ✓ {}: {}", entry.node, entry.detail);
        }
        self.history_len = state.history.len();

        let status = state.session.status.as_str().to_string();
        let progress_pct = (state.session.progress * 100.0).round() as u32;
        if self.status.as_deref() != Some(status.as_str()) || self.progress_pct != progress_pct {
            println!("📊 {} ({}%)", status, progress_pct);
            self.status = Some(status);
            self.progress_pct = progress_pct;
        }

        if state.session.detail != self.detail && !state.session.detail.is_empty() {
            println!("   {}", state.session.detail);
        }
        self.detail = state.session.detail.clone();

        if state.prompt != self.prompt {
            if let Some(prompt) = &state.prompt {
                print_prompt(prompt);
            }
            self.prompt = state.prompt.clone();
        }

        let notices: Vec<String> = [
            state.resume_error.as_ref().map(|e| format!("  ✗ {}", e)),
            state.session.error.as_ref().map(|e| format!("❌ {}", e)),
            state
                .session
                .rejection_reason
                .as_ref()
                .map(|r| format!("🚫 Rejected: {}", r)),
        ]
        .into_iter()
        .flatten()
        .collect();
        for notice in notices.iter().filter(|n| !self.notices.contains(n)) {
            println!("{}", notice);
        }
        self.notices = notices;
    }
}

fn print_prompt(prompt: &ActivePrompt) {
    println!("\n❓ Input needed: {}", prompt.kind);
    if let Some(message) = prompt.payload.message() {
        println!("   {}", message);
    }
    let hint = match prompt.kind {
        InteractionType::Questionnaire => "answer with {\"answers\": {...}} or 'skip'",
        InteractionType::RequirementsConfirmation => {
            "answer 'confirm' or {\"modifications\": {...}}"
        }
        InteractionType::RoleAndTaskUnifiedReview => {
            "answer 'approve' or {\"modifications\": {...}}"
        }
        InteractionType::UserQuestion => "type your answer, or 'skip'",
        InteractionType::BatchConfirmation => "answer 'approve'",
    };
    println!("   ({})", hint);
}
