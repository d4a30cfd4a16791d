use anyhow::Result;
use stagewatch_application::StagewatchClient;
use stagewatch_core::registry::SessionSummary;
use stagewatch_infrastructure::ClientConfig;

fn connect(config: ClientConfig) -> Result<StagewatchClient> {
    Ok(StagewatchClient::from_config(config, None)?)
}

pub async fn list(config: ClientConfig, all: bool) -> Result<()> {
    let client = connect(config)?;
    let registry = client.registry();
    registry.refresh().await?;
    if all {
        registry.load_all().await?;
    }

    let sessions = registry.sessions().await;
    if sessions.is_empty() {
        println!("No sessions yet. Start one with: stagewatch create \"<request>\"");
        return Ok(());
    }
    for session in &sessions {
        print_row(session);
    }
    if !all && registry.has_more().await {
        println!("\n(more sessions available, use --all)");
    }
    Ok(())
}

pub async fn create(config: ClientConfig, input: &str) -> Result<()> {
    let client = connect(config)?;
    let session = client.registry().create(input).await?;
    println!("✅ Created {}", session.session_id);
    println!("   Follow it with: stagewatch watch {}", session.session_id);
    Ok(())
}

pub async fn rename(config: ClientConfig, session_id: &str, name: &str) -> Result<()> {
    let client = connect(config)?;
    client.registry().load_all().await?;
    client.registry().rename(session_id, name).await?;
    println!("✓ Renamed {} to \"{}\"", session_id, name);
    Ok(())
}

pub async fn pin(config: ClientConfig, session_id: &str, pinned: bool) -> Result<()> {
    let client = connect(config)?;
    client.registry().load_all().await?;
    client.registry().set_pinned(session_id, pinned).await?;
    println!(
        "✓ {} {}",
        if pinned { "Pinned" } else { "Unpinned" },
        session_id
    );
    Ok(())
}

pub async fn delete(config: ClientConfig, session_id: &str) -> Result<()> {
    let client = connect(config)?;
    client.registry().delete(session_id).await?;
    println!("🗑  Deleted {}", session_id);
    Ok(())
}

fn print_row(session: &SessionSummary) {
    let marker = if session.pinned { "📌" } else { "  " };
    println!(
        "{} {:<38} {:<18} {}  {}",
        marker,
        session.session_id,
        session.status.as_str(),
        session.created_at,
        session.title()
    );
}
