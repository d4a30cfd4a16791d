use anyhow::Result;
use clap::{Parser, Subcommand};
use stagewatch_infrastructure::ClientConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "stagewatch")]
#[command(about = "Stagewatch - follow and steer multi-stage analysis workflows", long_about = None)]
struct Cli {
    /// Config file (defaults to $STAGEWATCH_CONFIG, then the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow a session live and answer its prompts
    Watch { session_id: String },
    /// List sessions
    List {
        /// Fetch every page instead of the first one
        #[arg(long)]
        all: bool,
    },
    /// Start a new analysis
    Create { input: String },
    /// Set the display name of a session
    Rename { session_id: String, name: String },
    /// Pin a session to the top of the list
    Pin {
        session_id: String,
        /// Unpin instead
        #[arg(long)]
        off: bool,
    },
    /// Delete a session
    Delete { session_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = ClientConfig::load(cli.config)?;

    match cli.command {
        Commands::Watch { session_id } => commands::watch::run(config, &session_id).await?,
        Commands::List { all } => commands::sessions::list(config, all).await?,
        Commands::Create { input } => commands::sessions::create(config, &input).await?,
        Commands::Rename { session_id, name } => {
            commands::sessions::rename(config, &session_id, &name).await?
        }
        Commands::Pin { session_id, off } => {
            commands::sessions::pin(config, &session_id, !off).await?
        }
        Commands::Delete { session_id } => commands::sessions::delete(config, &session_id).await?,
    }

    Ok(())
}

/// Logs go to stderr so they never interleave with command output.
/// Respects RUST_LOG, defaults to `warn` plus `info` for this tool's crates.
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,stagewatch=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
