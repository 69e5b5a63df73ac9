use anyhow::{Context, Result};
use chat_session::{SessionActor, SessionOptions, render_loop};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use chat_cli::config::{CliOverrides, ClientConfig, resolve_config_dir};
use chat_cli::health::check_health;
use chat_cli::input::input_loop;
use chat_cli::{HttpUploader, TranscriptPrinter, WsConnector};

#[derive(Parser)]
#[command(name = "chat")]
#[command(about = "Chat with a remote agent over WebSocket, with file uploads")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding config.toml (defaults to ~/.agent-chat)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Agent server host[:port]
    #[arg(long, global = true)]
    host: Option<String>,

    /// Use wss:// and https://
    #[arg(long, global = true)]
    secure: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session (default)
    Chat,

    /// Check that the agent server is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config_dir = resolve_config_dir(cli.config_dir.clone())?;
    let overrides = CliOverrides {
        host: cli.host.clone(),
        secure: cli.secure.then_some(true),
    };
    let config = ClientConfig::load(&config_dir, &overrides)?;

    match cli.command {
        None | Some(Commands::Chat) => run_chat(config).await,
        Some(Commands::Health) => health_command(config).await,
    }
}

/// Logs go to stderr; stdout carries the transcript.
fn init_tracing(debug: bool) {
    let default_directive = if debug {
        "chat=debug,chat_cli=debug,chat_session=debug,warn"
    } else {
        "chat=warn,chat_cli=warn,chat_session=warn,error"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

async fn run_chat(config: ClientConfig) -> Result<()> {
    info!(ws = %config.ws_url(), upload = %config.upload_url(), "starting chat session");

    let connector = WsConnector::new(config.ws_url());
    let uploader = Arc::new(HttpUploader::from_config(&config)?);
    let opts = SessionOptions {
        shutdown_grace: config.shutdown_grace,
        ..Default::default()
    };
    let session = SessionActor::spawn(&connector, uploader, opts);

    let printer = TranscriptPrinter::new(std::io::stdout()).with_timestamps(config.timestamps);
    let renderer = tokio::spawn(render_loop(session.subscribe(), printer));

    eprintln!("Type a message and press Enter. /upload <path> sends a file, /quit exits.");
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    if let Err(e) = input_loop(stdin, &session).await {
        warn!(error = %e, "session ended unexpectedly");
    }

    session
        .shutdown()
        .await
        .context("Failed to shut down chat session")?;
    drop(session);

    // The render loop ends once the actor drops its view publisher.
    if tokio::time::timeout(Duration::from_secs(2), renderer)
        .await
        .is_err()
    {
        warn!("renderer did not finish");
    }
    Ok(())
}

async fn health_command(config: ClientConfig) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;
    let url = config.health_url();

    match check_health(&client, &url).await {
        Ok(status) if status.is_ok() => {
            println!("{url}: ok");
            Ok(())
        }
        Ok(status) => {
            println!("{url}: {}", status.status);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("[chat: {e}]");
            std::process::exit(e.exit_code());
        }
    }
}
