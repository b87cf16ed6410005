use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;

use emdr_broker::{AppState, BrokerConfig, FileConfig, Overrides, load_config, serve};

#[derive(Parser)]
#[command(name = "emdr")]
#[command(about = "Session broker for the EMDR bilateral stimulation app")]
struct Cli {
    /// Config file (defaults to ./emdr.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Port to listen on (0 = auto-select)
    #[arg(short, long)]
    port: Option<u16>,

    /// Page clients open to join; the session id is appended as `sid`
    #[arg(long)]
    join_url_base: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_directive = if cli.debug {
        "emdr=debug,emdr_broker=debug,tower_http=debug,info"
    } else {
        "emdr=info,emdr_broker=info,tower_http=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let file_config: FileConfig = load_config(cli.config.as_deref())
        .extract()
        .context("Failed to load configuration")?;
    let file_config = file_config.apply(Overrides {
        host: cli.host,
        port: cli.port,
        join_url_base: cli.join_url_base,
    });
    let config = BrokerConfig::from_file(&file_config)?;

    info!("Starting EMDR session broker");
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal");
    };

    serve(listener, AppState::new(config), shutdown_signal).await?;
    info!("Shutdown complete");
    Ok(())
}
