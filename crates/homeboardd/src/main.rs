//! homeboardd — the homeboard daemon.
//!
//! Single binary serving the dashboard API in front of the configured
//! store (hosted row API + object storage, or a local redb file).
//!
//! # Usage
//!
//! ```text
//! SUPABASE_URL=https://proj.supabase.co SUPABASE_KEY=... homeboardd serve --port 5000
//! homeboardd serve --config homeboard.toml
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use homeboard_core::BoardConfig;
use homeboard_store::Board;
use tracing::{error, info, warn};

const DEFAULT_FILTER: &str = "info,homeboardd=debug,homeboard_api=debug,homeboard_store=debug";

#[derive(Parser)]
#[command(name = "homeboardd", about = "homeboard dashboard backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the dashboard API.
    Serve {
        /// Path to homeboard.toml.
        #[arg(long, env = "HOMEBOARD_CONFIG")]
        config: Option<PathBuf>,

        /// Address to bind, overriding the config file.
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on, overriding the config file.
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },

    /// Print the effective configuration (credentials redacted).
    Config {
        /// Path to homeboard.toml.
        #[arg(long, env = "HOMEBOARD_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, host, port } => run_serve(config, host, port).await,
        Command::Config { config } => print_config(config),
    }
}

async fn run_serve(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let mut config = BoardConfig::load(config_path.as_deref())?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    info!(backend = ?config.store.backend, "homeboard starting");

    // A missing store leaves the server up; store-backed routes report it.
    let board = Board::from_config(&config)?;
    if board.is_none() {
        error!(
            "SUPABASE_URL and SUPABASE_KEY must be set; requests will fail with \"Database client not initialized\""
        );
    }

    let router = homeboard_api::build_router(board, &config.server);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("homeboard stopped");
    Ok(())
}

fn print_config(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = BoardConfig::load(config_path.as_deref())?;
    if config.store.key.is_some() {
        config.store.key = Some("<redacted>".to_string());
    }
    println!("{}", config.to_toml_string()?);
    Ok(())
}
