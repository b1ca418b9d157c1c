use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mcp_discovery_workflow::{
    config::Config,
    generation::GenerationClient,
    server::{AppState, McpServer},
    storage::JsonFileStore,
};

/// MCP server for stage-gated product discovery
#[derive(Debug, Parser)]
#[command(name = "mcp-discovery-workflow", version, about)]
struct Cli {
    /// Override the state document path
    #[arg(long)]
    state_path: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(state_path) = cli.state_path {
        config.storage.state_path = state_path;
    }
    if let Some(log_level) = cli.log_level {
        config.logging.level = log_level;
    }

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "MCP Discovery Workflow Server starting..."
    );

    // Initialize storage
    let store = Arc::new(JsonFileStore::new(&config.storage.state_path));
    info!(path = %config.storage.state_path.display(), "State store initialized");

    // Initialize generation client
    let client = match GenerationClient::new(&config.generation, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.generation.base_url, "Generation client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize generation client");
            return Err(e.into());
        }
    };

    // Create application state
    let state = Arc::new(AppState::new(config, store, client));

    // Start MCP server
    let server = McpServer::new(state);

    info!("Server ready, waiting for requests on stdin...");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        mcp_discovery_workflow::config::LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        mcp_discovery_workflow::config::LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
