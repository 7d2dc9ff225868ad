mod check_config_cmd;
mod clients;
mod config;
mod status_cmd;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docsnap_config::{ensure_valid, LogFormat};
use docsnap_gateway::{start_server, GatewayState, PipelineSettings, WebhookController};
use docsnap_logging::init_logger;
use tracing::info;

#[derive(Parser)]
#[command(name = "docsnap")]
#[command(about = "docsnap: photographed documents in, extracted text out")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server
    Serve {
        /// Path to config.yaml
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Validate a config file and print the report
    CheckConfig {
        /// Path to config.yaml
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Also print the resolved config with secrets masked
        #[arg(long)]
        show: bool,
    },
    /// Query a running server's health endpoint
    Status {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port } => serve(config::resolve_config_path(config), port).await,
        Commands::CheckConfig { config, show } => {
            check_config_cmd::run(&config::resolve_config_path(config), show).await
        }
        Commands::Status { host, port } => status_cmd::run(&host, port).await,
    }
}

async fn serve(config_path: PathBuf, port: Option<u16>) -> Result<()> {
    let config = config::load_unchecked(&config_path).await?;

    init_logger(
        &config.logging.level,
        config.logging.format == LogFormat::Json,
        config.logging.dir.as_deref().map(std::path::Path::new),
    );
    ensure_valid(&config, &config_path)?;

    let settings = PipelineSettings::from_config(&config)?;
    let controller = Arc::new(WebhookController::new(
        clients::build_collaborators(&config)?,
        settings,
    ));

    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", config.server.host, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{port}", config.server.host))?;

    info!(
        addr = %addr,
        config = %config_path.display(),
        webhook = %config.webhook.path,
        "Starting docsnap"
    );
    start_server(addr, &config.webhook.path, GatewayState::new(controller)).await
}
