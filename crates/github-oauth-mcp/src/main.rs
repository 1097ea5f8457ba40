//! GitHub OAuth MCP Server - Entry Point
//!
//! Provides both HTTP (OAuth flow + MCP) and stdio (MCP only) transports.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use github_oauth_mcp::{config::Config, server::McpServer};

#[derive(Parser, Debug)]
#[command(name = "github-oauth-mcp")]
#[command(about = "MCP server exposing GitHub tools behind OAuth 2.1 with PKCE")]
#[command(version)]
struct Cli {
    /// Transport mode: http or stdio
    #[arg(long, default_value = "http")]
    transport: Transport,

    /// HTTP server port (only used with --transport http)
    #[arg(long, default_value = "8080", env = "PORT")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum Transport {
    /// HTTP with the OAuth flow routes
    #[default]
    Http,
    /// Standard input/output (MCP only)
    Stdio,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    let config = Config::from_env()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = ?cli.transport,
        environment = %config.environment,
        oauth_configured = config.is_oauth_configured(),
        "Starting GitHub OAuth MCP server"
    );

    if !config.is_oauth_configured() {
        tracing::warn!(
            "OAuth credentials are not configured; authenticated tools will fail \
             until OAUTH_CLIENT_ID and OAUTH_CLIENT_SECRET are set"
        );
    }

    let server = McpServer::new(config)?;

    match cli.transport {
        Transport::Http => {
            tracing::info!(port = cli.port, "Running in HTTP mode");
            server.run_http(cli.port).await?;
        }
        Transport::Stdio => {
            tracing::info!("Running in stdio mode");
            server.run_stdio().await?;
        }
    }

    Ok(())
}
