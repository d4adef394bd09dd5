//! MCP server for the Docstore hosted document database.
//!
//! Run with `DOCSTORE_API_KEY=... docstore-mcp` for stdio, or
//! `docstore-mcp --transport http --port 3000` to serve `POST /mcp`.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use docstore_mcp::{AppState, Config, McpServer, ToolContext, ToolRegistry, Transport};

/// MCP server for the Docstore hosted document database.
///
/// Exposes documents, collections, schemas, version history, webhooks and
/// vector search of one Docstore project as MCP tools for AI agents.
/// Credentials come from DOCSTORE_API_KEY (a .env file is honored).
#[derive(Parser)]
#[command(name = "docstore-mcp")]
#[command(version, about, long_about = None)]
struct Args {
    /// Transport to serve MCP over.
    #[arg(long, value_enum, env = "MCP_TRANSPORT", default_value_t = Transport::Stdio)]
    transport: Transport,

    /// Port for the HTTP transport.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Interface for the HTTP transport to bind.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: std::net::IpAddr,

    /// Enable debug logging to stderr.
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(&args);

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(
        project = config.project(),
        base_url = %config.base_url(),
        transport = %args.transport,
        "starting docstore-mcp"
    );

    let ctx = match ToolContext::from_config(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    let registry = Arc::new(ToolRegistry::new());

    let result = match args.transport {
        Transport::Stdio => {
            let mut server = McpServer::new(registry, ctx);
            server.run_stdio().await.map_err(|e| e.to_string())
        }
        Transport::Http => {
            let addr = SocketAddr::new(args.host, args.port);
            docstore_mcp::serve(addr, AppState::new(registry, ctx))
                .await
                .map_err(|e| e.to_string())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: Server error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr only; stdout carries the stdio protocol.
fn init_tracing(args: &Args) {
    let filter = if args.verbose {
        EnvFilter::new("docstore_mcp=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| {
                EnvFilter::new(format!(
                    "warn,docstore_mcp={}",
                    args.transport.default_log_level()
                ))
            })
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
