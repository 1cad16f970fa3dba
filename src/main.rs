//! MSSQL MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to read and modify a Microsoft SQL Server database.

use clap::Parser;
use mssql_mcp_server::config::{Config, TransportMode};
use mssql_mcp_server::db::{ConnectionManager, MssqlConnector};
use mssql_mcp_server::mcp::Dispatcher;
use mssql_mcp_server::tools::ToolRegistry;
use mssql_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so they never mix with the stdio transport.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let dotenv = dotenvy::dotenv();

    let config = Config::parse();
    init_tracing(&config);

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let settings = match config.connection_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            eprintln!("Error: {}", e);
            eprintln!();
            eprintln!("Usage: mssql-mcp-server --server <host[,port]> --database <name> --user <user> --password <password>");
            eprintln!();
            eprintln!("The same settings can be given with SERVER_NAME, DATABASE_NAME,");
            eprintln!("SQL_USERNAME and SQL_PASSWORD (a .env file is read if present).");
            std::process::exit(1);
        }
    };

    info!(
        transport = %config.transport,
        mode = config.mode_name(),
        target = %settings.target(),
        encrypt = settings.encrypt,
        trust_server_certificate = settings.trust_server_certificate,
        connect_timeout_ms = settings.connect_timeout_ms(),
        "Starting MSSQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );
    if settings.trust_server_certificate {
        warn!("Server certificate validation is disabled");
    }

    // The connection is opened lazily by the first tool call
    let connections = Arc::new(ConnectionManager::new(
        settings,
        Arc::new(MssqlConnector::new()),
    ));
    let registry = ToolRegistry::builtin();
    let dispatcher = Arc::new(Dispatcher::new(connections, &registry, config.read_only));

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            StdioTransport::new(dispatcher).run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            HttpTransport::new(
                dispatcher,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .run()
            .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
