//! Configuration handling for the MSSQL MCP Server.
//!
//! This module provides configuration management via CLI arguments and environment variables.
//! The environment variable names match the ones documented for existing deployments
//! (`SERVER_NAME`, `DATABASE_NAME`, `SQL_USERNAME`, ...), so a `.env` file keeps working.

use crate::db::ConnectionSettings;
use clap::{ArgAction, Parser, ValueEnum};
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SQL_SERVER_PORT: u16 = 1433;

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// HTTP with Server-Sent Events (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Configuration for the MSSQL MCP Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mssql-mcp-server",
    about = "MCP server for SQL Server - exposes governed database operations as tools",
    version,
    author
)]
pub struct Config {
    /// SQL Server address: "host", "host,port" or "host:port"
    #[arg(long = "server", value_name = "ADDRESS", env = "SERVER_NAME")]
    pub server: String,

    /// Database to connect to
    #[arg(long = "database", value_name = "NAME", env = "DATABASE_NAME")]
    pub database: String,

    /// SQL authentication user name
    #[arg(long = "user", env = "SQL_USERNAME")]
    pub user: String,

    /// SQL authentication password (never logged)
    #[arg(long = "password", env = "SQL_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..),
        env = "CONNECTION_TIMEOUT"
    )]
    pub connection_timeout: u64,

    /// Encrypt the connection with TLS
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        env = "ENCRYPT"
    )]
    pub encrypt: bool,

    /// Accept the server certificate without validating its chain
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        env = "TRUST_SERVER_CERTIFICATE"
    )]
    pub trust_server_certificate: bool,

    /// Only advertise and allow read-only tools (list_tables, read_data, describe_table)
    #[arg(long, env = "READONLY")]
    pub read_only: bool,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Build the database connection settings.
    ///
    /// Fails if the server address cannot be split into host and port.
    pub fn connection_settings(&self) -> Result<ConnectionSettings, String> {
        let (host, port) = parse_server_address(&self.server)?;
        if self.database.trim().is_empty() {
            return Err("Database name must not be empty".to_string());
        }

        Ok(ConnectionSettings {
            host,
            port,
            database: self.database.trim().to_string(),
            user: self.user.clone(),
            password: self.password.clone(),
            connect_timeout_secs: self.connection_timeout,
            encrypt: self.encrypt,
            trust_server_certificate: self.trust_server_certificate,
        })
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }

    /// Human readable name of the access mode.
    pub fn mode_name(&self) -> &'static str {
        if self.read_only { "read-only" } else { "full access" }
    }
}

/// Split a SQL Server address into host and port.
///
/// Accepts `host`, `host,port` (the SQL Server convention) and `host:port`.
/// The port defaults to 1433.
pub fn parse_server_address(address: &str) -> Result<(String, u16), String> {
    let address = address.trim();
    if address.is_empty() {
        return Err("Server address must not be empty".to_string());
    }

    let split = address.rfind(',').or_else(|| address.rfind(':'));
    let (host, port) = match split {
        Some(idx) => {
            let port = address[idx + 1..]
                .trim()
                .parse::<u16>()
                .map_err(|e| format!("Invalid port in server address '{}': {}", address, e))?;
            (address[..idx].trim(), port)
        }
        None => (address, DEFAULT_SQL_SERVER_PORT),
    };

    if host.is_empty() {
        return Err(format!("Missing host in server address '{}'", address));
    }
    if host.contains('\\') {
        return Err(format!(
            "Named instances are not supported in '{}'. Use host,port instead",
            address
        ));
    }

    Ok((host.to_string(), port))
}
