//! Connection traits and settings.
//!
//! `ConnectionManager` only talks to the database through these traits, so
//! the driver can be swapped (tiberius in production, in-memory fakes in tests).

use crate::db::params::SqlParam;
use crate::db::types::Row;
use crate::error::DbResult;
use async_trait::async_trait;
use std::time::Duration;

/// Database settings taken from the process configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    /// Sensitive - redacted from Debug output.
    pub password: String,
    pub connect_timeout_secs: u64,
    pub encrypt: bool,
    pub trust_server_certificate: bool,
}

impl ConnectionSettings {
    /// Get the connection timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Connection timeout in milliseconds.
    pub fn connect_timeout_ms(&self) -> u64 {
        self.connect_timeout_secs.saturating_mul(1000)
    }

    /// "host:port/database", safe to log.
    pub fn target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("encrypt", &self.encrypt)
            .field("trust_server_certificate", &self.trust_server_certificate)
            .finish()
    }
}

/// A live database connection.
///
/// Implementations track their own connectivity: after a transport-level
/// failure `is_connected` must return false so the manager replaces the handle.
#[async_trait]
pub trait SqlConnection: Send {
    /// Whether the handle can still be used.
    fn is_connected(&self) -> bool;

    /// Run a statement and return the rows of its first result set.
    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> DbResult<Vec<Row>>;

    /// Like [`query`](Self::query), but reads at most `limit` rows off the
    /// wire. Unread rows are discarded by the driver.
    async fn query_limited(
        &mut self,
        sql: &str,
        params: &[SqlParam],
        limit: usize,
    ) -> DbResult<Vec<Row>>;

    /// Run a statement and return the total number of affected rows.
    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> DbResult<u64>;

    /// Close the connection.
    async fn close(self: Box<Self>) -> DbResult<()>;
}

/// Opens new connections from settings.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, settings: &ConnectionSettings) -> DbResult<Box<dyn SqlConnection>>;
}
