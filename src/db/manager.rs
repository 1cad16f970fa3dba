//! Lazily opened, reused database connection.
//!
//! The server holds at most one live connection. It is opened on the first
//! tool call, reused while healthy and replaced after it drops.

use crate::db::connection::{ConnectionSettings, Connector, SqlConnection};
use crate::db::params::SqlStatement;
use crate::db::types::Row;
use crate::error::{DbError, DbResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct ConnectionManager {
    settings: ConnectionSettings,
    connector: Arc<dyn Connector>,
    slot: Mutex<Option<Box<dyn SqlConnection>>>,
    connections_opened: AtomicU64,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("settings", &self.settings)
            .field("connections_opened", &self.connections_opened())
            .finish()
    }
}

impl ConnectionManager {
    /// Create a manager. No connection is opened until it is needed.
    pub fn new(settings: ConnectionSettings, connector: Arc<dyn Connector>) -> Self {
        Self {
            settings,
            connector,
            slot: Mutex::new(None),
            connections_opened: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Make sure a connected handle is held, opening one if needed.
    ///
    /// A stale handle is closed best-effort before a new one is opened. On
    /// failure the slot is left empty and the next call tries again.
    pub async fn ensure_connected(&self) -> DbResult<()> {
        let mut slot = self.slot.lock().await;

        if slot.as_ref().is_some_and(|conn| conn.is_connected()) {
            debug!("Reusing SQL Server connection");
            return Ok(());
        }

        if let Some(stale) = slot.take() {
            debug!("Discarding disconnected SQL Server handle");
            if let Err(e) = stale.close().await {
                debug!(error = %e, "Closing stale connection failed");
            }
        }

        let timeout = self.settings.connect_timeout();
        let target = self.settings.target();
        info!(target = %target, timeout_ms = self.settings.connect_timeout_ms(), "Connecting to SQL Server");

        let conn = match tokio::time::timeout(timeout, self.connector.connect(&self.settings)).await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                warn!(target = %target, error = %e, "SQL Server connection failed");
                return Err(match e {
                    e @ DbError::Connection { .. } => e,
                    other => DbError::connection(
                        other.to_string(),
                        "Check the server address, database name and credentials",
                    ),
                });
            }
            Err(_) => {
                warn!(target = %target, "SQL Server connection timed out");
                return Err(DbError::connection(
                    format!(
                        "Timed out after {}ms connecting to {}",
                        self.settings.connect_timeout_ms(),
                        target
                    ),
                    "Check that SQL Server is reachable or raise CONNECTION_TIMEOUT",
                ));
            }
        };

        *slot = Some(conn);
        let opened = self.connections_opened.fetch_add(1, Ordering::SeqCst) + 1;
        info!(target = %target, connections_opened = opened, "Connected to SQL Server");
        Ok(())
    }

    /// Run a query on the current connection.
    pub async fn query(&self, stmt: &SqlStatement) -> DbResult<Vec<Row>> {
        let mut slot = self.slot.lock().await;
        let conn = Self::live(&mut slot)?;
        debug!(sql = %stmt.sql, params = stmt.params.len(), "Executing query");
        conn.query(&stmt.sql, &stmt.params).await
    }

    /// Run a query, reading at most `limit` rows.
    pub async fn query_limited(&self, stmt: &SqlStatement, limit: usize) -> DbResult<Vec<Row>> {
        let mut slot = self.slot.lock().await;
        let conn = Self::live(&mut slot)?;
        debug!(sql = %stmt.sql, params = stmt.params.len(), limit, "Executing limited query");
        conn.query_limited(&stmt.sql, &stmt.params, limit).await
    }

    /// Run a statement on the current connection and return affected rows.
    pub async fn execute(&self, stmt: &SqlStatement) -> DbResult<u64> {
        let mut slot = self.slot.lock().await;
        let conn = Self::live(&mut slot)?;
        debug!(sql = %stmt.sql, params = stmt.params.len(), "Executing statement");
        conn.execute(&stmt.sql, &stmt.params).await
    }

    fn live<'a>(
        slot: &'a mut Option<Box<dyn SqlConnection>>,
    ) -> DbResult<&'a mut Box<dyn SqlConnection>> {
        match slot {
            Some(conn) if conn.is_connected() => Ok(conn),
            _ => Err(DbError::connection(
                "No active SQL Server connection",
                "Retry the request to reconnect",
            )),
        }
    }

    /// Whether a connected handle is currently held.
    pub async fn is_connected(&self) -> bool {
        self.slot
            .lock()
            .await
            .as_ref()
            .is_some_and(|conn| conn.is_connected())
    }

    /// Number of connections opened since start.
    pub fn connections_opened(&self) -> u64 {
        self.connections_opened.load(Ordering::SeqCst)
    }

    /// Close the held connection, if any.
    pub async fn close(&self) {
        if let Some(conn) = self.slot.lock().await.take() {
            info!("Closing SQL Server connection");
            if let Err(e) = conn.close().await {
                warn!(error = %e, "Error while closing SQL Server connection");
            }
        }
    }
}
