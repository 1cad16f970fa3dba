//! In-memory `Connector` used by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use mssql_mcp_server::db::{
    ConnectionManager, ConnectionSettings, Connector, Row, SqlConnection, SqlParam,
};
use mssql_mcp_server::error::{DbError, DbResult};
use mssql_mcp_server::mcp::Dispatcher;
use mssql_mcp_server::tools::{JsonObject, ToolRegistry};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
pub struct FakeState {
    attempts: AtomicUsize,
    opens: AtomicUsize,
    closes: AtomicUsize,
    failures_left: AtomicUsize,
    connect_delay: Mutex<Option<Duration>>,
    rows: Mutex<Vec<Row>>,
    rows_affected: AtomicU64,
    rows_fetched: AtomicUsize,
    query_error: Mutex<Option<String>>,
    panic_on_query: AtomicBool,
    statements: Mutex<Vec<(String, Vec<SqlParam>)>>,
    handles: Mutex<Vec<Arc<AtomicBool>>>,
}

/// Connector whose connections answer with canned data.
#[derive(Clone, Default)]
pub struct FakeConnector {
    state: Arc<FakeState>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Make the next `n` connect attempts fail.
    pub fn fail_next_connects(&self, n: usize) {
        self.state.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *self.state.connect_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_rows(&self, rows: Vec<Value>) {
        *self.state.rows.lock().unwrap() = rows
            .into_iter()
            .map(|row| match row {
                Value::Object(map) => map,
                other => panic!("row must be an object, got {}", other),
            })
            .collect();
    }

    pub fn set_rows_affected(&self, n: u64) {
        self.state.rows_affected.store(n, Ordering::SeqCst);
    }

    pub fn fail_queries_with(&self, message: &str) {
        *self.state.query_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn panic_on_query(&self, panic: bool) {
        self.state.panic_on_query.store(panic, Ordering::SeqCst);
    }

    /// Rows handed out by queries so far.
    pub fn rows_fetched(&self) -> usize {
        self.state.rows_fetched.load(Ordering::SeqCst)
    }

    /// Statements run so far, in order.
    pub fn statements(&self) -> Vec<(String, Vec<SqlParam>)> {
        self.state.statements.lock().unwrap().clone()
    }

    /// Simulate the server dropping every open connection.
    pub fn disconnect_all(&self) {
        for handle in self.state.handles.lock().unwrap().iter() {
            handle.store(false, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _settings: &ConnectionSettings) -> DbResult<Box<dyn SqlConnection>> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);

        let delay = *self.state.connect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .state
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DbError::connection(
                "Login failed for user 'sa'",
                "Check the credentials",
            ));
        }

        let connected = Arc::new(AtomicBool::new(true));
        self.state.handles.lock().unwrap().push(connected.clone());
        self.state.opens.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(FakeConnection {
            state: self.state.clone(),
            connected,
        }))
    }
}

struct FakeConnection {
    state: Arc<FakeState>,
    connected: Arc<AtomicBool>,
}

impl FakeConnection {
    fn record(&self, sql: &str, params: &[SqlParam]) -> DbResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(DbError::connection("Connection reset", "Reconnect"));
        }
        self.state
            .statements
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        if self.state.panic_on_query.load(Ordering::SeqCst) {
            panic!("fake driver exploded");
        }
        if let Some(message) = self.state.query_error.lock().unwrap().clone() {
            return Err(DbError::database(message, Some(208), "Check the object name"));
        }
        Ok(())
    }
}

#[async_trait]
impl SqlConnection for FakeConnection {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> DbResult<Vec<Row>> {
        self.record(sql, params)?;
        let rows = self.state.rows.lock().unwrap().clone();
        self.state.rows_fetched.fetch_add(rows.len(), Ordering::SeqCst);
        Ok(rows)
    }

    async fn query_limited(
        &mut self,
        sql: &str,
        params: &[SqlParam],
        limit: usize,
    ) -> DbResult<Vec<Row>> {
        self.record(sql, params)?;
        let rows: Vec<Row> = self
            .state
            .rows
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .cloned()
            .collect();
        self.state.rows_fetched.fetch_add(rows.len(), Ordering::SeqCst);
        Ok(rows)
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> DbResult<u64> {
        self.record(sql, params)?;
        Ok(self.state.rows_affected.load(Ordering::SeqCst))
    }

    async fn close(self: Box<Self>) -> DbResult<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub fn settings() -> ConnectionSettings {
    ConnectionSettings {
        host: "fake-sql".to_string(),
        port: 1433,
        database: "testdb".to_string(),
        user: "sa".to_string(),
        password: "secret".to_string(),
        connect_timeout_secs: 1,
        encrypt: true,
        trust_server_certificate: true,
    }
}

pub fn manager(connector: &FakeConnector) -> Arc<ConnectionManager> {
    Arc::new(ConnectionManager::new(settings(), Arc::new(connector.clone())))
}

pub fn dispatcher(connector: &FakeConnector, read_only: bool) -> Dispatcher {
    Dispatcher::new(manager(connector), &ToolRegistry::builtin(), read_only)
}

pub fn args(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        other => panic!("arguments must be an object, got {}", other),
    }
}
