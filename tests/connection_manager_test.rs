//! Integration tests for the lazily opened, reused connection.

mod common;

use common::{FakeConnector, manager};
use mssql_mcp_server::db::SqlStatement;
use mssql_mcp_server::error::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_no_connection_until_needed() {
    let connector = FakeConnector::new();
    let manager = manager(&connector);

    assert!(!manager.is_connected().await);
    assert_eq!(manager.connections_opened(), 0);
    assert_eq!(connector.attempts(), 0);
}

#[tokio::test]
async fn test_ensure_connected_twice_opens_once() {
    let connector = FakeConnector::new();
    let manager = manager(&connector);

    manager.ensure_connected().await.unwrap();
    manager.ensure_connected().await.unwrap();

    assert_eq!(connector.opens(), 1);
    assert_eq!(connector.attempts(), 1);
    assert_eq!(manager.connections_opened(), 1);
    assert!(manager.is_connected().await);
}

#[tokio::test]
async fn test_failed_open_leaves_no_handle_and_next_call_retries() {
    let connector = FakeConnector::new();
    connector.fail_next_connects(1);
    let manager = manager(&connector);

    let err = manager.ensure_connected().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.to_string().contains("Login failed"));
    assert!(!manager.is_connected().await);

    manager.ensure_connected().await.unwrap();
    assert_eq!(connector.attempts(), 2);
    assert_eq!(connector.opens(), 1);
    assert!(manager.is_connected().await);
}

#[tokio::test]
async fn test_stale_handle_is_closed_and_replaced() {
    let connector = FakeConnector::new();
    let manager = manager(&connector);

    manager.ensure_connected().await.unwrap();
    connector.disconnect_all();
    assert!(!manager.is_connected().await);

    manager.ensure_connected().await.unwrap();

    assert_eq!(connector.opens(), 2);
    assert_eq!(connector.closes(), 1);
    assert!(manager.is_connected().await);
}

#[tokio::test]
async fn test_failed_reopen_after_drop_leaves_no_connected_handle() {
    let connector = FakeConnector::new();
    let manager = manager(&connector);

    manager.ensure_connected().await.unwrap();
    connector.disconnect_all();
    connector.fail_next_connects(1);

    assert!(manager.ensure_connected().await.is_err());
    assert!(!manager.is_connected().await);
    assert_eq!(connector.closes(), 1);

    manager.ensure_connected().await.unwrap();
    assert!(manager.is_connected().await);
}

#[tokio::test(start_paused = true)]
async fn test_connect_timeout_is_a_connection_error() {
    let connector = FakeConnector::new();
    connector.set_connect_delay(Duration::from_secs(60));
    let manager = manager(&connector);

    let err = manager.ensure_connected().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.to_string().contains("Timed out after 1000ms"));
    assert!(!manager.is_connected().await);
    assert_eq!(connector.opens(), 0);
}

#[tokio::test]
async fn test_concurrent_ensure_connected_opens_once() {
    let connector = FakeConnector::new();
    connector.set_connect_delay(Duration::from_millis(20));
    let manager = manager(&connector);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.ensure_connected().await })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(connector.attempts(), 1);
    assert_eq!(connector.opens(), 1);
}

#[tokio::test]
async fn test_query_without_connection_fails() {
    let connector = FakeConnector::new();
    let manager = manager(&connector);

    let err = manager
        .query(&SqlStatement::new("SELECT 1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(connector.attempts(), 0);
}

#[tokio::test]
async fn test_query_and_execute_use_shared_handle() {
    let connector = FakeConnector::new();
    connector.set_rows(vec![serde_json::json!({"n": 1})]);
    connector.set_rows_affected(3);
    let manager = manager(&connector);

    manager.ensure_connected().await.unwrap();
    let rows = manager.query(&SqlStatement::new("SELECT 1 AS n")).await.unwrap();
    let affected = manager
        .execute(&SqlStatement::new("DELETE FROM t WHERE 1 = 0"))
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(affected, 3);
    assert_eq!(connector.statements().len(), 2);
    assert_eq!(connector.opens(), 1);
}

#[tokio::test]
async fn test_query_limited_reads_at_most_limit_rows() {
    let connector = FakeConnector::new();
    connector.set_rows((0..50).map(|i| serde_json::json!({"n": i})).collect());
    let manager = manager(&connector);

    manager.ensure_connected().await.unwrap();
    let rows = manager
        .query_limited(&SqlStatement::new("SELECT n FROM numbers"), 11)
        .await
        .unwrap();

    assert_eq!(rows.len(), 11);
    assert_eq!(connector.rows_fetched(), 11);
}

#[tokio::test]
async fn test_close_releases_handle() {
    let connector = FakeConnector::new();
    let manager = manager(&connector);

    manager.ensure_connected().await.unwrap();
    manager.close().await;

    assert!(!manager.is_connected().await);
    assert_eq!(connector.closes(), 1);

    // Closing twice is a no-op
    manager.close().await;
    assert_eq!(connector.closes(), 1);
}
