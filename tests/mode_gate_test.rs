//! Tests for the read-only mode gate and tool listing.

mod common;

use common::{FakeConnector, args, dispatcher};
use mssql_mcp_server::mcp::envelope::text_of;
use mssql_mcp_server::tools::{ToolRegistry, visible_tools};
use serde_json::{Value, json};

const FULL_ACCESS: [&str; 8] = [
    "insert_data",
    "read_data",
    "describe_table",
    "update_data",
    "create_table",
    "create_index",
    "drop_table",
    "list_tables",
];

const READ_ONLY: [&str; 3] = ["read_data", "describe_table", "list_tables"];

#[test]
fn test_full_access_lists_every_tool_in_order() {
    let registry = ToolRegistry::builtin();
    assert_eq!(visible_tools(&registry, false).names(), FULL_ACCESS);
}

#[test]
fn test_read_only_is_ordered_subset() {
    let registry = ToolRegistry::builtin();
    let full = visible_tools(&registry, false).names();
    let read_only = visible_tools(&registry, true).names();

    assert_eq!(read_only, READ_ONLY);
    assert!(read_only.len() < full.len());

    // Relative order is preserved
    let positions: Vec<usize> = read_only
        .iter()
        .map(|name| full.iter().position(|n| n == name).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_listing_does_not_connect() {
    let connector = FakeConnector::new();
    let dispatcher = dispatcher(&connector, true);

    let tools = dispatcher.list_tools();

    assert_eq!(tools.len(), READ_ONLY.len());
    assert_eq!(connector.attempts(), 0);
}

#[test]
fn test_annotations_follow_capability() {
    let connector = FakeConnector::new();
    let dispatcher = dispatcher(&connector, false);

    for tool in dispatcher.list_tools() {
        let annotations = tool.annotations.as_ref().unwrap();
        let read_only = READ_ONLY.contains(&tool.name.as_ref());
        assert_eq!(annotations.read_only_hint, Some(read_only), "{}", tool.name);
        assert_eq!(annotations.destructive_hint, Some(!read_only), "{}", tool.name);
        assert_eq!(annotations.open_world_hint, Some(false));
        assert!(tool.description.is_some());
    }
}

#[test]
fn test_input_schemas_declare_required_arguments() {
    let connector = FakeConnector::new();
    let dispatcher = dispatcher(&connector, false);
    let tools = dispatcher.list_tools();

    let required = |name: &str| -> Vec<String> {
        let tool = tools.iter().find(|t| t.name == name).unwrap();
        assert_eq!(tool.input_schema.get("type"), Some(&json!("object")));
        assert!(tool.input_schema.get("$schema").is_none());
        tool.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    };

    assert_eq!(required("describe_table"), vec!["tableName"]);
    assert_eq!(required("read_data"), vec!["query"]);
    assert!(required("list_tables").is_empty());

    let mut update = required("update_data");
    update.sort();
    assert_eq!(update, vec!["tableName", "updates", "whereClause"]);
}

#[tokio::test]
async fn test_hidden_tools_are_unknown_in_read_only_mode() {
    let connector = FakeConnector::new();
    let dispatcher = dispatcher(&connector, true);

    for name in ["insert_data", "update_data", "create_table", "create_index", "drop_table"] {
        let result = dispatcher
            .call_tool(name, args(json!({"tableName": "users"})))
            .await;
        assert_eq!(result.is_error, Some(true));
        assert_eq!(text_of(&result), Some(format!("Unknown tool: {}", name).as_str()));
    }

    assert_eq!(connector.attempts(), 0);
    assert!(connector.statements().is_empty());
}

#[tokio::test]
async fn test_read_only_mode_still_serves_reads() {
    let connector = FakeConnector::new();
    connector.set_rows(vec![json!({"one": 1})]);
    let dispatcher = dispatcher(&connector, true);

    let result = dispatcher
        .call_tool("read_data", args(json!({"query": "SELECT 1 AS one"})))
        .await;

    assert_eq!(result.is_error, Some(false));
    assert!(dispatcher.is_read_only());
}
