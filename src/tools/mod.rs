//! MCP tool implementations.
//!
//! This module contains all database tool handlers:
//! - `list_tables`, `describe_table`: schema introspection
//! - `read_data`: run a single read-only SELECT
//! - `insert_data`, `update_data`: parameterized writes
//! - `create_table`, `create_index`, `drop_table`: DDL
//! - `sql_validator`: read-only and WHERE clause validation
//! - `registry`: the ordered tool registry and the read-only mode gate

pub mod ddl;
pub mod query;
pub mod registry;
pub mod schema;
pub mod sql_validator;
pub mod write;

use crate::db::ConnectionManager;
use crate::error::{DbError, DbResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

pub use ddl::{CreateIndexTool, CreateTableTool, DropTableTool};
pub use query::ReadDataTool;
pub use registry::{ToolRegistry, ToolSet, visible_tools};
pub use schema::{DescribeTableTool, ListTablesTool};
pub use write::{InsertDataTool, UpdateDataTool};

/// Tool arguments as received from the client.
pub type JsonObject = serde_json::Map<String, Value>;

/// Whether a tool is safe to expose in read-only mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ReadOnly,
    Mutating,
}

/// Static description of a tool: what is listed to clients and what the
/// dispatcher validates against.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub capability: Capability,
    pub input_schema: Arc<JsonObject>,
}

impl ToolDescriptor {
    /// Build a descriptor whose input schema is generated from `A`.
    pub fn new<A: JsonSchema>(
        name: &'static str,
        title: &'static str,
        description: &'static str,
        capability: Capability,
    ) -> Self {
        Self {
            name,
            title,
            description,
            capability,
            input_schema: Arc::new(schema_object::<A>()),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.capability == Capability::ReadOnly
    }
}

/// Generate the JSON schema object for an argument struct.
pub fn schema_object<A: JsonSchema>() -> JsonObject {
    let schema = schemars::schema_for!(A);
    let mut object = schema.as_object().cloned().unwrap_or_default();
    object.remove("$schema");
    object
        .entry("type")
        .or_insert_with(|| Value::String("object".to_string()));
    object
}

/// Object-safe tool contract used by the registry and the dispatcher.
#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    /// Check arguments without touching the database.
    fn validate(&self, args: &JsonObject) -> DbResult<()>;

    /// Run the tool. The connection is borrowed through `db`.
    async fn run(&self, db: &ConnectionManager, args: JsonObject) -> DbResult<Value>;
}

/// Typed tool implementation. Every `ToolHandler` is a [`Tool`].
#[async_trait]
pub trait ToolHandler: Send + Sync {
    type Args: DeserializeOwned + Send;
    type Output: Serialize + Send;

    fn info(&self) -> &ToolDescriptor;

    /// Semantic checks on parsed arguments, such as building the statement.
    fn check(&self, _args: &Self::Args) -> DbResult<()> {
        Ok(())
    }

    async fn handle(&self, db: &ConnectionManager, args: Self::Args) -> DbResult<Self::Output>;
}

#[async_trait]
impl<T: ToolHandler> Tool for T {
    fn descriptor(&self) -> &ToolDescriptor {
        self.info()
    }

    fn validate(&self, args: &JsonObject) -> DbResult<()> {
        let info = self.info();
        validate_arguments(info.name, &info.input_schema, args)?;
        let parsed: T::Args = parse_arguments(info.name, args)?;
        self.check(&parsed)
    }

    async fn run(&self, db: &ConnectionManager, args: JsonObject) -> DbResult<Value> {
        let name = self.info().name;
        let parsed: T::Args = parse_arguments(name, &args)?;
        let output = self.handle(db, parsed).await?;
        serde_json::to_value(output)
            .map_err(|e| DbError::internal(format!("Failed to serialize {} result: {}", name, e)))
    }
}

/// Structural validation: required properties are present and every
/// provided property with a declared `type` matches it.
pub fn validate_arguments(tool: &str, schema: &JsonObject, args: &JsonObject) -> DbResult<()> {
    if let Some(Value::Array(required)) = schema.get("required") {
        for name in required.iter().filter_map(Value::as_str) {
            match args.get(name) {
                None | Some(Value::Null) => {
                    return Err(DbError::invalid_argument(tool, name, "argument is required"));
                }
                Some(_) => {}
            }
        }
    }

    let Some(Value::Object(properties)) = schema.get("properties") else {
        return Ok(());
    };

    for (name, value) in args {
        let Some(declared) = properties.get(name).and_then(|p| p.get("type")) else {
            continue;
        };
        let allowed: Vec<&str> = match declared {
            Value::String(t) => vec![t.as_str()],
            Value::Array(types) => types.iter().filter_map(Value::as_str).collect(),
            _ => continue,
        };
        if !allowed.iter().any(|t| json_type_matches(t, value)) {
            return Err(DbError::invalid_argument(
                tool,
                name,
                format!("expected {}, got {}", allowed.join(" or "), json_type_name(value)),
            ));
        }
    }

    Ok(())
}

/// Deserialize arguments into the tool's typed struct.
pub fn parse_arguments<A: DeserializeOwned>(tool: &str, args: &JsonObject) -> DbResult<A> {
    serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| DbError::invalid_input(format!("Invalid arguments for {} tool: {}", tool, e)))
}

fn json_type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
