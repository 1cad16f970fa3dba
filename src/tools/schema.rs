//! Schema introspection tools.
//!
//! This module implements the `list_tables` and `describe_table` MCP tools
//! on top of `INFORMATION_SCHEMA`.

use crate::db::{ConnectionManager, Row, SqlStatement, TableName};
use crate::error::{DbError, DbResult};
use crate::tools::{Capability, ToolDescriptor, ToolHandler};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Input for the list_tables tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListTablesInput {
    /// Only list tables in these schemas (e.g. ["dbo", "sales"]). Omit to list every schema.
    #[serde(default)]
    pub schemas: Option<Vec<String>>,
}

/// Output from the list_tables tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTablesOutput {
    /// Table names qualified as "schema.table"
    pub tables: Vec<String>,
    /// Number of tables returned
    pub count: usize,
}

/// Input for the describe_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DescribeTableInput {
    /// Table to describe, either "table" or "schema.table"
    pub table_name: String,
}

/// Column details returned by describe_table.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl ColumnInfo {
    fn from_row(row: &Row) -> Self {
        let text = |key: &str| row.get(key).and_then(Value::as_str).map(str::to_string);
        let number = |key: &str| row.get(key).and_then(Value::as_i64);

        Self {
            name: text("COLUMN_NAME").unwrap_or_default(),
            data_type: text("DATA_TYPE").unwrap_or_default(),
            nullable: text("IS_NULLABLE").is_some_and(|v| v.eq_ignore_ascii_case("YES")),
            max_length: number("CHARACTER_MAXIMUM_LENGTH"),
            precision: number("NUMERIC_PRECISION"),
            scale: number("NUMERIC_SCALE"),
            default_value: text("COLUMN_DEFAULT"),
        }
    }
}

/// Output from the describe_table tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DescribeTableOutput {
    /// Table name as given
    pub table: String,
    /// Columns in ordinal order
    pub columns: Vec<ColumnInfo>,
}

pub struct ListTablesTool {
    descriptor: ToolDescriptor,
}

impl ListTablesTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor::new::<ListTablesInput>(
                "list_tables",
                "List Tables",
                "Lists base tables in the connected SQL Server database as \"schema.table\" names, optionally filtered by schema.",
                Capability::ReadOnly,
            ),
        }
    }

    pub fn build_statement(input: &ListTablesInput) -> SqlStatement {
        let mut stmt = SqlStatement::new("");
        let mut sql = String::from(
            "SELECT TABLE_SCHEMA, TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE = 'BASE TABLE'",
        );

        if let Some(schemas) = input.schemas.as_ref().filter(|s| !s.is_empty()) {
            let placeholders: Vec<String> =
                schemas.iter().map(|s| stmt.bind(s.as_str())).collect();
            sql.push_str(&format!(" AND TABLE_SCHEMA IN ({})", placeholders.join(", ")));
        }

        sql.push_str(" ORDER BY TABLE_SCHEMA, TABLE_NAME");
        stmt.sql = sql;
        stmt
    }
}

impl Default for ListTablesTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for ListTablesTool {
    type Args = ListTablesInput;
    type Output = ListTablesOutput;

    fn info(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn handle(&self, db: &ConnectionManager, args: ListTablesInput) -> DbResult<ListTablesOutput> {
        let rows = db.query(&Self::build_statement(&args)).await?;

        let tables: Vec<String> = rows
            .iter()
            .filter_map(|row| {
                let schema = row.get("TABLE_SCHEMA").and_then(Value::as_str)?;
                let name = row.get("TABLE_NAME").and_then(Value::as_str)?;
                Some(format!("{}.{}", schema, name))
            })
            .collect();

        info!(count = tables.len(), "Listed tables");

        Ok(ListTablesOutput {
            count: tables.len(),
            tables,
        })
    }
}

pub struct DescribeTableTool {
    descriptor: ToolDescriptor,
}

impl DescribeTableTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor::new::<DescribeTableInput>(
                "describe_table",
                "Describe Table",
                "Describes the columns of a table: name, data type, nullability, length, precision and default.",
                Capability::ReadOnly,
            ),
        }
    }

    pub fn build_statement(input: &DescribeTableInput) -> DbResult<SqlStatement> {
        let table = TableName::parse(&input.table_name)?;
        let mut stmt = SqlStatement::new("");
        let name = stmt.bind(table.name.as_str());

        let mut sql = format!(
            "SELECT COLUMN_NAME, DATA_TYPE, IS_NULLABLE, CHARACTER_MAXIMUM_LENGTH, \
             NUMERIC_PRECISION, NUMERIC_SCALE, COLUMN_DEFAULT \
             FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = {}",
            name
        );
        if let Some(schema) = &table.schema {
            let schema = stmt.bind(schema.as_str());
            sql.push_str(&format!(" AND TABLE_SCHEMA = {}", schema));
        }
        sql.push_str(" ORDER BY ORDINAL_POSITION");

        stmt.sql = sql;
        Ok(stmt)
    }
}

impl Default for DescribeTableTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for DescribeTableTool {
    type Args = DescribeTableInput;
    type Output = DescribeTableOutput;

    fn info(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn check(&self, args: &DescribeTableInput) -> DbResult<()> {
        Self::build_statement(args).map(|_| ())
    }

    async fn handle(
        &self,
        db: &ConnectionManager,
        args: DescribeTableInput,
    ) -> DbResult<DescribeTableOutput> {
        let rows = db.query(&Self::build_statement(&args)?).await?;

        if rows.is_empty() {
            return Err(DbError::schema(
                "Table not found or has no visible columns",
                &args.table_name,
            ));
        }

        Ok(DescribeTableOutput {
            table: args.table_name,
            columns: rows.iter().map(ColumnInfo::from_row).collect(),
        })
    }
}
