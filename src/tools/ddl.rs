//! DDL tools: `create_table`, `create_index` and `drop_table`.

use crate::db::{ConnectionManager, SqlStatement, TableName, quote_identifier};
use crate::error::{DbError, DbResult};
use crate::tools::{Capability, ToolDescriptor, ToolHandler, sql_validator};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// A column definition for create_table.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,
    /// SQL Server type and options, e.g. "INT PRIMARY KEY", "NVARCHAR(255) NOT NULL"
    #[serde(rename = "type")]
    pub data_type: String,
}

/// Input for the create_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableInput {
    /// Table to create, either "table" or "schema.table"
    pub table_name: String,
    /// Column definitions in order
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CreateTableOutput {
    pub message: String,
    pub table: String,
}

/// Input for the create_index tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIndexInput {
    /// Schema of the table. Omit when tableName is already qualified or the table is in the default schema
    #[serde(default)]
    pub schema_name: Option<String>,
    /// Table to index
    pub table_name: String,
    /// Name of the new index
    pub index_name: String,
    /// Columns to include in the index, in key order
    pub columns: Vec<String>,
    /// Create a UNIQUE index. Default: false
    #[serde(default)]
    pub is_unique: bool,
    /// Create a CLUSTERED index instead of NONCLUSTERED. Default: false
    #[serde(default)]
    pub is_clustered: bool,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CreateIndexOutput {
    pub message: String,
    pub index: String,
    pub table: String,
}

/// Input for the drop_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DropTableInput {
    /// Table to drop, either "table" or "schema.table"
    pub table_name: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DropTableOutput {
    pub message: String,
    pub table: String,
}

/// Column types are spliced into DDL, so only plain type syntax is allowed.
///
/// Parentheses must balance and top-level commas are refused, so a type can
/// never close the column list or add another column.
fn validate_column_type(column: &str, data_type: &str) -> DbResult<()> {
    let invalid = |reason: String| -> DbResult<()> {
        Err(DbError::invalid_argument("create_table", "columns", reason))
    };

    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, ' ' | '(' | ')' | ',' | '_');
    if data_type.trim().is_empty() || !data_type.chars().all(allowed) {
        return invalid(format!(
            "type '{}' for column '{}' may only contain letters, digits, spaces, parentheses, commas and underscores",
            data_type, column
        ));
    }

    let mut depth = 0usize;
    for c in data_type.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => {
                return invalid(format!(
                    "type '{}' for column '{}' closes a parenthesis it never opened",
                    data_type, column
                ));
            }
            ')' => depth -= 1,
            ',' if depth == 0 => {
                return invalid(format!(
                    "type '{}' for column '{}' contains a comma outside parentheses",
                    data_type, column
                ));
            }
            _ => {}
        }
    }
    if depth != 0 {
        return invalid(format!(
            "type '{}' for column '{}' has unbalanced parentheses",
            data_type, column
        ));
    }

    if let Some(keyword) = sql_validator::find_write_keyword(data_type)? {
        return Err(DbError::permission(
            keyword,
            "Column types must not contain statements",
        ));
    }
    sql_validator::check_dangerous_keywords(data_type)
}

pub struct CreateTableTool {
    descriptor: ToolDescriptor,
}

impl CreateTableTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor::new::<CreateTableInput>(
                "create_table",
                "Create Table",
                "Creates a new table with the given columns. Each column has a name and a SQL Server type such as \"INT PRIMARY KEY\" or \"NVARCHAR(255)\".",
                Capability::Mutating,
            ),
        }
    }

    pub fn build_statement(input: &CreateTableInput) -> DbResult<SqlStatement> {
        let table = TableName::parse(&input.table_name)?.quoted()?;
        if input.columns.is_empty() {
            return Err(DbError::invalid_argument(
                "create_table",
                "columns",
                "at least one column is required",
            ));
        }

        let mut seen = HashSet::new();
        let mut definitions = Vec::with_capacity(input.columns.len());
        for column in &input.columns {
            if !seen.insert(column.name.to_lowercase()) {
                return Err(DbError::invalid_argument(
                    "create_table",
                    "columns",
                    format!("duplicate column '{}'", column.name),
                ));
            }
            validate_column_type(&column.name, &column.data_type)?;
            definitions.push(format!(
                "{} {}",
                quote_identifier(&column.name)?,
                column.data_type.trim()
            ));
        }

        Ok(SqlStatement::new(format!(
            "CREATE TABLE {} ({})",
            table,
            definitions.join(", ")
        )))
    }
}

impl Default for CreateTableTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for CreateTableTool {
    type Args = CreateTableInput;
    type Output = CreateTableOutput;

    fn info(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn check(&self, args: &CreateTableInput) -> DbResult<()> {
        Self::build_statement(args).map(|_| ())
    }

    async fn handle(&self, db: &ConnectionManager, args: CreateTableInput) -> DbResult<CreateTableOutput> {
        db.execute(&Self::build_statement(&args)?).await?;
        info!(table = %args.table_name, columns = args.columns.len(), "Created table");

        Ok(CreateTableOutput {
            message: format!("Table '{}' created", args.table_name),
            table: args.table_name,
        })
    }
}

pub struct CreateIndexTool {
    descriptor: ToolDescriptor,
}

impl CreateIndexTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor::new::<CreateIndexInput>(
                "create_index",
                "Create Index",
                "Creates an index on one or more columns of a table, optionally UNIQUE and/or CLUSTERED.",
                Capability::Mutating,
            ),
        }
    }

    fn table(input: &CreateIndexInput) -> DbResult<TableName> {
        let table = TableName::parse(&input.table_name)?;
        match &input.schema_name {
            Some(schema) if !schema.trim().is_empty() => table.with_schema(schema),
            _ => Ok(table),
        }
    }

    pub fn build_statement(input: &CreateIndexInput) -> DbResult<SqlStatement> {
        let table = Self::table(input)?.quoted()?;
        let index = quote_identifier(&input.index_name)?;

        if input.columns.is_empty() {
            return Err(DbError::invalid_argument(
                "create_index",
                "columns",
                "at least one column is required",
            ));
        }
        let columns: Vec<String> = input
            .columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<DbResult<_>>()?;

        let unique = if input.is_unique { "UNIQUE " } else { "" };
        let clustered = if input.is_clustered {
            "CLUSTERED"
        } else {
            "NONCLUSTERED"
        };

        Ok(SqlStatement::new(format!(
            "CREATE {}{} INDEX {} ON {} ({})",
            unique,
            clustered,
            index,
            table,
            columns.join(", ")
        )))
    }
}

impl Default for CreateIndexTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for CreateIndexTool {
    type Args = CreateIndexInput;
    type Output = CreateIndexOutput;

    fn info(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn check(&self, args: &CreateIndexInput) -> DbResult<()> {
        Self::build_statement(args).map(|_| ())
    }

    async fn handle(&self, db: &ConnectionManager, args: CreateIndexInput) -> DbResult<CreateIndexOutput> {
        let table = Self::table(&args)?.to_string();
        db.execute(&Self::build_statement(&args)?).await?;

        info!(
            index = %args.index_name,
            table = %table,
            unique = args.is_unique,
            clustered = args.is_clustered,
            "Created index"
        );

        Ok(CreateIndexOutput {
            message: format!("Index '{}' created on table '{}'", args.index_name, table),
            index: args.index_name,
            table,
        })
    }
}

pub struct DropTableTool {
    descriptor: ToolDescriptor,
}

impl DropTableTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor::new::<DropTableInput>(
                "drop_table",
                "Drop Table",
                "Drops a table and all of its data. This cannot be undone.",
                Capability::Mutating,
            ),
        }
    }

    pub fn build_statement(input: &DropTableInput) -> DbResult<SqlStatement> {
        let table = TableName::parse(&input.table_name)?.quoted()?;
        Ok(SqlStatement::new(format!("DROP TABLE {}", table)))
    }
}

impl Default for DropTableTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for DropTableTool {
    type Args = DropTableInput;
    type Output = DropTableOutput;

    fn info(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn check(&self, args: &DropTableInput) -> DbResult<()> {
        Self::build_statement(args).map(|_| ())
    }

    async fn handle(&self, db: &ConnectionManager, args: DropTableInput) -> DbResult<DropTableOutput> {
        db.execute(&Self::build_statement(&args)?).await?;
        info!(table = %args.table_name, "Dropped table");

        Ok(DropTableOutput {
            message: format!("Table '{}' dropped", args.table_name),
            table: args.table_name,
        })
    }
}
