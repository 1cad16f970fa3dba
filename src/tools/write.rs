//! Write operation tools.
//!
//! This module implements the `insert_data` and `update_data` MCP tools.
//! Column names are quoted identifiers and every value is a bound parameter.

use crate::db::{ConnectionManager, SqlParam, SqlStatement, TableName, quote_identifier};
use crate::error::{DbError, DbResult};
use crate::tools::{Capability, JsonObject, ToolDescriptor, ToolHandler, sql_validator};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// SQL Server limit on parameters per request.
pub const MAX_PARAMETERS: usize = 2100;

/// SQL Server limit on row value expressions in one VALUES clause.
pub const MAX_INSERT_ROWS: usize = 1000;

/// One record or several records with identical columns.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum InsertRecords {
    Many(Vec<JsonObject>),
    One(JsonObject),
}

impl InsertRecords {
    fn as_slice(&self) -> &[JsonObject] {
        match self {
            InsertRecords::Many(records) => records,
            InsertRecords::One(record) => std::slice::from_ref(record),
        }
    }
}

/// Input for the insert_data tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsertDataInput {
    /// Target table, either "table" or "schema.table"
    pub table_name: String,
    /// A record object ({"column": value}) or an array of records that all share the same columns
    pub data: InsertRecords,
}

/// Output from the insert_data tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsertDataOutput {
    pub message: String,
    /// Number of rows reported inserted by the server
    pub rows_affected: u64,
    /// Number of records submitted
    pub record_count: usize,
}

/// Input for the update_data tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDataInput {
    /// Target table, either "table" or "schema.table"
    pub table_name: String,
    /// Columns to set, as {"column": newValue}
    pub updates: JsonObject,
    /// WHERE condition selecting the rows to update, without the WHERE keyword (e.g. "id = 5")
    pub where_clause: String,
}

/// Output from the update_data tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDataOutput {
    pub message: String,
    /// Number of rows updated
    pub rows_affected: u64,
}

pub struct InsertDataTool {
    descriptor: ToolDescriptor,
}

impl InsertDataTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor::new::<InsertDataInput>(
                "insert_data",
                "Insert Data",
                "Inserts one record or an array of records into a table. All records must have the same columns.",
                Capability::Mutating,
            ),
        }
    }

    pub fn build_statement(input: &InsertDataInput) -> DbResult<SqlStatement> {
        let table = TableName::parse(&input.table_name)?.quoted()?;
        let records = input.data.as_slice();

        let Some(first) = records.first() else {
            return Err(DbError::invalid_argument(
                "insert_data",
                "data",
                "at least one record is required",
            ));
        };
        if first.is_empty() {
            return Err(DbError::invalid_argument(
                "insert_data",
                "data",
                "records must contain at least one column",
            ));
        }
        if records.len() > MAX_INSERT_ROWS {
            return Err(DbError::invalid_input(format!(
                "Cannot insert {} records in one call; the maximum is {}",
                records.len(),
                MAX_INSERT_ROWS
            )));
        }

        let mut columns: Vec<&String> = first.keys().collect();
        columns.sort();
        let total_params = columns.len() * records.len();
        if total_params > MAX_PARAMETERS {
            return Err(DbError::invalid_input(format!(
                "Insert needs {} parameters; SQL Server allows at most {}. Split the records into smaller batches",
                total_params, MAX_PARAMETERS
            )));
        }

        for (index, record) in records.iter().enumerate() {
            let same_columns =
                record.len() == columns.len() && columns.iter().all(|c| record.contains_key(*c));
            if !same_columns {
                return Err(DbError::invalid_argument(
                    "insert_data",
                    "data",
                    format!("record {} does not have the same columns as the first record", index),
                ));
            }
        }

        let quoted: Vec<String> = columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<DbResult<_>>()?;

        let mut stmt = SqlStatement::new("");
        let mut tuples = Vec::with_capacity(records.len());
        for record in records {
            let placeholders: Vec<String> = columns
                .iter()
                .map(|c| {
                    let value = record.get(*c).map(SqlParam::from_json).unwrap_or(SqlParam::Null);
                    stmt.bind(value)
                })
                .collect();
            tuples.push(format!("({})", placeholders.join(", ")));
        }

        stmt.sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            table,
            quoted.join(", "),
            tuples.join(", ")
        );
        Ok(stmt)
    }
}

impl Default for InsertDataTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for InsertDataTool {
    type Args = InsertDataInput;
    type Output = InsertDataOutput;

    fn info(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn check(&self, args: &InsertDataInput) -> DbResult<()> {
        Self::build_statement(args).map(|_| ())
    }

    async fn handle(&self, db: &ConnectionManager, args: InsertDataInput) -> DbResult<InsertDataOutput> {
        let stmt = Self::build_statement(&args)?;
        let record_count = args.data.as_slice().len();

        let start = Instant::now();
        let rows_affected = db.execute(&stmt).await?;

        info!(
            table = %args.table_name,
            rows_affected = rows_affected,
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Inserted records"
        );

        Ok(InsertDataOutput {
            message: format!(
                "Inserted {} record(s) into {}",
                rows_affected, args.table_name
            ),
            rows_affected,
            record_count,
        })
    }
}

pub struct UpdateDataTool {
    descriptor: ToolDescriptor,
}

impl UpdateDataTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor::new::<UpdateDataInput>(
                "update_data",
                "Update Data",
                "Updates columns in the rows of a table matching a WHERE clause. The WHERE clause is required.",
                Capability::Mutating,
            ),
        }
    }

    pub fn build_statement(input: &UpdateDataInput) -> DbResult<SqlStatement> {
        let table = TableName::parse(&input.table_name)?.quoted()?;

        if input.updates.is_empty() {
            return Err(DbError::invalid_argument(
                "update_data",
                "updates",
                "at least one column must be updated",
            ));
        }
        sql_validator::validate_where_clause(&input.where_clause)?;

        let mut stmt = SqlStatement::new("");
        let mut assignments = Vec::with_capacity(input.updates.len());
        for (column, value) in &input.updates {
            let column = quote_identifier(column)?;
            let placeholder = stmt.bind(SqlParam::from_json(value));
            assignments.push(format!("{} = {}", column, placeholder));
        }

        stmt.sql = format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            assignments.join(", "),
            input.where_clause.trim()
        );
        Ok(stmt)
    }
}

impl Default for UpdateDataTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for UpdateDataTool {
    type Args = UpdateDataInput;
    type Output = UpdateDataOutput;

    fn info(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn check(&self, args: &UpdateDataInput) -> DbResult<()> {
        Self::build_statement(args).map(|_| ())
    }

    async fn handle(&self, db: &ConnectionManager, args: UpdateDataInput) -> DbResult<UpdateDataOutput> {
        let stmt = Self::build_statement(&args)?;

        let start = Instant::now();
        let rows_affected = db.execute(&stmt).await?;

        info!(
            table = %args.table_name,
            rows_affected = rows_affected,
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Updated rows"
        );

        Ok(UpdateDataOutput {
            message: format!("Updated {} row(s) in {}", rows_affected, args.table_name),
            rows_affected,
        })
    }
}
