//! Query execution tool.
//!
//! This module implements the `read_data` MCP tool for running a single
//! SELECT. Writes and DDL are rejected before the statement reaches the
//! server.

use crate::db::{ConnectionManager, Row, SqlStatement};
use crate::error::DbResult;
use crate::tools::{Capability, ToolDescriptor, ToolHandler, sql_validator};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Maximum rows returned by one read_data call.
pub const MAX_ROWS: usize = 10_000;

/// Input for the read_data tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadDataInput {
    /// A single SQL SELECT statement. INSERT/UPDATE/DELETE/DDL and SELECT ... INTO are rejected.
    pub query: String,
}

/// Output from the read_data tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadDataOutput {
    /// Result rows as column-name to value maps
    pub rows: Vec<Row>,
    /// Number of rows returned
    pub record_count: usize,
    /// True if more than the maximum number of rows matched and the result was cut
    pub truncated: bool,
}

pub struct ReadDataTool {
    descriptor: ToolDescriptor,
}

impl ReadDataTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor::new::<ReadDataInput>(
                "read_data",
                "Read Data",
                "Executes a single SQL SELECT query and returns the rows as JSON objects (at most 10000 rows).",
                Capability::ReadOnly,
            ),
        }
    }
}

impl Default for ReadDataTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for ReadDataTool {
    type Args = ReadDataInput;
    type Output = ReadDataOutput;

    fn info(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn check(&self, args: &ReadDataInput) -> DbResult<()> {
        sql_validator::validate_read_query(&args.query)
    }

    async fn handle(&self, db: &ConnectionManager, args: ReadDataInput) -> DbResult<ReadDataOutput> {
        sql_validator::validate_read_query(&args.query)?;

        let start = Instant::now();
        // One extra row tells whether the result was cut
        let mut rows = db
            .query_limited(&SqlStatement::new(args.query), MAX_ROWS + 1)
            .await?;

        let truncated = rows.len() > MAX_ROWS;
        if truncated {
            warn!(limit = MAX_ROWS, "read_data result truncated");
            rows.truncate(MAX_ROWS);
        }

        info!(
            rows = rows.len(),
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Query executed"
        );

        Ok(ReadDataOutput {
            record_count: rows.len(),
            rows,
            truncated,
        })
    }
}
