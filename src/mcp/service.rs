//! MCP service implementation using rmcp.
//!
//! `MssqlService` is the rmcp `ServerHandler`. Listing and invocation are
//! forwarded to the shared [`Dispatcher`], so every session sees the same
//! tool set and the same database connection.

use crate::mcp::Dispatcher;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    model::{
        CallToolRequestParams, CallToolResult, Implementation, ListToolsResult,
        PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct MssqlService {
    dispatcher: Arc<Dispatcher>,
}

impl MssqlService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    fn instructions(&self) -> String {
        let mut text = String::from(
            "Tools for working with a Microsoft SQL Server database.\n\
            \n\
            ## Workflow\n\
            1. Call `list_tables` to see the available tables\n\
            2. Call `describe_table` before querying or writing a table\n\
            3. Use `read_data` with a single SELECT statement to read rows\n",
        );
        if self.dispatcher.is_read_only() {
            text.push_str(
                "\nThe server runs in read-only mode: only `list_tables`, `describe_table` and `read_data` are available.",
            );
        } else {
            text.push_str(
                "4. Use `insert_data` and `update_data` to change rows; `update_data` always requires a WHERE clause\n\
                5. `create_table`, `create_index` and `drop_table` change the schema; `drop_table` cannot be undone",
            );
        }
        text
    }
}

impl ServerHandler for MssqlService {
    fn get_info(&self) -> ServerInfo {
        let mut server_info = Implementation::from_build_env();
        server_info.name = env!("CARGO_PKG_NAME").to_owned();
        server_info.version = env!("CARGO_PKG_VERSION").to_owned();
        server_info.title = Some("SQL Server MCP Server".to_owned());

        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info,
            instructions: Some(self.instructions()),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let result = ListToolsResult {
            tools: self.dispatcher.list_tools(),
            next_cursor: None,
            ..Default::default()
        };
        std::future::ready(Ok(result))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        let dispatcher = self.dispatcher.clone();
        let name = request.name.to_string();
        let args = request.arguments.unwrap_or_default();

        async move {
            debug!(tool = %name, "call_tool received");
            Ok(dispatcher.call_tool(&name, args).await)
        }
    }
}
