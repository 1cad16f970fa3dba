//! Tool dispatch.
//!
//! The dispatcher owns the visible tool set for the configured mode and runs
//! every call through the same steps: lookup, argument validation,
//! connection assurance, execution, envelope.

use crate::db::ConnectionManager;
use crate::error::DbError;
use crate::mcp::envelope;
use crate::tools::{JsonObject, Tool, ToolRegistry, ToolSet};
use futures_util::FutureExt;
use rmcp::model::{CallToolResult, Tool as McpTool, ToolAnnotations};
use std::borrow::Cow;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub struct Dispatcher {
    connections: Arc<ConnectionManager>,
    tools: ToolSet,
    read_only: bool,
    /// Held from connection assurance until the envelope is built.
    in_flight: Mutex<()>,
}

impl Dispatcher {
    /// Build a dispatcher exposing the tools visible in the given mode.
    pub fn new(connections: Arc<ConnectionManager>, registry: &ToolRegistry, read_only: bool) -> Self {
        let tools = registry.visible(read_only);
        info!(
            mode = if read_only { "read-only" } else { "full access" },
            tools = ?tools.names(),
            "Tool set ready"
        );
        Self {
            connections,
            tools,
            read_only,
            in_flight: Mutex::new(()),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// The visible tools as MCP tool definitions. Never touches the connection.
    pub fn list_tools(&self) -> Vec<McpTool> {
        self.tools.iter().map(|tool| to_mcp_tool(tool.as_ref())).collect()
    }

    /// Handle one tool invocation. Always returns an envelope.
    pub async fn call_tool(&self, name: &str, args: JsonObject) -> CallToolResult {
        let Some(tool) = self.tools.get(name).cloned() else {
            warn!(tool = %name, read_only = self.read_only, "Unknown tool requested");
            return envelope::unknown_tool(name);
        };

        if let Err(e) = tool.validate(&args) {
            debug!(tool = %name, error = %e, "Tool arguments rejected");
            return envelope::failure(&e);
        }

        let _guard = self.in_flight.lock().await;

        if let Err(e) = self.connections.ensure_connected().await {
            warn!(tool = %name, error = %e, "Connection unavailable, tool not run");
            return envelope::failure(&e);
        }

        let start = Instant::now();
        let outcome = AssertUnwindSafe(tool.run(&self.connections, args))
            .catch_unwind()
            .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(value)) => {
                info!(tool = %name, elapsed_ms, "Tool call succeeded");
                envelope::success(&value)
            }
            Ok(Err(e)) => {
                warn!(tool = %name, elapsed_ms, kind = %e.kind(), error = %e, "Tool call failed");
                envelope::failure(&e)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(tool = %name, elapsed_ms, panic = %message, "Tool handler panicked");
                // The handle may have been left mid-request
                self.connections.close().await;
                envelope::failure(&DbError::internal(format!(
                    "{} handler panicked: {}",
                    name, message
                )))
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Reduce a tool to the definition advertised to clients.
pub fn to_mcp_tool(tool: &dyn Tool) -> McpTool {
    let descriptor = tool.descriptor();
    let read_only = descriptor.is_read_only();

    McpTool {
        name: Cow::Borrowed(descriptor.name),
        title: Some(descriptor.title.to_string()),
        description: Some(Cow::Borrowed(descriptor.description)),
        input_schema: descriptor.input_schema.clone(),
        output_schema: None,
        annotations: Some(ToolAnnotations {
            title: Some(descriptor.title.to_string()),
            read_only_hint: Some(read_only),
            destructive_hint: Some(!read_only),
            idempotent_hint: Some(read_only),
            open_world_hint: Some(false),
        }),
        icons: None,
        meta: None,
    }
}
