//! MCP server integration module.
//!
//! This module provides the integration between the MCP protocol and
//! the database tools using the rmcp framework:
//! - `dispatcher`: lookup, validation, connection assurance and execution
//! - `envelope`: the uniform `CallToolResult` shape
//! - `service`: the rmcp `ServerHandler`

pub mod dispatcher;
pub mod envelope;
pub mod service;

pub use dispatcher::Dispatcher;
pub use service::MssqlService;
