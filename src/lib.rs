//! MSSQL MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to work with a Microsoft SQL Server database through a single, lazily
//! opened connection.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::{Dispatcher, MssqlService};
