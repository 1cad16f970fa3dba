//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - The `SqlConnection` / `Connector` seam between tools and the driver
//! - The single shared connection owned by `ConnectionManager`
//! - The SQL Server driver built on tiberius
//! - Parameter binding, identifier quoting and row-to-JSON conversion

pub mod connection;
pub mod identifier;
pub mod manager;
pub mod mssql;
pub mod params;
pub mod types;

pub use connection::{ConnectionSettings, Connector, SqlConnection};
pub use identifier::{TableName, quote_identifier};
pub use manager::ConnectionManager;
pub use mssql::MssqlConnector;
pub use params::{SqlParam, SqlStatement};
pub use types::Row;
