//! Error types for the MSSQL MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Each error variant provides actionable messages to help AI assistants understand
//! and recover from error conditions.

use thiserror::Error;

/// Coarse classification of a [`DbError`], used for logging and for
/// shaping the text of error envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Opening or re-establishing the database connection failed.
    Connection,
    /// The requested tool is not registered or not visible in the current mode.
    UnknownTool,
    /// Arguments were missing, mistyped, or rejected before any database work.
    Validation,
    /// The tool handler failed while running against the database.
    HandlerFault,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::UnknownTool => write!(f, "unknown_tool"),
            Self::Validation => write!(f, "validation"),
            Self::HandlerFault => write!(f, "handler_fault"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// SQL Server error number, e.g. 208 for "Invalid object name"
        code: Option<u32>,
        suggestion: String,
    },

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Missing or invalid '{argument}' argument for {tool} tool: {reason}")]
    InvalidArgument {
        tool: String,
        argument: String,
        reason: String,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Permission denied: {operation} - {reason}")]
    Permission { operation: String, reason: String },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with an optional SQL Server error number.
    pub fn database(
        message: impl Into<String>,
        code: Option<u32>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            code,
            suggestion: suggestion.into(),
        }
    }

    /// Create an unknown tool error.
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    /// Create an error for a single missing or mistyped tool argument.
    pub fn invalid_argument(
        tool: impl Into<String>,
        argument: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            tool: tool.into(),
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a permission error.
    pub fn permission(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Permission {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } => ErrorKind::Connection,
            Self::UnknownTool { .. } => ErrorKind::UnknownTool,
            Self::InvalidArgument { .. } | Self::InvalidInput { .. } | Self::Permission { .. } => {
                ErrorKind::Validation
            }
            Self::Database { .. } | Self::Schema { .. } | Self::Internal { .. } => {
                ErrorKind::HandlerFault
            }
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Convert tiberius errors to DbError.
///
/// Transport-level failures become connection errors so the connection
/// manager reopens the handle on the next request.
impl From<tiberius::error::Error> for DbError {
    fn from(err: tiberius::error::Error) -> Self {
        use tiberius::error::Error;

        match err {
            Error::Server(token) => DbError::database(
                token.message().to_string(),
                Some(token.code()),
                "Check the SQL syntax, referenced objects and permissions",
            ),
            Error::Io { message, .. } => DbError::connection(
                format!("I/O error: {}", message),
                "Check network connectivity and SQL Server status",
            ),
            Error::Tls(message) => DbError::connection(
                format!("TLS error: {}", message),
                "Verify the encrypt and trust-server-certificate settings",
            ),
            Error::Routing { host, port } => DbError::connection(
                format!("Server requested routing to {}:{}", host, port),
                "Retry the request to follow the redirect",
            ),
            Error::Protocol(message) => DbError::connection(
                format!("Protocol error: {}", message),
                "Check SQL Server version compatibility",
            ),
            other => DbError::internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::connection(
            format!("I/O error: {}", err),
            "Check network connectivity and SQL Server status",
        )
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_unknown_tool_display() {
        let err = DbError::unknown_tool("nonexistent_tool");
        assert_eq!(err.to_string(), "Unknown tool: nonexistent_tool");
    }

    #[test]
    fn test_invalid_argument_mentions_argument_and_tool() {
        let err = DbError::invalid_argument("describe_table", "tableName", "required");
        let msg = err.to_string();
        assert!(msg.contains("'tableName'"));
        assert!(msg.contains("describe_table"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::database("Invalid object name 'users'", Some(208), "Check SQL syntax");
        assert_eq!(err.suggestion(), Some("Check SQL syntax"));
        assert!(DbError::invalid_input("bad").suggestion().is_none());
    }

    #[test]
    fn test_error_retryable() {
        assert!(DbError::connection("err", "sugg").is_retryable());
        assert!(!DbError::permission("write", "read-only").is_retryable());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(DbError::connection("a", "b").kind(), ErrorKind::Connection);
        assert_eq!(DbError::unknown_tool("x").kind(), ErrorKind::UnknownTool);
        assert_eq!(
            DbError::invalid_argument("t", "a", "r").kind(),
            ErrorKind::Validation
        );
        assert_eq!(DbError::invalid_input("x").kind(), ErrorKind::Validation);
        assert_eq!(
            DbError::permission("INSERT", "no").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            DbError::database("x", None, "y").kind(),
            ErrorKind::HandlerFault
        );
        assert_eq!(DbError::internal("x").kind(), ErrorKind::HandlerFault);
    }

    #[test]
    fn test_io_error_maps_to_connection() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: DbError = io.into();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn test_tiberius_io_error_maps_to_connection() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err: DbError = tiberius::error::Error::from(io).into();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.to_string().contains("reset"));
    }
}
