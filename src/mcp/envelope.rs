//! Response envelopes.
//!
//! Every tool call answers with a `CallToolResult` holding exactly one text
//! block. Successful results are pretty-printed JSON; failures are plain text.

use crate::error::{DbError, ErrorKind};
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

fn envelope(text: String, is_error: bool) -> CallToolResult {
    CallToolResult {
        content: vec![Content::text(text)],
        structured_content: None,
        is_error: Some(is_error),
        meta: None,
    }
}

/// Wrap a handler result.
pub fn success<T: Serialize>(value: &T) -> CallToolResult {
    match serde_json::to_string_pretty(value) {
        Ok(text) => envelope(text, false),
        Err(e) => failure(&DbError::internal(format!(
            "Failed to serialize tool result: {}",
            e
        ))),
    }
}

/// Wrap an error.
///
/// Unknown tool and argument errors are reported as-is. Connection and
/// handler errors are prefixed with "Error occurred: ".
pub fn failure(error: &DbError) -> CallToolResult {
    let mut text = match error.kind() {
        ErrorKind::UnknownTool | ErrorKind::Validation => error.to_string(),
        ErrorKind::Connection | ErrorKind::HandlerFault => format!("Error occurred: {}", error),
    };
    if let Some(suggestion) = error.suggestion() {
        text.push_str("\nSuggestion: ");
        text.push_str(suggestion);
    }
    envelope(text, true)
}

/// Envelope for a name that is not in the visible tool set.
pub fn unknown_tool(name: &str) -> CallToolResult {
    failure(&DbError::unknown_tool(name))
}

/// Text of the single content block, if present.
pub fn text_of(result: &CallToolResult) -> Option<&str> {
    result
        .content
        .first()
        .and_then(|c| c.as_text())
        .map(|t| t.text.as_str())
}
