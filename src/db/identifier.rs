//! Identifier validation and quoting.
//!
//! Table, column and index names cannot be bound as parameters, so they are
//! validated and wrapped in brackets with `]` doubled.

use crate::error::{DbError, DbResult};

/// Maximum length of a SQL Server identifier (sysname).
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Validate a single identifier part.
pub fn validate_identifier(name: &str) -> DbResult<()> {
    if name.is_empty() {
        return Err(DbError::invalid_input("Identifier must not be empty"));
    }
    if name.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(DbError::invalid_input(format!(
            "Identifier '{}' exceeds {} characters",
            name, MAX_IDENTIFIER_LEN
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(DbError::invalid_input(format!(
            "Identifier '{}' contains control characters",
            name.escape_debug()
        )));
    }
    Ok(())
}

/// Validate and bracket-quote an identifier: `my]col` becomes `[my]]col]`.
pub fn quote_identifier(name: &str) -> DbResult<String> {
    validate_identifier(name)?;
    Ok(format!("[{}]", name.replace(']', "]]")))
}

/// Strip one layer of surrounding brackets, undoing `]]` escapes.
fn unbracket(part: &str) -> &str {
    let part = part.trim();
    part.strip_prefix('[')
        .and_then(|p| p.strip_suffix(']'))
        .unwrap_or(part)
}

/// A possibly schema-qualified table name such as `dbo.users`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub schema: Option<String>,
    pub name: String,
}

impl TableName {
    /// Parse `table`, `schema.table`, `[schema].[table]`.
    pub fn parse(input: &str) -> DbResult<Self> {
        let parts: Vec<&str> = input.trim().split('.').collect();
        let (schema, name) = match parts.as_slice() {
            [name] => (None, unbracket(name)),
            [schema, name] => (Some(unbracket(schema)), unbracket(name)),
            _ => {
                return Err(DbError::invalid_input(format!(
                    "Table name '{}' must be 'table' or 'schema.table'",
                    input
                )));
            }
        };

        if let Some(schema) = schema {
            validate_identifier(schema)?;
        }
        validate_identifier(name)?;

        Ok(Self {
            schema: schema.map(|s| s.replace("]]", "]")),
            name: name.replace("]]", "]"),
        })
    }

    /// Replace the schema, failing if the name already carried a different one.
    pub fn with_schema(mut self, schema: &str) -> DbResult<Self> {
        let schema = unbracket(schema);
        validate_identifier(schema)?;
        match &self.schema {
            Some(existing) if existing != schema => Err(DbError::invalid_input(format!(
                "Schema '{}' conflicts with qualified table name '{}'",
                schema, self
            ))),
            _ => {
                self.schema = Some(schema.to_string());
                Ok(self)
            }
        }
    }

    /// Bracket-quoted form for SQL text.
    pub fn quoted(&self) -> DbResult<String> {
        let name = quote_identifier(&self.name)?;
        match &self.schema {
            Some(schema) => Ok(format!("{}.{}", quote_identifier(schema)?, name)),
            None => Ok(name),
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
