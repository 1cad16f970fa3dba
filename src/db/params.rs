//! Parameter values and prepared statements.
//!
//! Tools never splice values into SQL text. They build a `SqlStatement` with
//! `@P1..@Pn` placeholders and a matching list of `SqlParam`s.

use serde_json::Value;

/// A bound statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl SqlParam {
    /// Convert a JSON value into a parameter.
    ///
    /// Arrays and objects are bound as their JSON text, which SQL Server
    /// stores in NVARCHAR columns and reads with `OPENJSON`/`JSON_VALUE`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => SqlParam::Null,
            Value::Bool(b) => SqlParam::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlParam::Int(i),
                None => n.as_f64().map(SqlParam::Float).unwrap_or(SqlParam::Null),
            },
            Value::String(s) => SqlParam::String(s.clone()),
            Value::Array(_) | Value::Object(_) => SqlParam::String(value.to_string()),
        }
    }
}

impl From<&str> for SqlParam {
    fn from(s: &str) -> Self {
        SqlParam::String(s.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(s: String) -> Self {
        SqlParam::String(s)
    }
}

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter and return its placeholder (`@P1`, `@P2`, ...).
    pub fn bind(&mut self, param: impl Into<SqlParam>) -> String {
        self.params.push(param.into());
        format!("@P{}", self.params.len())
    }
}
