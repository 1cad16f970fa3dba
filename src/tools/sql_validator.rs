//! SQL validation for `read_data` and `update_data`.
//!
//! `read_data` only accepts a single SELECT. `update_data` splices its
//! WHERE clause into the statement text, so the clause must parse as a lone
//! boolean expression. Both reject dangerous T-SQL keywords.
//!
//! Uses [sqlparser](https://docs.rs/sqlparser/) with the MS SQL dialect so
//! formatting tricks and string literals cannot hide a second statement.

use crate::error::{DbError, DbResult};
use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::MsSqlDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};

/// Keywords that reach outside the database or stall the server.
const DANGEROUS_KEYWORDS: &[&str] = &[
    "XP_CMDSHELL",
    "SP_EXECUTESQL",
    "SP_CONFIGURE",
    "SP_ADDSRVROLEMEMBER",
    "OPENROWSET",
    "OPENDATASOURCE",
    "OPENQUERY",
    "WAITFOR",
    "SHUTDOWN",
    "RECONFIGURE",
    "DBCC",
];

/// Procedure prefixes for extended and OLE automation stored procedures.
const DANGEROUS_PREFIXES: &[&str] = &["XP_", "SP_OA"];

/// Keywords that start a write, DDL or control statement.
///
/// T-SQL batches need no separator between statements, so `SELECT 1 DELETE
/// FROM t` runs a DELETE even though it parses as a SELECT with an alias.
const WRITE_KEYWORDS: &[&str] = &[
    "INSERT",
    "UPDATE",
    "DELETE",
    "MERGE",
    "DROP",
    "ALTER",
    "CREATE",
    "TRUNCATE",
    "EXEC",
    "EXECUTE",
    "GRANT",
    "REVOKE",
    "DENY",
    "BACKUP",
    "RESTORE",
    "BULK",
    "KILL",
    "DECLARE",
    "USE",
    "UPDATETEXT",
    "WRITETEXT",
];

mod error_messages {
    pub const NOT_SELECT: &str =
        "Only SELECT queries are allowed in read_data. Use the dedicated tools for writes and DDL.";
    pub const SELECT_INTO: &str =
        "SELECT ... INTO creates a table and is not allowed in read_data. Use create_table and insert_data.";
    pub const MULTIPLE: &str = "Exactly one statement is allowed.";
    pub const WHERE_SEPARATOR: &str =
        "WHERE clause must not contain statement separators or comments.";
    pub const WHERE_STATEMENT: &str =
        "WHERE clause must be a condition, not a statement. Use the dedicated tools for other writes.";
}

fn tokenize(sql: &str) -> DbResult<Vec<Token>> {
    Tokenizer::new(&MsSqlDialect {}, sql)
        .tokenize()
        .map_err(|e| DbError::invalid_input(format!("Failed to tokenize SQL: {}", e)))
}

/// Reject statements that mention a dangerous keyword outside a string literal.
pub fn check_dangerous_keywords(sql: &str) -> DbResult<()> {
    for token in tokenize(sql)? {
        if let Token::Word(word) = token {
            let upper = word.value.to_ascii_uppercase();
            let dangerous = DANGEROUS_KEYWORDS.contains(&upper.as_str())
                || DANGEROUS_PREFIXES.iter().any(|p| upper.starts_with(p));
            if dangerous {
                return Err(DbError::permission(
                    upper,
                    "This keyword is not allowed through the MCP tools",
                ));
            }
        }
    }
    Ok(())
}

/// First unquoted write or DDL keyword outside string literals, if any.
///
/// Bracketed or double-quoted identifiers such as `[Update]` are allowed.
pub fn find_write_keyword(sql: &str) -> DbResult<Option<String>> {
    for token in tokenize(sql)? {
        if let Token::Word(word) = token {
            if word.quote_style.is_some() {
                continue;
            }
            let upper = word.value.to_ascii_uppercase();
            if WRITE_KEYWORDS.contains(&upper.as_str()) {
                return Ok(Some(upper));
            }
        }
    }
    Ok(None)
}

/// Validate SQL for the `read_data` tool.
///
/// Returns `Ok(())` for exactly one query statement without `SELECT ... INTO`,
/// or an error naming why the statement was rejected.
///
/// # Examples
///
/// ```
/// use mssql_mcp_server::tools::sql_validator::validate_read_query;
///
/// assert!(validate_read_query("SELECT TOP 10 * FROM dbo.users").is_ok());
/// assert!(validate_read_query("DELETE FROM dbo.users").is_err());
/// ```
pub fn validate_read_query(sql: &str) -> DbResult<()> {
    if sql.trim().is_empty() {
        return Err(DbError::invalid_argument(
            "read_data",
            "query",
            "query must not be empty",
        ));
    }

    if let Some(keyword) = find_write_keyword(sql)? {
        return Err(DbError::permission(keyword, error_messages::NOT_SELECT));
    }

    let statements = Parser::parse_sql(&MsSqlDialect {}, sql)
        .map_err(|e| DbError::invalid_input(format!("Failed to parse SQL statement: {}", e)))?;

    let statement = match statements.as_slice() {
        [] => return Err(DbError::invalid_input("Empty SQL statement")),
        [statement] => statement,
        _ => {
            return Err(DbError::permission(
                "multiple statements",
                error_messages::MULTIPLE,
            ));
        }
    };

    match statement {
        Statement::Query(query) => {
            if query_has_into(query) {
                return Err(DbError::permission("SELECT INTO", error_messages::SELECT_INTO));
            }
        }
        other => {
            return Err(DbError::permission(
                statement_name(other),
                error_messages::NOT_SELECT,
            ));
        }
    }

    check_dangerous_keywords(sql)
}

/// Validate a WHERE clause before it is appended to an UPDATE.
///
/// The clause is parsed inside `SELECT 1 FROM t WHERE ...`; anything that
/// would end that expression early fails to parse as a single statement.
pub fn validate_where_clause(clause: &str) -> DbResult<()> {
    if clause.trim().is_empty() {
        return Err(DbError::invalid_argument(
            "update_data",
            "whereClause",
            "a WHERE clause is required to update rows",
        ));
    }

    for token in tokenize(clause)? {
        match token {
            Token::SemiColon
            | Token::Whitespace(Whitespace::SingleLineComment { .. })
            | Token::Whitespace(Whitespace::MultiLineComment(_)) => {
                return Err(DbError::permission(
                    "WHERE clause",
                    error_messages::WHERE_SEPARATOR,
                ));
            }
            _ => {}
        }
    }

    if let Some(keyword) = find_write_keyword(clause)? {
        return Err(DbError::permission(keyword, error_messages::WHERE_STATEMENT));
    }

    let wrapped = format!("SELECT 1 FROM t WHERE {}", clause);
    let statements = Parser::parse_sql(&MsSqlDialect {}, &wrapped)
        .map_err(|e| DbError::invalid_input(format!("Invalid WHERE clause: {}", e)))?;

    match statements.as_slice() {
        [Statement::Query(query)]
            if matches!(*query.body, SetExpr::Select(_)) && !query_has_into(query) => {}
        _ => {
            return Err(DbError::permission(
                "WHERE clause",
                error_messages::WHERE_SEPARATOR,
            ));
        }
    }

    check_dangerous_keywords(clause)
}

fn query_has_into(query: &Query) -> bool {
    set_expr_has_into(&query.body)
}

fn set_expr_has_into(expr: &SetExpr) -> bool {
    match expr {
        SetExpr::Select(select) => select.into.is_some(),
        SetExpr::Query(query) => query_has_into(query),
        SetExpr::SetOperation { left, right, .. } => {
            set_expr_has_into(left) || set_expr_has_into(right)
        }
        _ => false,
    }
}

fn statement_name(stmt: &Statement) -> &'static str {
    match stmt {
        Statement::Insert(_) => "INSERT",
        Statement::Update { .. } => "UPDATE",
        Statement::Delete(_) => "DELETE",
        Statement::Merge { .. } => "MERGE",
        Statement::CreateTable { .. } => "CREATE TABLE",
        Statement::CreateView { .. } => "CREATE VIEW",
        Statement::CreateIndex(_) => "CREATE INDEX",
        Statement::AlterTable { .. } => "ALTER TABLE",
        Statement::Drop { .. } => "DROP",
        Statement::Truncate { .. } => "TRUNCATE",
        Statement::Execute { .. } => "EXECUTE",
        Statement::Grant { .. } => "GRANT",
        Statement::Revoke { .. } => "REVOKE",
        Statement::StartTransaction { .. } => "BEGIN TRANSACTION",
        Statement::Commit { .. } => "COMMIT",
        Statement::Rollback { .. } => "ROLLBACK",
        Statement::Use(_) => "USE",
        Statement::Set(_) => "SET",
        _ => "non-SELECT statement",
    }
}
