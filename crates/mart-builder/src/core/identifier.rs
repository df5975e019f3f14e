//! Centralized identifier validation for generated SQL.
//!
//! Statements produced by the translators are plain text with no bind
//! parameters, so every name that ends up in a statement passes through here
//! first:
//!
//! 1. Basic validation (non-empty, no null bytes)
//! 2. Per-dialect length limits for names the translators invent
//!    (result tables, aliases, optimiser columns)
//! 3. Literal escaping for partition values embedded in predicates

use crate::error::{MartError, Result};

/// Longest table or column name MySQL accepts.
pub const MYSQL_MAX_NAME_LENGTH: usize = 64;

/// Longest table or column name Oracle accepts (pre-12.2 limit).
pub const ORACLE_MAX_NAME_LENGTH: usize = 30;

/// Longest table or column name PostgreSQL accepts (NAMEDATALEN - 1).
pub const POSTGRES_MAX_NAME_LENGTH: usize = 63;

/// Validate an identifier for security issues.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes (injection vector)
///
/// # Errors
///
/// Returns `MartError::Config` for invalid identifiers with a descriptive message.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MartError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MartError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    Ok(())
}

/// Check a generated table or column name against a dialect's limits.
///
/// Returns the message to wrap in a construction error, so the caller can
/// attach its own action context.
pub fn check_name(name: &str, max_len: usize) -> std::result::Result<(), String> {
    if let Err(e) = validate_identifier(name) {
        return Err(e.to_string());
    }
    if name.chars().count() > max_len {
        return Err(format!(
            "name {:?} is longer than {} characters",
            name, max_len
        ));
    }
    Ok(())
}

/// Render a string as a single-quoted SQL literal.
///
/// Single quotes are doubled, which every supported dialect accepts.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Qualify a table name with its schema (`schema.table`).
pub fn qualify(schema: &str, table: &str) -> String {
    format!("{}.{}", schema, table)
}
