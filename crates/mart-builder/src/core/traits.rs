//! Core traits for dialect-specific SQL generation.
//!
//! This module defines the two seams of the library:
//!
//! - [`DataLink`]: a live connection supplied by the caller
//! - [`Dialect`]: turns actions into vendor-specific SQL and samples data
//!
//! # Design Patterns
//!
//! - **Strategy**: each dialect is an interchangeable rendering algorithm
//! - **Template Method**: the probing and sampling methods have default
//!   implementations built on a few dialect-specific SQL builders

use async_trait::async_trait;
use tracing::debug;

use crate::action::MartAction;
use crate::error::{MartError, Result};

use super::schema::{ColumnId, SchemaModel, TableId};
use super::value::{Row, SqlValue};

/// A live database connection.
///
/// Names handed to the dialects are already resolved; the link only has to
/// report who it is, which database schema it reads, and run plain SQL.
#[async_trait]
pub trait DataLink: Send + Sync {
    /// Product name reported by the server (e.g. "PostgreSQL", "MySQL").
    async fn product_name(&self) -> Result<String>;

    /// Database schema that unqualified model tables live in.
    fn database_schema(&self) -> &str;

    /// Run a query and return every row.
    async fn query(&self, sql: &str) -> Result<Vec<Row>>;
}

/// SQL dialect translator.
///
/// A translator carries per-run state (the index counter and, for some
/// dialects, whether the dataset schema still has to be created). It is not
/// meant to be shared between concurrent runs: call [`Dialect::reset`]
/// before each run, or take a [`Dialect::fresh`] instance per run.
#[async_trait]
pub trait Dialect: Send + Sync {
    /// Get the dialect identifier (e.g., "mysql", "postgres").
    fn name(&self) -> &str;

    /// Product name a connection must report for this dialect to accept it.
    fn product_name(&self) -> &str;

    /// A new instance with the same settings and clean per-run state.
    fn fresh(&self) -> Box<dyn Dialect>;

    /// Clear per-run state.
    fn reset(&mut self);

    /// Translate one action into complete, parameter-free statements.
    ///
    /// With `include_comments`, the first statement is a `-- ` comment
    /// carrying the action's status message.
    fn translate(&mut self, action: &MartAction, include_comments: bool) -> Result<Vec<String>>;

    /// Build `select distinct column from schema.table`.
    fn select_distinct_sql(&self, schema: &str, table: &str, column: &str) -> String;

    /// Build a query returning `count` rows starting at 0-based `offset`.
    fn select_rows_sql(
        &self,
        schema: &str,
        table: &str,
        columns: &[String],
        offset: u64,
        count: u64,
    ) -> String;

    /// Whether a connection talks to this dialect's product.
    ///
    /// Failing to read the product name at all is an internal error: the
    /// link is broken, not the data.
    async fn understands_data_link(&self, link: &dyn DataLink) -> Result<bool> {
        let product = link.product_name().await.map_err(|e| {
            MartError::Internal(format!("cannot read connection metadata: {}", e))
        })?;
        debug!(dialect = self.name(), product = %product, "Probing data link");
        Ok(product.eq_ignore_ascii_case(self.product_name()))
    }

    /// Distinct values of one column.
    async fn execute_select_distinct(
        &self,
        link: &dyn DataLink,
        model: &SchemaModel,
        column: ColumnId,
    ) -> Result<Vec<SqlValue>> {
        let col = model
            .column(column)
            .ok_or_else(|| MartError::Internal(format!("unknown {}", column)))?;
        let table = model
            .table(col.table())
            .ok_or_else(|| MartError::Internal(format!("unknown {}", col.table())))?;
        let sql = self.select_distinct_sql(link.database_schema(), table.name(), col.name());
        let rows = link.query(&sql).await?;
        Ok(rows
            .into_iter()
            .map(|mut row| {
                if row.is_empty() {
                    SqlValue::Null
                } else {
                    row.swap_remove(0)
                }
            })
            .collect())
    }

    /// A page of rows from one table, columns in name order.
    async fn execute_select_rows(
        &self,
        link: &dyn DataLink,
        model: &SchemaModel,
        table: TableId,
        offset: u64,
        count: u64,
    ) -> Result<Vec<Row>> {
        let t = model
            .table(table)
            .ok_or_else(|| MartError::Internal(format!("unknown {}", table)))?;
        let columns: Vec<String> = t.columns().keys().cloned().collect();
        let sql = self.select_rows_sql(link.database_schema(), t.name(), &columns, offset, count);
        link.query(&sql).await
    }
}

/// Translate a whole plan with one dialect.
///
/// On failure, returns the error together with the statements produced by
/// the actions before the failing one; those remain valid.
pub fn translate_all(
    dialect: &mut dyn Dialect,
    actions: &[MartAction],
    include_comments: bool,
) -> std::result::Result<Vec<String>, (MartError, Vec<String>)> {
    let mut statements = Vec::new();
    for action in actions {
        match dialect.translate(action, include_comments) {
            Ok(mut translated) => statements.append(&mut translated),
            Err(e) => return Err((e, statements)),
        }
    }
    Ok(statements)
}
