//! MySQL SQL dialect (Strategy pattern).
//!
//! Renders mart actions as MySQL DDL. MySQL has no separate schema
//! namespace, so the dataset schema is a database that must already exist
//! and no preamble is emitted.

use async_trait::async_trait;
use tracing::debug;

use crate::action::{CopyOptimiser, DropColumns, Index, MartAction, UpdateOptimiser};
use crate::core::identifier::{qualify, MYSQL_MAX_NAME_LENGTH};
use crate::core::traits::Dialect;
use crate::drivers::common::sql::{self, Render, SqlStyle};
use crate::drivers::DEFAULT_INDEX_PREFIX;
use crate::error::{MartError, Result};

const STYLE: SqlStyle = SqlStyle {
    alias_keyword: " as ",
    max_name_length: MYSQL_MAX_NAME_LENGTH,
    additional_relations: false,
};

/// MySQL dialect implementation.
#[derive(Debug, Clone)]
pub struct MysqlDialect {
    index_prefix: String,
    index_count: u32,
}

impl Default for MysqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self::with_index_prefix(DEFAULT_INDEX_PREFIX)
    }

    /// Create an instance naming its indexes `<prefix><n>`.
    pub fn with_index_prefix(prefix: impl Into<String>) -> Self {
        Self {
            index_prefix: prefix.into(),
            index_count: 0,
        }
    }

    fn render(&mut self, action: &MartAction) -> Render<Vec<String>> {
        let statement = match action {
            MartAction::Rename(a) => {
                STYLE.check(&a.to)?;
                format!(
                    "rename table {}.{} to {}.{}",
                    a.dataset_schema, a.table, a.dataset_schema, a.to
                )
            }
            MartAction::Select(a) => sql::create_select(&STYLE, a)?,
            MartAction::Distinct(a) => sql::create_distinct(
                &STYLE,
                &a.dataset_schema,
                &a.result_table,
                &a.source_schema,
                &a.source_table,
            )?,
            MartAction::AddExpression(a) => sql::create_with_expressions(&STYLE, a)?,
            MartAction::Join(a) => sql::create_join(&STYLE, a, sql::join_type(a, true))?,
            MartAction::LeftJoin(a) => sql::create_left_join(&STYLE, a)?,
            MartAction::Index(a) => self.create_index(a)?,
            MartAction::Drop(a) => format!("drop table {}.{}", a.dataset_schema, a.table),
            MartAction::DropColumns(a) => drop_columns(a)?,
            MartAction::CreateOptimiser(a) => sql::create_optimiser(&STYLE, a)?,
            MartAction::CopyOptimiser(a) => return copy_optimiser(a),
            MartAction::UpdateOptimiser(a) => return update_optimiser(a),
        };
        Ok(vec![statement])
    }

    fn create_index(&mut self, action: &Index) -> Render {
        if action.columns.is_empty() {
            return Err("index needs at least one column".to_string());
        }
        let name = format!("{}{}", self.index_prefix, self.index_count);
        STYLE.check(&name)?;
        self.index_count += 1;
        Ok(format!(
            "create index {} on {}.{}({})",
            name,
            action.dataset_schema,
            action.table,
            action.columns.join(",")
        ))
    }
}

fn drop_columns(action: &DropColumns) -> Render {
    if action.columns.is_empty() {
        return Err("no columns to drop".to_string());
    }
    let drops: Vec<String> = action
        .columns
        .iter()
        .map(|c| format!("drop column {}", c))
        .collect();
    Ok(format!(
        "alter table {}.{} {}",
        action.dataset_schema,
        action.table,
        drops.join(",")
    ))
}

fn add_optimiser_column(schema: &str, table: &str, column: &str) -> Render {
    STYLE.check(column)?;
    Ok(format!(
        "alter table {}.{} add column {} integer default 0",
        schema, table, column
    ))
}

fn update_optimiser(action: &UpdateOptimiser) -> Render<Vec<String>> {
    let ds = &action.dataset_schema;
    Ok(vec![
        add_optimiser_column(ds, &action.optimiser_table, &action.column)?,
        format!(
            "update {}.{} a set a.{}=(select {} from {}.{} b where {})",
            ds,
            action.optimiser_table,
            action.column,
            sql::optimiser_flag(action.count_not_bool, action.null_not_zero, false),
            ds,
            action.source_table,
            sql::optimiser_conditions("a", action)?
        ),
    ])
}

fn copy_optimiser(action: &CopyOptimiser) -> Render<Vec<String>> {
    let ds = &action.dataset_schema;
    Ok(vec![
        add_optimiser_column(ds, &action.to_table, &action.to_column)?,
        format!(
            "update {}.{} a set a.{}={}",
            ds,
            action.to_table,
            action.to_column,
            sql::copy_optimiser_value("a", action)?
        ),
    ])
}

#[async_trait]
impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn product_name(&self) -> &str {
        "MySQL"
    }

    fn fresh(&self) -> Box<dyn Dialect> {
        Box::new(Self::with_index_prefix(self.index_prefix.clone()))
    }

    fn reset(&mut self) {
        self.index_count = 0;
    }

    fn translate(&mut self, action: &MartAction, include_comments: bool) -> Result<Vec<String>> {
        let body = self
            .render(action)
            .map_err(|e| MartError::construction(self.name(), action.status_message(), e))?;

        let mut statements = Vec::with_capacity(body.len() + 1);
        if include_comments {
            statements.push(sql::comment(action));
        }
        statements.extend(body);
        debug!(
            dialect = self.name(),
            kind = action.kind_name(),
            statements = statements.len(),
            "Translated action"
        );
        Ok(statements)
    }

    fn select_distinct_sql(&self, schema: &str, table: &str, column: &str) -> String {
        format!("select distinct {} from {}", column, qualify(schema, table))
    }

    fn select_rows_sql(
        &self,
        schema: &str,
        table: &str,
        columns: &[String],
        offset: u64,
        count: u64,
    ) -> String {
        // MySQL uses LIMIT offset,count
        format!(
            "select {} from {}.{} limit {},{}",
            columns.join(","),
            schema,
            table,
            offset,
            count
        )
    }
}
