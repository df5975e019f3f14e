//! PostgreSQL SQL dialect (Strategy pattern).
//!
//! Every action's statements are preceded by a `set search_path` naming the
//! schemas the action touches. After [`Dialect::reset`] the first action
//! also creates the dataset schema.

use async_trait::async_trait;
use tracing::debug;

use crate::action::{CopyOptimiser, DropColumns, Index, MartAction, UpdateOptimiser};
use crate::core::identifier::{qualify, POSTGRES_MAX_NAME_LENGTH};
use crate::core::traits::Dialect;
use crate::drivers::common::sql::{self, Render, SqlStyle};
use crate::drivers::DEFAULT_INDEX_PREFIX;
use crate::error::{MartError, Result};

const STYLE: SqlStyle = SqlStyle {
    alias_keyword: " as ",
    max_name_length: POSTGRES_MAX_NAME_LENGTH,
    additional_relations: true,
};

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone)]
pub struct PostgresDialect {
    index_prefix: String,
    index_count: u32,
    /// Whether the next action still has to create the dataset schema.
    clean_schema: bool,
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    ///
    /// The instance assumes the dataset schema exists; call
    /// [`Dialect::reset`] to have the next action create it.
    pub fn new() -> Self {
        Self::with_index_prefix(DEFAULT_INDEX_PREFIX)
    }

    /// Create an instance naming its indexes `<prefix><n>`.
    pub fn with_index_prefix(prefix: impl Into<String>) -> Self {
        Self {
            index_prefix: prefix.into(),
            index_count: 0,
            clean_schema: false,
        }
    }

    fn render(&mut self, action: &MartAction) -> Render<Vec<String>> {
        let statement = match action {
            MartAction::Rename(a) => {
                STYLE.check(&a.to)?;
                format!("alter table {}.{} rename to {}", a.dataset_schema, a.table, a.to)
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
            MartAction::DropColumns(a) => return drop_columns(a),
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

/// `set search_path` for the schemas an action reads and writes.
fn search_path(action: &MartAction) -> String {
    let mut schemas = vec![action.dataset_schema()];
    let source = match action {
        MartAction::Select(a) => Some(a.source_schema.as_str()),
        MartAction::Distinct(a) => Some(a.source_schema.as_str()),
        MartAction::Join(a) => Some(a.right_schema.as_str()),
        MartAction::LeftJoin(a) => Some(a.right_schema.as_str()),
        _ => None,
    };
    if let Some(s) = source {
        if !schemas.contains(&s) {
            schemas.push(s);
        }
    }
    format!("set search_path={},pg_catalog", schemas.join(","))
}

fn drop_columns(action: &DropColumns) -> Render<Vec<String>> {
    if action.columns.is_empty() {
        return Err("no columns to drop".to_string());
    }
    Ok(action
        .columns
        .iter()
        .map(|c| {
            format!(
                "alter table {}.{} drop column {}",
                action.dataset_schema, action.table, c
            )
        })
        .collect())
}

fn add_optimiser_column(schema: &str, table: &str, column: &str) -> Render {
    STYLE.check(column)?;
    Ok(format!(
        "alter table {}.{} add {} integer default 0",
        schema, table, column
    ))
}

// PostgreSQL does not allow an alias on the updated table to be used in the
// set clause, so the subquery correlates on the qualified table name.
fn update_optimiser(action: &UpdateOptimiser) -> Render<Vec<String>> {
    let ds = &action.dataset_schema;
    let outer = qualify(ds, &action.optimiser_table);
    Ok(vec![
        add_optimiser_column(ds, &action.optimiser_table, &action.column)?,
        format!(
            "update {} set {}=(select {} from {}.{} b where {})",
            outer,
            action.column,
            sql::optimiser_flag(action.count_not_bool, action.null_not_zero, false),
            ds,
            action.source_table,
            sql::optimiser_conditions(&outer, action)?
        ),
    ])
}

fn copy_optimiser(action: &CopyOptimiser) -> Render<Vec<String>> {
    let ds = &action.dataset_schema;
    let outer = qualify(ds, &action.to_table);
    Ok(vec![
        add_optimiser_column(ds, &action.to_table, &action.to_column)?,
        format!(
            "update {} set {}={}",
            outer,
            action.to_column,
            sql::copy_optimiser_value(&outer, action)?
        ),
    ])
}

#[async_trait]
impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn product_name(&self) -> &str {
        "PostgreSQL"
    }

    fn fresh(&self) -> Box<dyn Dialect> {
        let mut fresh = Self::with_index_prefix(self.index_prefix.clone());
        fresh.reset();
        Box::new(fresh)
    }

    fn reset(&mut self) {
        self.index_count = 0;
        self.clean_schema = true;
    }

    fn translate(&mut self, action: &MartAction, include_comments: bool) -> Result<Vec<String>> {
        let body = self
            .render(action)
            .map_err(|e| MartError::construction(self.name(), action.status_message(), e))?;

        let mut statements = Vec::with_capacity(body.len() + 3);
        if self.clean_schema {
            statements.push(format!("create schema {}", action.dataset_schema()));
            self.clean_schema = false;
        }
        if include_comments {
            statements.push(sql::comment(action));
        }
        statements.push(search_path(action));
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
        format!(
            "select {} from {}.{} limit {} offset {}",
            columns.join(","),
            schema,
            table,
            count,
            offset
        )
    }
}
