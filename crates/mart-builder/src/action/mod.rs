//! Mart construction actions.
//!
//! An action is an immutable description of one schema-transformation step.
//! Plans are ordered lists of actions produced by a planner; each
//! [`Dialect`](crate::core::traits::Dialect) turns one action into one or
//! more SQL statements.
//!
//! - [`MartAction`]: closed union over the twelve action kinds
//! - [`restriction`]: restriction and partition predicates
//!
//! Actions (de)serialise with a `kind` tag, so a plan can be written as YAML:
//!
//! ```yaml
//! - kind: rename
//!   dataset_schema: ds
//!   table: t1
//!   to: t2
//! - kind: index
//!   dataset_schema: ds
//!   table: t2
//!   columns: [gene_id]
//! ```

pub mod restriction;

use serde::{Deserialize, Serialize};

pub use restriction::{
    AdditionalRelation, PartitionFilter, RelationRestriction, RestrictionAlias, TableRestriction,
    MAX_ADDITIONAL_RELATIONS,
};

/// A source column and the name it takes in the result table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedColumn {
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ProjectedColumn {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            alias: None,
        }
    }

    pub fn aliased(column: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            alias: Some(alias.into()),
        }
    }

    /// The alias, unless it is absent or equal to the column name.
    pub fn effective_alias(&self) -> Option<&str> {
        self.alias.as_deref().filter(|a| *a != self.column)
    }
}

/// Ordered projection, source column to output name.
pub type Projection = Vec<ProjectedColumn>;

/// `a.col <> b.col`, used when a table is joined back onto itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loopback {
    pub left_column: String,
    pub right_column: String,
}

/// A computed column added by [`AddExpression`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionColumn {
    pub alias: String,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub dataset_schema: String,
    pub table: String,
    pub to: String,
}

/// Copy selected columns of a source table into a new dataset table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Select {
    pub dataset_schema: String,
    pub source_schema: String,
    pub source_table: String,
    pub result_table: String,
    pub columns: Projection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_restriction: Option<TableRestriction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distinct {
    pub dataset_schema: String,
    pub source_schema: String,
    pub source_table: String,
    pub result_table: String,
}

/// Copy a dataset table adding computed columns, optionally grouping by
/// the copied columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddExpression {
    pub dataset_schema: String,
    pub table: String,
    pub result_table: String,
    pub columns: Vec<String>,
    pub expressions: Vec<ExpressionColumn>,
    #[serde(default)]
    pub group_by: bool,
}

/// Merge a source table onto a dataset table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    pub dataset_schema: String,
    pub left_table: String,
    pub right_schema: String,
    pub right_table: String,
    pub result_table: String,
    pub left_join_columns: Vec<String>,
    pub right_join_columns: Vec<String>,
    pub columns: Projection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_restriction: Option<RelationRestriction>,
    /// Whether the restriction's left aliases refer to the left table.
    #[serde(default = "default_true")]
    pub relation_restriction_left_is_first: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_restriction: Option<TableRestriction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loopback: Option<Loopback>,
}

/// Plain left join of two dataset-level tables with explicit column lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeftJoin {
    pub dataset_schema: String,
    pub left_table: String,
    pub right_schema: String,
    pub right_table: String,
    pub result_table: String,
    pub left_columns: Vec<String>,
    pub right_columns: Vec<String>,
    pub left_join_columns: Vec<String>,
    pub right_join_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub dataset_schema: String,
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTable {
    pub dataset_schema: String,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropColumns {
    pub dataset_schema: String,
    pub table: String,
    pub columns: Vec<String>,
}

/// Create an optimiser table holding the distinct keys of a dataset table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOptimiser {
    pub dataset_schema: String,
    pub source_table: String,
    pub optimiser_table: String,
    pub key_columns: Vec<String>,
    /// Only keep keys also present in this table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_table: Option<String>,
}

/// Copy an optimiser column from one optimiser table to another, directly
/// or through a linking table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyOptimiser {
    pub dataset_schema: String,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    /// Keys linking `from_table` to `via_table`; unused without a via table.
    #[serde(default)]
    pub from_key_columns: Vec<String>,
    /// Keys linking `to_table` to `via_table`, or to `from_table` directly.
    pub to_key_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via_table: Option<String>,
    #[serde(default)]
    pub count_not_bool: bool,
}

/// Add a count or flag column to an optimiser table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOptimiser {
    pub dataset_schema: String,
    pub source_table: String,
    pub optimiser_table: String,
    pub column: String,
    pub key_columns: Vec<String>,
    /// Rows count when none of these columns is NULL (used without a restriction).
    #[serde(default)]
    pub non_null_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restriction: Option<TableRestriction>,
    /// Store raw counts rather than a 0/1 flag.
    #[serde(default)]
    pub count_not_bool: bool,
    /// Use NULL rather than 0 for "no rows".
    #[serde(default)]
    pub null_not_zero: bool,
}

fn default_true() -> bool {
    true
}

/// One step of a mart construction plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MartAction {
    Rename(Rename),
    Select(Select),
    Distinct(Distinct),
    AddExpression(AddExpression),
    Join(Join),
    LeftJoin(LeftJoin),
    Index(Index),
    Drop(DropTable),
    DropColumns(DropColumns),
    CreateOptimiser(CreateOptimiser),
    CopyOptimiser(CopyOptimiser),
    UpdateOptimiser(UpdateOptimiser),
}

impl MartAction {
    /// Short name of the action kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            MartAction::Rename(_) => "rename",
            MartAction::Select(_) => "select",
            MartAction::Distinct(_) => "distinct",
            MartAction::AddExpression(_) => "add_expression",
            MartAction::Join(_) => "join",
            MartAction::LeftJoin(_) => "left_join",
            MartAction::Index(_) => "index",
            MartAction::Drop(_) => "drop",
            MartAction::DropColumns(_) => "drop_columns",
            MartAction::CreateOptimiser(_) => "create_optimiser",
            MartAction::CopyOptimiser(_) => "copy_optimiser",
            MartAction::UpdateOptimiser(_) => "update_optimiser",
        }
    }

    /// Schema the action writes into.
    pub fn dataset_schema(&self) -> &str {
        match self {
            MartAction::Rename(a) => &a.dataset_schema,
            MartAction::Select(a) => &a.dataset_schema,
            MartAction::Distinct(a) => &a.dataset_schema,
            MartAction::AddExpression(a) => &a.dataset_schema,
            MartAction::Join(a) => &a.dataset_schema,
            MartAction::LeftJoin(a) => &a.dataset_schema,
            MartAction::Index(a) => &a.dataset_schema,
            MartAction::Drop(a) => &a.dataset_schema,
            MartAction::DropColumns(a) => &a.dataset_schema,
            MartAction::CreateOptimiser(a) => &a.dataset_schema,
            MartAction::CopyOptimiser(a) => &a.dataset_schema,
            MartAction::UpdateOptimiser(a) => &a.dataset_schema,
        }
    }

    /// Human-readable description, used for progress output and SQL comments.
    pub fn status_message(&self) -> String {
        match self {
            MartAction::Rename(a) => {
                format!("Rename {}.{} to {}", a.dataset_schema, a.table, a.to)
            }
            MartAction::Select(a) => format!(
                "Create {}.{} from {}.{}",
                a.dataset_schema, a.result_table, a.source_schema, a.source_table
            ),
            MartAction::Distinct(a) => format!(
                "Create {}.{} from distinct rows of {}.{}",
                a.dataset_schema, a.result_table, a.source_schema, a.source_table
            ),
            MartAction::AddExpression(a) => format!(
                "Create {}.{} from {} adding {} expression column(s)",
                a.dataset_schema,
                a.result_table,
                a.table,
                a.expressions.len()
            ),
            MartAction::Join(a) => format!(
                "Create {}.{} by joining {} to {}.{}",
                a.dataset_schema, a.result_table, a.left_table, a.right_schema, a.right_table
            ),
            MartAction::LeftJoin(a) => format!(
                "Create {}.{} by left joining {} to {}.{}",
                a.dataset_schema, a.result_table, a.left_table, a.right_schema, a.right_table
            ),
            MartAction::Index(a) => format!(
                "Index {}.{} on {}",
                a.dataset_schema,
                a.table,
                a.columns.join(",")
            ),
            MartAction::Drop(a) => format!("Drop {}.{}", a.dataset_schema, a.table),
            MartAction::DropColumns(a) => format!(
                "Drop columns {} from {}.{}",
                a.columns.join(","),
                a.dataset_schema,
                a.table
            ),
            MartAction::CreateOptimiser(a) => format!(
                "Create optimiser {}.{} from {}",
                a.dataset_schema, a.optimiser_table, a.source_table
            ),
            MartAction::CopyOptimiser(a) => format!(
                "Copy optimiser column {}.{} to {}.{}",
                a.from_table, a.from_column, a.to_table, a.to_column
            ),
            MartAction::UpdateOptimiser(a) => format!(
                "Add optimiser column {} to {}.{} from {}",
                a.column, a.dataset_schema, a.optimiser_table, a.source_table
            ),
        }
    }
}
