//! Statement fragments shared by the dialects.
//!
//! Builders return `Render<T>`: an error here is a plain message that the
//! calling dialect wraps into a construction error with its own name and
//! the action's status message.
//!
//! Table aliases are fixed: `a` is the table being built from, `b` the
//! table being joined or the correlated source in a subquery, `c` a linking
//! table, and `f`, `g`, ... tables reached by restriction relations.

use crate::action::{
    AddExpression, CopyOptimiser, CreateOptimiser, Join, LeftJoin, MartAction, PartitionFilter,
    Projection, Select, TableRestriction, UpdateOptimiser,
};
use crate::core::identifier::check_name;

/// Result of rendering a fragment; the error is a message.
pub(crate) type Render<T = String> = std::result::Result<T, String>;

/// Syntax differences that the shared builders need to know about.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SqlStyle {
    /// Text between a table and its alias: `" as "` or `" "`.
    pub alias_keyword: &'static str,
    pub max_name_length: usize,
    /// Whether restrictions may reach other tables through extra joins.
    pub additional_relations: bool,
}

impl SqlStyle {
    /// `schema.table<kw>alias`
    pub fn aliased(&self, schema: &str, table: &str, alias: &str) -> String {
        format!("{}.{}{}{}", schema, table, self.alias_keyword, alias)
    }

    /// Check a name the statement will create.
    pub fn check(&self, name: &str) -> Render<()> {
        check_name(name, self.max_name_length)
    }

    /// Aliases for a restriction's additional relations, if this style allows them.
    pub fn relation_prefixes(&self, restriction: Option<&TableRestriction>) -> Render<Vec<String>> {
        match restriction {
            Some(r) if !r.additional_relations.is_empty() => {
                if self.additional_relations {
                    r.relation_aliases()
                } else {
                    Err("restrictions referring to other tables are not supported".to_string())
                }
            }
            _ => Ok(Vec::new()),
        }
    }
}

/// Leading comment carrying the action's status message.
///
/// Line breaks in names are flattened so the comment stays on one line.
pub(crate) fn comment(action: &MartAction) -> String {
    let message: String = action
        .status_message()
        .chars()
        .map(|c| if matches!(c, '\n' | '\r') { ' ' } else { c })
        .collect();
    format!("-- {}", message)
}

/// `a.x=b.x and a.y=b.z`, pairing columns positionally.
pub(crate) fn join_on(
    left: &str,
    left_columns: &[String],
    right: &str,
    right_columns: &[String],
) -> Render {
    if left_columns.len() != right_columns.len() {
        return Err(format!(
            "join column count mismatch ({} vs {})",
            left_columns.len(),
            right_columns.len()
        ));
    }
    if left_columns.is_empty() {
        return Err("no join columns".to_string());
    }
    Ok(left_columns
        .iter()
        .zip(right_columns)
        .map(|(l, r)| format!("{}.{}={}.{}", left, l, right, r))
        .collect::<Vec<_>>()
        .join(" and "))
}

/// Projected columns as select items (`a.col`, `a.col as alias`).
pub(crate) fn projection(style: &SqlStyle, prefix: &str, columns: &Projection) -> Render<Vec<String>> {
    columns
        .iter()
        .map(|c| match c.effective_alias() {
            Some(alias) => {
                style.check(alias)?;
                Ok(format!("{}.{} as {}", prefix, c.column, alias))
            }
            None => Ok(format!("{}.{}", prefix, c.column)),
        })
        .collect()
}

/// Predicate for one partition. Range expressions are parenthesised.
pub(crate) fn partition_predicate(partition: &PartitionFilter, prefix: &str) -> String {
    match partition {
        PartitionFilter::Value { .. } => partition.render(prefix),
        PartitionFilter::Range { .. } => format!("({})", partition.render(prefix)),
    }
}

/// Extra joins to the tables a restriction reaches through relations.
pub(crate) fn additional_joins(
    style: &SqlStyle,
    join_type: &str,
    schema: &str,
    base: &str,
    restriction: &TableRestriction,
    prefixes: &[String],
) -> Render {
    let mut sql = String::new();
    for (relation, alias) in restriction.additional_relations.iter().zip(prefixes) {
        sql.push_str(&format!(
            " {} join {} on {}",
            join_type,
            style.aliased(schema, &relation.table, alias),
            join_on(base, &relation.many_columns, alias, &relation.one_columns)?
        ));
    }
    Ok(sql)
}

/// `inner` when any hard condition applies, else `left`.
///
/// `partition_forces_inner` decides whether a partition filter alone is
/// enough to make the join inner.
pub(crate) fn join_type(action: &Join, partition_forces_inner: bool) -> &'static str {
    let relation_hard = action.relation_restriction.as_ref().is_some_and(|r| r.hard);
    let table_hard = action.table_restriction.as_ref().is_some_and(|r| r.hard);
    if relation_hard || table_hard || (partition_forces_inner && action.partition.is_some()) {
        "inner"
    } else {
        "left"
    }
}

pub(crate) fn create_select(style: &SqlStyle, action: &Select) -> Render {
    style.check(&action.result_table)?;
    if action.columns.is_empty() {
        return Err("no columns to select".to_string());
    }
    let prefixes = style.relation_prefixes(action.table_restriction.as_ref())?;

    let mut sql = format!(
        "create table {}.{} as select {} from {}",
        action.dataset_schema,
        action.result_table,
        projection(style, "a", &action.columns)?.join(","),
        style.aliased(&action.source_schema, &action.source_table, "a")
    );

    let mut conditions = Vec::new();
    if let Some(r) = &action.table_restriction {
        sql.push_str(&additional_joins(
            style,
            "inner",
            &action.source_schema,
            "a",
            r,
            &prefixes,
        )?);
        conditions.push(format!("({})", r.render("a", &prefixes)?));
    }
    if let Some(p) = &action.partition {
        conditions.push(partition_predicate(p, "a"));
    }
    if !conditions.is_empty() {
        sql.push_str(" where ");
        sql.push_str(&conditions.join(" and "));
    }
    Ok(sql)
}

pub(crate) fn create_distinct(
    style: &SqlStyle,
    dataset_schema: &str,
    result_table: &str,
    source_schema: &str,
    source_table: &str,
) -> Render {
    style.check(result_table)?;
    Ok(format!(
        "create table {}.{} as select distinct * from {}.{}",
        dataset_schema, result_table, source_schema, source_table
    ))
}

pub(crate) fn create_with_expressions(style: &SqlStyle, action: &AddExpression) -> Render {
    style.check(&action.result_table)?;
    if action.expressions.is_empty() {
        return Err("no expression columns to add".to_string());
    }
    let mut items: Vec<String> = action.columns.clone();
    for e in &action.expressions {
        style.check(&e.alias)?;
        items.push(format!("{} as {}", e.expression, e.alias));
    }
    let mut sql = format!(
        "create table {}.{} as select {} from {}.{}",
        action.dataset_schema,
        action.result_table,
        items.join(","),
        action.dataset_schema,
        action.table
    );
    if action.group_by && !action.columns.is_empty() {
        sql.push_str(" group by ");
        sql.push_str(&action.columns.join(","));
    }
    Ok(sql)
}

pub(crate) fn create_join(style: &SqlStyle, action: &Join, join_type: &str) -> Render {
    style.check(&action.result_table)?;
    let prefixes = style.relation_prefixes(action.table_restriction.as_ref())?;

    let mut select = vec!["a.*".to_string()];
    select.extend(projection(style, "b", &action.columns)?);

    let mut sql = format!(
        "create table {}.{} as select {} from {} {} join {} on {}",
        action.dataset_schema,
        action.result_table,
        select.join(","),
        style.aliased(&action.dataset_schema, &action.left_table, "a"),
        join_type,
        style.aliased(&action.right_schema, &action.right_table, "b"),
        join_on(
            "a",
            &action.left_join_columns,
            "b",
            &action.right_join_columns
        )?
    );

    if let Some(r) = &action.relation_restriction {
        let (first, second) = if action.relation_restriction_left_is_first {
            ("a", "b")
        } else {
            ("b", "a")
        };
        sql.push_str(&format!(" and ({})", r.render(first, second)));
    }
    if let Some(r) = &action.table_restriction {
        if prefixes.is_empty() {
            sql.push_str(&format!(" and ({})", r.render("b", &prefixes)?));
        }
    }
    if let Some(p) = &action.partition {
        sql.push_str(" and ");
        sql.push_str(&partition_predicate(p, "b"));
    }
    if let Some(l) = &action.loopback {
        sql.push_str(&format!(" and a.{}<>b.{}", l.left_column, l.right_column));
    }
    if let Some(r) = &action.table_restriction {
        if !prefixes.is_empty() {
            sql.push_str(&additional_joins(
                style,
                join_type,
                &action.right_schema,
                "b",
                r,
                &prefixes,
            )?);
            sql.push_str(&format!(" where ({})", r.render("b", &prefixes)?));
        }
    }
    Ok(sql)
}

pub(crate) fn create_left_join(style: &SqlStyle, action: &LeftJoin) -> Render {
    style.check(&action.result_table)?;
    let select: Vec<String> = action
        .left_columns
        .iter()
        .map(|c| format!("a.{}", c))
        .chain(action.right_columns.iter().map(|c| format!("b.{}", c)))
        .collect();
    if select.is_empty() {
        return Err("no columns to select".to_string());
    }
    Ok(format!(
        "create table {}.{} as select {} from {} left join {} on {}",
        action.dataset_schema,
        action.result_table,
        select.join(","),
        style.aliased(&action.dataset_schema, &action.left_table, "a"),
        style.aliased(&action.right_schema, &action.right_table, "b"),
        join_on(
            "a",
            &action.left_join_columns,
            "b",
            &action.right_join_columns
        )?
    ))
}

pub(crate) fn create_optimiser(style: &SqlStyle, action: &CreateOptimiser) -> Render {
    style.check(&action.optimiser_table)?;
    if action.key_columns.is_empty() {
        return Err("optimiser needs key columns".to_string());
    }
    let ds = &action.dataset_schema;
    match &action.copy_table {
        None => Ok(format!(
            "create table {}.{} as select distinct {} from {}.{}",
            ds,
            action.optimiser_table,
            action.key_columns.join(","),
            ds,
            action.source_table
        )),
        Some(copy) => {
            let keys: Vec<String> = action.key_columns.iter().map(|k| format!("a.{}", k)).collect();
            Ok(format!(
                "create table {}.{} as select distinct {} from {} inner join {} on {}",
                ds,
                action.optimiser_table,
                keys.join(","),
                style.aliased(ds, &action.source_table, "a"),
                style.aliased(ds, copy, "b"),
                join_on("a", &action.key_columns, "b", &action.key_columns)?
            ))
        }
    }
}

/// Value stored in an optimiser column: a raw count, or a 0/1 flag with
/// NULL or 0 for "no rows".
pub(crate) fn optimiser_flag(count_not_bool: bool, null_not_zero: bool, decode: bool) -> String {
    let falsy = if null_not_zero { "NULL" } else { "0" };
    if count_not_bool {
        "COUNT(1)".to_string()
    } else if decode {
        format!("DECODE(COUNT(1),0,{},1)", falsy)
    } else {
        format!("CASE COUNT(1) WHEN 0 THEN {} ELSE 1 END", falsy)
    }
}

/// Where clause of the optimiser subquery, correlating `outer` with `b`.
pub(crate) fn optimiser_conditions(outer: &str, action: &UpdateOptimiser) -> Render {
    if action.key_columns.is_empty() {
        return Err("optimiser needs key columns".to_string());
    }
    let mut conditions: Vec<String> = action
        .key_columns
        .iter()
        .map(|k| format!("{}.{}=b.{}", outer, k, k))
        .collect();
    if let Some(r) = &action.restriction {
        if !r.additional_relations.is_empty() {
            return Err("optimiser restrictions cannot refer to other tables".to_string());
        }
        conditions.push(format!("({})", r.render("b", &[])?));
    } else if !action.non_null_columns.is_empty() {
        let nulls: Vec<String> = action
            .non_null_columns
            .iter()
            .map(|c| format!("b.{} is null", c))
            .collect();
        conditions.push(format!("not ({})", nulls.join(" and ")));
    }
    Ok(conditions.join(" and "))
}

/// Parenthesised subquery computing the copied optimiser value.
pub(crate) fn copy_optimiser_value(outer: &str, action: &CopyOptimiser) -> Render {
    let ds = &action.dataset_schema;
    let function = if action.count_not_bool { "sum" } else { "max" };
    let mut sql = format!(
        "(select {}(b.{}) from {}.{} b",
        function, action.from_column, ds, action.from_table
    );
    let linked = match &action.via_table {
        Some(via) => {
            sql.push_str(&format!(
                " inner join {}.{} c on {}",
                ds,
                via,
                join_on("b", &action.from_key_columns, "c", &action.from_key_columns)?
            ));
            "c"
        }
        None => "b",
    };
    sql.push_str(" where ");
    sql.push_str(&join_on(
        outer,
        &action.to_key_columns,
        linked,
        &action.to_key_columns,
    )?);
    sql.push(')');
    Ok(sql)
}
