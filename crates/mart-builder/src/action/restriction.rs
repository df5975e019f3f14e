//! Restriction and partition predicates carried by actions.
//!
//! Expressions refer to columns through `:alias` placeholders. Rendering an
//! expression replaces each placeholder with `<table alias>.<column>`, where
//! the table alias is chosen by the dialect at translation time (`a`, `b`,
//! or `f`, `g`, ... for additional relations).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Rewrite every `:name` placeholder for which `lookup` returns a value.
///
/// Placeholders inside single-quoted literals and the second colon of a
/// PostgreSQL `::` cast are left alone.
pub fn substitute(expression: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let chars: Vec<char> = expression.chars().collect();
    let mut out = String::with_capacity(expression.len());
    let mut in_literal = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            in_literal = !in_literal;
            out.push(c);
            i += 1;
            continue;
        }
        let after_colon = i > 0 && chars[i - 1] == ':';
        if c == ':' && !in_literal && !after_colon {
            let start = i + 1;
            let mut end = start;
            while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
                end += 1;
            }
            if end > start {
                let token: String = chars[start..end].iter().collect();
                if let Some(replacement) = lookup(&token) {
                    out.push_str(&replacement);
                    i = end;
                    continue;
                }
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Most additional relations one restriction may carry. Their table aliases
/// run from `f` to `y`.
pub const MAX_ADDITIONAL_RELATIONS: usize = 20;

/// A placeholder in a table restriction and the column it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionAlias {
    pub alias: String,
    pub column: String,
    /// Index into [`TableRestriction::additional_relations`] when the column
    /// lives on a table other than the restricted one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<usize>,
}

/// A table outside the two being joined that a restriction reaches through
/// a relation. Rendered as an extra inner join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalRelation {
    /// Table holding the one end of the relation.
    pub table: String,
    /// Columns on the restricted table (the many end), in key order.
    pub many_columns: Vec<String>,
    /// Columns on `table` (the one end), paired positionally.
    pub one_columns: Vec<String>,
}

/// Filter on the rows of a single table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRestriction {
    pub expression: String,
    #[serde(default)]
    pub aliases: Vec<RestrictionAlias>,
    /// A hard restriction drops unmatched rows, forcing an inner join.
    #[serde(default)]
    pub hard: bool,
    #[serde(default)]
    pub additional_relations: Vec<AdditionalRelation>,
}

impl TableRestriction {
    /// Soft restriction with no aliases.
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            aliases: Vec::new(),
            hard: false,
            additional_relations: Vec::new(),
        }
    }

    pub fn hard(mut self) -> Self {
        self.hard = true;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>, column: impl Into<String>) -> Self {
        self.aliases.push(RestrictionAlias {
            alias: alias.into(),
            column: column.into(),
            relation: None,
        });
        self
    }

    /// Alias a column on an additional relation's table.
    pub fn with_relation_alias(
        mut self,
        alias: impl Into<String>,
        column: impl Into<String>,
        relation: usize,
    ) -> Self {
        self.aliases.push(RestrictionAlias {
            alias: alias.into(),
            column: column.into(),
            relation: Some(relation),
        });
        self
    }

    pub fn with_relation(mut self, relation: AdditionalRelation) -> Self {
        self.additional_relations.push(relation);
        self
    }

    /// Table aliases for the additional relations: `f`, `g`, `h`, ...
    ///
    /// Fails when there are more than [`MAX_ADDITIONAL_RELATIONS`].
    pub fn relation_aliases(&self) -> std::result::Result<Vec<String>, String> {
        let count = self.additional_relations.len();
        if count > MAX_ADDITIONAL_RELATIONS {
            return Err(format!(
                "too many additional relations in restriction ({}, at most {})",
                count, MAX_ADDITIONAL_RELATIONS
            ));
        }
        Ok((b'f'..)
            .take(count)
            .map(|c| char::from(c).to_string())
            .collect())
    }

    /// Render against `prefix` for the restricted table and `relation_prefixes`
    /// for the additional relations.
    ///
    /// Fails if an alias points at an additional relation that does not exist.
    pub fn render(
        &self,
        prefix: &str,
        relation_prefixes: &[String],
    ) -> std::result::Result<String, String> {
        if self.additional_relations.len() > MAX_ADDITIONAL_RELATIONS {
            return Err("too many additional relations in restriction".to_string());
        }
        let mut lookup = BTreeMap::new();
        for alias in &self.aliases {
            let table = match alias.relation {
                None => prefix,
                Some(i) => relation_prefixes.get(i).map(String::as_str).ok_or_else(|| {
                    format!(
                        "restriction alias :{} refers to missing relation {}",
                        alias.alias, i
                    )
                })?,
            };
            lookup.insert(alias.alias.as_str(), format!("{}.{}", table, alias.column));
        }
        Ok(substitute(&self.expression, |token| lookup.get(token).cloned()))
    }
}

/// Filter on the pair of tables a relation links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRestriction {
    pub expression: String,
    /// Placeholders for columns of the relation's first table.
    #[serde(default)]
    pub left_aliases: BTreeMap<String, String>,
    /// Placeholders for columns of the relation's second table.
    #[serde(default)]
    pub right_aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub hard: bool,
}

impl RelationRestriction {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            left_aliases: BTreeMap::new(),
            right_aliases: BTreeMap::new(),
            hard: false,
        }
    }

    pub fn hard(mut self) -> Self {
        self.hard = true;
        self
    }

    pub fn with_left_alias(mut self, alias: impl Into<String>, column: impl Into<String>) -> Self {
        self.left_aliases.insert(alias.into(), column.into());
        self
    }

    pub fn with_right_alias(mut self, alias: impl Into<String>, column: impl Into<String>) -> Self {
        self.right_aliases.insert(alias.into(), column.into());
        self
    }

    /// Render with `left_prefix` for left aliases and `right_prefix` for right ones.
    pub fn render(&self, left_prefix: &str, right_prefix: &str) -> String {
        substitute(&self.expression, |token| {
            if let Some(column) = self.left_aliases.get(token) {
                Some(format!("{}.{}", left_prefix, column))
            } else {
                self.right_aliases
                    .get(token)
                    .map(|column| format!("{}.{}", right_prefix, column))
            }
        })
    }
}

/// Restricts a select or join to one partition of the source data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartitionFilter {
    /// One value of a list partition; `None` selects NULLs.
    Value {
        column: String,
        value: Option<String>,
    },
    /// One range of a range partition. The expression refers to the
    /// partition column as `:<column>`.
    Range { column: String, expression: String },
}

impl PartitionFilter {
    pub fn column(&self) -> &str {
        match self {
            PartitionFilter::Value { column, .. } | PartitionFilter::Range { column, .. } => column,
        }
    }

    /// Render against a table alias, escaping list values as literals.
    pub fn render(&self, prefix: &str) -> String {
        match self {
            PartitionFilter::Value {
                column,
                value: Some(v),
            } => format!(
                "{}.{}={}",
                prefix,
                column,
                crate::core::identifier::quote_literal(v)
            ),
            PartitionFilter::Value { column, value: None } => {
                format!("{}.{} is null", prefix, column)
            }
            PartitionFilter::Range { column, expression } => substitute(expression, |token| {
                (token == column).then(|| format!("{}.{}", prefix, column))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_basic() {
        let out = substitute(":a > 5 and :b is not null", |t| match t {
            "a" => Some("x.col_a".to_string()),
            "b" => Some("x.col_b".to_string()),
            _ => None,
        });
        assert_eq!(out, "x.col_a > 5 and x.col_b is not null");
    }

    #[test]
    fn test_substitute_does_not_match_prefixes() {
        let out = substitute(":ab = :a", |t| (t == "a").then(|| "x.a".to_string()));
        assert_eq!(out, ":ab = x.a");
    }

    #[test]
    fn test_substitute_skips_literals_and_casts() {
        let out = substitute("':a' = :a::text", |t| (t == "a" || t == "text").then(|| "b.c".to_string()));
        assert_eq!(out, "':a' = b.c::text");
    }

    #[test]
    fn test_table_restriction_render() {
        let r = TableRestriction::new(":status = 'KNOWN'").with_alias("status", "gene_status");
        assert_eq!(r.render("b", &[]).unwrap(), "b.gene_status = 'KNOWN'");
        assert!(!r.hard);
    }

    #[test]
    fn test_table_restriction_additional_relation_aliases() {
        let r = TableRestriction::new(":biotype = 'protein_coding' and :name like 'BRCA%'")
            .with_alias("biotype", "biotype")
            .with_relation_alias("name", "display_label", 0)
            .with_relation(AdditionalRelation {
                table: "xref".into(),
                many_columns: vec!["display_xref_id".into()],
                one_columns: vec!["xref_id".into()],
            });
        let prefixes = r.relation_aliases().unwrap();
        assert_eq!(prefixes, vec!["f".to_string()]);
        assert_eq!(
            r.render("a", &prefixes).unwrap(),
            "a.biotype = 'protein_coding' and f.display_label like 'BRCA%'"
        );
    }

    fn xref_relations(count: usize) -> TableRestriction {
        (0..count).fold(TableRestriction::new(":x = 1"), |r, i| {
            r.with_relation(AdditionalRelation {
                table: format!("xref_{}", i),
                many_columns: vec!["xref_id".into()],
                one_columns: vec!["xref_id".into()],
            })
        })
    }

    #[test]
    fn test_relation_aliases_up_to_limit() {
        let aliases = xref_relations(MAX_ADDITIONAL_RELATIONS).relation_aliases().unwrap();
        assert_eq!(aliases.len(), MAX_ADDITIONAL_RELATIONS);
        assert_eq!(aliases.first().map(String::as_str), Some("f"));
        assert_eq!(aliases.last().map(String::as_str), Some("y"));
    }

    #[test]
    fn test_relation_aliases_over_limit_is_error() {
        for count in [MAX_ADDITIONAL_RELATIONS + 1, 160, 300] {
            let err = xref_relations(count).relation_aliases().unwrap_err();
            assert!(err.contains("too many additional relations"), "{}", err);
        }
    }

    #[test]
    fn test_table_restriction_missing_relation_is_error() {
        let r = TableRestriction::new(":x = 1").with_relation_alias("x", "x", 2);
        let err = r.render("a", &[]).unwrap_err();
        assert!(err.contains("missing relation 2"));
    }

    #[test]
    fn test_relation_restriction_render() {
        let r = RelationRestriction::new(":l_start <= :r_end")
            .with_left_alias("l_start", "seq_start")
            .with_right_alias("r_end", "seq_end");
        assert_eq!(r.render("a", "b"), "a.seq_start <= b.seq_end");
        assert_eq!(r.render("b", "a"), "b.seq_start <= a.seq_end");
    }

    #[test]
    fn test_partition_value() {
        let p = PartitionFilter::Value {
            column: "species".into(),
            value: Some("homo_sapiens".into()),
        };
        assert_eq!(p.render("b"), "b.species='homo_sapiens'");
        let null = PartitionFilter::Value {
            column: "species".into(),
            value: None,
        };
        assert_eq!(null.render("a"), "a.species is null");
    }

    #[test]
    fn test_partition_value_escapes_quotes() {
        let p = PartitionFilter::Value {
            column: "name".into(),
            value: Some("o'hara".into()),
        };
        assert_eq!(p.render("a"), "a.name='o''hara'");
    }

    #[test]
    fn test_partition_range() {
        let p = PartitionFilter::Range {
            column: "chr_start".into(),
            expression: ":chr_start >= 1000 and :chr_start < 2000".into(),
        };
        assert_eq!(p.render("a"), "a.chr_start >= 1000 and a.chr_start < 2000");
        assert_eq!(p.column(), "chr_start");
    }
}
