//! Structural snapshots of a schema.
//!
//! A [`SchemaShape`] describes a schema by names only, with every list
//! sorted, so two object-distinct schemas with the same structure compare
//! equal. Replication is checked this way.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;

use super::{Cardinality, ComponentStatus, KeyId, KeyKind, SchemaId, SchemaModel};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaShape {
    pub key_guessing: bool,
    pub partitions: BTreeMap<String, String>,
    pub tables: Vec<TableShape>,
    pub relations: Vec<RelationShape>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TableShape {
    pub name: String,
    pub columns: Vec<String>,
    pub primary_key: Option<KeyShape>,
    pub foreign_keys: Vec<KeyShape>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct KeyShape {
    pub columns: Vec<String>,
    pub status: ComponentStatus,
}

/// One end of a relation. `schema` is only set when the key lives outside
/// the schema being described.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct KeyRef {
    pub schema: Option<String>,
    pub table: String,
    pub kind: KeyKind,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RelationShape {
    pub first: KeyRef,
    pub second: KeyRef,
    pub cardinality: Cardinality,
    pub status: ComponentStatus,
}

impl SchemaShape {
    /// Pretty-printed JSON, for logging and diffing snapshots.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl SchemaModel {
    /// Describe a schema structurally.
    pub fn shape(&self, schema: SchemaId) -> Result<SchemaShape> {
        let s = self.schema_ref(schema)?;

        let mut tables = Vec::with_capacity(s.tables.len());
        for table in s.tables.values() {
            let t = self.table_ref(*table)?;
            let primary_key = match t.primary_key {
                Some(pk) => Some(self.key_shape(pk)?),
                None => None,
            };
            let mut foreign_keys = t
                .foreign_keys
                .iter()
                .map(|fk| self.key_shape(*fk))
                .collect::<Result<Vec<_>>>()?;
            foreign_keys.sort();
            tables.push(TableShape {
                name: t.name.clone(),
                columns: t.columns.keys().cloned().collect(),
                primary_key,
                foreign_keys,
            });
        }

        let mut relations = Vec::with_capacity(s.relations.len());
        for relation in &s.relations {
            let r = self.relation_ref(*relation)?;
            relations.push(RelationShape {
                first: self.key_ref_shape(r.first_key, schema)?,
                second: self.key_ref_shape(r.second_key, schema)?,
                cardinality: r.cardinality,
                status: r.status,
            });
        }
        relations.sort();

        Ok(SchemaShape {
            key_guessing: s.key_guessing,
            partitions: s.partitions.clone(),
            tables,
            relations,
        })
    }

    fn key_shape(&self, key: KeyId) -> Result<KeyShape> {
        Ok(KeyShape {
            columns: self.key_column_names(key)?,
            status: self.key_ref(key)?.status,
        })
    }

    fn key_ref_shape(&self, key: KeyId, described: SchemaId) -> Result<KeyRef> {
        let k = self.key_ref(key)?;
        let t = self.table_ref(k.table)?;
        let schema = if t.schema == described {
            None
        } else {
            Some(self.schema_ref(t.schema)?.name.clone())
        };
        Ok(KeyRef {
            schema,
            table: t.name.clone(),
            kind: k.kind,
            columns: self.key_column_names(key)?,
        })
    }
}
