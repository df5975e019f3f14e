//! Relational metamodel of schemas, tables, columns, keys and relations.
//!
//! All entities live in arenas owned by a single [`SchemaModel`] and refer to
//! each other by generated IDs. Destroying an entity removes its arena entry
//! and sweeps the indices that pointed at it, so there are no dangling
//! references and no reference cycles to break.
//!
//! The model keeps these invariants under any sequence of edits:
//!
//! - a key's columns all belong to the key's table
//! - both keys of a relation have the same column count unless the relation
//!   is marked [`ComponentStatus::InferredIncorrect`]
//! - a relation between two primary keys is always one-to-one
//! - table-level and schema-level relation indices (all / internal /
//!   external) always agree with the relation arena
//!
//! Edits that would break an invariant fail with
//! [`MartError::Association`](crate::error::MartError::Association) before
//! anything is modified. Cascading teardowns always work from a snapshot of
//! dependent IDs.
//!
//! # Example
//!
//! ```rust
//! use mart_builder::core::schema::{Cardinality, SchemaModel};
//!
//! let mut model = SchemaModel::new();
//! let src = model.add_schema("src");
//! let gene = model.add_table(src, "gene")?;
//! let gene_id = model.add_column(gene, "gene_id")?;
//! let pk = model.set_primary_key(&[gene_id])?;
//!
//! let transcript = model.add_table(src, "transcript")?;
//! let fk_col = model.add_column(transcript, "gene_id")?;
//! let fk = model.add_foreign_key(&[fk_col])?;
//!
//! let rel = model.add_relation(pk, fk, Cardinality::Many)?;
//! assert!(model.is_one_to_many(rel)?);
//! # Ok::<(), mart_builder::MartError>(())
//! ```

#[cfg(test)]
mod edit_sequences;
mod key;
mod relation;
mod replicate;
mod shape;
mod table;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MartError, Result};

pub use shape::{KeyRef, KeyShape, RelationShape, SchemaShape, TableShape};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }
    };
}

arena_id!(
    /// Identifies a schema inside a [`SchemaModel`].
    SchemaId,
    "schema"
);
arena_id!(
    /// Identifies a table inside a [`SchemaModel`].
    TableId,
    "table"
);
arena_id!(
    /// Identifies a column inside a [`SchemaModel`].
    ColumnId,
    "column"
);
arena_id!(
    /// Identifies a primary or foreign key inside a [`SchemaModel`].
    KeyId,
    "key"
);
arena_id!(
    /// Identifies a relation inside a [`SchemaModel`].
    RelationId,
    "relation"
);

/// Provenance of a key or relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentStatus {
    /// Discovered from database metadata or by key guessing.
    Inferred,
    /// Was inferred, but no longer matches the structure it describes.
    InferredIncorrect,
    /// Created or confirmed by a user.
    Handmade,
}

/// Cardinality of the foreign-key end of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

/// Key subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Primary,
    Foreign,
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComponentStatus::Inferred => "INFERRED",
            ComponentStatus::InferredIncorrect => "INFERRED_INCORRECT",
            ComponentStatus::Handmade => "HANDMADE",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::One => f.write_str("1"),
            Cardinality::Many => f.write_str("M"),
        }
    }
}

/// A named group of tables, usually mirroring one source database schema.
#[derive(Debug, Clone)]
pub struct Schema {
    pub(crate) name: String,
    pub(crate) tables: BTreeMap<String, TableId>,
    pub(crate) relations: BTreeSet<RelationId>,
    pub(crate) internal_relations: BTreeSet<RelationId>,
    pub(crate) external_relations: BTreeSet<RelationId>,
    pub(crate) key_guessing: bool,
    pub(crate) partitions: BTreeMap<String, String>,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tables keyed by name.
    pub fn tables(&self) -> &BTreeMap<String, TableId> {
        &self.tables
    }

    pub fn relations(&self) -> &BTreeSet<RelationId> {
        &self.relations
    }

    /// Relations whose keys both live in this schema.
    pub fn internal_relations(&self) -> &BTreeSet<RelationId> {
        &self.internal_relations
    }

    /// Relations linking a table of this schema to another schema.
    pub fn external_relations(&self) -> &BTreeSet<RelationId> {
        &self.external_relations
    }

    pub fn key_guessing(&self) -> bool {
        self.key_guessing
    }

    /// Physical partitions sharing this schema's structure, catalog name to prefix.
    pub fn partitions(&self) -> &BTreeMap<String, String> {
        &self.partitions
    }
}

/// A table and its derived relation indices.
#[derive(Debug, Clone)]
pub struct Table {
    pub(crate) name: String,
    pub(crate) schema: SchemaId,
    pub(crate) columns: BTreeMap<String, ColumnId>,
    pub(crate) primary_key: Option<KeyId>,
    pub(crate) foreign_keys: Vec<KeyId>,
    pub(crate) relations: BTreeSet<RelationId>,
    pub(crate) internal_relations: BTreeSet<RelationId>,
    pub(crate) external_relations: BTreeSet<RelationId>,
}

impl Table {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> SchemaId {
        self.schema
    }

    /// Columns keyed by name.
    pub fn columns(&self) -> &BTreeMap<String, ColumnId> {
        &self.columns
    }

    pub fn primary_key(&self) -> Option<KeyId> {
        self.primary_key
    }

    /// Foreign keys in creation order.
    pub fn foreign_keys(&self) -> &[KeyId] {
        &self.foreign_keys
    }

    pub fn relations(&self) -> &BTreeSet<RelationId> {
        &self.relations
    }

    pub fn internal_relations(&self) -> &BTreeSet<RelationId> {
        &self.internal_relations
    }

    pub fn external_relations(&self) -> &BTreeSet<RelationId> {
        &self.external_relations
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub(crate) name: String,
    pub(crate) table: TableId,
    pub(crate) keys: BTreeSet<KeyId>,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> TableId {
        self.table
    }

    /// Keys this column participates in (back-references only).
    pub fn keys(&self) -> &BTreeSet<KeyId> {
        &self.keys
    }
}

/// A primary or foreign key: an ordered column list on one table.
#[derive(Debug, Clone)]
pub struct Key {
    pub(crate) kind: KeyKind,
    pub(crate) table: TableId,
    pub(crate) columns: Vec<ColumnId>,
    pub(crate) status: ComponentStatus,
    pub(crate) relations: BTreeSet<RelationId>,
}

impl Key {
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn table(&self) -> TableId {
        self.table
    }

    /// Columns in key order. Position matters: the n-th column of one key
    /// pairs with the n-th column of the other key in a relation.
    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    pub fn count_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn status(&self) -> ComponentStatus {
        self.status
    }

    pub fn relations(&self) -> &BTreeSet<RelationId> {
        &self.relations
    }
}

/// A link between two keys.
#[derive(Debug, Clone)]
pub struct Relation {
    pub(crate) first_key: KeyId,
    pub(crate) second_key: KeyId,
    pub(crate) cardinality: Cardinality,
    pub(crate) status: ComponentStatus,
    pub(crate) one_to_many_allowed: bool,
    pub(crate) many_to_many_allowed: bool,
    pub(crate) external: bool,
}

impl Relation {
    pub fn first_key(&self) -> KeyId {
        self.first_key
    }

    pub fn second_key(&self) -> KeyId {
        self.second_key
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn status(&self) -> ComponentStatus {
        self.status
    }

    /// Whether the two ends are of different key subtypes.
    pub fn one_to_many_allowed(&self) -> bool {
        self.one_to_many_allowed
    }

    /// Whether both ends are foreign keys.
    pub fn many_to_many_allowed(&self) -> bool {
        self.many_to_many_allowed
    }

    /// Whether the keys' tables belong to different schemas.
    pub fn is_external(&self) -> bool {
        self.external
    }

    /// Whether this relation links the given pair of keys, in either order.
    pub fn links(&self, a: KeyId, b: KeyId) -> bool {
        (self.first_key == a && self.second_key == b)
            || (self.first_key == b && self.second_key == a)
    }
}

/// Arena holding every schema, table, column, key and relation.
///
/// The model has no internal locking; it assumes one writer per edit session.
#[derive(Debug, Clone, Default)]
pub struct SchemaModel {
    schemas: BTreeMap<SchemaId, Schema>,
    tables: BTreeMap<TableId, Table>,
    columns: BTreeMap<ColumnId, Column>,
    keys: BTreeMap<KeyId, Key>,
    relations: BTreeMap<RelationId, Relation>,
    next_id: u32,
}

impl SchemaModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Add an empty schema.
    pub fn add_schema(&mut self, name: impl Into<String>) -> SchemaId {
        let id = SchemaId(self.next_id());
        self.schemas.insert(
            id,
            Schema {
                name: name.into(),
                tables: BTreeMap::new(),
                relations: BTreeSet::new(),
                internal_relations: BTreeSet::new(),
                external_relations: BTreeSet::new(),
                key_guessing: false,
                partitions: BTreeMap::new(),
            },
        );
        id
    }

    pub fn schema(&self, id: SchemaId) -> Option<&Schema> {
        self.schemas.get(&id)
    }

    /// Find a schema by name.
    pub fn schema_by_name(&self, name: &str) -> Option<SchemaId> {
        self.schemas
            .iter()
            .find(|(_, s)| s.name == name)
            .map(|(id, _)| *id)
    }

    pub fn schema_ids(&self) -> impl Iterator<Item = SchemaId> + '_ {
        self.schemas.keys().copied()
    }

    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(&id)
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.get(&id)
    }

    pub fn key(&self, id: KeyId) -> Option<&Key> {
        self.keys.get(&id)
    }

    pub fn relation(&self, id: RelationId) -> Option<&Relation> {
        self.relations.get(&id)
    }

    /// Number of live relations across all schemas.
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn set_key_guessing(&mut self, schema: SchemaId, enabled: bool) -> Result<()> {
        self.schema_mut(schema)?.key_guessing = enabled;
        Ok(())
    }

    /// Register a physical partition (catalog name) and the prefix its tables get.
    pub fn add_partition(
        &mut self,
        schema: SchemaId,
        catalog: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Result<()> {
        self.schema_mut(schema)?
            .partitions
            .insert(catalog.into(), prefix.into());
        Ok(())
    }

    /// Forget a partition; returns whether it was registered.
    pub fn remove_partition(&mut self, schema: SchemaId, catalog: &str) -> Result<bool> {
        Ok(self.schema_mut(schema)?.partitions.remove(catalog).is_some())
    }

    pub(crate) fn schema_ref(&self, id: SchemaId) -> Result<&Schema> {
        self.schemas
            .get(&id)
            .ok_or_else(|| MartError::Internal(format!("unknown {}", id)))
    }

    pub(crate) fn schema_mut(&mut self, id: SchemaId) -> Result<&mut Schema> {
        self.schemas
            .get_mut(&id)
            .ok_or_else(|| MartError::Internal(format!("unknown {}", id)))
    }

    pub(crate) fn table_ref(&self, id: TableId) -> Result<&Table> {
        self.tables
            .get(&id)
            .ok_or_else(|| MartError::Internal(format!("unknown {}", id)))
    }

    pub(crate) fn table_mut(&mut self, id: TableId) -> Result<&mut Table> {
        self.tables
            .get_mut(&id)
            .ok_or_else(|| MartError::Internal(format!("unknown {}", id)))
    }

    pub(crate) fn column_ref(&self, id: ColumnId) -> Result<&Column> {
        self.columns
            .get(&id)
            .ok_or_else(|| MartError::Internal(format!("unknown {}", id)))
    }

    pub(crate) fn key_ref(&self, id: KeyId) -> Result<&Key> {
        self.keys
            .get(&id)
            .ok_or_else(|| MartError::Internal(format!("unknown {}", id)))
    }

    pub(crate) fn key_mut(&mut self, id: KeyId) -> Result<&mut Key> {
        self.keys
            .get_mut(&id)
            .ok_or_else(|| MartError::Internal(format!("unknown {}", id)))
    }

    pub(crate) fn relation_ref(&self, id: RelationId) -> Result<&Relation> {
        self.relations
            .get(&id)
            .ok_or_else(|| MartError::Internal(format!("unknown {}", id)))
    }

    pub(crate) fn relation_mut(&mut self, id: RelationId) -> Result<&mut Relation> {
        self.relations
            .get_mut(&id)
            .ok_or_else(|| MartError::Internal(format!("unknown {}", id)))
    }
}
