//! Primary and foreign key edits.
//!
//! Changing a key's columns or marking it incorrect invalidates the relations
//! that use it. Invalidation is one level deep: a relation marked incorrect
//! does not cascade to anything else.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::{MartError, Result};

use super::{ColumnId, ComponentStatus, Key, KeyId, KeyKind, SchemaModel, TableId};

impl SchemaModel {
    /// Install a new primary key on the columns' table.
    ///
    /// A previous primary key with a different column list is destroyed
    /// along with all of its relations. Setting the same columns again
    /// returns the existing key untouched.
    pub fn set_primary_key(&mut self, columns: &[ColumnId]) -> Result<KeyId> {
        let table = self.table_of_columns(columns)?;
        if let Some(old) = self.table_ref(table)?.primary_key {
            if self.key_ref(old)?.columns == columns {
                return Ok(old);
            }
            self.destroy_key(old)?;
        }

        let id = self.insert_key(KeyKind::Primary, table, columns);
        self.table_mut(table)?.primary_key = Some(id);
        Ok(id)
    }

    /// Remove the primary key of a table, if it has one.
    pub fn clear_primary_key(&mut self, table: TableId) -> Result<()> {
        if let Some(pk) = self.table_ref(table)?.primary_key {
            self.destroy_key(pk)?;
        }
        Ok(())
    }

    /// Add a foreign key on the columns' table.
    ///
    /// Fails if the table already has a foreign key over the same ordered
    /// column list.
    pub fn add_foreign_key(&mut self, columns: &[ColumnId]) -> Result<KeyId> {
        let table = self.table_of_columns(columns)?;
        self.check_duplicate_foreign_key(table, columns, None)?;

        let id = self.insert_key(KeyKind::Foreign, table, columns);
        self.table_mut(table)?.foreign_keys.push(id);
        Ok(id)
    }

    /// Replace a key's columns.
    ///
    /// Every relation using the key is invalidated: relations that are
    /// hand-made, or that hang off a hand-made key, are destroyed; the rest
    /// are marked [`ComponentStatus::InferredIncorrect`].
    pub fn set_key_columns(&mut self, key: KeyId, columns: &[ColumnId]) -> Result<()> {
        let (kind, table) = {
            let k = self.key_ref(key)?;
            (k.kind, k.table)
        };
        if !columns.is_empty() {
            let derived = self.table_of_columns(columns)?;
            if derived != table {
                return Err(MartError::Association(format!(
                    "columns of {} must stay on table {}",
                    self.key_name(key)?,
                    self.table_ref(table)?.name
                )));
            }
        }
        if kind == KeyKind::Foreign {
            self.check_duplicate_foreign_key(table, columns, Some(key))?;
        }
        debug!("Changing columns on {}", self.key_name(key)?);

        let old = std::mem::take(&mut self.key_mut(key)?.columns);
        for column in old {
            if let Some(c) = self.columns.get_mut(&column) {
                c.keys.remove(&key);
            }
        }
        self.attach_columns(key, columns);
        self.invalidate_relations(key)
    }

    /// Change a key's status.
    ///
    /// Marking a key [`ComponentStatus::InferredIncorrect`] invalidates its
    /// relations the same way a column change does.
    pub fn set_key_status(&mut self, key: KeyId, status: ComponentStatus) -> Result<()> {
        self.key_mut(key)?.status = status;
        if status == ComponentStatus::InferredIncorrect {
            self.invalidate_relations(key)?;
        }
        Ok(())
    }

    /// Destroy a key, every relation using it, and its slot on the table.
    pub fn destroy_key(&mut self, key: KeyId) -> Result<()> {
        let name = self.key_name(key)?;
        debug!("Dropping key {}", name);

        let relations: Vec<_> = self.key_ref(key)?.relations.iter().copied().collect();
        for relation in relations {
            self.destroy_relation(relation)?;
        }

        let (kind, table, columns) = {
            let k = self.key_ref(key)?;
            (k.kind, k.table, k.columns.clone())
        };
        for column in columns {
            if let Some(c) = self.columns.get_mut(&column) {
                c.keys.remove(&key);
            }
        }

        let t = self.table_mut(table)?;
        match kind {
            KeyKind::Primary if t.primary_key == Some(key) => t.primary_key = None,
            KeyKind::Foreign if t.foreign_keys.contains(&key) => {
                t.foreign_keys.retain(|k| *k != key)
            }
            _ => {
                return Err(MartError::Internal(format!(
                    "{} is not attached to its table",
                    name
                )))
            }
        }

        self.keys.remove(&key);
        Ok(())
    }

    /// Column names of a key, in key order.
    pub fn key_column_names(&self, key: KeyId) -> Result<Vec<String>> {
        self.key_ref(key)?
            .columns
            .iter()
            .map(|c| self.column_ref(*c).map(|c| c.name.clone()))
            .collect()
    }

    /// Display name such as `PK:gene(gene_id)` or `FK:transcript(gene_id)`.
    pub fn key_name(&self, key: KeyId) -> Result<String> {
        let k = self.key_ref(key)?;
        let prefix = match k.kind {
            KeyKind::Primary => "PK",
            KeyKind::Foreign => "FK",
        };
        Ok(format!(
            "{}:{}({})",
            prefix,
            self.table_ref(k.table)?.name,
            self.key_column_names(key)?.join(",")
        ))
    }

    /// Owning table of a column list; all columns must share it.
    fn table_of_columns(&self, columns: &[ColumnId]) -> Result<TableId> {
        let first = columns.first().ok_or_else(|| {
            MartError::Association("a key needs at least one column".to_string())
        })?;
        let table = self.column_ref(*first)?.table;
        for column in &columns[1..] {
            if self.column_ref(*column)?.table != table {
                return Err(MartError::Association(format!(
                    "key columns span more than one table ({} and {})",
                    self.table_ref(table)?.name,
                    self.table_ref(self.column_ref(*column)?.table)?.name
                )));
            }
        }
        Ok(table)
    }

    fn check_duplicate_foreign_key(
        &self,
        table: TableId,
        columns: &[ColumnId],
        except: Option<KeyId>,
    ) -> Result<()> {
        for fk in &self.table_ref(table)?.foreign_keys {
            if Some(*fk) != except && self.key_ref(*fk)?.columns == columns {
                return Err(MartError::Association(format!(
                    "duplicate foreign key {}",
                    self.key_name(*fk)?
                )));
            }
        }
        Ok(())
    }

    fn insert_key(&mut self, kind: KeyKind, table: TableId, columns: &[ColumnId]) -> KeyId {
        let id = KeyId(self.next_id());
        self.keys.insert(
            id,
            Key {
                kind,
                table,
                columns: Vec::new(),
                status: ComponentStatus::Inferred,
                relations: BTreeSet::new(),
            },
        );
        self.attach_columns(id, columns);
        id
    }

    fn attach_columns(&mut self, key: KeyId, columns: &[ColumnId]) {
        for column in columns {
            if let Some(c) = self.columns.get_mut(column) {
                c.keys.insert(key);
            }
        }
        if let Some(k) = self.keys.get_mut(&key) {
            k.columns = columns.to_vec();
        }
    }

    fn invalidate_relations(&mut self, key: KeyId) -> Result<()> {
        let (key_handmade, relations) = {
            let k = self.key_ref(key)?;
            (
                k.status == ComponentStatus::Handmade,
                k.relations.iter().copied().collect::<Vec<_>>(),
            )
        };
        for relation in relations {
            let r = self.relation_ref(relation)?;
            if key_handmade || r.status == ComponentStatus::Handmade {
                warn!("Dropping relation {} after key change", self.relation_name(relation)?);
                self.destroy_relation(relation)?;
            } else {
                self.relation_mut(relation)?.status = ComponentStatus::InferredIncorrect;
            }
        }
        Ok(())
    }
}
