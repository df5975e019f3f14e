//! Deep copies of a schema.
//!
//! The copy is object-distinct from the source, so keys are matched by
//! (table name, key kind, ordered column names) rather than by ID when
//! relations are recreated. Relations that leave the source schema keep
//! pointing at the same external key.

use tracing::{debug, warn};

use crate::error::{MartError, Result};

use super::{ColumnId, KeyId, KeyKind, SchemaId, SchemaModel, TableId};

impl SchemaModel {
    /// Create a new schema holding a structural copy of `schema`.
    pub fn replicate(&mut self, schema: SchemaId, new_name: &str) -> Result<SchemaId> {
        let target = self.add_schema(new_name);
        self.replicate_contents(schema, target)?;
        Ok(target)
    }

    /// Replace everything in `target` with a structural copy of `source`.
    ///
    /// Partitions and the key-guessing flag are copied along with the tables.
    pub fn replicate_contents(&mut self, source: SchemaId, target: SchemaId) -> Result<()> {
        if source == target {
            return Ok(());
        }
        debug!(
            "Replicating {} into {}",
            self.schema_ref(source)?.name,
            self.schema_ref(target)?.name
        );

        let (partitions, key_guessing) = {
            let s = self.schema_ref(source)?;
            (s.partitions.clone(), s.key_guessing)
        };
        let t = self.schema_mut(target)?;
        t.partitions = partitions;
        t.key_guessing = key_guessing;
        self.remove_all_tables(target)?;

        let tables: Vec<TableId> = self.schema_ref(source)?.tables.values().copied().collect();

        // Tables and columns first, so every key can find its columns.
        for table in &tables {
            let (name, columns) = {
                let t = self.table_ref(*table)?;
                (t.name.clone(), t.columns.keys().cloned().collect::<Vec<_>>())
            };
            let copy = self.add_table(target, &name)?;
            for column in columns {
                self.add_column(copy, &column)?;
            }
        }

        for table in &tables {
            let (name, keys) = {
                let t = self.table_ref(*table)?;
                let mut keys: Vec<KeyId> = t.primary_key.into_iter().collect();
                keys.extend(t.foreign_keys.iter().copied());
                (t.name.clone(), keys)
            };
            let copy = self
                .table_by_name(target, &name)
                .ok_or_else(|| MartError::Internal(format!("replica lost table {}", name)))?;

            for key in keys {
                let (kind, status) = {
                    let k = self.key_ref(key)?;
                    (k.kind, k.status)
                };
                let names = self.key_column_names(key)?;
                if names.is_empty() {
                    warn!("Skipping empty key {} during replication", self.key_name(key)?);
                    continue;
                }
                let columns = names
                    .iter()
                    .map(|n| {
                        self.column_by_name(copy, n).ok_or_else(|| {
                            MartError::Internal(format!("replica lost column {}.{}", name, n))
                        })
                    })
                    .collect::<Result<Vec<ColumnId>>>()?;
                let new_key = match kind {
                    KeyKind::Primary => self.set_primary_key(&columns)?,
                    KeyKind::Foreign => self.add_foreign_key(&columns)?,
                };
                self.key_mut(new_key)?.status = status;
            }
        }

        let relations: Vec<_> = self.schema_ref(source)?.relations.iter().copied().collect();
        for relation in relations {
            let (first, second, cardinality, status) = {
                let r = self.relation_ref(relation)?;
                (r.first_key, r.second_key, r.cardinality, r.status)
            };
            let ends = (
                self.resolve_in_replica(first, source, target)?,
                self.resolve_in_replica(second, source, target)?,
            );
            match ends {
                (Some(a), Some(b)) => {
                    let copy = self.link_keys(a, b, cardinality)?;
                    self.relation_mut(copy)?.status = status;
                }
                _ => warn!(
                    "Skipping relation {} during replication: key not found in copy",
                    self.relation_name(relation)?
                ),
            }
        }
        Ok(())
    }

    /// Find the key in `target` that corresponds to `key` in `source`.
    ///
    /// Keys outside `source` are returned unchanged.
    fn resolve_in_replica(
        &self,
        key: KeyId,
        source: SchemaId,
        target: SchemaId,
    ) -> Result<Option<KeyId>> {
        let k = self.key_ref(key)?;
        let t = self.table_ref(k.table)?;
        if t.schema != source {
            return Ok(Some(key));
        }
        let Some(copy) = self.table_by_name(target, &t.name) else {
            return Ok(None);
        };
        let names = self.key_column_names(key)?;
        let copy = self.table_ref(copy)?;
        let candidates = copy.primary_key.into_iter().chain(copy.foreign_keys.iter().copied());
        for candidate in candidates {
            if self.key_ref(candidate)?.kind == k.kind && self.key_column_names(candidate)? == names
            {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}
