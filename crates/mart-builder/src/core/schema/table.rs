//! Table and column edits, including cascading teardown.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::Result;

use super::{Column, ColumnId, SchemaId, SchemaModel, Table, TableId};

/// Column names ending in this suffix keep it last when made unique.
pub const KEY_SUFFIX: &str = "_key";

/// Pick `name`, or `name_1`, `name_2`, ... until `taken` says it is free.
fn unique_name(name: &str, suffix: &str, taken: impl Fn(&str) -> bool) -> String {
    let base = &name[..name.len() - suffix.len()];
    let mut candidate = name.to_string();
    let mut i = 1;
    while taken(&candidate) {
        candidate = format!("{}_{}{}", base, i, suffix);
        i += 1;
    }
    candidate
}

impl SchemaModel {
    /// Add an empty table; the name gets a numeric suffix if already taken.
    pub fn add_table(&mut self, schema: SchemaId, name: &str) -> Result<TableId> {
        let tables = &self.schema_ref(schema)?.tables;
        let name = unique_name(name, "", |n| tables.contains_key(n));

        let id = TableId(self.next_id());
        self.tables.insert(
            id,
            Table {
                name: name.clone(),
                schema,
                columns: BTreeMap::new(),
                primary_key: None,
                foreign_keys: Vec::new(),
                relations: BTreeSet::new(),
                internal_relations: BTreeSet::new(),
                external_relations: BTreeSet::new(),
            },
        );
        self.schema_mut(schema)?.tables.insert(name, id);
        Ok(id)
    }

    pub fn table_by_name(&self, schema: SchemaId, name: &str) -> Option<TableId> {
        self.schemas.get(&schema)?.tables.get(name).copied()
    }

    /// Rename a table, suffixing the new name if needed. Returns the name used.
    pub fn rename_table(&mut self, table: TableId, name: &str) -> Result<String> {
        let (schema, old) = {
            let t = self.table_ref(table)?;
            (t.schema, t.name.clone())
        };
        if old == name {
            return Ok(old);
        }
        let tables = &self.schema_ref(schema)?.tables;
        let name = unique_name(name, "", |n| tables.contains_key(n));

        let s = self.schema_mut(schema)?;
        s.tables.remove(&old);
        s.tables.insert(name.clone(), table);
        self.table_mut(table)?.name = name.clone();
        Ok(name)
    }

    /// Destroy a table: its columns, every key on them and every relation
    /// on those keys go with it.
    pub fn remove_table(&mut self, table: TableId) -> Result<()> {
        let (schema, name, columns, keys) = {
            let t = self.table_ref(table)?;
            let mut keys: Vec<_> = t.foreign_keys.clone();
            keys.extend(t.primary_key);
            (
                t.schema,
                t.name.clone(),
                t.columns.values().copied().collect::<Vec<_>>(),
                keys,
            )
        };
        debug!("Dropping table {}", name);

        for column in columns {
            self.remove_column(column)?;
        }
        // Keys with no columns are not reachable through any column.
        for key in keys {
            if self.keys.contains_key(&key) {
                self.destroy_key(key)?;
            }
        }

        self.schema_mut(schema)?.tables.remove(&name);
        self.tables.remove(&table);
        Ok(())
    }

    /// Remove a table by name; returns whether a table was removed.
    pub fn remove_table_by_name(&mut self, schema: SchemaId, name: &str) -> Result<bool> {
        match self.table_by_name(schema, name) {
            Some(table) => {
                self.remove_table(table)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove every table in a schema.
    pub fn remove_all_tables(&mut self, schema: SchemaId) -> Result<()> {
        let tables: Vec<_> = self.schema_ref(schema)?.tables.values().copied().collect();
        for table in tables {
            self.remove_table(table)?;
        }
        Ok(())
    }

    /// Add a column; the name gets a numeric suffix if already taken.
    ///
    /// The suffix goes before a trailing `_key`, so `id_key` becomes
    /// `id_1_key` rather than `id_key_1`.
    pub fn add_column(&mut self, table: TableId, name: &str) -> Result<ColumnId> {
        let columns = &self.table_ref(table)?.columns;
        let suffix = if name.ends_with(KEY_SUFFIX) && name.len() > KEY_SUFFIX.len() {
            KEY_SUFFIX
        } else {
            ""
        };
        let name = unique_name(name, suffix, |n| columns.contains_key(n));

        let id = ColumnId(self.next_id());
        self.columns.insert(
            id,
            Column {
                name: name.clone(),
                table,
                keys: BTreeSet::new(),
            },
        );
        self.table_mut(table)?.columns.insert(name, id);
        Ok(id)
    }

    pub fn column_by_name(&self, table: TableId, name: &str) -> Option<ColumnId> {
        self.tables.get(&table)?.columns.get(name).copied()
    }

    /// Destroy a column and every key that contains it.
    pub fn remove_column(&mut self, column: ColumnId) -> Result<()> {
        let (table, name, keys) = {
            let c = self.column_ref(column)?;
            (c.table, c.name.clone(), c.keys.iter().copied().collect::<Vec<_>>())
        };
        for key in keys {
            if self.keys.contains_key(&key) {
                self.destroy_key(key)?;
            }
        }
        self.table_mut(table)?.columns.remove(&name);
        self.columns.remove(&column);
        Ok(())
    }

    /// Column names of a table, sorted.
    pub fn column_names(&self, table: TableId) -> Result<Vec<String>> {
        Ok(self.table_ref(table)?.columns.keys().cloned().collect())
    }

    /// `schema.table` for display and logging.
    pub fn qualified_table_name(&self, table: TableId) -> Result<String> {
        let t = self.table_ref(table)?;
        let s = self.schema_ref(t.schema)?;
        Ok(format!("{}.{}", s.name, t.name))
    }
}
