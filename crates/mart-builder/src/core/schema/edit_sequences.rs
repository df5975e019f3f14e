//! Random edit sequences checked against the model's structural invariants.
//!
//! Every step must leave the arenas and the derived indices in agreement,
//! and a failed edit must leave the model exactly as it was.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use super::{
    Cardinality, ColumnId, ComponentStatus, KeyId, KeyKind, RelationId, SchemaId, SchemaModel,
    TableId,
};
use crate::error::Result;

const TABLE_NAMES: [&str; 4] = ["gene", "transcript", "xref", "gene_main"];
const COLUMN_NAMES: [&str; 5] = ["gene_id", "name", "id_key", "seq_region_id", "biotype"];
const STATUSES: [ComponentStatus; 3] = [
    ComponentStatus::Inferred,
    ComponentStatus::InferredIncorrect,
    ComponentStatus::Handmade,
];
const MAX_SCHEMAS: usize = 5;

/// One model edit. Entity fields index into the live entities of that kind,
/// modulo their count.
#[derive(Debug, Clone)]
enum Edit {
    AddTable { schema: u8, name: u8 },
    RenameTable { table: u8, name: u8 },
    RemoveTable { table: u8 },
    AddColumn { table: u8, name: u8 },
    RemoveColumn { column: u8 },
    SetPrimaryKey { table: u8, width: u8, offset: u8 },
    ClearPrimaryKey { table: u8 },
    AddForeignKey { table: u8, width: u8, offset: u8 },
    SetKeyColumns { key: u8, width: u8, offset: u8, any_table: bool },
    SetKeyStatus { key: u8, status: u8 },
    DestroyKey { key: u8 },
    AddRelation { first: u8, second: u8, many: bool },
    RemoveRelation { relation: u8 },
    SetRelationCardinality { relation: u8, many: bool },
    SetRelationStatus { relation: u8, status: u8 },
    Replicate { source: u8, target: u8 },
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        2 => (any::<u8>(), any::<u8>()).prop_map(|(schema, name)| Edit::AddTable { schema, name }),
        1 => (any::<u8>(), any::<u8>()).prop_map(|(table, name)| Edit::RenameTable { table, name }),
        1 => any::<u8>().prop_map(|table| Edit::RemoveTable { table }),
        4 => (any::<u8>(), any::<u8>()).prop_map(|(table, name)| Edit::AddColumn { table, name }),
        1 => any::<u8>().prop_map(|column| Edit::RemoveColumn { column }),
        3 => (any::<u8>(), any::<u8>(), any::<u8>())
            .prop_map(|(table, width, offset)| Edit::SetPrimaryKey { table, width, offset }),
        1 => any::<u8>().prop_map(|table| Edit::ClearPrimaryKey { table }),
        3 => (any::<u8>(), any::<u8>(), any::<u8>())
            .prop_map(|(table, width, offset)| Edit::AddForeignKey { table, width, offset }),
        2 => (any::<u8>(), any::<u8>(), any::<u8>(), any::<bool>()).prop_map(
            |(key, width, offset, any_table)| Edit::SetKeyColumns { key, width, offset, any_table }
        ),
        1 => (any::<u8>(), any::<u8>()).prop_map(|(key, status)| Edit::SetKeyStatus { key, status }),
        1 => any::<u8>().prop_map(|key| Edit::DestroyKey { key }),
        5 => (any::<u8>(), any::<u8>(), any::<bool>())
            .prop_map(|(first, second, many)| Edit::AddRelation { first, second, many }),
        1 => any::<u8>().prop_map(|relation| Edit::RemoveRelation { relation }),
        1 => (any::<u8>(), any::<bool>())
            .prop_map(|(relation, many)| Edit::SetRelationCardinality { relation, many }),
        2 => (any::<u8>(), any::<u8>())
            .prop_map(|(relation, status)| Edit::SetRelationStatus { relation, status }),
        1 => (any::<u8>(), any::<u8>()).prop_map(|(source, target)| Edit::Replicate { source, target }),
    ]
}

fn pick<T: Copy>(items: &[T], index: u8) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[usize::from(index) % items.len()])
    }
}

/// Up to three consecutive columns, wrapping around. Width 0 gives an empty list.
fn window(columns: &[ColumnId], width: u8, offset: u8) -> Vec<ColumnId> {
    if columns.is_empty() {
        return Vec::new();
    }
    let width = (usize::from(width) % 4).min(columns.len());
    (0..width)
        .map(|i| columns[(usize::from(offset) + i) % columns.len()])
        .collect()
}

fn cardinality(many: bool) -> Cardinality {
    if many {
        Cardinality::Many
    } else {
        Cardinality::One
    }
}

fn table_columns(model: &SchemaModel, table: TableId) -> Vec<ColumnId> {
    model
        .tables
        .get(&table)
        .map(|t| t.columns.values().copied().collect())
        .unwrap_or_default()
}

/// Apply an edit. `None` means there was nothing to apply it to.
fn apply(model: &mut SchemaModel, edit: &Edit) -> Option<Result<()>> {
    let schemas: Vec<SchemaId> = model.schemas.keys().copied().collect();
    let tables: Vec<TableId> = model.tables.keys().copied().collect();
    let columns: Vec<ColumnId> = model.columns.keys().copied().collect();
    let keys: Vec<KeyId> = model.keys.keys().copied().collect();
    let relations: Vec<RelationId> = model.relations.keys().copied().collect();
    let table_name = |i: u8| TABLE_NAMES[usize::from(i) % TABLE_NAMES.len()];
    let status = |i: u8| STATUSES[usize::from(i) % STATUSES.len()];

    let result = match *edit {
        Edit::AddTable { schema, name } => {
            model.add_table(pick(&schemas, schema)?, table_name(name)).map(drop)
        }
        Edit::RenameTable { table, name } => {
            model.rename_table(pick(&tables, table)?, table_name(name)).map(drop)
        }
        Edit::RemoveTable { table } => model.remove_table(pick(&tables, table)?),
        Edit::AddColumn { table, name } => {
            let name = COLUMN_NAMES[usize::from(name) % COLUMN_NAMES.len()];
            model.add_column(pick(&tables, table)?, name).map(drop)
        }
        Edit::RemoveColumn { column } => model.remove_column(pick(&columns, column)?),
        Edit::SetPrimaryKey { table, width, offset } => {
            let cols = window(&table_columns(model, pick(&tables, table)?), width, offset);
            model.set_primary_key(&cols).map(drop)
        }
        Edit::ClearPrimaryKey { table } => model.clear_primary_key(pick(&tables, table)?),
        Edit::AddForeignKey { table, width, offset } => {
            let cols = window(&table_columns(model, pick(&tables, table)?), width, offset);
            model.add_foreign_key(&cols).map(drop)
        }
        Edit::SetKeyColumns { key, width, offset, any_table } => {
            let key = pick(&keys, key)?;
            let cols = if any_table {
                window(&columns, width, offset)
            } else {
                window(&table_columns(model, model.keys[&key].table), width, offset)
            };
            model.set_key_columns(key, &cols)
        }
        Edit::SetKeyStatus { key, status: s } => model.set_key_status(pick(&keys, key)?, status(s)),
        Edit::DestroyKey { key } => model.destroy_key(pick(&keys, key)?),
        Edit::AddRelation { first, second, many } => model
            .add_relation(pick(&keys, first)?, pick(&keys, second)?, cardinality(many))
            .map(drop),
        Edit::RemoveRelation { relation } => model.remove_relation(pick(&relations, relation)?),
        Edit::SetRelationCardinality { relation, many } => {
            model.set_relation_cardinality(pick(&relations, relation)?, cardinality(many))
        }
        Edit::SetRelationStatus { relation, status: s } => {
            model.set_relation_status(pick(&relations, relation)?, status(s))
        }
        Edit::Replicate { source, target } => {
            let source = pick(&schemas, source)?;
            if schemas.len() < MAX_SCHEMAS {
                model
                    .replicate(source, &format!("copy_{}", schemas.len()))
                    .map(drop)
            } else {
                model.replicate_contents(source, pick(&schemas, target)?)
            }
        }
    };
    Some(result)
}

/// Relation IDs expected in the all / internal / external indices.
type RelationIndex = [BTreeSet<RelationId>; 3];

/// Every way the model disagrees with itself.
fn violations(model: &SchemaModel) -> Vec<String> {
    let mut found = Vec::new();

    for (sid, schema) in &model.schemas {
        for (name, tid) in &schema.tables {
            if !model
                .tables
                .get(tid)
                .is_some_and(|t| t.schema == *sid && t.name == *name)
            {
                found.push(format!("{} lists stale table {} as {}", sid, tid, name));
            }
        }
    }

    for (tid, table) in &model.tables {
        let listed = model
            .schemas
            .get(&table.schema)
            .and_then(|s| s.tables.get(&table.name));
        if listed != Some(tid) {
            found.push(format!("{} missing from its schema", tid));
        }
        for (name, cid) in &table.columns {
            if !model
                .columns
                .get(cid)
                .is_some_and(|c| c.table == *tid && c.name == *name)
            {
                found.push(format!("{} lists stale column {} as {}", tid, cid, name));
            }
        }
        let owned = |kid: &KeyId, kind: KeyKind| {
            model
                .keys
                .get(kid)
                .is_some_and(|k| k.kind == kind && k.table == *tid)
        };
        if let Some(pk) = &table.primary_key {
            if !owned(pk, KeyKind::Primary) {
                found.push(format!("{} has stale primary key {}", tid, pk));
            }
        }
        for fk in &table.foreign_keys {
            if !owned(fk, KeyKind::Foreign) {
                found.push(format!("{} has stale foreign key {}", tid, fk));
            }
        }
    }

    for (cid, column) in &model.columns {
        let listed = model
            .tables
            .get(&column.table)
            .and_then(|t| t.columns.get(&column.name));
        if listed != Some(cid) {
            found.push(format!("{} missing from its table", cid));
        }
        for kid in &column.keys {
            if !model.keys.get(kid).is_some_and(|k| k.columns.contains(cid)) {
                found.push(format!("{} points back at unrelated key {}", cid, kid));
            }
        }
    }

    for (kid, key) in &model.keys {
        let attached = model.tables.get(&key.table).is_some_and(|t| match key.kind {
            KeyKind::Primary => t.primary_key == Some(*kid),
            KeyKind::Foreign => t.foreign_keys.contains(kid),
        });
        if !attached {
            found.push(format!("{} not attached to its table", kid));
        }
        for cid in &key.columns {
            if !model
                .columns
                .get(cid)
                .is_some_and(|c| c.table == key.table && c.keys.contains(kid))
            {
                found.push(format!("{} uses foreign or stale column {}", kid, cid));
            }
        }
        for rid in &key.relations {
            if !model
                .relations
                .get(rid)
                .is_some_and(|r| r.first_key == *kid || r.second_key == *kid)
            {
                found.push(format!("{} lists stale relation {}", kid, rid));
            }
        }
    }

    let mut table_index: BTreeMap<TableId, RelationIndex> = BTreeMap::new();
    let mut schema_index: BTreeMap<SchemaId, RelationIndex> = BTreeMap::new();
    for (rid, relation) in &model.relations {
        let (Some(first), Some(second)) = (
            model.keys.get(&relation.first_key),
            model.keys.get(&relation.second_key),
        ) else {
            found.push(format!("{} has a dangling key", rid));
            continue;
        };
        if !first.relations.contains(rid) || !second.relations.contains(rid) {
            found.push(format!("{} missing from a key's relations", rid));
        }
        if first.columns.len() != second.columns.len()
            && relation.status != ComponentStatus::InferredIncorrect
        {
            found.push(format!(
                "{} links keys of different width with status {}",
                rid, relation.status
            ));
        }
        if first.kind == KeyKind::Primary
            && second.kind == KeyKind::Primary
            && relation.cardinality != Cardinality::One
        {
            found.push(format!("{} between primary keys is not one-to-one", rid));
        }
        let (Some(first_schema), Some(second_schema)) = (
            model.tables.get(&first.table).map(|t| t.schema),
            model.tables.get(&second.table).map(|t| t.schema),
        ) else {
            found.push(format!("{} has a key on a missing table", rid));
            continue;
        };
        if relation.external != (first_schema != second_schema) {
            found.push(format!("{} has the wrong external flag", rid));
        }

        let scope = if relation.external { 2 } else { 1 };
        for table in [first.table, second.table] {
            let index = table_index.entry(table).or_default();
            index[0].insert(*rid);
            index[scope].insert(*rid);
        }
        for schema in [first_schema, second_schema] {
            let index = schema_index.entry(schema).or_default();
            index[0].insert(*rid);
            index[scope].insert(*rid);
        }
    }

    for (tid, table) in &model.tables {
        let expected = table_index.remove(tid).unwrap_or_default();
        let actual = [
            &table.relations,
            &table.internal_relations,
            &table.external_relations,
        ];
        if actual != [&expected[0], &expected[1], &expected[2]] {
            found.push(format!("{} relation indices out of sync", tid));
        }
    }
    for (sid, schema) in &model.schemas {
        let expected = schema_index.remove(sid).unwrap_or_default();
        let actual = [
            &schema.relations,
            &schema.internal_relations,
            &schema.external_relations,
        ];
        if actual != [&expected[0], &expected[1], &expected[2]] {
            found.push(format!("{} relation indices out of sync", sid));
        }
    }

    found
}

/// Two schemas with a gene/transcript relation and one external table.
fn seeded_model() -> SchemaModel {
    let mut model = SchemaModel::new();
    let src = model.add_schema("src");
    let ext = model.add_schema("ext");

    let gene = model.add_table(src, "gene").unwrap();
    let gene_id = model.add_column(gene, "gene_id").unwrap();
    model.add_column(gene, "name").unwrap();
    let gene_pk = model.set_primary_key(&[gene_id]).unwrap();

    let transcript = model.add_table(src, "transcript").unwrap();
    let transcript_id = model.add_column(transcript, "transcript_id").unwrap();
    let fk_col = model.add_column(transcript, "gene_id").unwrap();
    model.set_primary_key(&[transcript_id]).unwrap();
    let fk = model.add_foreign_key(&[fk_col]).unwrap();
    model.add_relation(gene_pk, fk, Cardinality::Many).unwrap();

    let xref = model.add_table(ext, "xref").unwrap();
    let xref_id = model.add_column(xref, "xref_id").unwrap();
    model.set_primary_key(&[xref_id]).unwrap();
    model
}

#[test]
fn test_seeded_model_is_consistent() {
    assert_eq!(violations(&seeded_model()), Vec::<String>::new());
}

#[test]
fn test_violations_detects_stale_index() {
    let mut model = seeded_model();
    let gene = model.tables.keys().copied().next().unwrap();
    model
        .tables
        .get_mut(&gene)
        .unwrap()
        .internal_relations
        .clear();
    assert!(!violations(&model).is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_edit_sequences_keep_model_consistent(
        edits in prop::collection::vec(edit_strategy(), 1..150)
    ) {
        let mut model = seeded_model();
        for edit in &edits {
            let before = format!("{:?}", model);
            if let Some(Err(e)) = apply(&mut model, edit) {
                prop_assert!(!e.is_fatal(), "{:?} failed with {}", edit, e);
                if !matches!(edit, Edit::Replicate { .. }) {
                    prop_assert_eq!(&before, &format!("{:?}", model), "{:?} changed the model before failing", edit);
                }
            }
            let found = violations(&model);
            prop_assert!(found.is_empty(), "after {:?}: {:?}", edit, found);
        }
    }
}
