//! Relation construction, teardown and index maintenance.

use tracing::debug;

use crate::error::{MartError, Result};

use super::{Cardinality, ComponentStatus, KeyId, KeyKind, Relation, RelationId, SchemaModel};

impl SchemaModel {
    /// Link two keys.
    ///
    /// Fails without modifying anything if the keys differ in column count,
    /// if the same pair is already linked, or if the link would give a
    /// foreign key both a relation to its own table and another relation.
    /// A relation between two primary keys is forced to [`Cardinality::One`].
    pub fn add_relation(
        &mut self,
        first: KeyId,
        second: KeyId,
        cardinality: Cardinality,
    ) -> Result<RelationId> {
        if first == second {
            return Err(MartError::Association(
                "a relation needs two distinct keys".to_string(),
            ));
        }
        let fk = self.key_ref(first)?;
        let sk = self.key_ref(second)?;

        if fk.columns.len() != sk.columns.len() {
            return Err(MartError::Association(format!(
                "key column count mismatch between {} and {}",
                self.key_name(first)?,
                self.key_name(second)?
            )));
        }
        for r in &fk.relations {
            if self.relation_ref(*r)?.links(first, second) {
                return Err(MartError::Association(format!(
                    "relation between {} and {} already exists",
                    self.key_name(first)?,
                    self.key_name(second)?
                )));
            }
        }
        if fk.table == sk.table {
            let busy = |k: &super::Key| k.kind == KeyKind::Foreign && !k.relations.is_empty();
            if busy(fk) || busy(sk) {
                return Err(MartError::Association(format!(
                    "a foreign key may relate to its own table only once and to nothing else ({})",
                    self.key_name(first)?
                )));
            }
        } else if fk.relations.len() == 1 {
            if let Some(existing) = fk.relations.iter().next() {
                let other = self.other_key(*existing, first)?;
                if self.key_ref(other)?.table == fk.table {
                    return Err(MartError::Association(format!(
                        "{} already relates to its own table",
                        self.key_name(first)?
                    )));
                }
            }
        }

        self.link_keys(first, second, cardinality)
    }

    /// Insert a relation and index it, without the construction checks.
    pub(crate) fn link_keys(
        &mut self,
        first: KeyId,
        second: KeyId,
        cardinality: Cardinality,
    ) -> Result<RelationId> {
        let fk = self.key_ref(first)?;
        let sk = self.key_ref(second)?;
        let first_schema = self.table_ref(fk.table)?.schema;
        let second_schema = self.table_ref(sk.table)?.schema;
        let relation = Relation {
            first_key: first,
            second_key: second,
            cardinality: normalize_cardinality(fk.kind, sk.kind, cardinality),
            status: ComponentStatus::Inferred,
            one_to_many_allowed: fk.kind != sk.kind,
            many_to_many_allowed: fk.kind == KeyKind::Foreign && sk.kind == KeyKind::Foreign,
            external: first_schema != second_schema,
        };

        let id = RelationId(self.next_id());
        self.relations.insert(id, relation);
        self.key_mut(first)?.relations.insert(id);
        self.key_mut(second)?.relations.insert(id);
        self.index_relation(id, true)?;
        debug!("Created relation {}", self.relation_name(id)?);
        Ok(id)
    }

    /// Remove a relation from the model.
    pub fn remove_relation(&mut self, relation: RelationId) -> Result<()> {
        self.destroy_relation(relation)
    }

    pub(crate) fn destroy_relation(&mut self, relation: RelationId) -> Result<()> {
        debug!("Dropping relation {}", self.relation_name(relation)?);
        self.index_relation(relation, false)?;
        let (first, second) = {
            let r = self.relation_ref(relation)?;
            (r.first_key, r.second_key)
        };
        self.key_mut(first)?.relations.remove(&relation);
        self.key_mut(second)?.relations.remove(&relation);
        self.relations.remove(&relation);
        Ok(())
    }

    /// Change cardinality; a primary-to-primary relation stays one-to-one.
    pub fn set_relation_cardinality(
        &mut self,
        relation: RelationId,
        cardinality: Cardinality,
    ) -> Result<()> {
        let (first, second) = self.relation_kinds(relation)?;
        self.relation_mut(relation)?.cardinality = normalize_cardinality(first, second, cardinality);
        Ok(())
    }

    /// Change status.
    ///
    /// Any status other than [`ComponentStatus::InferredIncorrect`] requires
    /// both keys to have the same column count.
    pub fn set_relation_status(
        &mut self,
        relation: RelationId,
        status: ComponentStatus,
    ) -> Result<()> {
        if status != ComponentStatus::InferredIncorrect {
            let r = self.relation_ref(relation)?;
            let first = self.key_ref(r.first_key)?.columns.len();
            let second = self.key_ref(r.second_key)?.columns.len();
            if first != second {
                return Err(MartError::Association(format!(
                    "cannot mark {} as {}: key column count mismatch",
                    self.relation_name(relation)?,
                    status
                )));
            }
        }
        self.relation_mut(relation)?.status = status;
        Ok(())
    }

    /// The key at the other end of a relation.
    pub fn other_key(&self, relation: RelationId, key: KeyId) -> Result<KeyId> {
        let r = self.relation_ref(relation)?;
        if r.first_key == key {
            Ok(r.second_key)
        } else if r.second_key == key {
            Ok(r.first_key)
        } else {
            Err(MartError::Internal(format!(
                "{} is not part of {}",
                key, relation
            )))
        }
    }

    pub fn is_one_to_one(&self, relation: RelationId) -> Result<bool> {
        Ok(self.relation_ref(relation)?.cardinality == Cardinality::One)
    }

    /// Many cardinality with a primary key at one end.
    pub fn is_one_to_many(&self, relation: RelationId) -> Result<bool> {
        let (first, second) = self.relation_kinds(relation)?;
        Ok(self.relation_ref(relation)?.cardinality == Cardinality::Many
            && (first == KeyKind::Primary || second == KeyKind::Primary))
    }

    /// Many cardinality between two foreign keys.
    pub fn is_many_to_many(&self, relation: RelationId) -> Result<bool> {
        Ok(self.relation_ref(relation)?.cardinality == Cardinality::Many
            && !self.is_one_to_many(relation)?)
    }

    /// The primary-key end of a one-to-many relation.
    pub fn one_key(&self, relation: RelationId) -> Result<Option<KeyId>> {
        Ok(self.one_many_ends(relation)?.map(|(one, _)| one))
    }

    /// The foreign-key end of a one-to-many relation.
    pub fn many_key(&self, relation: RelationId) -> Result<Option<KeyId>> {
        Ok(self.one_many_ends(relation)?.map(|(_, many)| many))
    }

    /// Display name such as `PK:gene(gene_id) -> FK:transcript(gene_id)`.
    pub fn relation_name(&self, relation: RelationId) -> Result<String> {
        let r = self.relation_ref(relation)?;
        Ok(format!(
            "{} -> {}",
            self.key_name(r.first_key)?,
            self.key_name(r.second_key)?
        ))
    }

    fn one_many_ends(&self, relation: RelationId) -> Result<Option<(KeyId, KeyId)>> {
        if !self.is_one_to_many(relation)? {
            return Ok(None);
        }
        let r = self.relation_ref(relation)?;
        if self.key_ref(r.first_key)?.kind == KeyKind::Primary {
            Ok(Some((r.first_key, r.second_key)))
        } else {
            Ok(Some((r.second_key, r.first_key)))
        }
    }

    fn relation_kinds(&self, relation: RelationId) -> Result<(KeyKind, KeyKind)> {
        let r = self.relation_ref(relation)?;
        Ok((
            self.key_ref(r.first_key)?.kind,
            self.key_ref(r.second_key)?.kind,
        ))
    }

    /// Add a relation to, or remove it from, the table and schema indices
    /// at both ends.
    fn index_relation(&mut self, relation: RelationId, add: bool) -> Result<()> {
        let (external, tables) = {
            let r = self.relation_ref(relation)?;
            let first = self.key_ref(r.first_key)?.table;
            let second = self.key_ref(r.second_key)?.table;
            (r.external, [first, second])
        };
        let schemas = [
            self.table_ref(tables[0])?.schema,
            self.table_ref(tables[1])?.schema,
        ];

        for table in tables {
            let t = self.table_mut(table)?;
            let scoped = if external {
                &mut t.external_relations
            } else {
                &mut t.internal_relations
            };
            if add {
                scoped.insert(relation);
                t.relations.insert(relation);
            } else {
                scoped.remove(&relation);
                t.relations.remove(&relation);
            }
        }
        for schema in schemas {
            let s = self.schema_mut(schema)?;
            let scoped = if external {
                &mut s.external_relations
            } else {
                &mut s.internal_relations
            };
            if add {
                scoped.insert(relation);
                s.relations.insert(relation);
            } else {
                scoped.remove(&relation);
                s.relations.remove(&relation);
            }
        }
        Ok(())
    }
}

fn normalize_cardinality(first: KeyKind, second: KeyKind, requested: Cardinality) -> Cardinality {
    if first == KeyKind::Primary && second == KeyKind::Primary {
        Cardinality::One
    } else {
        requested
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Cardinality, ComponentStatus, KeyId, SchemaId, SchemaModel};
    use crate::error::MartError;

    fn two_tables(model: &mut SchemaModel, schema: SchemaId) -> (KeyId, KeyId) {
        let gene = model.add_table(schema, "gene").unwrap();
        let gid = model.add_column(gene, "gene_id").unwrap();
        let pk = model.set_primary_key(&[gid]).unwrap();
        let tr = model.add_table(schema, "transcript").unwrap();
        let tgid = model.add_column(tr, "gene_id").unwrap();
        let fk = model.add_foreign_key(&[tgid]).unwrap();
        (pk, fk)
    }

    #[test]
    fn test_one_to_many_ends() {
        let mut model = SchemaModel::new();
        let s = model.add_schema("src");
        let (pk, fk) = two_tables(&mut model, s);
        let rel = model.add_relation(fk, pk, Cardinality::Many).unwrap();
        assert!(model.is_one_to_many(rel).unwrap());
        assert!(!model.is_many_to_many(rel).unwrap());
        assert_eq!(model.one_key(rel).unwrap(), Some(pk));
        assert_eq!(model.many_key(rel).unwrap(), Some(fk));
        assert_eq!(model.other_key(rel, pk).unwrap(), fk);
        let r = model.relation(rel).unwrap();
        assert!(r.one_to_many_allowed());
        assert!(!r.many_to_many_allowed());
        assert!(!r.is_external());
    }

    #[test]
    fn test_one_to_one_has_no_many_end() {
        let mut model = SchemaModel::new();
        let s = model.add_schema("src");
        let (pk, fk) = two_tables(&mut model, s);
        let rel = model.add_relation(pk, fk, Cardinality::One).unwrap();
        assert!(model.is_one_to_one(rel).unwrap());
        assert_eq!(model.many_key(rel).unwrap(), None);
    }

    #[test]
    fn test_primary_to_primary_forced_to_one() {
        let mut model = SchemaModel::new();
        let s = model.add_schema("src");
        let a = model.add_table(s, "a").unwrap();
        let ac = model.add_column(a, "id").unwrap();
        let apk = model.set_primary_key(&[ac]).unwrap();
        let b = model.add_table(s, "b").unwrap();
        let bc = model.add_column(b, "id").unwrap();
        let bpk = model.set_primary_key(&[bc]).unwrap();

        let rel = model.add_relation(apk, bpk, Cardinality::Many).unwrap();
        assert_eq!(model.relation(rel).unwrap().cardinality(), Cardinality::One);
        model.set_relation_cardinality(rel, Cardinality::Many).unwrap();
        assert_eq!(model.relation(rel).unwrap().cardinality(), Cardinality::One);
    }

    #[test]
    fn test_many_to_many_between_foreign_keys() {
        let mut model = SchemaModel::new();
        let s = model.add_schema("src");
        let a = model.add_table(s, "a").unwrap();
        let ac = model.add_column(a, "x").unwrap();
        let afk = model.add_foreign_key(&[ac]).unwrap();
        let b = model.add_table(s, "b").unwrap();
        let bc = model.add_column(b, "x").unwrap();
        let bfk = model.add_foreign_key(&[bc]).unwrap();
        let rel = model.add_relation(afk, bfk, Cardinality::Many).unwrap();
        assert!(model.is_many_to_many(rel).unwrap());
        assert!(model.relation(rel).unwrap().many_to_many_allowed());
        assert_eq!(model.one_key(rel).unwrap(), None);
    }

    #[test]
    fn test_column_count_mismatch_rejected() {
        let mut model = SchemaModel::new();
        let s = model.add_schema("src");
        let gene = model.add_table(s, "gene").unwrap();
        let g1 = model.add_column(gene, "a").unwrap();
        let g2 = model.add_column(gene, "b").unwrap();
        let pk = model.set_primary_key(&[g1, g2]).unwrap();
        let tr = model.add_table(s, "transcript").unwrap();
        let t1 = model.add_column(tr, "a").unwrap();
        let fk = model.add_foreign_key(&[t1]).unwrap();

        let err = model.add_relation(pk, fk, Cardinality::Many).unwrap_err();
        assert!(matches!(err, MartError::Association(_)));
        assert_eq!(model.relation_count(), 0);
        assert!(model.key(pk).unwrap().relations().is_empty());
        assert!(model.schema(s).unwrap().relations().is_empty());
    }

    #[test]
    fn test_duplicate_relation_rejected_in_either_order() {
        let mut model = SchemaModel::new();
        let s = model.add_schema("src");
        let (pk, fk) = two_tables(&mut model, s);
        model.add_relation(pk, fk, Cardinality::Many).unwrap();
        assert!(model.add_relation(pk, fk, Cardinality::Many).is_err());
        assert!(model.add_relation(fk, pk, Cardinality::One).is_err());
        assert_eq!(model.relation_count(), 1);
    }

    #[test]
    fn test_self_referencing_foreign_key_only_once() {
        let mut model = SchemaModel::new();
        let s = model.add_schema("src");
        let t = model.add_table(s, "node").unwrap();
        let id = model.add_column(t, "id").unwrap();
        let parent = model.add_column(t, "parent_id").unwrap();
        let pk = model.set_primary_key(&[id]).unwrap();
        let fk = model.add_foreign_key(&[parent]).unwrap();
        model.add_relation(pk, fk, Cardinality::Many).unwrap();

        let other = model.add_table(s, "other").unwrap();
        let oc = model.add_column(other, "id").unwrap();
        let opk = model.set_primary_key(&[oc]).unwrap();
        let err = model.add_relation(fk, opk, Cardinality::Many).unwrap_err();
        assert!(err.to_string().contains("own table"));
    }

    #[test]
    fn test_status_requires_matching_counts() {
        let mut model = SchemaModel::new();
        let s = model.add_schema("src");
        let (pk, fk) = two_tables(&mut model, s);
        let rel = model.add_relation(pk, fk, Cardinality::Many).unwrap();

        let table = model.key(fk).unwrap().table();
        let extra = model.add_column(table, "extra").unwrap();
        let mut cols = model.key(fk).unwrap().columns().to_vec();
        cols.push(extra);
        model.set_key_columns(fk, &cols).unwrap();
        assert_eq!(
            model.relation(rel).unwrap().status(),
            ComponentStatus::InferredIncorrect
        );

        let err = model
            .set_relation_status(rel, ComponentStatus::Handmade)
            .unwrap_err();
        assert!(matches!(err, MartError::Association(_)));
        model
            .set_relation_status(rel, ComponentStatus::InferredIncorrect)
            .unwrap();
    }

    #[test]
    fn test_external_relation_indexed_in_both_schemas() {
        let mut model = SchemaModel::new();
        let core = model.add_schema("core");
        let variation = model.add_schema("variation");
        let gene = model.add_table(core, "gene").unwrap();
        let gid = model.add_column(gene, "gene_id").unwrap();
        let pk = model.set_primary_key(&[gid]).unwrap();
        let var = model.add_table(variation, "variation_feature").unwrap();
        let vgid = model.add_column(var, "gene_id").unwrap();
        let fk = model.add_foreign_key(&[vgid]).unwrap();

        let rel = model.add_relation(pk, fk, Cardinality::Many).unwrap();
        assert!(model.relation(rel).unwrap().is_external());
        for s in [core, variation] {
            let schema = model.schema(s).unwrap();
            assert!(schema.external_relations().contains(&rel));
            assert!(schema.internal_relations().is_empty());
            assert!(schema.relations().contains(&rel));
        }
        assert!(model.table(gene).unwrap().external_relations().contains(&rel));

        model.remove_relation(rel).unwrap();
        for s in [core, variation] {
            assert!(model.schema(s).unwrap().relations().is_empty());
            assert!(model.schema(s).unwrap().external_relations().is_empty());
        }
        assert!(model.table(var).unwrap().relations().is_empty());
    }

    #[test]
    fn test_relation_name() {
        let mut model = SchemaModel::new();
        let s = model.add_schema("src");
        let (pk, fk) = two_tables(&mut model, s);
        let rel = model.add_relation(pk, fk, Cardinality::Many).unwrap();
        assert_eq!(
            model.relation_name(rel).unwrap(),
            "PK:gene(gene_id) -> FK:transcript(gene_id)"
        );
    }
}
