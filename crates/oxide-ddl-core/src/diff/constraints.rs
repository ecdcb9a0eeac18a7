//! In-place alteration of a table: constraints, indexes and the column plan,
//! in execution order.

use std::collections::BTreeMap;

use super::columns::ColumnPlan;
use super::tables::all_indexes;
use super::Differ;
use crate::error::Result;
use crate::resolver::{EntityKind, EntityRef};
use crate::snapshot::{Index, PrimaryKey, Table, Unique};
use crate::squash::SquashedTable;
use crate::statement::{
    AlterPrimaryKeyStatement, CheckStatement, IndexStatement, PrimaryKeyStatement,
    ReferenceStatement, RenameMemberStatement, Statement, UniqueStatement,
};

/// Members present only on one side, or on both with different content.
struct MemberDiff {
    created: Vec<String>,
    deleted: Vec<String>,
    changed: Vec<String>,
}

fn member_diff<V: PartialEq>(old: &BTreeMap<String, V>, new: &BTreeMap<String, V>) -> MemberDiff {
    MemberDiff {
        created: new.keys().filter(|k| !old.contains_key(*k)).cloned().collect(),
        deleted: old.keys().filter(|k| !new.contains_key(*k)).cloned().collect(),
        changed: new
            .iter()
            .filter(|(k, v)| old.get(*k).is_some_and(|o| o != *v))
            .map(|(k, _)| k.clone())
            .collect(),
    }
}

/// Whether two members differ only by name.
fn same_shape<V: Clone + PartialEq>(from: &V, to: &V, rename: impl Fn(&mut V)) -> bool {
    let mut renamed = from.clone();
    rename(&mut renamed);
    renamed == *to
}

impl Differ<'_> {
    /// Emits the in-place alteration of one table.
    #[allow(clippy::too_many_lines, clippy::cognitive_complexity)]
    pub(super) fn apply_alters(
        &mut self,
        prev: &Table,
        next: &Table,
        old: &SquashedTable,
        new: &SquashedTable,
        columns: ColumnPlan,
    ) -> Result<()> {
        let (schema, table) = (next.schema.clone(), next.name.clone());
        let member = |name: &str| EntityRef::member(schema.clone(), table.clone(), name);
        let mut alters = Vec::new();
        let mut renames = Vec::new();
        let mut creates = Vec::new();

        // ---- Foreign keys ----
        let fks = member_diff(&old.foreign_keys, &new.foreign_keys);
        for name in fks.deleted.iter().chain(&fks.changed) {
            if let Some(fk) = prev.foreign_keys.iter().find(|f| f.name == *name) {
                alters.push(Statement::DeleteReference(ReferenceStatement {
                    table: table.clone(),
                    schema: schema.clone(),
                    foreign_key: fk.clone(),
                }));
            }
        }
        for name in fks.created.iter().chain(&fks.changed) {
            if let Some(fk) = next.foreign_keys.iter().find(|f| f.name == *name) {
                creates.push(Statement::CreateReference(ReferenceStatement {
                    table: table.clone(),
                    schema: schema.clone(),
                    foreign_key: fk.clone(),
                }));
            }
        }

        // ---- Unique constraints ----
        if !self.caps.uniques_as_indexes {
            let uniques = member_diff(&old.uniques, &new.uniques);
            let resolution = self.resolve(
                EntityKind::Unique,
                uniques.created.iter().map(|n| member(n)).collect(),
                uniques.deleted.iter().map(|n| member(n)).collect(),
            )?;
            let unique_statement = |unique: &Unique| UniqueStatement {
                table: table.clone(),
                schema: schema.clone(),
                unique: unique.clone(),
            };
            let mut deleted: Vec<&Unique> = resolution
                .deleted
                .iter()
                .map(|r| &r.name)
                .chain(&uniques.changed)
                .filter_map(|n| old.uniques.get(n))
                .collect();
            let mut created: Vec<&Unique> = resolution
                .created
                .iter()
                .map(|r| &r.name)
                .chain(&uniques.changed)
                .filter_map(|n| new.uniques.get(n))
                .collect();

            for rename in &resolution.renamed {
                let (Some(from), Some(to)) = (
                    old.uniques.get(&rename.from.name),
                    new.uniques.get(&rename.to.name),
                ) else {
                    continue;
                };
                let in_place = self.caps.rename.unique
                    && !self.options.legacy_constraint_recreate
                    && same_shape(from, to, |u| u.name.clone_from(&to.name));
                if in_place {
                    renames.push(Statement::RenameUniqueConstraint(RenameMemberStatement {
                        table: table.clone(),
                        schema: schema.clone(),
                        from: from.name.clone(),
                        to: to.name.clone(),
                    }));
                } else {
                    deleted.push(from);
                    created.push(to);
                }
            }
            for unique in deleted {
                alters.push(Statement::DeleteUniqueConstraint(unique_statement(unique)));
            }
            for unique in created {
                creates.push(Statement::CreateUniqueConstraint(unique_statement(unique)));
            }
        }

        // ---- Check constraints ----
        let checks = member_diff(&old.checks, &new.checks);
        for name in checks.deleted.iter().chain(&checks.changed) {
            if let Some(check) = old.checks.get(name) {
                alters.push(Statement::DeleteCheckConstraint(CheckStatement {
                    table: table.clone(),
                    schema: schema.clone(),
                    check: check.clone(),
                }));
            }
        }
        for name in checks.created.iter().chain(&checks.changed) {
            if let Some(check) = next.check_constraints.iter().find(|c| c.name == *name) {
                creates.push(Statement::CreateCheckConstraint(CheckStatement {
                    table: table.clone(),
                    schema: schema.clone(),
                    check: check.clone(),
                }));
            }
        }

        // ---- Indexes ----
        let uniques_as_indexes = self.caps.uniques_as_indexes;
        let comparable = |squashed: &SquashedTable| -> BTreeMap<String, Index> {
            let mut indexes = squashed.indexes.clone();
            if uniques_as_indexes {
                for unique in squashed.uniques.values() {
                    indexes.insert(unique.name.clone(), Index::from_unique(unique));
                }
            }
            indexes
        };
        let raw = |t: &Table| -> BTreeMap<String, Index> {
            all_indexes(t, uniques_as_indexes)
                .into_iter()
                .map(|i| (i.name.clone(), i))
                .collect()
        };
        let (old_indexes, new_indexes) = (comparable(old), comparable(new));
        let (prev_indexes, next_indexes) = (raw(prev), raw(next));
        let indexes = member_diff(&old_indexes, &new_indexes);
        let resolution = self.resolve(
            EntityKind::Index,
            indexes.created.iter().map(|n| member(n)).collect(),
            indexes.deleted.iter().map(|n| member(n)).collect(),
        )?;
        let index_statement = |index: &Index| IndexStatement {
            table: table.clone(),
            schema: schema.clone(),
            index: index.clone(),
        };
        let mut dropped: Vec<String> = resolution
            .deleted
            .iter()
            .map(|r| r.name.clone())
            .chain(indexes.changed.iter().cloned())
            .collect();
        let mut added: Vec<String> = resolution
            .created
            .iter()
            .map(|r| r.name.clone())
            .chain(indexes.changed.iter().cloned())
            .collect();
        for rename in &resolution.renamed {
            let (Some(from), Some(to)) = (
                old_indexes.get(&rename.from.name),
                new_indexes.get(&rename.to.name),
            ) else {
                continue;
            };
            if self.caps.rename.index && same_shape(from, to, |i| i.name.clone_from(&to.name)) {
                renames.push(Statement::RenameIndex(RenameMemberStatement {
                    table: table.clone(),
                    schema: schema.clone(),
                    from: from.name.clone(),
                    to: to.name.clone(),
                }));
            } else {
                dropped.push(from.name.clone());
                added.push(to.name.clone());
            }
        }
        for name in &dropped {
            if let Some(index) = prev_indexes.get(name) {
                alters.push(Statement::DropIndex(index_statement(index)));
            }
        }
        for name in &added {
            if let Some(index) = next_indexes.get(name) {
                creates.push(Statement::CreateIndex(index_statement(index)));
            }
        }

        // ---- Composite primary key ----
        let pk_statement = |pk: &PrimaryKey| PrimaryKeyStatement {
            table: table.clone(),
            schema: schema.clone(),
            primary_key: pk.clone(),
        };
        let mut pk_create = None;
        match (old.primary_keys.values().next(), new.primary_keys.values().next()) {
            (Some(from), Some(to)) if from != to => {
                if from.name == to.name {
                    pk_create = Some(Statement::AlterCompositePk(AlterPrimaryKeyStatement {
                        table: table.clone(),
                        schema: schema.clone(),
                        old: from.clone(),
                        new: to.clone(),
                    }));
                } else {
                    alters.push(Statement::DeleteCompositePk(pk_statement(from)));
                    pk_create = Some(Statement::CreateCompositePk(pk_statement(to)));
                }
            }
            (Some(from), None) => alters.push(Statement::DeleteCompositePk(pk_statement(from))),
            (None, Some(to)) => pk_create = Some(Statement::CreateCompositePk(pk_statement(to))),
            _ => {}
        }

        alters.extend(renames);
        alters.extend(columns.drops);
        alters.extend(columns.adds);
        alters.extend(columns.alters);
        alters.extend(columns.pk_sets);
        alters.extend(pk_create);

        self.out.table_alters.extend(alters);
        self.out.creates.extend(creates);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_diff_splits_sides() {
        let old: BTreeMap<String, i32> = [("a".into(), 1), ("b".into(), 2)].into();
        let new: BTreeMap<String, i32> = [("b".into(), 3), ("c".into(), 4)].into();
        let diff = member_diff(&old, &new);
        assert_eq!(diff.created, vec!["c"]);
        assert_eq!(diff.deleted, vec!["a"]);
        assert_eq!(diff.changed, vec!["b"]);
    }

    #[test]
    fn shape_ignores_name() {
        let from = Index::new("a_idx", ["email"]);
        let to = Index::new("b_idx", ["email"]);
        assert!(same_shape(&from, &to, |i| i.name.clone_from(&to.name)));
        let other = Index::new("b_idx", ["name"]);
        assert!(!same_shape(&from, &other, |i| i.name.clone_from(&other.name)));
    }
}
