//! Table creation, removal, renames and the per-table alter driver.

use super::entities::{moved, renamed};
use super::{changed_refs, common_keys, relocate, Differ};
use crate::dialect::Support;
use crate::error::Result;
use crate::resolver::{EntityKind, EntityRef};
use crate::snapshot::{meta_key, Index, Policy, Table};
use crate::squash::{squash_table, SquashedTable};
use crate::statement::{
    CreateTableStatement, EntityStatement, IndexStatement, PolicyStatement, ReferenceStatement,
    RenameMemberStatement, Statement, TableStatement,
};

/// Indexes of a table, plus the unique indexes standing in for unique
/// constraints in dialects without them.
pub(super) fn all_indexes(table: &Table, uniques_as_indexes: bool) -> Vec<Index> {
    let mut indexes = table.indexes.clone();
    if uniques_as_indexes {
        indexes.extend(table.unique_constraints.iter().map(Index::from_unique));
    }
    indexes
}

impl Differ<'_> {
    pub(super) fn tables(&mut self) -> Result<()> {
        let (created, deleted) = changed_refs(&self.prev.tables, &self.next.tables, |t| {
            EntityRef::new(t.schema.clone(), t.name.clone())
        });
        let resolution = self.resolve(EntityKind::Table, created, deleted)?;

        for rename in &resolution.renamed {
            self.check_rename(self.caps.rename.table, EntityKind::Table, rename)?;
            self.out.tables.extend(renamed(
                rename,
                Statement::AlterTableSetSchema,
                Statement::RenameTable,
            ));
            self.relocate_table(&rename.from, &rename.to);
        }
        for m in &resolution.moved {
            self.out.tables.push(moved(m, Statement::AlterTableSetSchema));
            self.relocate_table(&m.from_ref(), &m.to_ref());
        }
        for created in &resolution.created {
            self.create_table(created);
        }
        self.drop_tables(&resolution.deleted);
        for key in common_keys(&self.prev.tables, &self.next.tables) {
            self.rename_columns(&key)?;
        }
        Ok(())
    }

    /// Moves a table of the working copy and retargets foreign keys at it.
    fn relocate_table(&mut self, from: &EntityRef, to: &EntityRef) {
        relocate(&mut self.prev.tables, self.dialect, from, to);
        for table in self.prev.tables.values_mut() {
            for fk in &mut table.foreign_keys {
                if fk.schema_to == from.schema && fk.table_to == from.name {
                    fk.schema_to.clone_from(&to.schema);
                    fk.table_to.clone_from(&to.name);
                }
            }
        }
        let key = self.key(&to.schema, &to.name);
        self.table_origins
            .entry(key)
            .or_insert_with(|| from.clone());
        self.meta.tables.insert(
            meta_key(&[&from.schema, &from.name]),
            meta_key(&[&to.schema, &to.name]),
        );
    }

    fn create_table(&mut self, created: &EntityRef) {
        let key = self.key(&created.schema, &created.name);
        let Some(table) = self.next.tables.get(&key).cloned() else {
            return;
        };
        let (schema, name) = (table.schema.clone(), table.name.clone());

        self.out
            .tables
            .push(Statement::CreateTable(CreateTableStatement {
                table: table.clone(),
            }));
        if table.is_rls_enabled && self.caps.policies {
            self.out.tables.push(Statement::EnableRls(TableStatement {
                table: name.clone(),
                schema: schema.clone(),
            }));
        }

        if !self.caps.inline_foreign_keys {
            for fk in &table.foreign_keys {
                self.out
                    .creates
                    .push(Statement::CreateReference(ReferenceStatement {
                        table: name.clone(),
                        schema: schema.clone(),
                        foreign_key: fk.clone(),
                    }));
            }
        }
        for index in all_indexes(&table, self.caps.uniques_as_indexes) {
            self.out.creates.push(Statement::CreateIndex(IndexStatement {
                table: name.clone(),
                schema: schema.clone(),
                index,
            }));
        }
        for policy in &table.policies {
            self.out.creates.push(Statement::CreatePolicy(PolicyStatement {
                table: name.clone(),
                schema: schema.clone(),
                policy: policy.clone(),
            }));
        }

        // Later phases see the new table as already in place.
        self.prev.tables.insert(key, table);
    }

    /// Drops tables so that every table goes before the tables it
    /// references. Within a cycle the references on the first table are
    /// deleted before it is dropped.
    fn drop_tables(&mut self, deleted: &[EntityRef]) {
        let mut remaining: Vec<String> = deleted
            .iter()
            .map(|d| self.key(&d.schema, &d.name))
            .filter(|key| self.prev.tables.contains_key(key))
            .collect();

        while !remaining.is_empty() {
            let referenced = |key: &String| {
                remaining
                    .iter()
                    .any(|other| other != key && self.references(other).contains(key))
            };
            let free = remaining.iter().position(|key| !referenced(key));
            if let Some(pos) = free {
                let key = remaining.remove(pos);
                self.drop_table(&key);
                continue;
            }
            let key = remaining.remove(0);
            self.break_references(&key, &remaining);
            self.drop_table(&key);
        }
    }

    /// Keys of the tables a table of the working copy references.
    fn references(&self, key: &str) -> Vec<String> {
        self.prev
            .tables
            .get(key)
            .into_iter()
            .flat_map(|t| &t.foreign_keys)
            .map(|fk| self.key(&fk.schema_to, &fk.table_to))
            .collect()
    }

    /// Deletes the references that tables still to be dropped hold on a
    /// table.
    fn break_references(&mut self, key: &str, remaining: &[String]) {
        if !matches!(
            self.caps.alter.foreign_keys,
            Support::InPlace | Support::DropAndAdd
        ) {
            return;
        }
        let mut deletes = Vec::new();
        for table in remaining.iter().filter_map(|other| self.prev.tables.get(other)) {
            for fk in &table.foreign_keys {
                if self.key(&fk.schema_to, &fk.table_to) == key {
                    deletes.push(Statement::DeleteReference(ReferenceStatement {
                        table: table.name.clone(),
                        schema: table.schema.clone(),
                        foreign_key: fk.clone(),
                    }));
                }
            }
        }
        self.out.table_drops.extend(deletes);
    }

    fn drop_table(&mut self, key: &str) {
        let Some(table) = self.prev.tables.get(key) else {
            return;
        };
        if !self.caps.drop_table_drops_indexes {
            for index in all_indexes(table, self.caps.uniques_as_indexes) {
                self.out.table_drops.push(Statement::DropIndex(IndexStatement {
                    table: table.name.clone(),
                    schema: table.schema.clone(),
                    index,
                }));
            }
        }
        self.out.table_drops.push(Statement::DropTable(EntityStatement {
            name: table.name.clone(),
            schema: table.schema.clone(),
        }));
    }

    /// Resolves column renames of one table present on both sides.
    fn rename_columns(&mut self, key: &str) -> Result<()> {
        let (Some(prev), Some(next)) = (self.prev.tables.get(key), self.next.tables.get(key)) else {
            return Ok(());
        };
        let (schema, table) = (next.schema.clone(), next.name.clone());
        let member = |name: &str| EntityRef::member(schema.clone(), table.clone(), name);
        let created = next
            .columns
            .values()
            .filter(|c| prev.get_column(&c.name).is_none())
            .map(|c| member(&c.name))
            .collect();
        let deleted = prev
            .columns
            .values()
            .filter(|c| next.get_column(&c.name).is_none())
            .map(|c| member(&c.name))
            .collect();
        let resolution = self.resolve(EntityKind::Column, created, deleted)?;

        for rename in &resolution.renamed {
            self.check_rename(self.caps.rename.column, EntityKind::Column, rename)?;
            let (from, to) = (rename.from.name.as_str(), rename.to.name.as_str());
            self.out
                .tables
                .push(Statement::AlterTableRenameColumn(RenameMemberStatement {
                    table: table.clone(),
                    schema: schema.clone(),
                    from: from.to_string(),
                    to: to.to_string(),
                }));

            if let Some(working) = self.prev.tables.get_mut(key) {
                working.rename_column(from, to);
            }
            for other in self.prev.tables.values_mut() {
                for fk in &mut other.foreign_keys {
                    if fk.schema_to == schema && fk.table_to == table {
                        for column in fk.columns_to.iter_mut().filter(|c| *c == from) {
                            *column = to.to_string();
                        }
                    }
                }
            }
            self.meta.columns.insert(
                meta_key(&[&schema, &table, from]),
                meta_key(&[&schema, &table, to]),
            );
        }
        Ok(())
    }

    // ========================================================================
    // Alters
    // ========================================================================

    /// Diffs every table present on both sides.
    pub(super) fn alter_tables(&mut self) -> Result<()> {
        for key in common_keys(&self.prev.tables, &self.next.tables) {
            let (Some(prev), Some(next)) = (
                self.prev.tables.get(&key).cloned(),
                self.next.tables.get(&key).cloned(),
            ) else {
                continue;
            };
            let old = squash_table(self.dialect, &prev, self.options.mode);
            let new = squash_table(self.dialect, &next, self.options.mode);
            if old == new {
                continue;
            }

            let columns = self.plan_columns(&prev, &next, &old, &new)?;
            let reason = match columns.recreate.clone() {
                Some(reason) => Some(reason),
                None => self.constraint_recreate_reason(&old, &new)?,
            };
            match reason {
                Some(reason) => self.recreate_table(&prev, &next, reason),
                None => self.apply_alters(&prev, &next, &old, &new, columns)?,
            }
            self.policies(&key, &old, &new)?;
        }
        Ok(())
    }

    /// Checks foreign key, check and composite primary key changes against
    /// the dialect. Returns why the table must be rebuilt, if it must.
    fn constraint_recreate_reason(
        &self,
        old: &SquashedTable,
        new: &SquashedTable,
    ) -> Result<Option<String>> {
        let changes = [
            (
                old.foreign_keys != new.foreign_keys,
                self.caps.alter.foreign_keys,
                "foreign keys",
            ),
            (
                old.checks != new.checks,
                self.caps.alter.checks,
                "check constraints",
            ),
            (
                old.primary_keys != new.primary_keys,
                self.caps.alter.composite_primary_key,
                "the composite primary key",
            ),
        ];
        let mut reason = None;
        for (changed, support, what) in changes {
            if !changed {
                continue;
            }
            let what = format!("changing {what} of table {}", new.name);
            match support {
                Support::InPlace | Support::DropAndAdd => {}
                Support::Recreate => {
                    reason.get_or_insert(what);
                }
                Support::Unsupported => return Err(self.unsupported(what)),
            }
        }
        Ok(reason)
    }

    // ========================================================================
    // Policies
    // ========================================================================

    fn policies(&mut self, key: &str, old: &SquashedTable, new: &SquashedTable) -> Result<()> {
        let (schema, table) = (new.schema.clone(), new.name.clone());
        // Policy drops run before table renames, against the original name.
        let (origin_schema, origin_table) = self
            .table_origins
            .get(key)
            .map_or_else(
                || (schema.clone(), table.clone()),
                |o| (o.schema.clone(), o.name.clone()),
            );
        let statement = |policy: &Policy| PolicyStatement {
            table: table.clone(),
            schema: schema.clone(),
            policy: policy.clone(),
        };
        let dropped = |policy: &Policy| {
            Statement::DropPolicy(PolicyStatement {
                table: origin_table.clone(),
                schema: origin_schema.clone(),
                policy: policy.clone(),
            })
        };

        let member = |name: &str| EntityRef::member(schema.clone(), table.clone(), name);
        let created = new
            .policies
            .keys()
            .filter(|n| !old.policies.contains_key(*n))
            .map(|n| member(n))
            .collect();
        let deleted = old
            .policies
            .keys()
            .filter(|n| !new.policies.contains_key(*n))
            .map(|n| member(n))
            .collect();
        let resolution = self.resolve(EntityKind::Policy, created, deleted)?;

        for rename in &resolution.renamed {
            let (Some(from), Some(to)) = (
                old.policies.get(&rename.from.name),
                new.policies.get(&rename.to.name),
            ) else {
                continue;
            };
            if from.kind != to.kind || from.command != to.command || !self.caps.rename.policy {
                self.out.pre_drops.push(dropped(from));
                self.out.creates.push(Statement::CreatePolicy(statement(to)));
                continue;
            }
            self.out
                .table_alters
                .push(Statement::RenamePolicy(RenameMemberStatement {
                    table: table.clone(),
                    schema: schema.clone(),
                    from: from.name.clone(),
                    to: to.name.clone(),
                }));
            let renamed_policy = Policy {
                name: to.name.clone(),
                ..from.clone()
            };
            if &renamed_policy != to {
                self.out.creates.push(Statement::AlterPolicy(statement(to)));
            }
        }
        for created in &resolution.created {
            if let Some(policy) = new.policies.get(&created.name) {
                self.out.creates.push(Statement::CreatePolicy(statement(policy)));
            }
        }
        for deleted in &resolution.deleted {
            if let Some(policy) = old.policies.get(&deleted.name) {
                self.out.pre_drops.push(dropped(policy));
            }
        }
        for (name, to) in &new.policies {
            let Some(from) = old.policies.get(name) else {
                continue;
            };
            if from == to {
                continue;
            }
            if from.kind != to.kind || from.command != to.command {
                self.out.pre_drops.push(dropped(from));
                self.out.creates.push(Statement::CreatePolicy(statement(to)));
            } else {
                self.out.creates.push(Statement::AlterPolicy(statement(to)));
            }
        }
        self.toggle_rls(old, new);
        Ok(())
    }

    fn toggle_rls(&mut self, old: &SquashedTable, new: &SquashedTable) {
        if old.is_rls_enabled == new.is_rls_enabled {
            return;
        }
        let toggle = TableStatement {
            table: new.name.clone(),
            schema: new.schema.clone(),
        };
        self.out.creates.push(if new.is_rls_enabled {
            Statement::EnableRls(toggle)
        } else {
            Statement::DisableRls(toggle)
        });
    }
}
