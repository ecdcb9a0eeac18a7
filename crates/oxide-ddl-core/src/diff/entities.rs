//! Namespaces and the standalone entities tables depend on.

use std::collections::BTreeMap;

use tracing::debug;

use super::{changed_refs, common_keys, rekeyed, relocate, Differ};
use crate::dialect::EnumSupport;
use crate::error::Result;
use crate::resolver::{EntityKind, EntityRef, Move, Rename};
use crate::snapshot::{meta_key, Check, Function, Snapshot};
use crate::squash::squash;
use crate::statement::{
    AddEnumValueStatement, AlterColumnStatement, AlterDomainStatement, CreateEnumStatement,
    CreateFunctionStatement, DomainAction, DomainStatement, EntityStatement,
    FunctionStatement, MoveFunctionStatement, MoveStatement, RenameFunctionStatement,
    RenameSchemaStatement, RenameStatement, SchemaStatement, SequenceStatement,
    SetColumnTypeStatement, Statement,
};

/// Statements for a rename, preceded by a move when the namespace changes.
pub(super) fn renamed(
    rename: &Rename,
    move_to: fn(MoveStatement) -> Statement,
    rename_to: fn(RenameStatement) -> Statement,
) -> Vec<Statement> {
    let (from, to) = (&rename.from, &rename.to);
    let mut out = Vec::new();
    if from.schema != to.schema {
        out.push(move_to(MoveStatement {
            name: from.name.clone(),
            schema_from: from.schema.clone(),
            schema_to: to.schema.clone(),
        }));
    }
    if from.name != to.name {
        out.push(rename_to(RenameStatement {
            schema: to.schema.clone(),
            name_from: from.name.clone(),
            name_to: to.name.clone(),
        }));
    }
    out
}

pub(super) fn moved(m: &Move, move_to: fn(MoveStatement) -> Statement) -> Statement {
    move_to(MoveStatement {
        name: m.name.clone(),
        schema_from: m.schema_from.clone(),
        schema_to: m.schema_to.clone(),
    })
}

/// Values added to an enum, each with the existing value it goes before
/// (empty to append). `None` when old values were removed or reordered.
pub(super) fn added_values(old: &[String], new: &[String]) -> Option<Vec<(String, String)>> {
    let kept: Vec<&String> = new.iter().filter(|v| old.contains(v)).collect();
    if kept.len() != old.len() || kept.iter().zip(old).any(|(k, o)| *k != o) {
        return None;
    }
    let added = new
        .iter()
        .enumerate()
        .filter(|(_, v)| !old.contains(v))
        .map(|(i, v)| {
            let before = new[i + 1..]
                .iter()
                .find(|later| old.contains(later))
                .cloned()
                .unwrap_or_default();
            (v.clone(), before)
        })
        .collect();
    Some(added)
}

impl Differ<'_> {
    pub(super) fn check_rename(
        &self,
        allowed: bool,
        kind: EntityKind,
        rename: &Rename,
    ) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(self.unsupported(format!(
                "renaming {kind} {} to {}",
                rename.from, rename.to
            )))
        }
    }

    // ========================================================================
    // Schemas
    // ========================================================================

    pub(super) fn schemas(&mut self) -> Result<()> {
        let created = self
            .next
            .schemas
            .iter()
            .filter(|s| !self.prev.schemas.contains(s))
            .map(|s| EntityRef::new("", s.clone()))
            .collect();
        let deleted = self
            .prev
            .schemas
            .iter()
            .filter(|s| !self.next.schemas.contains(s))
            .map(|s| EntityRef::new("", s.clone()))
            .collect();
        let resolution = self.resolve(EntityKind::Schema, created, deleted)?;

        for rename in &resolution.renamed {
            self.check_rename(self.caps.rename.schema, EntityKind::Schema, rename)?;
            let (from, to) = (rename.from.name.clone(), rename.to.name.clone());
            self.out
                .schemas
                .push(Statement::RenameSchema(RenameSchemaStatement {
                    from: from.clone(),
                    to: to.clone(),
                }));
            self.rename_schema(&from, &to);
            self.meta
                .schemas
                .insert(meta_key(&[&from]), meta_key(&[&to]));
        }
        for schema in resolution.created {
            self.out
                .schemas
                .push(Statement::CreateSchema(SchemaStatement { name: schema.name }));
        }
        for schema in resolution.deleted {
            self.out
                .schema_drops
                .push(Statement::DropSchema(SchemaStatement { name: schema.name }));
        }
        Ok(())
    }

    /// Moves every entity of the working copy from one namespace to another.
    fn rename_schema(&mut self, from: &str, to: &str) {
        let swap = |schema: &mut String| {
            if schema == from {
                *schema = to.to_string();
            }
        };
        let prev = &mut self.prev;
        for schema in &mut prev.schemas {
            swap(schema);
        }
        for table in prev.tables.values_mut() {
            swap(&mut table.schema);
            for fk in &mut table.foreign_keys {
                swap(&mut fk.schema_to);
            }
            for column in table.columns.values_mut() {
                if let Some(schema) = column.type_schema.as_mut() {
                    swap(schema);
                }
            }
        }
        prev.enums.values_mut().for_each(|e| swap(&mut e.schema));
        prev.sequences.values_mut().for_each(|s| swap(&mut s.schema));
        prev.views.values_mut().for_each(|v| swap(&mut v.schema));
        prev.domains.values_mut().for_each(|d| swap(&mut d.schema));
        prev.functions.values_mut().for_each(|f| swap(&mut f.schema));

        let working = std::mem::replace(&mut self.prev, Snapshot::empty(self.dialect));
        self.prev = rekeyed(working);
    }

    /// Points columns typed with a renamed or moved user type at its new
    /// identity.
    fn retype_columns(&mut self, from: &EntityRef, to: &EntityRef) {
        for table in self.prev.tables.values_mut() {
            for column in table.columns.values_mut() {
                if column.references_type(&from.schema, &from.name) {
                    let suffix = column.sql_type[column.base_type().len()..].to_string();
                    column.sql_type = format!("{}{suffix}", to.name);
                    column.type_schema = Some(to.schema.clone());
                }
            }
        }
    }

    // ========================================================================
    // Enums
    // ========================================================================

    pub(super) fn enums(&mut self) -> Result<()> {
        let (created, deleted) = changed_refs(&self.prev.enums, &self.next.enums, |e| {
            EntityRef::new(e.schema.clone(), e.name.clone())
        });
        let resolution = self.resolve(EntityKind::Enum, created, deleted)?;

        for m in &resolution.moved {
            self.out.types.push(moved(m, Statement::MoveTypeEnum));
            self.retype_columns(&m.from_ref(), &m.to_ref());
            relocate(&mut self.prev.enums, self.dialect, &m.from_ref(), &m.to_ref());
        }
        for rename in &resolution.renamed {
            self.check_rename(self.caps.rename.enum_type, EntityKind::Enum, rename)?;
            self.out.types.extend(renamed(
                rename,
                Statement::MoveTypeEnum,
                Statement::RenameTypeEnum,
            ));
            self.retype_columns(&rename.from, &rename.to);
            relocate(&mut self.prev.enums, self.dialect, &rename.from, &rename.to);
        }
        for created in &resolution.created {
            if let Some(e) = self.next.enums.get(&self.key(&created.schema, &created.name)) {
                self.out
                    .types
                    .push(Statement::CreateTypeEnum(CreateEnumStatement {
                        name: e.name.clone(),
                        schema: e.schema.clone(),
                        values: e.values.clone(),
                    }));
            }
        }
        for deleted in resolution.deleted {
            self.out
                .enum_drops
                .push(Statement::DropTypeEnum(EntityStatement {
                    name: deleted.name,
                    schema: deleted.schema,
                }));
        }

        for key in common_keys(&self.prev.enums, &self.next.enums) {
            let (Some(old), Some(new)) = (self.prev.enums.get(&key), self.next.enums.get(&key))
            else {
                continue;
            };
            if old.values == new.values {
                continue;
            }
            let added = added_values(&old.values, &new.values).filter(|added| {
                self.caps.enums == EnumSupport::Positional
                    || added.iter().all(|(_, before)| before.is_empty())
            });
            let Some(added) = added else {
                debug!(enum_type = %key, "enum values removed or reordered, recreating");
                self.enum_recreates.push((old.clone(), new.clone()));
                continue;
            };
            for (value, before) in added {
                self.out
                    .types
                    .push(Statement::AlterTypeAddValue(AddEnumValueStatement {
                        name: new.name.clone(),
                        schema: new.schema.clone(),
                        value,
                        before,
                    }));
            }
        }
        Ok(())
    }

    /// Recreates enums whose values cannot be changed in place. Referencing
    /// columns are loosened to text first and cast back afterwards.
    pub(super) fn recreate_enums(&mut self) {
        for (old, new) in std::mem::take(&mut self.enum_recreates) {
            let mut statements = Vec::new();
            let mut loosened = Vec::new();

            for (key, table) in &mut self.prev.tables {
                for column in table
                    .columns
                    .values_mut()
                    .filter(|c| c.references_type(&old.schema, &old.name))
                {
                    if column.default.take().is_some() {
                        statements.push(Statement::AlterTableAlterColumnDropDefault(
                            AlterColumnStatement {
                                table: table.name.clone(),
                                schema: table.schema.clone(),
                                column: column.clone(),
                            },
                        ));
                    }
                    let old_type = column.sql_type.clone();
                    let suffix = old_type[column.base_type().len()..].to_string();
                    column.sql_type = format!("text{suffix}");
                    column.type_schema = None;
                    statements.push(Statement::AlterTableAlterColumnSetType(
                        SetColumnTypeStatement {
                            table: table.name.clone(),
                            schema: table.schema.clone(),
                            column: column.clone(),
                            old_type,
                            using_cast: false,
                        },
                    ));
                    loosened.push((key.clone(), column.name.clone()));
                }
            }

            statements.push(Statement::DropTypeEnum(EntityStatement {
                name: old.name.clone(),
                schema: old.schema.clone(),
            }));
            statements.push(Statement::CreateTypeEnum(CreateEnumStatement {
                name: new.name.clone(),
                schema: new.schema.clone(),
                values: new.values.clone(),
            }));

            for (key, name) in loosened {
                let Some(target) = self.next.tables.get(&key).and_then(|t| t.get_column(&name))
                else {
                    continue;
                };
                if !target.references_type(&new.schema, &new.name) {
                    continue;
                }
                let Some(table) = self.prev.tables.get_mut(&key) else {
                    continue;
                };
                let Some(column) = table.columns.values_mut().find(|c| c.name == name) else {
                    continue;
                };
                let old_type = std::mem::replace(&mut column.sql_type, target.sql_type.clone());
                column.type_schema.clone_from(&target.type_schema);
                statements.push(Statement::AlterTableAlterColumnSetType(
                    SetColumnTypeStatement {
                        table: table.name.clone(),
                        schema: table.schema.clone(),
                        column: column.clone(),
                        old_type,
                        using_cast: true,
                    },
                ));
            }

            let key = self.key(&new.schema, &new.name);
            if let Some(e) = self.prev.enums.get_mut(&key) {
                e.values.clone_from(&new.values);
            }
            self.out.enum_recreates.extend(statements);
        }
    }

    // ========================================================================
    // Sequences
    // ========================================================================

    pub(super) fn sequences(&mut self) -> Result<()> {
        let (created, deleted) = changed_refs(&self.prev.sequences, &self.next.sequences, |s| {
            EntityRef::new(s.schema.clone(), s.name.clone())
        });
        let resolution = self.resolve(EntityKind::Sequence, created, deleted)?;

        for created in &resolution.created {
            if let Some(sequence) = self
                .next
                .sequences
                .get(&self.key(&created.schema, &created.name))
            {
                self.out
                    .types
                    .push(Statement::CreateSequence(SequenceStatement {
                        sequence: sequence.clone(),
                    }));
            }
        }
        for m in &resolution.moved {
            self.out.types.push(moved(m, Statement::MoveSequence));
            relocate(&mut self.prev.sequences, self.dialect, &m.from_ref(), &m.to_ref());
        }
        for rename in &resolution.renamed {
            self.check_rename(self.caps.rename.sequence, EntityKind::Sequence, rename)?;
            self.out.types.extend(renamed(
                rename,
                Statement::MoveSequence,
                Statement::RenameSequence,
            ));
            relocate(&mut self.prev.sequences, self.dialect, &rename.from, &rename.to);
        }
        for deleted in resolution.deleted {
            self.out
                .sequence_drops
                .push(Statement::DropSequence(EntityStatement {
                    name: deleted.name,
                    schema: deleted.schema,
                }));
        }

        let old = squash(&self.prev, self.options.mode).sequences;
        let new = squash(&self.next, self.options.mode).sequences;
        for key in common_keys(&self.prev.sequences, &self.next.sequences) {
            if old.get(&key) == new.get(&key) {
                continue;
            }
            if let Some(sequence) = self.next.sequences.get(&key) {
                self.out
                    .types
                    .push(Statement::AlterSequence(SequenceStatement {
                        sequence: sequence.clone(),
                    }));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Domains
    // ========================================================================

    pub(super) fn domains(&mut self) -> Result<()> {
        let (created, deleted) = changed_refs(&self.prev.domains, &self.next.domains, |d| {
            EntityRef::new(d.schema.clone(), d.name.clone())
        });
        let resolution = self.resolve(EntityKind::Domain, created, deleted)?;

        for created in &resolution.created {
            if let Some(domain) = self
                .next
                .domains
                .get(&self.key(&created.schema, &created.name))
            {
                self.out.types.push(Statement::CreateDomain(DomainStatement {
                    domain: domain.clone(),
                }));
            }
        }
        for m in &resolution.moved {
            self.out.types.push(moved(m, Statement::MoveDomain));
            self.retype_columns(&m.from_ref(), &m.to_ref());
            relocate(&mut self.prev.domains, self.dialect, &m.from_ref(), &m.to_ref());
        }
        for rename in &resolution.renamed {
            self.check_rename(self.caps.rename.domain, EntityKind::Domain, rename)?;
            self.out.types.extend(renamed(
                rename,
                Statement::MoveDomain,
                Statement::RenameDomain,
            ));
            self.retype_columns(&rename.from, &rename.to);
            relocate(&mut self.prev.domains, self.dialect, &rename.from, &rename.to);
        }
        for deleted in resolution.deleted {
            self.out.domain_drops.push(Statement::DropDomain(EntityStatement {
                name: deleted.name,
                schema: deleted.schema,
            }));
        }

        let old = squash(&self.prev, self.options.mode).domains;
        let new = squash(&self.next, self.options.mode).domains;
        for key in common_keys(&self.prev.domains, &self.next.domains) {
            let (Some(old), Some(new)) = (old.get(&key), new.get(&key)) else {
                continue;
            };
            if old == new {
                continue;
            }
            if old.base_type != new.base_type {
                return Err(self.unsupported(format!(
                    "changing the base type of domain {key} from {} to {}",
                    old.base_type, new.base_type
                )));
            }

            let mut actions = Vec::new();
            if old.default != new.default {
                actions.push(new.default.as_ref().map_or(DomainAction::DropDefault, |value| {
                    DomainAction::SetDefault {
                        value: value.clone(),
                    }
                }));
            }
            if old.not_null != new.not_null {
                actions.push(if new.not_null {
                    DomainAction::SetNotNull
                } else {
                    DomainAction::DropNotNull
                });
            }
            let old_checks: BTreeMap<&str, &Check> =
                old.checks.iter().map(|c| (c.name.as_str(), c)).collect();
            let new_checks: BTreeMap<&str, &Check> =
                new.checks.iter().map(|c| (c.name.as_str(), c)).collect();
            for (name, check) in &old_checks {
                if new_checks.get(name).map(|c| c.value.trim()) != Some(check.value.trim()) {
                    actions.push(DomainAction::DropConstraint {
                        name: (*name).to_string(),
                    });
                }
            }
            for (name, check) in &new_checks {
                if old_checks.get(name).map(|c| c.value.trim()) != Some(check.value.trim()) {
                    actions.push(DomainAction::AddConstraint {
                        check: (*check).clone(),
                    });
                }
            }

            for action in actions {
                self.out.types.push(Statement::AlterDomain(AlterDomainStatement {
                    name: new.name.clone(),
                    schema: new.schema.clone(),
                    action,
                }));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Functions
    // ========================================================================

    pub(super) fn functions(&mut self) -> Result<()> {
        let (created, deleted) = changed_refs(&self.prev.functions, &self.next.functions, |f| {
            EntityRef::new(f.schema.clone(), f.name.clone())
        });
        let resolution = self.resolve(EntityKind::Function, created, deleted)?;

        for created in &resolution.created {
            if let Some(function) = self
                .next
                .functions
                .get(&self.key(&created.schema, &created.name))
            {
                self.out
                    .functions
                    .push(Statement::CreateFunction(CreateFunctionStatement {
                        function: function.clone(),
                        or_replace: false,
                    }));
            }
        }
        for m in &resolution.moved {
            let arg_types = self.function_args(&m.from_ref());
            self.out
                .functions
                .push(Statement::MoveFunction(MoveFunctionStatement {
                    name: m.name.clone(),
                    schema_from: m.schema_from.clone(),
                    schema_to: m.schema_to.clone(),
                    arg_types,
                }));
            relocate(&mut self.prev.functions, self.dialect, &m.from_ref(), &m.to_ref());
        }
        for rename in &resolution.renamed {
            self.check_rename(self.caps.rename.function, EntityKind::Function, rename)?;
            let (from, to) = (&rename.from, &rename.to);
            let arg_types = self.function_args(from);
            if from.schema != to.schema {
                self.out
                    .functions
                    .push(Statement::MoveFunction(MoveFunctionStatement {
                        name: from.name.clone(),
                        schema_from: from.schema.clone(),
                        schema_to: to.schema.clone(),
                        arg_types: arg_types.clone(),
                    }));
            }
            if from.name != to.name {
                self.out
                    .functions
                    .push(Statement::RenameFunction(RenameFunctionStatement {
                        schema: to.schema.clone(),
                        name_from: from.name.clone(),
                        name_to: to.name.clone(),
                        arg_types,
                    }));
            }
            relocate(&mut self.prev.functions, self.dialect, from, to);
        }
        for deleted in &resolution.deleted {
            let arg_types = self.function_args(deleted);
            self.out
                .function_drops
                .push(Statement::DropFunction(FunctionStatement {
                    name: deleted.name.clone(),
                    schema: deleted.schema.clone(),
                    arg_types,
                }));
        }
        self.alter_functions();
        Ok(())
    }

    /// Replaces functions present on both sides whose definition changed.
    fn alter_functions(&mut self) {
        let old = squash(&self.prev, self.options.mode).functions;
        let new = squash(&self.next, self.options.mode).functions;
        for key in common_keys(&self.prev.functions, &self.next.functions) {
            let (Some(old), Some(new)) = (old.get(&key), new.get(&key)) else {
                continue;
            };
            if old == new {
                continue;
            }
            let Some(function) = self.next.functions.get(&key) else {
                continue;
            };
            // The signature is part of the identity of an overload.
            let signature_changed =
                old.arg_types() != new.arg_types() || old.returns != new.returns;
            if signature_changed {
                self.out
                    .functions
                    .push(Statement::DropFunction(FunctionStatement {
                        name: old.name.clone(),
                        schema: old.schema.clone(),
                        arg_types: self
                            .prev
                            .functions
                            .get(&key)
                            .map(Function::arg_types)
                            .unwrap_or_default(),
                    }));
            }
            self.out
                .functions
                .push(Statement::CreateFunction(CreateFunctionStatement {
                    function: function.clone(),
                    or_replace: !signature_changed,
                }));
        }
    }

    fn function_args(&self, function: &EntityRef) -> Vec<String> {
        self.prev
            .functions
            .get(&self.key(&function.schema, &function.name))
            .map(Function::arg_types)
            .unwrap_or_default()
    }
}
