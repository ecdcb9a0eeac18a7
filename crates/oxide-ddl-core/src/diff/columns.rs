//! Column-level changes on a table present on both sides.

use super::Differ;
use crate::dialect::{EnumSupport, Support};
use crate::error::Result;
use crate::snapshot::{Column, Table};
use crate::squash::SquashedTable;
use crate::statement::{
    AddColumnStatement, AlterColumnStatement, DropColumnStatement, SetColumnTypeStatement,
    Statement,
};

/// Column statements of one table, grouped by where they run.
#[derive(Debug, Default)]
pub(super) struct ColumnPlan {
    pub drops: Vec<Statement>,
    pub adds: Vec<Statement>,
    pub alters: Vec<Statement>,
    /// Single-column primary keys set after every other column change.
    pub pk_sets: Vec<Statement>,
    /// Why the table must be rebuilt instead.
    pub recreate: Option<String>,
}

const fn rank(support: Support) -> u8 {
    match support {
        Support::InPlace => 0,
        Support::DropAndAdd => 1,
        Support::Recreate => 2,
        Support::Unsupported => 3,
    }
}

/// The more restrictive of two strategies.
const fn worst(a: Support, b: Support) -> Support {
    if rank(a) >= rank(b) {
        a
    } else {
        b
    }
}

/// Outcome of checking one attribute change against the dialect.
enum Step {
    InPlace,
    DropAndAdd,
    Recreate,
}

impl Differ<'_> {
    fn step(&self, support: Support, what: &str, table: &str, column: &str) -> Result<Step> {
        match support {
            Support::InPlace => Ok(Step::InPlace),
            Support::DropAndAdd => Ok(Step::DropAndAdd),
            Support::Recreate => Ok(Step::Recreate),
            Support::Unsupported => {
                Err(self.unsupported(format!("{what} column {table}.{column}")))
            }
        }
    }

    /// Plans column drops, adds and attribute changes. Stops short of
    /// emitting anything when some change forces a table rebuild.
    #[allow(clippy::too_many_lines, clippy::cognitive_complexity)]
    pub(super) fn plan_columns(
        &self,
        prev: &Table,
        next: &Table,
        old: &SquashedTable,
        new: &SquashedTable,
    ) -> Result<ColumnPlan> {
        let mut plan = ColumnPlan::default();
        let (schema, table) = (next.schema.as_str(), next.name.as_str());
        let alter = &self.caps.alter;

        let column_statement = |column: &Column| AlterColumnStatement {
            table: table.to_string(),
            schema: schema.to_string(),
            column: column.clone(),
        };
        let drop_column = |name: &str| {
            Statement::AlterTableDropColumn(DropColumnStatement {
                table: table.to_string(),
                schema: schema.to_string(),
                column: name.to_string(),
            })
        };
        let add_column = |column: &Column| {
            Statement::AlterTableAddColumn(AddColumnStatement {
                table: table.to_string(),
                schema: schema.to_string(),
                column: column.clone(),
            })
        };

        for column in prev.columns.values() {
            if new.columns.contains_key(&column.name) {
                continue;
            }
            match self.step(alter.drop_column, "dropping", table, &column.name)? {
                Step::InPlace | Step::DropAndAdd => plan.drops.push(drop_column(&column.name)),
                Step::Recreate => {
                    plan.recreate
                        .get_or_insert_with(|| format!("dropping column {}", column.name));
                }
            }
        }

        for column in next.columns.values() {
            if old.columns.contains_key(&column.name) {
                continue;
            }
            let mut support = alter.add_column;
            if let Some(generated) = &column.generated {
                support = worst(support, self.caps.generated.add(generated.kind));
            }
            match self.step(support, "adding", table, &column.name)? {
                Step::InPlace | Step::DropAndAdd => plan.adds.push(add_column(column)),
                Step::Recreate => {
                    plan.recreate
                        .get_or_insert_with(|| format!("adding column {}", column.name));
                }
            }
        }

        // A single-column primary key flag only counts without a composite key.
        let old_single_pk = old.primary_keys.is_empty();
        let new_single_pk = new.primary_keys.is_empty();

        for target in next.columns.values() {
            let name = target.name.as_str();
            let (Some(from), Some(to)) = (old.columns.get(name), new.columns.get(name)) else {
                continue;
            };
            if from == to {
                continue;
            }
            let mut recreate = |what: &str| {
                plan.recreate
                    .get_or_insert_with(|| format!("{what} column {name}"));
            };

            // ---- Generated expression ----
            if from.generated != to.generated {
                let what = "changing the generated expression of";
                let expression_changed = match (&from.generated, &to.generated) {
                    (Some(a), Some(b)) => a.expression != b.expression,
                    _ => true,
                };
                let support = self.caps.generated.transition(
                    from.generated.as_ref().map(|g| g.kind),
                    to.generated.as_ref().map(|g| g.kind),
                    expression_changed,
                );
                match self.step(support, what, table, name)? {
                    Step::InPlace => plan.alters.push(if to.generated.is_some() {
                        Statement::AlterTableAlterColumnAlterGenerated(column_statement(target))
                    } else {
                        Statement::AlterTableAlterColumnDropGenerated(column_statement(target))
                    }),
                    Step::DropAndAdd => {
                        plan.drops.push(drop_column(name));
                        plan.adds.push(add_column(target));
                        continue;
                    }
                    Step::Recreate => recreate(what),
                }
            }

            // ---- Type ----
            if from.sql_type != to.sql_type || from.type_schema != to.type_schema {
                let what = "changing the type of";
                match self.step(alter.column_type, what, table, name)? {
                    Step::InPlace => {
                        let old_type = prev
                            .get_column(name)
                            .map_or_else(|| from.sql_type.clone(), |c| c.sql_type.clone());
                        plan.alters.push(Statement::AlterTableAlterColumnSetType(
                            SetColumnTypeStatement {
                                table: table.to_string(),
                                schema: schema.to_string(),
                                column: target.clone(),
                                old_type,
                                using_cast: self.caps.enums == EnumSupport::Positional
                                    && target.type_schema.is_some(),
                            },
                        ));
                    }
                    Step::DropAndAdd => {
                        plan.drops.push(drop_column(name));
                        plan.adds.push(add_column(target));
                        continue;
                    }
                    Step::Recreate => recreate(what),
                }
            }

            // ---- Default ----
            if from.default != to.default {
                let what = "changing the default of";
                match self.step(alter.default, what, table, name)? {
                    Step::InPlace | Step::DropAndAdd => {
                        plan.alters.push(if to.default.is_some() {
                            Statement::AlterTableAlterColumnSetDefault(column_statement(target))
                        } else {
                            Statement::AlterTableAlterColumnDropDefault(column_statement(target))
                        });
                    }
                    Step::Recreate => recreate(what),
                }
            }

            // ---- Nullability ----
            if from.not_null != to.not_null {
                let what = "changing the nullability of";
                match self.step(alter.nullability, what, table, name)? {
                    Step::InPlace | Step::DropAndAdd => {
                        plan.alters.push(if to.not_null {
                            Statement::AlterTableAlterColumnSetNotnull(column_statement(target))
                        } else {
                            Statement::AlterTableAlterColumnDropNotnull(column_statement(target))
                        });
                    }
                    Step::Recreate => recreate(what),
                }
            }

            // ---- Autoincrement ----
            if from.autoincrement != to.autoincrement {
                let what = "changing the autoincrement of";
                match self.step(alter.autoincrement, what, table, name)? {
                    Step::InPlace | Step::DropAndAdd => {
                        plan.alters.push(if to.autoincrement {
                            Statement::AlterTableAlterColumnSetAutoincrement(column_statement(
                                target,
                            ))
                        } else {
                            Statement::AlterTableAlterColumnDropAutoincrement(column_statement(
                                target,
                            ))
                        });
                    }
                    Step::Recreate => recreate(what),
                }
            }

            // ---- On update ----
            if from.on_update != to.on_update {
                let what = "changing the on update expression of";
                match self.step(alter.on_update, what, table, name)? {
                    Step::InPlace | Step::DropAndAdd => {
                        plan.alters.push(if to.on_update.is_some() {
                            Statement::AlterTableAlterColumnSetOnUpdate(column_statement(target))
                        } else {
                            Statement::AlterTableAlterColumnDropOnUpdate(column_statement(target))
                        });
                    }
                    Step::Recreate => recreate(what),
                }
            }

            // ---- Primary key ----
            let was_pk = from.primary_key && old_single_pk;
            let is_pk = to.primary_key && new_single_pk;
            if was_pk != is_pk {
                let what = "changing the primary key of";
                match self.step(alter.primary_key, what, table, name)? {
                    Step::InPlace | Step::DropAndAdd => {
                        if is_pk {
                            plan.pk_sets.push(Statement::AlterTableAlterColumnSetPk(
                                column_statement(target),
                            ));
                        } else {
                            plan.drops.push(Statement::AlterTableAlterColumnDropPk(
                                column_statement(target),
                            ));
                        }
                    }
                    Step::Recreate => recreate(what),
                }
            }
        }

        Ok(plan)
    }
}
