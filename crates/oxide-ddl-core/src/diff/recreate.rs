//! Table rebuilds for dialects that cannot alter a table in place.

use super::tables::all_indexes;
use super::{DiffWarning, Differ};
use crate::dialect::RecreateStrategy;
use crate::snapshot::Table;
use crate::statement::{
    CheckStatement, IndexStatement, RecreateTableStatement, ReferenceStatement, Statement,
};

/// Columns whose data survives the rebuild: stored on both sides and not
/// generated on either.
pub(super) fn copy_columns(prev: &Table, next: &Table) -> Vec<String> {
    next.columns
        .values()
        .filter(|c| c.generated.is_none())
        .filter(|c| {
            prev.get_column(&c.name)
                .is_some_and(|p| p.generated.is_none())
        })
        .map(|c| c.name.clone())
        .collect()
}

impl Differ<'_> {
    /// Replaces every pending change on the table with one rebuild and the
    /// index and reference statements around it.
    pub(super) fn recreate_table(&mut self, prev: &Table, next: &Table, reason: String) {
        let key = self.key(&next.schema, &next.name);
        self.warn(DiffWarning::TableRecreated { table: key, reason });

        let (schema, table) = (next.schema.clone(), next.name.clone());
        let uniques_as_indexes = self.caps.uniques_as_indexes;
        let mut statements = Vec::new();

        if !self.caps.drop_table_drops_indexes {
            for index in all_indexes(prev, uniques_as_indexes) {
                statements.push(Statement::DropIndex(IndexStatement {
                    table: table.clone(),
                    schema: schema.clone(),
                    index,
                }));
            }
        }
        // The old table lives on next to the new one until the copy is done,
        // so its constraint names must be freed first.
        if self.caps.recreate == RecreateStrategy::RenameOld {
            for fk in &prev.foreign_keys {
                statements.push(Statement::DeleteReference(ReferenceStatement {
                    table: table.clone(),
                    schema: schema.clone(),
                    foreign_key: fk.clone(),
                }));
            }
            for check in &prev.check_constraints {
                statements.push(Statement::DeleteCheckConstraint(CheckStatement {
                    table: table.clone(),
                    schema: schema.clone(),
                    check: check.clone(),
                }));
            }
        }

        statements.push(Statement::RecreateTable(RecreateTableStatement {
            table: next.clone(),
            copy_columns: copy_columns(prev, next),
        }));

        for index in all_indexes(next, uniques_as_indexes) {
            statements.push(Statement::CreateIndex(IndexStatement {
                table: table.clone(),
                schema: schema.clone(),
                index,
            }));
        }
        if !self.caps.inline_foreign_keys {
            for fk in &next.foreign_keys {
                statements.push(Statement::CreateReference(ReferenceStatement {
                    table: table.clone(),
                    schema: schema.clone(),
                    foreign_key: fk.clone(),
                }));
            }
        }

        self.out.table_alters.extend(statements);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Column, GeneratedKind};

    #[test]
    fn copy_skips_new_and_generated_columns() {
        let prev = Table::new("", "t")
            .column(Column::new("id", "integer"))
            .column(Column::new("total", "integer").generated("a + b", GeneratedKind::Stored))
            .column(Column::new("dropped", "text"));
        let next = Table::new("", "t")
            .column(Column::new("id", "integer"))
            .column(Column::new("total", "integer"))
            .column(Column::new("fresh", "text"));
        assert_eq!(copy_columns(&prev, &next), vec!["id"]);
    }
}
