//! Cloud Spanner (GoogleSQL) dialect for migrations.

use super::{Dialect, MigrationDialect};
use crate::error::Result;
use crate::snapshot::Column;
use crate::statement::{AlterColumnStatement, IndexStatement, SetColumnTypeStatement, ViewStatement};

/// Spanner dialect for migration SQL generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpannerDialect;

impl SpannerDialect {
    /// Creates a new Spanner dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// `ALTER TABLE t ALTER COLUMN c type [NOT NULL]`: Spanner restates
    /// type and nullability together.
    fn restate_column(self, schema: &str, table: &str, column: &Column) -> String {
        let mut sql = format!(
            "ALTER TABLE {} ALTER COLUMN {} {}",
            self.table_name(schema, table),
            self.quote_identifier(&column.name),
            self.column_type(column)
        );
        if column.not_null {
            sql.push_str(" NOT NULL");
        }
        sql
    }
}

impl MigrationDialect for SpannerDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Spanner
    }

    /// `name type [NOT NULL] [DEFAULT (x) | AS (x) STORED | AUTO_INCREMENT]`.
    fn column_definition(&self, column: &Column) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&column.name),
            self.column_type(column)
        );
        if column.not_null {
            sql.push_str(" NOT NULL");
        }
        if column.autoincrement {
            sql.push_str(" AUTO_INCREMENT");
        }
        if let Some(default) = &column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.render_default(column, default));
        }
        if let Some(generated) = &column.generated {
            sql.push_str(&format!(" AS ({}) STORED", generated.expression));
        }
        sql
    }

    fn set_column_type(&self, st: &SetColumnTypeStatement) -> String {
        self.restate_column(&st.schema, &st.table, &st.column)
    }

    fn set_column_not_null(&self, st: &AlterColumnStatement) -> String {
        self.restate_column(&st.schema, &st.table, &st.column)
    }

    fn drop_column_not_null(&self, st: &AlterColumnStatement) -> String {
        self.restate_column(&st.schema, &st.table, &st.column)
    }

    fn create_index(&self, st: &IndexStatement) -> String {
        let index = &st.index;
        let parts: Vec<String> = index.columns.iter().map(|p| self.index_part(p)).collect();
        format!(
            "CREATE {}{}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            if index.null_filtered { "NULL_FILTERED " } else { "" },
            self.quote_identifier(&index.name),
            self.table_name(&st.schema, &st.table),
            parts.join(", ")
        )
    }

    fn create_view(&self, st: &ViewStatement) -> Result<String> {
        let definition = st
            .view
            .definition
            .as_ref()
            .ok_or_else(|| self.unrenderable("create_view"))?;
        Ok(format!(
            "CREATE VIEW {} SQL SECURITY INVOKER AS {definition}",
            self.quote_identifier(&st.view.name)
        ))
    }
}
