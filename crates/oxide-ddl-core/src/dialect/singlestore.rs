//! SingleStore dialect for migrations.

use super::mysql::{alter_table_sql, create_index_sql};
use super::{Dialect, MigrationDialect};
use crate::snapshot::Column;
use crate::statement::{IndexStatement, RenameMemberStatement};

/// SingleStore dialect for migration SQL generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleStoreDialect;

impl SingleStoreDialect {
    /// Creates a new SingleStore dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MigrationDialect for SingleStoreDialect {
    fn dialect(&self) -> Dialect {
        Dialect::SingleStore
    }

    /// Computed columns are written `AS (expr) PERSISTED type`.
    fn column_definition(&self, column: &Column) -> String {
        let Some(generated) = &column.generated else {
            return default_column_definition(*self, column);
        };
        let mut sql = format!(
            "{} AS ({}) PERSISTED {}",
            self.quote_identifier(&column.name),
            generated.expression,
            self.column_type(column)
        );
        if column.not_null {
            sql.push_str(" NOT NULL");
        }
        sql
    }

    fn rename_column(&self, st: &RenameMemberStatement) -> String {
        alter_table_sql(
            self,
            &st.schema,
            &st.table,
            &format!(
                "CHANGE {} {}",
                self.quote_identifier(&st.from),
                self.quote_identifier(&st.to)
            ),
        )
    }

    fn create_index(&self, st: &IndexStatement) -> String {
        create_index_sql(self, st)
    }
}

/// Column definition without a computed expression, in MySQL order.
fn default_column_definition(d: SingleStoreDialect, column: &Column) -> String {
    let caps = d.capabilities();
    let mut sql = format!("{} {}", d.quote_identifier(&column.name), d.column_type(column));
    if column.primary_key {
        sql.push_str(" PRIMARY KEY");
    }
    if column.autoincrement {
        if let Some(keyword) = caps.autoincrement_keyword {
            sql.push(' ');
            sql.push_str(keyword);
        }
    }
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&d.render_default(column, default));
    }
    if let Some(on_update) = &column.on_update {
        sql.push_str(" ON UPDATE ");
        sql.push_str(on_update);
    }
    if column.not_null {
        sql.push_str(" NOT NULL");
    }
    sql
}
