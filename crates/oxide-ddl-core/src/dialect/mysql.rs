//! MySQL dialect for migrations.

use super::{Dialect, MigrationDialect};
use crate::error::Result;
use crate::statement::{
    AlterColumnStatement, AlterPrimaryKeyStatement, AlterViewStatement, CheckStatement,
    IndexStatement, PrimaryKeyStatement, ReferenceStatement, RenameMemberStatement,
    RenameStatement, RenameViewStatement, SetColumnTypeStatement, UniqueStatement, ViewStatement,
};

/// MySQL dialect for migration SQL generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// `CREATE INDEX` in the MySQL family: expression key parts are
/// parenthesized and the method trails the key list.
pub(super) fn create_index_sql<D: MigrationDialect + ?Sized>(d: &D, st: &IndexStatement) -> String {
    let index = &st.index;
    let parts: Vec<String> = index
        .columns
        .iter()
        .map(|p| {
            let part = d.index_part(p);
            if p.is_expression {
                format!("({part})")
            } else {
                part
            }
        })
        .collect();
    let mut sql = format!(
        "CREATE {}INDEX {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        d.quote_identifier(&index.name),
        d.table_name(&st.schema, &st.table),
        parts.join(", ")
    );
    if let Some(method) = &index.method {
        sql.push_str(" USING ");
        sql.push_str(&method.to_uppercase());
    }
    sql
}

/// `ALTER TABLE t <action>` for the MySQL family.
pub(super) fn alter_table_sql<D: MigrationDialect + ?Sized>(
    d: &D,
    schema: &str,
    table: &str,
    action: &str,
) -> String {
    format!("ALTER TABLE {} {action}", d.table_name(schema, table))
}

impl MySqlDialect {
    fn view_header(self, verb: &str, st: &ViewStatement) -> String {
        let view = &st.view;
        let mut sql = format!("{verb} ");
        if let Some(algorithm) = &view.algorithm {
            sql.push_str(&format!("ALGORITHM = {algorithm} "));
        }
        if let Some(security) = &view.sql_security {
            sql.push_str(&format!("SQL SECURITY {security} "));
        }
        sql.push_str(&format!("VIEW {}", self.quote_identifier(&view.name)));
        sql
    }

    fn view_sql(self, verb: &str, st: &ViewStatement, statement: &'static str) -> Result<String> {
        let definition = st
            .view
            .definition
            .as_ref()
            .ok_or_else(|| self.unrenderable(statement))?;
        let mut sql = format!("{} AS ({definition})", self.view_header(verb, st));
        if let Some(option) = &st.view.check_option {
            sql.push_str(&format!(" WITH {option} CHECK OPTION"));
        }
        Ok(sql)
    }
}

impl MigrationDialect for MySqlDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    fn rename_table(&self, st: &RenameStatement) -> String {
        format!(
            "RENAME TABLE {} TO {}",
            self.quote_identifier(&st.name_from),
            self.quote_identifier(&st.name_to)
        )
    }

    fn set_column_type(&self, st: &SetColumnTypeStatement) -> String {
        alter_table_sql(
            self,
            &st.schema,
            &st.table,
            &format!("MODIFY COLUMN {}", self.column_definition(&st.column)),
        )
    }

    fn set_column_not_null(&self, st: &AlterColumnStatement) -> String {
        self.modify_column(st)
    }

    fn drop_column_not_null(&self, st: &AlterColumnStatement) -> String {
        self.modify_column(st)
    }

    fn drop_column_generated(&self, st: &AlterColumnStatement) -> String {
        self.modify_column(st)
    }

    fn create_composite_pk(&self, st: &PrimaryKeyStatement) -> String {
        alter_table_sql(
            self,
            &st.schema,
            &st.table,
            &format!("ADD PRIMARY KEY({})", self.quote_list(&st.primary_key.columns)),
        )
    }

    fn delete_composite_pk(&self, st: &PrimaryKeyStatement) -> String {
        alter_table_sql(self, &st.schema, &st.table, "DROP PRIMARY KEY")
    }

    fn alter_composite_pk(&self, st: &AlterPrimaryKeyStatement) -> Vec<String> {
        vec![alter_table_sql(
            self,
            &st.schema,
            &st.table,
            &format!(
                "DROP PRIMARY KEY, ADD PRIMARY KEY({})",
                self.quote_list(&st.new.columns)
            ),
        )]
    }

    fn delete_reference(&self, st: &ReferenceStatement) -> String {
        alter_table_sql(
            self,
            &st.schema,
            &st.table,
            &format!("DROP FOREIGN KEY {}", self.quote_identifier(&st.foreign_key.name)),
        )
    }

    fn delete_unique(&self, st: &UniqueStatement) -> String {
        alter_table_sql(
            self,
            &st.schema,
            &st.table,
            &format!("DROP INDEX {}", self.quote_identifier(&st.unique.name)),
        )
    }

    fn rename_unique(&self, st: &RenameMemberStatement) -> String {
        self.rename_index(st)
    }

    fn delete_check(&self, st: &CheckStatement) -> String {
        alter_table_sql(
            self,
            &st.schema,
            &st.table,
            &format!("DROP CHECK {}", self.quote_identifier(&st.check.name)),
        )
    }

    fn create_index(&self, st: &IndexStatement) -> String {
        create_index_sql(self, st)
    }

    fn rename_index(&self, st: &RenameMemberStatement) -> String {
        alter_table_sql(
            self,
            &st.schema,
            &st.table,
            &format!(
                "RENAME INDEX {} TO {}",
                self.quote_identifier(&st.from),
                self.quote_identifier(&st.to)
            ),
        )
    }

    fn create_view(&self, st: &ViewStatement) -> Result<String> {
        self.view_sql("CREATE", st, "create_view")
    }

    fn rename_view(&self, st: &RenameViewStatement) -> String {
        format!(
            "RENAME TABLE {} TO {}",
            self.quote_identifier(&st.name_from),
            self.quote_identifier(&st.name_to)
        )
    }

    /// Restates the whole view.
    fn alter_view(&self, st: &AlterViewStatement) -> Result<Vec<String>> {
        let view = ViewStatement {
            view: st.view.clone(),
        };
        Ok(vec![self.view_sql("ALTER", &view, "alter_view")?])
    }
}
