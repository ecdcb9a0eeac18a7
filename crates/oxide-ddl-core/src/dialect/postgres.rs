//! PostgreSQL dialect for migrations.

use super::{Dialect, MigrationDialect};
use crate::statement::{AlterColumnStatement, EntityStatement};

/// PostgreSQL dialect for migration SQL generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MigrationDialect for PostgresDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn drop_table(&self, st: &EntityStatement) -> String {
        format!("DROP TABLE {} CASCADE", self.table_name(&st.schema, &st.name))
    }

    fn drop_column_pk(&self, st: &AlterColumnStatement) -> String {
        // Single-column keys carry the server-generated constraint name.
        self.drop_constraint_sql(&st.schema, &st.table, &format!("{}_pkey", st.table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{
        Column, DefaultValue, Enum, ForeignKey, Function, FunctionArg, FunctionSecurity,
        GeneratedKind, Index, IndexColumn, Policy, PolicyAs, PolicyFor, Sequence, Table, View,
        Volatility,
    };
    use crate::statement::{
        AddColumnStatement, AddEnumValueStatement, AlterViewStatement, CreateEnumStatement,
        CreateFunctionStatement, CreateTableStatement, IndexStatement, PolicyStatement,
        ReferenceStatement, SequenceStatement, SetColumnTypeStatement, Statement, ViewStatement,
    };

    fn sql(statement: &Statement) -> Vec<String> {
        PostgresDialect::new().generate_sql(statement).unwrap()
    }

    #[test]
    fn test_create_table() {
        let table = Table::new("public", "users")
            .column(Column::new("id", "serial").primary_key())
            .column(Column::new("email", "varchar(255)").not_null())
            .column(Column::new("active", "boolean").default_value(DefaultValue::Boolean(true)))
            .unique("users_email_unique", ["email"]);
        let out = sql(&Statement::CreateTable(CreateTableStatement { table }));
        assert_eq!(
            out,
            vec![
                "CREATE TABLE \"users\" (\n    \"id\" serial PRIMARY KEY NOT NULL,\n    \"email\" varchar(255) NOT NULL,\n    \"active\" boolean DEFAULT true,\n    CONSTRAINT \"users_email_unique\" UNIQUE(\"email\")\n);"
            ]
        );
    }

    #[test]
    fn test_create_table_in_schema_with_composite_key() {
        let table = Table::new("auth", "members")
            .column(Column::new("user_id", "integer").not_null())
            .column(Column::new("group_id", "integer").not_null())
            .primary_key("members_pk", ["user_id", "group_id"]);
        let out = sql(&Statement::CreateTable(CreateTableStatement { table }));
        assert!(out[0].starts_with("CREATE TABLE \"auth\".\"members\" ("));
        assert!(out[0].contains("CONSTRAINT \"members_pk\" PRIMARY KEY(\"user_id\", \"group_id\")"));
    }

    #[test]
    fn test_user_type_column_is_qualified() {
        let column = Column::new("tags", "mood[]").type_schema("public");
        let out = sql(&Statement::AlterTableAddColumn(AddColumnStatement {
            table: "users".into(),
            schema: "public".into(),
            column,
        }));
        assert_eq!(
            out,
            vec!["ALTER TABLE \"users\" ADD COLUMN \"tags\" \"public\".\"mood\"[];"]
        );
    }

    #[test]
    fn test_generated_column() {
        let column = Column::new("full_name", "text").generated("first || last", GeneratedKind::Stored);
        let out = sql(&Statement::AlterTableAddColumn(AddColumnStatement {
            table: "users".into(),
            schema: String::new(),
            column,
        }));
        assert_eq!(
            out,
            vec!["ALTER TABLE \"users\" ADD COLUMN \"full_name\" text GENERATED ALWAYS AS (first || last) STORED;"]
        );
    }

    #[test]
    fn test_set_type_with_cast() {
        let out = sql(&Statement::AlterTableAlterColumnSetType(SetColumnTypeStatement {
            table: "users".into(),
            schema: "public".into(),
            column: Column::new("mood", "mood").type_schema("public"),
            old_type: "text".into(),
            using_cast: true,
        }));
        assert_eq!(
            out,
            vec!["ALTER TABLE \"users\" ALTER COLUMN \"mood\" SET DATA TYPE \"public\".\"mood\" USING \"mood\"::\"public\".\"mood\";"]
        );
    }

    #[test]
    fn test_drop_table_cascades() {
        let out = sql(&Statement::DropTable(EntityStatement {
            name: "users".into(),
            schema: "public".into(),
        }));
        assert_eq!(out, vec!["DROP TABLE \"users\" CASCADE;"]);
    }

    #[test]
    fn test_drop_pk_uses_generated_name() {
        let out = sql(&Statement::AlterTableAlterColumnDropPk(AlterColumnStatement {
            table: "users".into(),
            schema: String::new(),
            column: Column::new("id", "integer"),
        }));
        assert_eq!(out, vec!["ALTER TABLE \"users\" DROP CONSTRAINT \"users_pkey\";"]);
    }

    #[test]
    fn test_enum_statements() {
        let e = Enum::new("public", "mood", ["sad", "happy"]);
        let out = sql(&Statement::CreateTypeEnum(CreateEnumStatement {
            name: e.name.clone(),
            schema: e.schema.clone(),
            values: e.values.clone(),
        }));
        assert_eq!(
            out,
            vec!["CREATE TYPE \"public\".\"mood\" AS ENUM('sad', 'happy');"]
        );

        let out = sql(&Statement::AlterTypeAddValue(AddEnumValueStatement {
            name: "mood".into(),
            schema: "public".into(),
            value: "ok".into(),
            before: "happy".into(),
        }));
        assert_eq!(
            out,
            vec!["ALTER TYPE \"public\".\"mood\" ADD VALUE 'ok' BEFORE 'happy';"]
        );
    }

    #[test]
    fn test_sequence() {
        let mut sequence = Sequence::new("public", "order_seq");
        sequence.increment = Some("5".into());
        sequence.start_with = Some("100".into());
        sequence.cycle = true;
        let out = sql(&Statement::CreateSequence(SequenceStatement {
            sequence: sequence.clone(),
        }));
        assert_eq!(
            out,
            vec!["CREATE SEQUENCE \"public\".\"order_seq\" INCREMENT BY 5 START WITH 100 CYCLE;"]
        );
        let out = sql(&Statement::AlterSequence(SequenceStatement { sequence }));
        assert_eq!(
            out,
            vec!["ALTER SEQUENCE \"public\".\"order_seq\" INCREMENT BY 5 NO MINVALUE NO MAXVALUE START WITH 100 CACHE 1 CYCLE;"]
        );
    }

    #[test]
    fn test_function_body_tag() {
        let function = Function {
            name: "add_one".into(),
            schema: "public".into(),
            args: vec![FunctionArg {
                name: "x".into(),
                sql_type: "integer".into(),
            }],
            returns: "integer".into(),
            language: "sql".into(),
            security: FunctionSecurity::Invoker,
            volatility: Volatility::Immutable,
            body: "SELECT x + 1".into(),
        };
        let out = sql(&Statement::CreateFunction(CreateFunctionStatement {
            function,
            or_replace: true,
        }));
        assert_eq!(
            out,
            vec!["CREATE OR REPLACE FUNCTION \"public\".\"add_one\"(\"x\" integer) RETURNS integer LANGUAGE sql IMMUTABLE SECURITY INVOKER AS $$SELECT x + 1$$;"]
        );
    }

    #[test]
    fn test_index_with_method_and_predicate() {
        let mut index = Index::new("users_lower_email", Vec::<String>::new()).unique();
        index.columns = vec![IndexColumn::expression("lower(email)")];
        index.method = Some("btree".into());
        index.r#where = Some("deleted_at IS NULL".into());
        let out = sql(&Statement::CreateIndex(IndexStatement {
            table: "users".into(),
            schema: "public".into(),
            index: index.clone(),
        }));
        assert_eq!(
            out,
            vec!["CREATE UNIQUE INDEX \"users_lower_email\" ON \"users\" USING btree (lower(email)) WHERE deleted_at IS NULL;"]
        );
        let out = sql(&Statement::DropIndex(IndexStatement {
            table: "users".into(),
            schema: "public".into(),
            index,
        }));
        assert_eq!(out, vec!["DROP INDEX \"users_lower_email\";"]);
    }

    #[test]
    fn test_foreign_key() {
        let fk = ForeignKey {
            name: "posts_author_fk".into(),
            columns_from: vec!["author_id".into()],
            schema_to: "public".into(),
            table_to: "users".into(),
            columns_to: vec!["id".into()],
            on_delete: Some("cascade".into()),
            on_update: None,
        };
        let out = sql(&Statement::CreateReference(ReferenceStatement {
            table: "posts".into(),
            schema: "public".into(),
            foreign_key: fk,
        }));
        assert_eq!(
            out,
            vec!["ALTER TABLE \"posts\" ADD CONSTRAINT \"posts_author_fk\" FOREIGN KEY (\"author_id\") REFERENCES \"users\"(\"id\") ON DELETE CASCADE;"]
        );
    }

    #[test]
    fn test_view_options() {
        let mut view = View::new("public", "active_users", "SELECT * FROM users");
        view.with.insert("security_barrier".into(), "true".into());
        let out = sql(&Statement::CreateView(ViewStatement { view: view.clone() }));
        assert_eq!(
            out,
            vec!["CREATE VIEW \"public\".\"active_users\" WITH (security_barrier = true) AS SELECT * FROM users;"]
        );
        let out = sql(&Statement::AlterView(AlterViewStatement {
            view,
            reset: vec!["check_option".into()],
        }));
        assert_eq!(
            out,
            vec![
                "ALTER VIEW \"public\".\"active_users\" SET (security_barrier = true);",
                "ALTER VIEW \"public\".\"active_users\" RESET (check_option);",
            ]
        );
    }

    #[test]
    fn test_policy() {
        let policy = Policy {
            name: "owner_only".into(),
            kind: PolicyAs::Permissive,
            command: PolicyFor::Select,
            to: vec!["app_user".into(), "current_user".into()],
            using: Some("owner_id = current_user_id()".into()),
            with_check: None,
        };
        let out = sql(&Statement::CreatePolicy(PolicyStatement {
            table: "docs".into(),
            schema: "public".into(),
            policy,
        }));
        assert_eq!(
            out,
            vec!["CREATE POLICY \"owner_only\" ON \"docs\" AS PERMISSIVE FOR SELECT TO \"app_user\", current_user USING (owner_id = current_user_id());"]
        );
    }
}
