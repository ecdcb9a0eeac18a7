//! Behavioural properties of the diff engine across dialects.

mod common;

use common::{author_fk, plan, plan_err, plan_with_hints, posts, snapshot, sql, tags, users};
use oxide_ddl_core::prelude::*;

// =============================================================================
// Stability
// =============================================================================

#[test]
fn identical_snapshots_produce_nothing() {
    for dialect in Dialect::ALL {
        let mut tables = vec![users(dialect)];
        if dialect.capabilities().foreign_keys {
            tables.push(posts(dialect));
        }
        let s = snapshot(dialect, tables);
        let plan = plan(&s, &s);
        assert!(plan.is_empty(), "{dialect}: {:?}", plan.statements);
        assert!(plan.warnings.is_empty());
    }
}

#[test]
fn identical_postgres_snapshot_with_every_kind_produces_nothing() {
    let mut sequence = Sequence::new("public", "order_seq");
    sequence.increment = Some("1".into());
    let s = snapshot(Dialect::Postgres, [users(Dialect::Postgres)])
        .with_schema("audit")
        .with_enum(Enum::new("public", "mood", ["sad", "ok", "happy"]))
        .with_sequence(sequence)
        .with_view(View::new("public", "adults", "SELECT * FROM users WHERE age >= 18"));
    assert!(plan(&s, &s).is_empty());
}

#[test]
fn column_declaration_order_is_not_a_change() {
    let dialect = Dialect::Postgres;
    let from = snapshot(dialect, [users(dialect)]);
    let reordered = Table::new("public", "users")
        .column(Column::new("age", "integer"))
        .column(Column::new("name", "varchar(64)").not_null())
        .column(Column::new("id", "integer").primary_key().not_null())
        .index(Index::new("users_name_idx", ["name"]));
    let to = snapshot(dialect, [reordered]);
    assert!(plan(&from, &to).is_empty());
}

#[test]
fn default_schema_is_implied() {
    let from = snapshot(Dialect::Postgres, [users(Dialect::Postgres)]);
    let mut table = users(Dialect::Postgres);
    table.schema = String::new();
    let to = snapshot(Dialect::Postgres, [table]);
    assert!(plan(&from, &to).is_empty());
}

// =============================================================================
// Renames
// =============================================================================

#[test]
fn hinted_table_rename_is_a_single_statement() {
    let dialect = Dialect::Postgres;
    let mut renamed = users(dialect);
    renamed.name = "people".into();
    let from = snapshot(dialect, [users(dialect)]);
    let to = snapshot(dialect, [renamed]);

    let plan = plan_with_hints(&from, &to, &["public.users->public.people"]);
    assert_eq!(tags(&plan), vec!["rename_table"]);

    let unhinted = common::plan(&from, &to);
    assert_eq!(tags(&unhinted), vec!["create_table", "create_index", "drop_table"]);
}

#[test]
fn table_rename_retargets_foreign_keys() {
    let dialect = Dialect::Postgres;
    let mut people = users(dialect);
    people.name = "people".into();
    let mut fk = author_fk(dialect);
    fk.table_to = "people".into();
    let mut next_posts = posts(dialect);
    next_posts.foreign_keys = vec![fk];

    let from = snapshot(dialect, [users(dialect), posts(dialect)]);
    let to = snapshot(dialect, [people, next_posts]);
    let plan = plan_with_hints(&from, &to, &["public.users->public.people"]);
    assert_eq!(tags(&plan), vec!["rename_table"]);
}

#[test]
fn hinted_column_rename() {
    let dialect = Dialect::Postgres;
    let from = snapshot(dialect, [users(dialect)]);
    let mut table = users(dialect);
    table.rename_column("name", "full_name");
    let to = snapshot(dialect, [table]);

    let plan = plan_with_hints(&from, &to, &["public.users.name->public.users.full_name"]);
    assert_eq!(
        sql(&plan),
        vec!["ALTER TABLE \"users\" RENAME COLUMN \"name\" TO \"full_name\";"]
    );
    assert_eq!(
        plan.meta.columns.get("\"public\".\"users\".\"name\"").map(String::as_str),
        Some("\"public\".\"users\".\"full_name\"")
    );
}

#[test]
fn renaming_a_composite_key_member_keeps_the_key() {
    let dialect = Dialect::Postgres;
    let keyed = || users(dialect).primary_key("users_pk", ["id", "name"]);
    let from = snapshot(dialect, [keyed()]);
    let mut table = keyed();
    table.rename_column("name", "full_name");
    let to = snapshot(dialect, [table]);

    let plan = plan_with_hints(&from, &to, &["public.users.name->public.users.full_name"]);
    assert_eq!(tags(&plan), vec!["alter_table_rename_column"]);
}

#[test]
fn column_rename_is_fatal_without_support() {
    let dialect = Dialect::Spanner;
    let from = snapshot(dialect, [users(dialect)]);
    let mut table = users(dialect);
    table.rename_column("age", "years");
    let to = snapshot(dialect, [table]);

    let err = plan_err(&from, &to, &["users.age->users.years"]);
    assert!(matches!(err, Error::UnsupportedTransition { .. }), "{err}");
    assert!(err.to_string().starts_with("spanner: "));
}

#[test]
fn unique_rename_in_place_and_legacy_mode() {
    let dialect = Dialect::Postgres;
    let from = snapshot(dialect, [users(dialect).unique("users_name_key", ["name"])]);
    let to = snapshot(dialect, [users(dialect).unique("users_name_unique", ["name"])]);
    let hints = ["public.users.users_name_key->public.users.users_name_unique"];

    let plan = plan_with_hints(&from, &to, &hints);
    assert_eq!(
        sql(&plan),
        vec!["ALTER TABLE \"users\" RENAME CONSTRAINT \"users_name_key\" TO \"users_name_unique\";"]
    );

    let mut resolver = HintResolver::new(hints).unwrap();
    let options = DiffOptions::new().legacy_constraint_recreate(true);
    let legacy = diff(&from, &to, &mut resolver, &options).unwrap();
    assert_eq!(
        tags(&legacy),
        vec!["delete_unique_constraint", "create_unique_constraint"]
    );
}

#[test]
fn hint_for_unrelated_entities_is_ignored() {
    let dialect = Dialect::Postgres;
    let from = snapshot(dialect, [users(dialect)]);
    let plan = plan_with_hints(&from, &from, &["public.a->public.b"]);
    assert!(plan.is_empty());
}

// =============================================================================
// Constraints
// =============================================================================

#[test]
fn check_rename_is_drop_then_add() {
    let dialect = Dialect::Postgres;
    let from = snapshot(
        dialect,
        [users(dialect).check("some_check_name", "\"users\".\"age\" > 21")],
    );
    let to = snapshot(
        dialect,
        [users(dialect).check("new_check_name", "\"users\".\"age\" > 21")],
    );

    let plan = plan(&from, &to);
    assert_eq!(
        tags(&plan),
        vec!["delete_check_constraint", "create_check_constraint"]
    );
    assert_eq!(
        sql(&plan),
        vec![
            "ALTER TABLE \"users\" DROP CONSTRAINT \"some_check_name\";",
            "ALTER TABLE \"users\" ADD CONSTRAINT \"new_check_name\" CHECK (\"users\".\"age\" > 21);",
        ]
    );
}

#[test]
fn check_value_change_is_drop_then_add() {
    let dialect = Dialect::Postgres;
    let from = snapshot(dialect, [users(dialect).check("age_check", "age > 21")]);
    let to = snapshot(dialect, [users(dialect).check("age_check", "age > 18")]);
    assert_eq!(
        tags(&plan(&from, &to)),
        vec!["delete_check_constraint", "create_check_constraint"]
    );
}

#[test]
fn duplicate_check_names_are_rejected() {
    let dialect = Dialect::Postgres;
    let from = snapshot(dialect, [users(dialect)]);
    let to = snapshot(
        dialect,
        [users(dialect)
            .check("age_check", "age > 21")
            .check("age_check", "age < 100")],
    );
    let err = plan_err(&from, &to, &[]);
    assert!(matches!(err, Error::DuplicateName { kind: "check constraint", .. }));
}

#[test]
fn foreign_key_added_after_tables() {
    let dialect = Dialect::Postgres;
    let from = Snapshot::empty(dialect);
    let to = snapshot(dialect, [posts(dialect), users(dialect)]);
    let plan = plan(&from, &to);
    assert_eq!(
        tags(&plan),
        vec!["create_table", "create_table", "create_reference", "create_index"]
    );
    let sql = sql(&plan);
    assert_eq!(
        sql[2],
        "ALTER TABLE \"posts\" ADD CONSTRAINT \"posts_author_id_users_id_fk\" FOREIGN KEY (\"author_id\") REFERENCES \"users\"(\"id\") ON DELETE CASCADE;"
    );
}

#[test]
fn referencing_tables_are_dropped_first_on_mysql() {
    let dialect = Dialect::Mysql;
    let from = snapshot(dialect, [users(dialect), posts(dialect)]);
    let plan = plan(&from, &Snapshot::empty(dialect));
    assert_eq!(sql(&plan), vec!["DROP TABLE `posts`;", "DROP TABLE `users`;"]);
}

#[test]
fn referencing_tables_are_dropped_first_on_spanner() {
    let dialect = Dialect::Spanner;
    let from = snapshot(dialect, [users(dialect), posts(dialect)]);
    let plan = plan(&from, &Snapshot::empty(dialect));
    assert_eq!(
        sql(&plan),
        vec![
            "DROP TABLE `posts`;",
            "DROP INDEX `users_name_idx`;",
            "DROP TABLE `users`;",
        ]
    );
}

#[test]
fn reference_cycle_is_broken_before_dropping() {
    let dialect = Dialect::Mysql;
    let table = |name: &str, other: &str| {
        Table::new("", name)
            .column(Column::new("id", "integer").primary_key().not_null())
            .column(Column::new("other_id", "integer"))
            .foreign_key(ForeignKey {
                name: format!("{name}_other_id_fk"),
                columns_from: vec!["other_id".into()],
                schema_to: String::new(),
                table_to: other.into(),
                columns_to: vec!["id".into()],
                on_delete: None,
                on_update: None,
            })
    };
    let from = snapshot(dialect, [table("a", "b"), table("b", "a")]);
    let plan = plan(&from, &Snapshot::empty(dialect));
    assert_eq!(
        sql(&plan),
        vec![
            "ALTER TABLE `b` DROP FOREIGN KEY `b_other_id_fk`;",
            "DROP TABLE `a`;",
            "DROP TABLE `b`;",
        ]
    );
}

// =============================================================================
// Columns
// =============================================================================

#[test]
fn column_changes_in_place() {
    let dialect = Dialect::Postgres;
    let from = snapshot(dialect, [users(dialect)]);
    let table = Table::new("public", "users")
        .column(Column::new("id", "integer").primary_key().not_null())
        .column(Column::new("name", "varchar(128)"))
        .column(Column::new("age", "integer").default_value(DefaultValue::Integer(0)))
        .column(Column::new("email", "text"))
        .index(Index::new("users_name_idx", ["name"]));
    let to = snapshot(dialect, [table]);

    let plan = plan(&from, &to);
    assert_eq!(
        tags(&plan),
        vec![
            "alter_table_add_column",
            "alter_table_alter_column_set_type",
            "alter_table_alter_column_drop_notnull",
            "alter_table_alter_column_set_default",
        ]
    );
    assert_eq!(
        sql(&plan)[0],
        "ALTER TABLE \"users\" ADD COLUMN \"email\" text;"
    );
}

fn mysql_users(age: Column) -> Table {
    Table::new("", "users")
        .column(Column::new("id", "integer").primary_key().not_null())
        .column(Column::new("name", "varchar(64)").not_null())
        .column(age)
        .index(Index::new("users_name_idx", ["name"]))
}

#[test]
fn converting_a_column_to_generated_drops_and_adds_it() {
    let dialect = Dialect::Mysql;
    let from = snapshot(dialect, [users(dialect)]);
    let to = snapshot(
        dialect,
        [mysql_users(
            Column::new("age", "integer").generated("id * 2", GeneratedKind::Stored),
        )],
    );
    assert_eq!(
        sql(&plan(&from, &to)),
        vec![
            "ALTER TABLE `users` DROP COLUMN `age`;",
            "ALTER TABLE `users` ADD COLUMN `age` integer GENERATED ALWAYS AS (id * 2) STORED;",
        ]
    );
}

#[test]
fn dropping_a_virtual_expression_is_unsupported() {
    let dialect = Dialect::Mysql;
    let from = snapshot(
        dialect,
        [mysql_users(
            Column::new("age", "integer").generated("id * 2", GeneratedKind::Virtual),
        )],
    );
    let to = snapshot(dialect, [users(dialect)]);

    let err = plan_err(&from, &to, &[]);
    assert!(matches!(err, Error::UnsupportedTransition { .. }), "{err}");
    assert_eq!(
        err.to_string(),
        "mysql: changing the generated expression of column users.age is not supported"
    );
}

// =============================================================================
// Meta replay
// =============================================================================

#[test]
fn meta_replays_as_hints() {
    let dialect = Dialect::Postgres;
    let mut renamed = users(dialect);
    renamed.name = "people".into();
    let from = snapshot(dialect, [users(dialect)]);
    let to = snapshot(dialect, [renamed]);
    let first = plan_with_hints(&from, &to, &["public.users->public.people"]);

    let mut replay = HintResolver::from_meta(&first.meta);
    let second = diff(&from, &to, &mut replay, &DiffOptions::new()).unwrap();
    assert_eq!(second.statements, first.statements);
}
