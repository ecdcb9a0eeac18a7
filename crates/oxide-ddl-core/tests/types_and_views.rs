//! Literal quoting, enum evolution and view handling.

mod common;

use common::{ns, plan, plan_err, plan_with_hints, snapshot, sql, tags, users};
use oxide_ddl_core::prelude::*;

// =============================================================================
// Quoting
// =============================================================================

#[test]
fn quoted_default_survives_every_dialect() {
    let expected = [
        (Dialect::Postgres, "DEFAULT 'escape''s quotes'"),
        (Dialect::Mysql, "DEFAULT 'escape''s quotes'"),
        (Dialect::Sqlite, "DEFAULT 'escape''s quotes'"),
        (Dialect::SingleStore, "DEFAULT 'escape''s quotes'"),
        (Dialect::Spanner, "DEFAULT ('escape\\'s quotes')"),
    ];
    for (dialect, fragment) in expected {
        let table = Table::new(ns(dialect), "notes")
            .column(Column::new("id", "integer").primary_key().not_null())
            .column(
                Column::new("note", "varchar(64)")
                    .default_value(DefaultValue::string("escape's quotes")),
            );
        let plan = plan(&Snapshot::empty(dialect), &snapshot(dialect, [table]));
        let sql = sql(&plan);
        assert_eq!(sql.len(), 1, "{dialect}: {sql:?}");
        assert!(sql[0].contains(fragment), "{dialect}: {}", sql[0]);
    }
}

#[test]
fn quoted_identifiers_are_escaped() {
    let table = Table::new("public", "we\"ird")
        .column(Column::new("id", "integer").primary_key().not_null());
    let sql = sql(&plan(
        &Snapshot::empty(Dialect::Postgres),
        &snapshot(Dialect::Postgres, [table]),
    ));
    assert!(sql[0].starts_with("CREATE TABLE \"we\"\"ird\" ("), "{}", sql[0]);
}

// =============================================================================
// Enums
// =============================================================================

fn with_enum(values: &[&str]) -> Snapshot {
    Snapshot::empty(Dialect::Postgres).with_enum(Enum::new("public", "e", values.iter().copied()))
}

#[test]
fn enum_value_inserted_before_its_successor() {
    let plan = plan(&with_enum(&["v1", "v3"]), &with_enum(&["v1", "v2", "v3"]));
    assert_eq!(tags(&plan), vec!["alter_type_add_value"]);
    assert_eq!(
        sql(&plan),
        vec!["ALTER TYPE \"public\".\"e\" ADD VALUE 'v2' BEFORE 'v3';"]
    );
}

#[test]
fn enum_value_appended() {
    let plan = plan(&with_enum(&["v1", "v2"]), &with_enum(&["v1", "v2", "v3"]));
    assert_eq!(
        sql(&plan),
        vec!["ALTER TYPE \"public\".\"e\" ADD VALUE 'v3';"]
    );
}

#[test]
fn enum_value_removal_recreates_the_type() {
    let mood_table = || {
        Table::new("public", "users")
            .column(Column::new("id", "integer").primary_key().not_null())
            .column(
                Column::new("mood", "mood")
                    .type_schema("public")
                    .default_value(DefaultValue::string("sad")),
            )
    };
    let from = snapshot(Dialect::Postgres, [mood_table()])
        .with_enum(Enum::new("public", "mood", ["sad", "ok", "happy"]));
    let to = snapshot(Dialect::Postgres, [mood_table()])
        .with_enum(Enum::new("public", "mood", ["sad", "happy"]));

    let plan = plan(&from, &to);
    assert_eq!(
        tags(&plan),
        vec![
            "alter_table_alter_column_drop_default",
            "alter_table_alter_column_set_type",
            "drop_type_enum",
            "create_type_enum",
            "alter_table_alter_column_set_type",
            "alter_table_alter_column_set_default",
        ]
    );
    let sql = sql(&plan);
    assert_eq!(
        sql[4],
        "ALTER TABLE \"users\" ALTER COLUMN \"mood\" SET DATA TYPE \"public\".\"mood\" USING \"mood\"::\"public\".\"mood\";"
    );
    assert_eq!(
        sql[3],
        "CREATE TYPE \"public\".\"mood\" AS ENUM('sad', 'happy');"
    );
}

#[test]
fn enums_are_rejected_outside_postgres() {
    let from = Snapshot::empty(Dialect::Mysql);
    let to = Snapshot::empty(Dialect::Mysql).with_enum(Enum::new("", "e", ["a"]));
    let err = plan_err(&from, &to, &[]);
    assert!(matches!(err, Error::UnsupportedEntity { .. }));
}

// =============================================================================
// Views
// =============================================================================

fn view_snapshot(dialect: Dialect, view: View) -> Snapshot {
    snapshot(dialect, [users(dialect)]).with_view(view)
}

fn adults(dialect: Dialect, name: &str) -> View {
    View::new(ns(dialect), name, "SELECT * FROM users WHERE age >= 18")
}

#[test]
fn view_rename_falls_back_to_recreate() {
    let dialect = Dialect::Sqlite;
    let from = view_snapshot(dialect, adults(dialect, "adults"));
    let to = view_snapshot(dialect, adults(dialect, "grown_ups"));

    let plan = plan_with_hints(&from, &to, &["adults->grown_ups"]);
    assert_eq!(tags(&plan), vec!["drop_view", "create_view"]);
    assert_eq!(
        plan.warnings,
        vec![DiffWarning::RenameNotSupported {
            kind: EntityKind::View,
            from: "adults".into(),
            to: "grown_ups".into(),
        }]
    );
}

#[test]
fn strict_view_rename_fails() {
    let dialect = Dialect::Sqlite;
    let from = view_snapshot(dialect, adults(dialect, "adults"));
    let to = view_snapshot(dialect, adults(dialect, "grown_ups"));

    let mut resolver = HintResolver::new(["adults->grown_ups"]).unwrap();
    let options = DiffOptions::new().view_rename_fallback(ViewRenameFallback::Fail);
    let err = diff(&from, &to, &mut resolver, &options).unwrap_err();
    assert_eq!(
        err.to_string(),
        "sqlite: renaming view adults to grown_ups is not supported"
    );
}

#[test]
fn postgres_view_rename_in_place() {
    let dialect = Dialect::Postgres;
    let from = view_snapshot(dialect, adults(dialect, "adults"));
    let to = view_snapshot(dialect, adults(dialect, "grown_ups"));
    let plan = plan_with_hints(&from, &to, &["public.adults->public.grown_ups"]);
    assert_eq!(tags(&plan), vec!["rename_view"]);
    assert!(plan.warnings.is_empty());
}

#[test]
fn postgres_view_option_change_alters_in_place() {
    let dialect = Dialect::Postgres;
    let mut tuned = adults(dialect, "adults");
    tuned.with.insert("security_barrier".into(), "true".into());
    let from = view_snapshot(dialect, adults(dialect, "adults"));
    let to = view_snapshot(dialect, tuned);
    assert_eq!(tags(&plan(&from, &to)), vec!["alter_view"]);
}

#[test]
fn postgres_view_definition_change_recreates() {
    let dialect = Dialect::Postgres;
    let from = view_snapshot(dialect, adults(dialect, "adults"));
    let mut changed = adults(dialect, "adults");
    changed.definition = Some("SELECT * FROM users WHERE age >= 21".into());
    let to = view_snapshot(dialect, changed);
    assert_eq!(tags(&plan(&from, &to)), vec!["drop_view", "create_view"]);
}

#[test]
fn mysql_view_definition_change_alters_in_place() {
    let dialect = Dialect::Mysql;
    let from = view_snapshot(dialect, adults(dialect, "adults"));
    let mut changed = adults(dialect, "adults");
    changed.definition = Some("SELECT * FROM users WHERE age >= 21".into());
    let to = view_snapshot(dialect, changed);
    assert_eq!(tags(&plan(&from, &to)), vec!["alter_view"]);
}

#[test]
fn existing_views_are_left_alone() {
    let dialect = Dialect::Postgres;
    let mut existing = adults(dialect, "legacy");
    existing.is_existing = true;
    existing.definition = None;
    let from = snapshot(dialect, [users(dialect)]);
    let to = view_snapshot(dialect, existing);
    assert!(plan(&from, &to).is_empty());
}
