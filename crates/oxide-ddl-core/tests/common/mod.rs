#![allow(dead_code)]

use oxide_ddl_core::prelude::*;

/// Diffs without rename hints.
pub fn plan(from: &Snapshot, to: &Snapshot) -> MigrationPlan {
    diff(from, to, &mut NoRenames, &DiffOptions::new())
        .unwrap_or_else(|e| panic!("Diff failed: {e}"))
}

/// Diffs with `from->to` rename hints.
pub fn plan_with_hints(from: &Snapshot, to: &Snapshot, hints: &[&str]) -> MigrationPlan {
    let mut resolver = HintResolver::new(hints).expect("valid hints");
    diff(from, to, &mut resolver, &DiffOptions::new())
        .unwrap_or_else(|e| panic!("Diff failed: {e}"))
}

/// Diffs and expects an error.
pub fn plan_err(from: &Snapshot, to: &Snapshot, hints: &[&str]) -> Error {
    let mut resolver = HintResolver::new(hints).expect("valid hints");
    diff(from, to, &mut resolver, &DiffOptions::new()).expect_err("Expected the diff to fail")
}

/// Renders a plan.
pub fn sql(plan: &MigrationPlan) -> Vec<String> {
    plan.to_sql()
        .unwrap_or_else(|e| panic!("Rendering failed: {e}"))
}

/// Statement type tags of a plan, in order.
pub fn tags(plan: &MigrationPlan) -> Vec<&'static str> {
    plan.statements.iter().map(Statement::type_tag).collect()
}

/// Namespace used for tables in the dialect.
pub fn ns(dialect: Dialect) -> &'static str {
    if dialect.capabilities().namespaces {
        "public"
    } else {
        ""
    }
}

/// `users(id, name, age)` with an index on `name`.
pub fn users(dialect: Dialect) -> Table {
    Table::new(ns(dialect), "users")
        .column(Column::new("id", "integer").primary_key().not_null())
        .column(Column::new("name", "varchar(64)").not_null())
        .column(Column::new("age", "integer"))
        .index(Index::new("users_name_idx", ["name"]))
}

/// `posts(id, author_id)` referencing `users`.
pub fn posts(dialect: Dialect) -> Table {
    Table::new(ns(dialect), "posts")
        .column(Column::new("id", "integer").primary_key().not_null())
        .column(Column::new("author_id", "integer").not_null())
        .foreign_key(author_fk(dialect))
}

pub fn author_fk(dialect: Dialect) -> ForeignKey {
    ForeignKey {
        name: "posts_author_id_users_id_fk".into(),
        columns_from: vec!["author_id".into()],
        schema_to: ns(dialect).into(),
        table_to: "users".into(),
        columns_to: vec!["id".into()],
        on_delete: Some("cascade".into()),
        on_update: None,
    }
}

/// A snapshot of the dialect holding the given tables.
pub fn snapshot(dialect: Dialect, tables: impl IntoIterator<Item = Table>) -> Snapshot {
    tables
        .into_iter()
        .fold(Snapshot::empty(dialect), Snapshot::with_table)
}
