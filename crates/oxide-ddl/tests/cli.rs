//! End-to-end tests for the `oxide-ddl` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use oxide_ddl_core::prelude::*;
use tempfile::TempDir;

fn oxide_ddl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_oxide-ddl"))
        .args(args)
        .env_remove("OXIDE_DDL_FROM")
        .env_remove("OXIDE_DDL_TO")
        .env_remove("OXIDE_DDL_RENAMES")
        .env_remove("OXIDE_DDL_FORMAT")
        .env_remove("OXIDE_DDL_DIALECT")
        .output()
        .expect("Failed to run oxide-ddl")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "oxide-ddl failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn write(dir: &Path, name: &str, snapshot: &Snapshot) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, snapshot.to_json().unwrap()).unwrap();
    path
}

fn users(name: &str) -> Table {
    Table::new("public", name)
        .column(Column::new("id", "serial").primary_key())
        .column(Column::new("email", "text").not_null())
        .index(Index::new(format!("{name}_email_idx"), ["email"]))
}

fn pg(tables: impl IntoIterator<Item = Table>) -> Snapshot {
    tables
        .into_iter()
        .fold(Snapshot::empty(Dialect::Postgres), Snapshot::with_table)
}

#[test]
fn generate_from_empty_schema() {
    let dir = TempDir::new().unwrap();
    let to = write(dir.path(), "to.json", &pg([users("users")]));

    let out = stdout(&oxide_ddl(&["generate", "--to", to.to_str().unwrap()]));
    assert!(out.starts_with("CREATE TABLE \"users\" ("), "{out}");
    assert!(out.ends_with("CREATE INDEX \"users_email_idx\" ON \"users\" (\"email\");\n"));
}

#[test]
fn generate_with_breakpoints() {
    let dir = TempDir::new().unwrap();
    let to = write(dir.path(), "to.json", &pg([users("users")]));

    let out = stdout(&oxide_ddl(&[
        "generate",
        "--from",
        "",
        "--to",
        to.to_str().unwrap(),
        "--breakpoints",
    ]));
    assert_eq!(out.matches("--> statement-breakpoint").count(), 1);
    assert!(out.contains(");\n--> statement-breakpoint\nCREATE INDEX"));
}

#[test]
fn generate_with_rename_hint() {
    let dir = TempDir::new().unwrap();
    let from = write(dir.path(), "from.json", &pg([users("users")]));
    let mut people = users("people");
    people.indexes = users("users").indexes;
    let to = write(dir.path(), "to.json", &pg([people]));

    let out = stdout(&oxide_ddl(&[
        "generate",
        "--from",
        from.to_str().unwrap(),
        "--to",
        to.to_str().unwrap(),
        "--rename",
        "public.users->public.people",
    ]));
    assert_eq!(out, "ALTER TABLE \"users\" RENAME TO \"people\";\n");
}

#[test]
fn json_journal_renders_in_other_dialects() {
    let dir = TempDir::new().unwrap();
    let from = write(dir.path(), "from.json", &pg([users("users")]));
    let mut people = users("people");
    people.indexes = users("users").indexes;
    let to = write(dir.path(), "to.json", &pg([people]));

    let out = stdout(&oxide_ddl(&[
        "generate",
        "--from",
        from.to_str().unwrap(),
        "--to",
        to.to_str().unwrap(),
        "--rename",
        "public.users->public.people",
        "--format",
        "json",
    ]));
    let journal: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(journal["dialect"], "postgresql");
    assert_eq!(journal["statements"][0]["type"], "rename_table");
    assert_eq!(
        journal["_meta"]["tables"]["\"public\".\"users\""],
        "\"public\".\"people\""
    );

    let path = dir.path().join("journal.json");
    std::fs::write(&path, &out).unwrap();
    let journal = path.to_str().unwrap();

    let out = stdout(&oxide_ddl(&["render", journal]));
    assert_eq!(out, "ALTER TABLE \"users\" RENAME TO \"people\";\n");

    let out = stdout(&oxide_ddl(&["render", journal, "--dialect", "mysql"]));
    assert_eq!(out, "RENAME TABLE `users` TO `people`;\n");
}

#[test]
fn render_plain_statement_array() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal.json");
    std::fs::write(
        &path,
        r#"[{"type": "drop_table", "name": "users", "schema": ""}]"#,
    )
    .unwrap();
    let journal = path.to_str().unwrap();

    let out = stdout(&oxide_ddl(&["render", journal, "--dialect", "sqlite"]));
    assert_eq!(out, "DROP TABLE `users`;\n");

    let missing = oxide_ddl(&["render", journal]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("pass --dialect"));
}

#[test]
fn check_reports_valid_and_outdated_snapshots() {
    let dir = TempDir::new().unwrap();
    let valid = write(dir.path(), "valid.json", &pg([users("users")]));
    let out = stdout(&oxide_ddl(&["check", valid.to_str().unwrap()]));
    assert!(out.contains("valid postgresql snapshot (version 7, 1 tables)"), "{out}");

    let mut old = pg([users("users")]);
    old.version = "5".into();
    let old = write(dir.path(), "old.json", &old);
    let output = oxide_ddl(&["check", old.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("outdated"));
}

#[test]
fn strict_renames_reject_view_recreation() {
    let dir = TempDir::new().unwrap();
    let view = |name: &str| View::new("", name, "SELECT 1");
    let from = write(
        dir.path(),
        "from.json",
        &Snapshot::empty(Dialect::Sqlite).with_view(view("a")),
    );
    let to = write(
        dir.path(),
        "to.json",
        &Snapshot::empty(Dialect::Sqlite).with_view(view("b")),
    );
    let args = [
        "generate",
        "--from",
        from.to_str().unwrap(),
        "--to",
        to.to_str().unwrap(),
        "--rename",
        "a->b",
    ];

    let lenient = oxide_ddl(&args);
    assert!(lenient.status.success());
    assert!(String::from_utf8_lossy(&lenient.stderr).contains("cannot be renamed"));

    let mut strict_args = args.to_vec();
    strict_args.push("--strict-renames");
    let strict = oxide_ddl(&strict_args);
    assert!(!strict.status.success());
    assert!(String::from_utf8_lossy(&strict.stderr)
        .contains("sqlite: renaming view a to b is not supported"));
}
