//! Normalizes snapshots into flat, string-keyed maps for set comparison.
//!
//! Squashed values are canonical clones: two entities compare equal with
//! plain `==` exactly when no DDL is needed to turn one into the other.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::dialect::Dialect;
use crate::snapshot::{
    Check, Column, DefaultValue, Domain, Enum, ForeignKey, Function, Index, Policy, PrimaryKey,
    Sequence, Snapshot, Table, Unique, View,
};

/// How much normalization to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SquashMode {
    /// Both sides come from the schema definition.
    #[default]
    Default,
    /// The source side was introspected from a live database: fold the
    /// formatting differences introspection introduces.
    Push,
}

/// Identity key of a namespaced entity: `ns.name`, or `name` when the
/// dialect has no namespaces.
#[must_use]
pub fn entity_key(dialect: Dialect, schema: &str, name: &str) -> String {
    if dialect.capabilities().namespaces && !schema.is_empty() {
        format!("{schema}.{name}")
    } else {
        name.to_string()
    }
}

/// Identity key of a table member: `ns.table.name`.
#[must_use]
pub fn member_key(dialect: Dialect, schema: &str, table: &str, name: &str) -> String {
    format!("{}.{name}", entity_key(dialect, schema, table))
}

/// Squashed members of one table, keyed by member name.
#[derive(Debug, Clone, PartialEq)]
pub struct SquashedTable {
    pub schema: String,
    pub name: String,
    pub columns: BTreeMap<String, Column>,
    pub indexes: BTreeMap<String, Index>,
    pub foreign_keys: BTreeMap<String, ForeignKey>,
    pub uniques: BTreeMap<String, Unique>,
    pub checks: BTreeMap<String, Check>,
    pub primary_keys: BTreeMap<String, PrimaryKey>,
    pub policies: BTreeMap<String, Policy>,
    pub is_rls_enabled: bool,
}

/// A snapshot reduced to comparable keyed maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SquashedSnapshot {
    pub schemas: BTreeSet<String>,
    pub enums: BTreeMap<String, Enum>,
    pub sequences: BTreeMap<String, Sequence>,
    pub domains: BTreeMap<String, Domain>,
    pub functions: BTreeMap<String, Function>,
    pub views: BTreeMap<String, View>,
    pub tables: BTreeMap<String, SquashedTable>,
}

impl SquashedSnapshot {
    /// All columns keyed `ns.table.column`.
    #[must_use]
    pub fn columns(&self) -> BTreeMap<String, &Column> {
        self.tables
            .iter()
            .flat_map(|(key, t)| t.columns.iter().map(move |(c, col)| (format!("{key}.{c}"), col)))
            .collect()
    }

    /// All indexes keyed `ns.table.index`.
    #[must_use]
    pub fn indexes(&self) -> BTreeMap<String, &Index> {
        self.tables
            .iter()
            .flat_map(|(key, t)| t.indexes.iter().map(move |(n, i)| (format!("{key}.{n}"), i)))
            .collect()
    }
}

/// Squashes a snapshot. The snapshot should already be
/// [`normalized`](Snapshot::normalized).
#[must_use]
pub fn squash(snapshot: &Snapshot, mode: SquashMode) -> SquashedSnapshot {
    let dialect = snapshot.dialect;
    let key = |schema: &str, name: &str| entity_key(dialect, schema, name);

    let squashed = SquashedSnapshot {
        schemas: snapshot.schemas.iter().cloned().collect(),
        enums: snapshot
            .enums
            .values()
            .map(|e| (key(&e.schema, &e.name), e.clone()))
            .collect(),
        sequences: snapshot
            .sequences
            .values()
            .map(|s| (key(&s.schema, &s.name), squash_sequence(s)))
            .collect(),
        domains: snapshot
            .domains
            .values()
            .map(|d| (key(&d.schema, &d.name), squash_domain(d, mode)))
            .collect(),
        functions: snapshot
            .functions
            .values()
            .map(|f| (key(&f.schema, &f.name), squash_function(f)))
            .collect(),
        views: snapshot
            .views
            .values()
            .filter(|v| !v.is_existing)
            .map(|v| (key(&v.schema, &v.name), squash_view(v, mode)))
            .collect(),
        tables: snapshot
            .tables
            .values()
            .map(|t| (key(&t.schema, &t.name), squash_table(dialect, t, mode)))
            .collect(),
    };

    trace!(
        tables = squashed.tables.len(),
        enums = squashed.enums.len(),
        views = squashed.views.len(),
        "squashed snapshot"
    );
    squashed
}

/// Squashes a single table.
#[must_use]
pub fn squash_table(dialect: Dialect, table: &Table, mode: SquashMode) -> SquashedTable {
    SquashedTable {
        schema: table.schema.clone(),
        name: table.name.clone(),
        columns: table
            .columns
            .values()
            .map(|c| (c.name.clone(), squash_column(dialect, c, mode)))
            .collect(),
        indexes: table
            .indexes
            .iter()
            .map(|i| (i.name.clone(), squash_index(i, mode)))
            .collect(),
        foreign_keys: table
            .foreign_keys
            .iter()
            .map(|f| (f.name.clone(), squash_foreign_key(f)))
            .collect(),
        uniques: table
            .unique_constraints
            .iter()
            .map(|u| (u.name.clone(), u.clone()))
            .collect(),
        checks: table
            .check_constraints
            .iter()
            .map(|c| {
                let check = Check {
                    name: c.name.clone(),
                    value: c.value.trim().to_string(),
                };
                (c.name.clone(), check)
            })
            .collect(),
        primary_keys: table
            .composite_primary_keys
            .iter()
            .map(|p| (p.name.clone(), p.clone()))
            .collect(),
        policies: table
            .policies
            .iter()
            .map(|p| (p.name.clone(), squash_policy(p)))
            .collect(),
        is_rls_enabled: table.is_rls_enabled,
    }
}

/// Squashes a single column.
#[must_use]
pub fn squash_column(dialect: Dialect, column: &Column, mode: SquashMode) -> Column {
    let caps = dialect.capabilities();
    let mut out = column.clone();
    out.sql_type = normalize_type(&column.sql_type, mode);
    if caps.autoincrement_keyword.is_none() {
        out.autoincrement = false;
    }
    if mode == SquashMode::Push {
        out.default = column.default.as_ref().map(fold_default);
    }
    if let Some(generated) = out.generated.as_mut() {
        generated.expression = generated.expression.trim().to_string();
    }
    out.on_update = column.on_update.as_ref().map(|e| e.trim().to_lowercase());
    out
}

fn squash_index(index: &Index, mode: SquashMode) -> Index {
    let mut out = index.clone();
    out.concurrently = false;
    out.method = index.method.as_ref().map(|m| m.to_lowercase());
    for part in &mut out.columns {
        part.expression = part.expression.trim().to_string();
    }
    if mode == SquashMode::Push {
        out.with.clear();
        if out.method.as_deref() == Some("btree") {
            out.method = None;
        }
    }
    out
}

fn squash_foreign_key(fk: &ForeignKey) -> ForeignKey {
    let action = |a: &Option<String>| {
        a.as_ref()
            .map(|a| a.to_lowercase())
            .filter(|a| a != "no action")
    };
    ForeignKey {
        on_delete: action(&fk.on_delete),
        on_update: action(&fk.on_update),
        ..fk.clone()
    }
}

fn squash_policy(policy: &Policy) -> Policy {
    let mut out = policy.clone();
    out.to.sort();
    out.to.dedup();
    out.using = policy.using.as_ref().map(|s| s.trim().to_string());
    out.with_check = policy.with_check.as_ref().map(|s| s.trim().to_string());
    out
}

fn squash_sequence(sequence: &Sequence) -> Sequence {
    let mut out = sequence.clone();
    // Engine defaults are written out by introspection but omitted by hand.
    if out.increment.as_deref() == Some("1") {
        out.increment = None;
    }
    if out.cache.as_deref() == Some("1") {
        out.cache = None;
    }
    out
}

fn squash_domain(domain: &Domain, mode: SquashMode) -> Domain {
    let mut out = domain.clone();
    out.base_type = normalize_type(&domain.base_type, mode);
    out.default = domain.default.as_ref().map(|d| d.trim().to_string());
    out
}

fn squash_function(function: &Function) -> Function {
    let mut out = function.clone();
    out.body = function.body.trim().to_string();
    out.returns = function.returns.trim().to_lowercase();
    out.language = function.language.to_lowercase();
    for arg in &mut out.args {
        arg.sql_type = arg.sql_type.trim().to_lowercase();
    }
    out
}

fn squash_view(view: &View, mode: SquashMode) -> View {
    let mut out = view.clone();
    out.definition = view.definition.as_ref().map(|d| {
        if mode == SquashMode::Push {
            collapse_whitespace(d)
        } else {
            d.trim().to_string()
        }
    });
    out
}

// ============================================================================
// Normalization helpers
// ============================================================================

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static DISPLAY_WIDTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(smallint|mediumint|int|integer|bigint)\(\d+\)").expect("valid regex")
});

static TRAILING_CAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(.*?)::[a-zA-Z_"][a-zA-Z0-9_ ."\[\]()]*$"#).expect("valid regex")
});

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid regex"));

fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Trims a type and lower-cases it outside quoted segments. In push mode
/// also folds the aliases introspection reports.
#[must_use]
pub fn normalize_type(sql_type: &str, mode: SquashMode) -> String {
    let mut out = String::with_capacity(sql_type.len());
    let mut quote: Option<char> = None;
    for ch in sql_type.trim().chars() {
        match quote {
            Some(q) if ch == q => {
                quote = None;
                out.push(ch);
            }
            Some(_) => out.push(ch),
            None if ch == '"' || ch == '`' || ch == '\'' => {
                quote = Some(ch);
                out.push(ch);
            }
            None => out.extend(ch.to_lowercase()),
        }
    }
    if mode == SquashMode::Push {
        fold_type_alias(&out)
    } else {
        out
    }
}

fn fold_type_alias(sql_type: &str) -> String {
    let (base, array) = sql_type
        .find("[]")
        .map_or((sql_type, ""), |pos| sql_type.split_at(pos));
    let base = collapse_whitespace(base);
    let folded = match base.as_str() {
        "int4" => "integer".to_string(),
        "int8" => "bigint".to_string(),
        "int2" => "smallint".to_string(),
        "bool" => "boolean".to_string(),
        "float8" => "double precision".to_string(),
        "float4" => "real".to_string(),
        "timestamp without time zone" => "timestamp".to_string(),
        "timestamptz" => "timestamp with time zone".to_string(),
        "time without time zone" => "time".to_string(),
        "timetz" => "time with time zone".to_string(),
        other => {
            if let Some(rest) = other.strip_prefix("character varying") {
                format!("varchar{rest}")
            } else if let Some(rest) = other.strip_prefix("timestamp(") {
                rest.strip_suffix(") without time zone")
                    .map_or_else(|| other.to_string(), |p| format!("timestamp({p})"))
            } else if let Some(caps) = DISPLAY_WIDTH.captures(other) {
                format!("{}{}", &caps[1], &other[caps[0].len()..])
            } else {
                other.to_string()
            }
        }
    };
    format!("{folded}{array}")
}

/// Folds a default value written by an introspector into the literal form a
/// schema definition would produce.
#[must_use]
pub fn fold_default(value: &DefaultValue) -> DefaultValue {
    let DefaultValue::Sql(expr) = value else {
        return value.clone();
    };
    let mut expr = expr.trim().to_string();
    loop {
        let stripped = strip_wrapping_parens(&expr)
            .or_else(|| {
                TRAILING_CAST
                    .captures(&expr)
                    .map(|c| c[1].trim().to_string())
            });
        match stripped {
            Some(s) if s != expr && !s.is_empty() => expr = s,
            _ => break,
        }
    }

    if expr.len() >= 2 && expr.starts_with('\'') && expr.ends_with('\'') {
        let inner = &expr[1..expr.len() - 1];
        if !inner.replace("''", "").contains('\'') {
            return DefaultValue::String(inner.replace("''", "'"));
        }
    }
    if NUMBER.is_match(&expr) {
        if let Ok(i) = expr.parse::<i64>() {
            return DefaultValue::Integer(i);
        }
        if let Ok(f) = expr.parse::<f64>() {
            return DefaultValue::Float(f);
        }
    }
    match expr.to_lowercase().as_str() {
        "true" => DefaultValue::Boolean(true),
        "false" => DefaultValue::Boolean(false),
        "null" => DefaultValue::Null,
        _ => DefaultValue::Sql(expr),
    }
}

/// Removes one pair of parentheses wrapping the whole expression.
fn strip_wrapping_parens(expr: &str) -> Option<String> {
    let inner = expr.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0i32;
    let mut in_string = false;
    for ch in inner.chars() {
        match ch {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then(|| inner.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_omit_namespace_when_unsupported() {
        assert_eq!(entity_key(Dialect::Postgres, "public", "users"), "public.users");
        assert_eq!(entity_key(Dialect::Sqlite, "", "users"), "users");
        assert_eq!(
            member_key(Dialect::Postgres, "public", "users", "id"),
            "public.users.id"
        );
        assert_eq!(member_key(Dialect::Mysql, "", "users", "id"), "users.id");
    }

    #[test]
    fn type_lowercased_outside_quotes() {
        assert_eq!(
            normalize_type(" VARCHAR(255) ", SquashMode::Default),
            "varchar(255)"
        );
        assert_eq!(
            normalize_type("enum('A','b')", SquashMode::Default),
            "enum('A','b')"
        );
    }

    #[test]
    fn push_mode_folds_type_aliases() {
        assert_eq!(normalize_type("int4", SquashMode::Push), "integer");
        assert_eq!(
            normalize_type("character varying(255)", SquashMode::Push),
            "varchar(255)"
        );
        assert_eq!(normalize_type("int(11)", SquashMode::Push), "int");
        assert_eq!(normalize_type("bigint(20) unsigned", SquashMode::Push), "bigint unsigned");
        assert_eq!(normalize_type("tinyint(1)", SquashMode::Push), "tinyint(1)");
        assert_eq!(normalize_type("int4[]", SquashMode::Push), "integer[]");
        assert_eq!(normalize_type("int4", SquashMode::Default), "int4");
    }

    #[test]
    fn folds_introspected_defaults() {
        assert_eq!(
            fold_default(&DefaultValue::sql("'active'::text")),
            DefaultValue::string("active")
        );
        assert_eq!(
            fold_default(&DefaultValue::sql("'it''s'::character varying")),
            DefaultValue::string("it's")
        );
        assert_eq!(fold_default(&DefaultValue::sql("(0)")), DefaultValue::Integer(0));
        assert_eq!(fold_default(&DefaultValue::sql("false")), DefaultValue::Boolean(false));
        assert_eq!(
            fold_default(&DefaultValue::sql("now()")),
            DefaultValue::sql("now()")
        );
        assert_eq!(
            fold_default(&DefaultValue::sql("(lower(name))")),
            DefaultValue::sql("lower(name)")
        );
    }

    #[test]
    fn push_mode_ignores_index_noise() {
        let mut index = Index::new("users_email_idx", ["email"]);
        index.method = Some("BTREE".into());
        index.concurrently = true;
        index.with.insert("fillfactor".into(), "70".into());

        let plain = Index::new("users_email_idx", ["email"]);
        assert_eq!(squash_index(&index, SquashMode::Push), plain);
        assert_ne!(squash_index(&index, SquashMode::Default), plain);
    }

    #[test]
    fn column_order_is_not_compared() {
        let a = Table::new("public", "t")
            .column(Column::new("a", "int"))
            .column(Column::new("b", "int"));
        let b = Table::new("public", "t")
            .column(Column::new("b", "int"))
            .column(Column::new("a", "int"));
        assert_eq!(
            squash_table(Dialect::Postgres, &a, SquashMode::Default),
            squash_table(Dialect::Postgres, &b, SquashMode::Default)
        );
    }

    #[test]
    fn autoincrement_ignored_without_keyword() {
        let column = Column::new("id", "serial").autoincrement();
        assert!(!squash_column(Dialect::Postgres, &column, SquashMode::Default).autoincrement);
        assert!(squash_column(Dialect::Sqlite, &column, SquashMode::Default).autoincrement);
    }
}
