//! Table-level snapshot types: tables, columns and their constraints.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A column default value.
///
/// String literals are stored unescaped; quoting happens at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum DefaultValue {
    /// `NULL`.
    Null,
    /// Boolean literal.
    Boolean(bool),
    /// Integer literal.
    Integer(i64),
    /// Floating point literal.
    Float(f64),
    /// String literal (unescaped).
    String(String),
    /// Raw SQL expression, rendered verbatim.
    Sql(String),
}

impl DefaultValue {
    /// Creates a string literal default.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Creates a raw SQL expression default.
    #[must_use]
    pub fn sql(expr: impl Into<String>) -> Self {
        Self::Sql(expr.into())
    }

    /// Returns `true` for raw SQL expressions.
    #[must_use]
    pub const fn is_expression(&self) -> bool {
        matches!(self, Self::Sql(_))
    }
}

/// Storage of a generated column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratedKind {
    /// Computed on write and stored.
    Stored,
    /// Computed on read.
    Virtual,
}

impl GeneratedKind {
    /// SQL keyword for the storage kind.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Stored => "STORED",
            Self::Virtual => "VIRTUAL",
        }
    }
}

/// Generated column expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generated {
    /// Raw SQL expression.
    #[serde(rename = "as")]
    pub expression: String,
    /// Storage kind.
    #[serde(rename = "type")]
    pub kind: GeneratedKind,
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Dialect-specific type string, e.g. `varchar(255)`.
    #[serde(rename = "type")]
    pub sql_type: String,
    /// Namespace of a user-defined type (enums).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_schema: Option<String>,
    /// Whether the column is the single-column primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Whether the column rejects NULL.
    #[serde(default)]
    pub not_null: bool,
    /// Whether the column auto-increments.
    #[serde(default)]
    pub autoincrement: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Generated expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<Generated>,
    /// `ON UPDATE` expression (MySQL family only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
}

impl Column {
    /// Creates a nullable column with no default.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            type_schema: None,
            primary_key: false,
            not_null: false,
            autoincrement: false,
            default: None,
            generated: None,
            on_update: None,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Marks the column as primary key (implies NOT NULL).
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    /// Marks the column auto-incrementing.
    #[must_use]
    pub const fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Sets a generated expression.
    #[must_use]
    pub fn generated(mut self, expression: impl Into<String>, kind: GeneratedKind) -> Self {
        self.generated = Some(Generated {
            expression: expression.into(),
            kind,
        });
        self
    }

    /// Sets the namespace of a user-defined column type.
    #[must_use]
    pub fn type_schema(mut self, schema: impl Into<String>) -> Self {
        self.type_schema = Some(schema.into());
        self
    }

    /// Sets the `ON UPDATE` expression.
    #[must_use]
    pub fn on_update(mut self, expr: impl Into<String>) -> Self {
        self.on_update = Some(expr.into());
        self
    }

    /// Type name with any array suffix removed.
    #[must_use]
    pub fn base_type(&self) -> &str {
        self.sql_type.trim_end_matches("[]")
    }

    /// Returns `true` when the column's type is the given user-defined type.
    #[must_use]
    pub fn references_type(&self, schema: &str, name: &str) -> bool {
        self.type_schema.as_deref() == Some(schema) && self.base_type() == name
    }
}

/// One key part of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexColumn {
    /// Column name or raw SQL expression.
    pub expression: String,
    /// Whether `expression` is raw SQL rather than a column name.
    #[serde(default)]
    pub is_expression: bool,
    /// Ascending order.
    #[serde(default = "default_true")]
    pub asc: bool,
    /// `NULLS FIRST` / `NULLS LAST`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nulls: Option<String>,
    /// Operator class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opclass: Option<String>,
}

impl IndexColumn {
    /// An ascending plain-column key part.
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self {
            expression: name.into(),
            is_expression: false,
            asc: true,
            nulls: None,
            opclass: None,
        }
    }

    /// A raw SQL expression key part.
    #[must_use]
    pub fn expression(expr: impl Into<String>) -> Self {
        Self {
            is_expression: true,
            ..Self::column(expr)
        }
    }
}

const fn default_true() -> bool {
    true
}

/// A table index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    /// Index name.
    pub name: String,
    /// Key parts in order.
    pub columns: Vec<IndexColumn>,
    /// Whether this is a UNIQUE index.
    #[serde(default)]
    pub unique: bool,
    /// Index method (`btree`, `gin`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Partial index predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#where: Option<String>,
    /// Build without locking writes.
    #[serde(default)]
    pub concurrently: bool,
    /// Storage parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub with: BTreeMap<String, String>,
    /// Spanner `NULL_FILTERED`.
    #[serde(default)]
    pub null_filtered: bool,
    /// MySQL secondary engine attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_engine_attribute: Option<String>,
}

impl Index {
    /// Creates a plain index over the named columns.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(IndexColumn::column).collect(),
            unique: false,
            method: None,
            r#where: None,
            concurrently: false,
            with: BTreeMap::new(),
            null_filtered: false,
            secondary_engine_attribute: None,
        }
    }

    /// Marks the index UNIQUE.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// The unique index standing in for a unique constraint.
    #[must_use]
    pub fn from_unique(unique: &Unique) -> Self {
        Self::new(unique.name.clone(), unique.columns.iter().cloned()).unique()
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,
    /// Referencing columns.
    pub columns_from: Vec<String>,
    /// Namespace of the referenced table.
    #[serde(default)]
    pub schema_to: String,
    /// Referenced table.
    pub table_to: String,
    /// Referenced columns.
    pub columns_to: Vec<String>,
    /// ON DELETE action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
    /// ON UPDATE action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
}

/// A unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unique {
    /// Constraint name.
    pub name: String,
    /// Constrained columns.
    pub columns: Vec<String>,
    /// Postgres `NULLS NOT DISTINCT`.
    #[serde(default)]
    pub nulls_not_distinct: bool,
}

/// A check constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    /// Constraint name.
    pub name: String,
    /// Raw SQL predicate.
    pub value: String,
}

/// A (composite) primary key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    /// Constraint name.
    pub name: String,
    /// Key columns in order.
    pub columns: Vec<String>,
}

/// Whether a policy is permissive or restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAs {
    #[default]
    Permissive,
    Restrictive,
}

/// Command a policy applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyFor {
    #[default]
    All,
    Select,
    Insert,
    Update,
    Delete,
}

/// A row-level-security policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Policy name.
    pub name: String,
    /// Permissive or restrictive.
    #[serde(rename = "as", default)]
    pub kind: PolicyAs,
    /// Command the policy applies to.
    #[serde(rename = "for", default)]
    pub command: PolicyFor,
    /// Roles the policy applies to.
    #[serde(default)]
    pub to: Vec<String>,
    /// `USING` predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,
    /// `WITH CHECK` predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_check: Option<String>,
}

/// A table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Namespace, empty for the dialect default.
    #[serde(default)]
    pub schema: String,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: IndexMap<String, Column>,
    /// Indexes.
    #[serde(default)]
    pub indexes: Vec<Index>,
    /// Foreign keys.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    /// Composite primary keys (at most one in a valid snapshot).
    #[serde(default)]
    pub composite_primary_keys: Vec<PrimaryKey>,
    /// Unique constraints.
    #[serde(default)]
    pub unique_constraints: Vec<Unique>,
    /// Check constraints.
    #[serde(default)]
    pub check_constraints: Vec<Check>,
    /// Row-level-security policies.
    #[serde(default)]
    pub policies: Vec<Policy>,
    /// Whether row-level security is enabled.
    #[serde(default)]
    pub is_rls_enabled: bool,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            columns: IndexMap::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            composite_primary_keys: Vec::new(),
            unique_constraints: Vec::new(),
            check_constraints: Vec::new(),
            policies: Vec::new(),
            is_rls_enabled: false,
        }
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.insert(column.name.clone(), column);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Adds a composite primary key.
    #[must_use]
    pub fn primary_key<I, S>(mut self, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.composite_primary_keys.push(PrimaryKey {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Adds a unique constraint.
    #[must_use]
    pub fn unique<I, S>(mut self, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_constraints.push(Unique {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            nulls_not_distinct: false,
        });
        self
    }

    /// Adds a check constraint.
    #[must_use]
    pub fn check(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.check_constraints.push(Check {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Adds a policy.
    #[must_use]
    pub fn policy(mut self, policy: Policy) -> Self {
        self.policies.push(policy);
        self
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.values().find(|c| c.name == name)
    }

    /// Columns making up the primary key, composite or single-column.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<String> {
        if let Some(pk) = self.composite_primary_keys.first() {
            return pk.columns.clone();
        }
        self.columns
            .values()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Renames a column in place, keeping declaration order and rewriting
    /// every constraint of this table that lists it.
    pub fn rename_column(&mut self, from: &str, to: &str) {
        self.columns = std::mem::take(&mut self.columns)
            .into_iter()
            .map(|(key, mut column)| {
                if column.name == from {
                    column.name = to.to_string();
                    (to.to_string(), column)
                } else {
                    (key, column)
                }
            })
            .collect();

        let rename = |cols: &mut Vec<String>| {
            for c in cols.iter_mut().filter(|c| *c == from) {
                *c = to.to_string();
            }
        };
        for index in &mut self.indexes {
            for part in index.columns.iter_mut().filter(|p| !p.is_expression) {
                if part.expression == from {
                    part.expression = to.to_string();
                }
            }
        }
        for fk in &mut self.foreign_keys {
            rename(&mut fk.columns_from);
        }
        for pk in &mut self.composite_primary_keys {
            rename(&mut pk.columns);
        }
        for unique in &mut self.unique_constraints {
            rename(&mut unique.columns);
        }
    }
}
