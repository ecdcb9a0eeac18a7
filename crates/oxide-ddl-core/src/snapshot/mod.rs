//! Schema snapshots.
//!
//! A snapshot is the complete, versioned, dialect-specific description of a
//! schema at one revision, serialized as JSON. Snapshots are produced by an
//! external front end (schema DSL serializer or live introspection) and are
//! only read here.

mod entities;
mod table;

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use entities::{
    Domain, Enum, Function, FunctionArg, FunctionSecurity, Sequence, View, Volatility,
};
pub use table::{
    Check, Column, DefaultValue, ForeignKey, Generated, GeneratedKind, Index, IndexColumn,
    Policy, PolicyAs, PolicyFor, PrimaryKey, Table, Unique,
};

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::squash::entity_key;

/// Rename history recorded by a diff.
///
/// Keys and values use the quoted `"ns"."name"` form
/// (`"ns"."table"."column"` for columns).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Schema renames.
    #[serde(default)]
    pub schemas: BTreeMap<String, String>,
    /// Table renames and moves.
    #[serde(default)]
    pub tables: BTreeMap<String, String>,
    /// Column renames.
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
}

impl Meta {
    /// Returns `true` when no rename was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.tables.is_empty() && self.columns.is_empty()
    }
}

/// Quotes path segments into the `_meta` key form, skipping empty ones.
pub(crate) fn meta_key(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| format!("\"{p}\""))
        .collect::<Vec<_>>()
        .join(".")
}

/// A complete schema snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Snapshot format version.
    pub version: String,
    /// Target dialect.
    pub dialect: Dialect,
    /// Snapshot identifier.
    #[serde(default)]
    pub id: String,
    /// Identifier of the previous snapshot.
    #[serde(default)]
    pub prev_id: String,
    /// User namespaces (the dialect default is implicit).
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(default)]
    pub tables: IndexMap<String, Table>,
    #[serde(default)]
    pub enums: IndexMap<String, Enum>,
    #[serde(default)]
    pub sequences: IndexMap<String, Sequence>,
    #[serde(default)]
    pub views: IndexMap<String, View>,
    #[serde(default)]
    pub domains: IndexMap<String, Domain>,
    #[serde(default)]
    pub functions: IndexMap<String, Function>,
    /// Rename history.
    #[serde(rename = "_meta", default)]
    pub meta: Meta,
}

impl Snapshot {
    /// Creates an empty snapshot at the dialect's current version.
    #[must_use]
    pub fn empty(dialect: Dialect) -> Self {
        Self {
            version: dialect.current_version().to_string(),
            dialect,
            id: String::new(),
            prev_id: String::new(),
            schemas: Vec::new(),
            tables: IndexMap::new(),
            enums: IndexMap::new(),
            sequences: IndexMap::new(),
            views: IndexMap::new(),
            domains: IndexMap::new(),
            functions: IndexMap::new(),
            meta: Meta::default(),
        }
    }

    /// Parses a snapshot from JSON. Does not validate it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] when the document does not match the model.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the snapshot to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Adds a table keyed by its identity.
    #[must_use]
    pub fn with_table(mut self, table: Table) -> Self {
        let key = entity_key(self.dialect, &table.schema, &table.name);
        self.tables.insert(key, table);
        self
    }

    /// Adds an enum keyed by its identity.
    #[must_use]
    pub fn with_enum(mut self, e: Enum) -> Self {
        let key = entity_key(self.dialect, &e.schema, &e.name);
        self.enums.insert(key, e);
        self
    }

    /// Adds a sequence keyed by its identity.
    #[must_use]
    pub fn with_sequence(mut self, sequence: Sequence) -> Self {
        let key = entity_key(self.dialect, &sequence.schema, &sequence.name);
        self.sequences.insert(key, sequence);
        self
    }

    /// Adds a view keyed by its identity.
    #[must_use]
    pub fn with_view(mut self, view: View) -> Self {
        let key = entity_key(self.dialect, &view.schema, &view.name);
        self.views.insert(key, view);
        self
    }

    /// Adds a domain keyed by its identity.
    #[must_use]
    pub fn with_domain(mut self, domain: Domain) -> Self {
        let key = entity_key(self.dialect, &domain.schema, &domain.name);
        self.domains.insert(key, domain);
        self
    }

    /// Adds a function keyed by its identity.
    #[must_use]
    pub fn with_function(mut self, function: Function) -> Self {
        let key = entity_key(self.dialect, &function.schema, &function.name);
        self.functions.insert(key, function);
        self
    }

    /// Adds a user namespace.
    #[must_use]
    pub fn with_schema(mut self, name: impl Into<String>) -> Self {
        self.schemas.push(name.into());
        self
    }

    /// Looks up a table by identity.
    #[must_use]
    pub fn table(&self, schema: &str, name: &str) -> Option<&Table> {
        self.tables
            .values()
            .find(|t| t.schema == schema && t.name == name)
    }

    /// Mutable lookup of a table by identity.
    pub fn table_mut(&mut self, schema: &str, name: &str) -> Option<&mut Table> {
        self.tables
            .values_mut()
            .find(|t| t.schema == schema && t.name == name)
    }

    /// Checks the version, the entity kinds the dialect can express and
    /// name uniqueness inside every table.
    ///
    /// # Errors
    ///
    /// Returns the first version, entity or duplicate-name violation found.
    pub fn validate(&self) -> Result<()> {
        self.validate_version()?;
        self.validate_entities()?;
        for table in self.tables.values() {
            validate_table(table)?;
        }
        Ok(())
    }

    fn validate_version(&self) -> Result<()> {
        let expected = self.dialect.current_version();
        match self.version.trim().parse::<u32>() {
            Ok(v) if v == expected => Ok(()),
            Ok(v) if v < expected => Err(Error::OutdatedVersion {
                dialect: self.dialect,
                version: self.version.clone(),
                expected,
            }),
            _ => Err(Error::UnsupportedVersion {
                dialect: self.dialect,
                version: self.version.clone(),
                expected,
            }),
        }
    }

    fn validate_entities(&self) -> Result<()> {
        let caps = self.dialect.capabilities();
        let unsupported = |what: &str| Error::UnsupportedEntity {
            dialect: self.dialect,
            what: what.to_string(),
        };

        if !self.enums.is_empty() && caps.enums == crate::dialect::EnumSupport::None {
            return Err(unsupported("enum types"));
        }
        if !self.sequences.is_empty() && !caps.sequences {
            return Err(unsupported("sequences"));
        }
        if !self.domains.is_empty() && !caps.domains {
            return Err(unsupported("domains"));
        }
        if !self.functions.is_empty() && !caps.functions {
            return Err(unsupported("functions"));
        }
        for view in self.views.values() {
            if view.materialized && !caps.materialized_views {
                return Err(unsupported("materialized views"));
            }
            if view.definition.is_none() && !view.is_existing {
                return Err(unsupported(&format!(
                    "view '{}' without a definition",
                    view.name
                )));
            }
        }
        for table in self.tables.values() {
            if !table.policies.is_empty() && !caps.policies {
                return Err(unsupported("row-level-security policies"));
            }
            if !table.foreign_keys.is_empty() && !caps.foreign_keys {
                return Err(unsupported("foreign keys"));
            }
            if !table.check_constraints.is_empty() && !caps.check_constraints {
                return Err(unsupported("check constraints"));
            }
            for column in table.columns.values() {
                if let Some(generated) = &column.generated {
                    if !caps.generated.supports(generated.kind) {
                        return Err(unsupported(&format!(
                            "{} generated columns",
                            generated.kind.as_sql().to_lowercase()
                        )));
                    }
                }
                if column.on_update.is_some() && !caps.on_update {
                    return Err(unsupported("ON UPDATE column expressions"));
                }
            }
        }
        Ok(())
    }

    /// Returns a copy with namespaces made explicit: empty namespaces become
    /// the dialect default, and dialects without namespaces drop them.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let caps = self.dialect.capabilities();
        let fill = |schema: &mut String| {
            if !caps.namespaces {
                schema.clear();
            } else if schema.is_empty() {
                *schema = caps.default_namespace.to_string();
            }
        };

        let mut out = self.clone();
        for table in out.tables.values_mut() {
            fill(&mut table.schema);
            for fk in &mut table.foreign_keys {
                fill(&mut fk.schema_to);
            }
            for column in table.columns.values_mut() {
                if let Some(schema) = column.type_schema.as_mut() {
                    fill(schema);
                }
                if !caps.namespaces {
                    column.type_schema = None;
                }
            }
        }
        for e in out.enums.values_mut() {
            fill(&mut e.schema);
        }
        for s in out.sequences.values_mut() {
            fill(&mut s.schema);
        }
        for v in out.views.values_mut() {
            fill(&mut v.schema);
        }
        for d in out.domains.values_mut() {
            fill(&mut d.schema);
        }
        for f in out.functions.values_mut() {
            fill(&mut f.schema);
        }
        if !caps.namespaces {
            out.schemas.clear();
        }
        out.schemas.retain(|s| s != caps.default_namespace);
        out
    }
}

fn validate_table(table: &Table) -> Result<()> {
    fn unique_names<'a>(
        kind: &'static str,
        table: &Table,
        names: impl Iterator<Item = &'a str>,
    ) -> Result<()> {
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name) {
                return Err(Error::DuplicateName {
                    kind,
                    table: table.name.clone(),
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    unique_names("column", table, table.columns.values().map(|c| c.name.as_str()))?;
    unique_names("index", table, table.indexes.iter().map(|i| i.name.as_str()))?;
    unique_names(
        "foreign key",
        table,
        table.foreign_keys.iter().map(|f| f.name.as_str()),
    )?;
    unique_names(
        "unique constraint",
        table,
        table.unique_constraints.iter().map(|u| u.name.as_str()),
    )?;
    unique_names(
        "check constraint",
        table,
        table.check_constraints.iter().map(|c| c.name.as_str()),
    )?;
    unique_names(
        "primary key",
        table,
        table.composite_primary_keys.iter().map(|p| p.name.as_str()),
    )?;
    unique_names("policy", table, table.policies.iter().map(|p| p.name.as_str()))?;
    if table.composite_primary_keys.len() > 1 {
        return Err(Error::DuplicateName {
            kind: "primary key",
            table: table.name.clone(),
            name: table.composite_primary_keys[1].name.clone(),
        });
    }
    Ok(())
}
