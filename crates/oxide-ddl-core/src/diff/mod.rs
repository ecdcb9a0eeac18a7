//! Snapshot diffing.
//!
//! [`diff`] compares two snapshots of the same dialect and produces the
//! ordered statement list turning the first into the second. Entity kinds
//! are resolved in dependency order (schemas, types, functions, tables,
//! columns, constraints, views); renames found along the way are applied to
//! a working copy of the source snapshot so that later kinds compare against
//! post-rename identities.
//!
//! Statements are collected into buckets and concatenated at the end, which
//! fixes the cross-entity order independently of processing order.

mod columns;
mod constraints;
mod entities;
mod recreate;
mod tables;
mod views;

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::dialect::{render_all, Capabilities, Dialect};
use crate::error::{Error, Result};
use crate::resolver::{resolve_checked, EntityKind, EntityRef, Resolution, Resolver};
use crate::snapshot::{Domain, Enum, Function, Meta, Sequence, Snapshot, Table, View};
use crate::squash::{entity_key, SquashMode};
use crate::statement::Statement;

// ============================================================================
// Options and results
// ============================================================================

/// What to do when a view is renamed in a dialect without view renames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewRenameFallback {
    /// Drop the old view and create the new one, with a warning.
    #[default]
    Recreate,
    /// Reject the diff.
    Fail,
}

/// Diff configuration.
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    /// Squash mode used for comparisons.
    pub mode: SquashMode,
    /// Handling of view renames the dialect cannot express.
    pub view_rename_fallback: ViewRenameFallback,
    /// Emit drop + create for hinted unique-constraint renames, as older
    /// migration histories did.
    pub legacy_constraint_recreate: bool,
}

impl DiffOptions {
    /// Default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the squash mode.
    #[must_use]
    pub const fn mode(mut self, mode: SquashMode) -> Self {
        self.mode = mode;
        self
    }

    /// Compares against an introspected snapshot.
    #[must_use]
    pub const fn push(self) -> Self {
        self.mode(SquashMode::Push)
    }

    /// Sets the view rename fallback.
    #[must_use]
    pub const fn view_rename_fallback(mut self, fallback: ViewRenameFallback) -> Self {
        self.view_rename_fallback = fallback;
        self
    }

    /// Enables the legacy constraint output.
    #[must_use]
    pub const fn legacy_constraint_recreate(mut self, enabled: bool) -> Self {
        self.legacy_constraint_recreate = enabled;
        self
    }
}

/// A non-fatal diagnostic produced while diffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffWarning {
    /// A rename was replaced by drop + create.
    RenameNotSupported {
        kind: EntityKind,
        from: String,
        to: String,
    },
    /// A table is rebuilt because the dialect cannot alter it in place.
    TableRecreated { table: String, reason: String },
}

impl fmt::Display for DiffWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RenameNotSupported { kind, from, to } => write!(
                f,
                "{kind} '{from}' cannot be renamed to '{to}' in place, recreating it"
            ),
            Self::TableRecreated { table, reason } => {
                write!(f, "table '{table}' is recreated: {reason}")
            }
        }
    }
}

/// The result of a diff.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    /// Dialect of both snapshots.
    pub dialect: Dialect,
    /// Ordered statements.
    pub statements: Vec<Statement>,
    /// Diagnostics.
    pub warnings: Vec<DiffWarning>,
    /// Renames performed, to be stored as the target snapshot's `_meta`.
    pub meta: Meta,
}

impl MigrationPlan {
    /// Returns `true` when the snapshots are equivalent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Renders every statement to SQL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unrenderable`] for a statement the dialect cannot
    /// express.
    pub fn to_sql(&self) -> Result<Vec<String>> {
        render_all(self.dialect.renderer().as_ref(), &self.statements)
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Computes the statements turning `from` into `to`.
///
/// Both snapshots are validated first. Renames and moves are decided by
/// `resolver`; every answer is checked against the resolver contract.
///
/// # Errors
///
/// Fails on mismatched dialects, an invalid snapshot, a resolver answer
/// that breaks the contract, or a change the dialect cannot express.
pub fn diff(
    from: &Snapshot,
    to: &Snapshot,
    resolver: &mut dyn Resolver,
    options: &DiffOptions,
) -> Result<MigrationPlan> {
    if from.dialect != to.dialect {
        return Err(Error::DialectMismatch {
            from: from.dialect,
            to: to.dialect,
        });
    }
    from.validate()?;
    to.validate()?;

    let dialect = to.dialect;
    debug!(dialect = %dialect, mode = ?options.mode, "diffing snapshots");

    let mut differ = Differ {
        dialect,
        caps: dialect.capabilities(),
        options,
        resolver,
        prev: rekeyed(from.normalized()),
        next: rekeyed(to.normalized()),
        out: Buckets::default(),
        warnings: Vec::new(),
        meta: Meta::default(),
        enum_recreates: Vec::new(),
        table_origins: HashMap::new(),
    };

    differ.schemas()?;
    differ.enums()?;
    differ.sequences()?;
    differ.domains()?;
    differ.functions()?;
    differ.tables()?;
    differ.recreate_enums();
    differ.alter_tables()?;
    differ.views()?;

    Ok(differ.finish())
}

// ============================================================================
// Differ state
// ============================================================================

/// Statements grouped by execution phase.
#[derive(Debug, Default)]
struct Buckets {
    schemas: Vec<Statement>,
    types: Vec<Statement>,
    pre_drops: Vec<Statement>,
    functions: Vec<Statement>,
    tables: Vec<Statement>,
    enum_recreates: Vec<Statement>,
    table_alters: Vec<Statement>,
    creates: Vec<Statement>,
    views: Vec<Statement>,
    table_drops: Vec<Statement>,
    function_drops: Vec<Statement>,
    domain_drops: Vec<Statement>,
    sequence_drops: Vec<Statement>,
    enum_drops: Vec<Statement>,
    schema_drops: Vec<Statement>,
}

impl Buckets {
    fn into_statements(self) -> Vec<Statement> {
        let buckets = [
            ("schemas", self.schemas),
            ("types", self.types),
            ("pre_drops", self.pre_drops),
            ("functions", self.functions),
            ("tables", self.tables),
            ("enum_recreates", self.enum_recreates),
            ("table_alters", self.table_alters),
            ("creates", self.creates),
            ("views", self.views),
            ("table_drops", self.table_drops),
            ("function_drops", self.function_drops),
            ("domain_drops", self.domain_drops),
            ("sequence_drops", self.sequence_drops),
            ("enum_drops", self.enum_drops),
            ("schema_drops", self.schema_drops),
        ];
        let mut out = Vec::new();
        for (name, statements) in buckets {
            if !statements.is_empty() {
                debug!(bucket = name, statements = statements.len(), "emitting");
            }
            out.extend(statements);
        }
        out
    }
}

struct Differ<'a> {
    dialect: Dialect,
    caps: &'static Capabilities,
    options: &'a DiffOptions,
    resolver: &'a mut dyn Resolver,
    /// Working copy of the source snapshot, rewritten by renames.
    prev: Snapshot,
    next: Snapshot,
    out: Buckets,
    warnings: Vec<DiffWarning>,
    meta: Meta,
    /// Enums whose values were removed or reordered, as (old, new).
    enum_recreates: Vec<(Enum, Enum)>,
    /// Identity of renamed or moved tables before this diff, by new key.
    table_origins: HashMap<String, EntityRef>,
}

impl Differ<'_> {
    fn key(&self, schema: &str, name: &str) -> String {
        entity_key(self.dialect, schema, name)
    }

    fn resolve(
        &mut self,
        kind: EntityKind,
        created: Vec<EntityRef>,
        deleted: Vec<EntityRef>,
    ) -> Result<Resolution> {
        resolve_checked(&mut *self.resolver, kind, created, deleted)
    }

    fn unsupported(&self, operation: impl Into<String>) -> Error {
        Error::unsupported(self.dialect, operation)
    }

    fn warn(&mut self, warning: DiffWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    fn finish(self) -> MigrationPlan {
        let statements = self.out.into_statements();
        debug!(
            statements = statements.len(),
            warnings = self.warnings.len(),
            "diff complete"
        );
        MigrationPlan {
            dialect: self.dialect,
            statements,
            warnings: self.warnings,
            meta: self.meta,
        }
    }
}

// ============================================================================
// Keyed-map helpers
// ============================================================================

/// An entity whose identity can be rewritten by a rename or move.
trait Located {
    fn locate(&mut self, schema: &str, name: &str);
}

macro_rules! impl_located {
    ($($ty:ty),*) => {
        $(impl Located for $ty {
            fn locate(&mut self, schema: &str, name: &str) {
                self.schema = schema.to_string();
                self.name = name.to_string();
            }
        })*
    };
}

impl_located!(Table, Enum, Sequence, Domain, Function, View);

/// Moves an entity of the working copy to a new identity, re-keying it.
fn relocate<V: Located>(
    map: &mut IndexMap<String, V>,
    dialect: Dialect,
    from: &EntityRef,
    to: &EntityRef,
) {
    if let Some(mut entity) = map.shift_remove(&entity_key(dialect, &from.schema, &from.name)) {
        entity.locate(&to.schema, &to.name);
        map.insert(entity_key(dialect, &to.schema, &to.name), entity);
    }
}

/// Entities present only in `next` (created) and only in `prev` (deleted),
/// in declaration order.
fn changed_refs<V>(
    prev: &IndexMap<String, V>,
    next: &IndexMap<String, V>,
    make: impl Fn(&V) -> EntityRef,
) -> (Vec<EntityRef>, Vec<EntityRef>) {
    let created = next
        .iter()
        .filter(|(k, _)| !prev.contains_key(*k))
        .map(|(_, v)| make(v))
        .collect();
    let deleted = prev
        .iter()
        .filter(|(k, _)| !next.contains_key(*k))
        .map(|(_, v)| make(v))
        .collect();
    (created, deleted)
}

/// Keys present in both maps, in `next` order.
fn common_keys<V>(prev: &IndexMap<String, V>, next: &IndexMap<String, V>) -> Vec<String> {
    next.keys()
        .filter(|k| prev.contains_key(*k))
        .cloned()
        .collect()
}

fn rekey<V>(map: IndexMap<String, V>, key: impl Fn(&V) -> String) -> IndexMap<String, V> {
    map.into_values().map(|v| (key(&v), v)).collect()
}

/// Re-keys every entity map by identity.
fn rekeyed(mut snapshot: Snapshot) -> Snapshot {
    let d = snapshot.dialect;
    snapshot.tables = rekey(snapshot.tables, |t| entity_key(d, &t.schema, &t.name));
    snapshot.enums = rekey(snapshot.enums, |e| entity_key(d, &e.schema, &e.name));
    snapshot.sequences = rekey(snapshot.sequences, |s| entity_key(d, &s.schema, &s.name));
    snapshot.views = rekey(snapshot.views, |v| entity_key(d, &v.schema, &v.name));
    snapshot.domains = rekey(snapshot.domains, |x| entity_key(d, &x.schema, &x.name));
    snapshot.functions = rekey(snapshot.functions, |f| entity_key(d, &f.schema, &f.name));
    snapshot
}
