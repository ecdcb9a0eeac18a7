//! Rename/move disambiguation.
//!
//! The diff engine sees entities disappear from one snapshot and appear in
//! the other. Whether such a pair is a rename, a move between namespaces or
//! an independent drop and create cannot be inferred from the snapshots, so
//! it asks a [`Resolver`] for every entity kind in dependency order.

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};
use crate::snapshot::Meta;

/// Entity kinds the diff engine resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Schema,
    Enum,
    Sequence,
    Domain,
    Function,
    Table,
    Column,
    View,
    Index,
    Unique,
    Policy,
}

impl EntityKind {
    /// Human readable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Enum => "enum",
            Self::Sequence => "sequence",
            Self::Domain => "domain",
            Self::Function => "function",
            Self::Table => "table",
            Self::Column => "column",
            Self::View => "view",
            Self::Index => "index",
            Self::Unique => "unique constraint",
            Self::Policy => "policy",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lightweight identity of a candidate entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    /// Namespace, empty in dialects without namespaces.
    pub schema: String,
    /// Owning table for table members.
    pub table: Option<String>,
    /// Entity name.
    pub name: String,
}

impl EntityRef {
    /// A namespaced top-level entity.
    #[must_use]
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: None,
            name: name.into(),
        }
    }

    /// A member of a table (column, index, constraint, policy).
    #[must_use]
    pub fn member(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: Some(table.into()),
            name: name.into(),
        }
    }

    /// Key in the squasher's dotted form, empty segments omitted.
    #[must_use]
    pub fn key(&self) -> String {
        [
            self.schema.as_str(),
            self.table.as_deref().unwrap_or_default(),
            self.name.as_str(),
        ]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".")
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Candidates handed to a resolver.
#[derive(Debug, Clone)]
pub struct ResolveInput {
    /// Kind being resolved.
    pub kind: EntityKind,
    /// Entities only present in the target snapshot.
    pub created: Vec<EntityRef>,
    /// Entities only present in the source snapshot.
    pub deleted: Vec<EntityRef>,
}

/// A rename pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: EntityRef,
    pub to: EntityRef,
}

/// A namespace move of an entity keeping its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub name: String,
    pub schema_from: String,
    pub schema_to: String,
}

impl Move {
    pub(crate) fn from_ref(&self) -> EntityRef {
        EntityRef::new(self.schema_from.clone(), self.name.clone())
    }

    pub(crate) fn to_ref(&self) -> EntityRef {
        EntityRef::new(self.schema_to.clone(), self.name.clone())
    }
}

/// A resolver's answer.
///
/// `created ∪ renamed.to ∪ moved` must equal the input's created set, and
/// likewise for deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub created: Vec<EntityRef>,
    pub deleted: Vec<EntityRef>,
    pub renamed: Vec<Rename>,
    pub moved: Vec<Move>,
}

impl Resolution {
    /// Everything stays created/deleted.
    #[must_use]
    pub fn unchanged(input: &ResolveInput) -> Self {
        Self {
            created: input.created.clone(),
            deleted: input.deleted.clone(),
            renamed: Vec::new(),
            moved: Vec::new(),
        }
    }
}

/// Strategy deciding which created/deleted pairs are renames or moves.
pub trait Resolver {
    /// Resolves one entity kind.
    fn resolve(&mut self, input: ResolveInput) -> Result<Resolution>;
}

/// Resolver that never pairs anything: every change is a drop and a create.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRenames;

impl Resolver for NoRenames {
    fn resolve(&mut self, input: ResolveInput) -> Result<Resolution> {
        Ok(Resolution::unchanged(&input))
    }
}

/// Resolver driven by explicit `from->to` hints.
///
/// Hints use the squasher's keys (`ns.name`, `ns.table.column`, or without
/// the namespace segment in dialects that have none). A hint pairs a deleted
/// and a created entity when both keys match exactly; a pair whose names
/// agree but whose namespaces differ is a move, anything else a rename.
#[derive(Debug, Clone, Default)]
pub struct HintResolver {
    hints: Vec<(String, String)>,
}

impl HintResolver {
    /// Parses `from->to` hint strings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHint`] for a hint without `->`.
    pub fn new<I, S>(hints: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Vec::new();
        for hint in hints {
            let hint = hint.as_ref();
            let (from, to) = hint
                .split_once("->")
                .map(|(f, t)| (f.trim(), t.trim()))
                .filter(|(f, t)| !f.is_empty() && !t.is_empty())
                .ok_or_else(|| Error::MalformedHint(hint.to_string()))?;
            parsed.push((from.to_string(), to.to_string()));
        }
        Ok(Self { hints: parsed })
    }

    /// Replays the renames recorded in a snapshot's `_meta` block.
    #[must_use]
    pub fn from_meta(meta: &Meta) -> Self {
        let hints = meta
            .schemas
            .iter()
            .chain(&meta.tables)
            .chain(&meta.columns)
            .map(|(from, to)| (unquote_meta_key(from), unquote_meta_key(to)))
            .collect();
        Self { hints }
    }

    /// Number of hints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hints.len()
    }

    /// Returns `true` when there are no hints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}

impl Resolver for HintResolver {
    fn resolve(&mut self, input: ResolveInput) -> Result<Resolution> {
        let mut created = input.created;
        let mut deleted = input.deleted;
        let mut renamed = Vec::new();
        let mut moved = Vec::new();

        for (from, to) in &self.hints {
            let Some(d) = deleted.iter().position(|e| e.key() == *from) else {
                continue;
            };
            let Some(c) = created.iter().position(|e| e.key() == *to) else {
                continue;
            };
            let from = deleted.remove(d);
            let to = created.remove(c);
            if from.name == to.name && from.table == to.table && from.schema != to.schema {
                moved.push(Move {
                    name: to.name,
                    schema_from: from.schema,
                    schema_to: to.schema,
                });
            } else {
                renamed.push(Rename { from, to });
            }
        }

        Ok(Resolution {
            created,
            deleted,
            renamed,
            moved,
        })
    }
}

/// `"public"."users"` to `public.users`.
fn unquote_meta_key(key: &str) -> String {
    key.split("\".\"")
        .map(|s| s.trim_matches('"'))
        .collect::<Vec<_>>()
        .join(".")
}

/// Calls the resolver and checks its answer against the contract.
pub(crate) fn resolve_checked(
    resolver: &mut dyn Resolver,
    kind: EntityKind,
    created: Vec<EntityRef>,
    deleted: Vec<EntityRef>,
) -> Result<Resolution> {
    if created.is_empty() || deleted.is_empty() {
        // Nothing to pair.
        return Ok(Resolution {
            created,
            deleted,
            ..Resolution::default()
        });
    }

    let input = ResolveInput {
        kind,
        created,
        deleted,
    };
    let original = input.clone();
    let resolution = resolver.resolve(input)?;
    validate(&original, &resolution)?;

    debug!(
        kind = %kind,
        renamed = resolution.renamed.len(),
        moved = resolution.moved.len(),
        created = resolution.created.len(),
        deleted = resolution.deleted.len(),
        "resolved"
    );
    Ok(resolution)
}

fn validate(input: &ResolveInput, resolution: &Resolution) -> Result<()> {
    let kind = input.kind;

    let check_side = |original: &[EntityRef], returned: Vec<EntityRef>| -> Result<()> {
        let known: HashSet<&EntityRef> = original.iter().collect();
        let mut seen = HashSet::new();
        for entity in &returned {
            if !known.contains(entity) {
                return Err(Error::UnknownEntity {
                    kind,
                    name: entity.key(),
                });
            }
            if !seen.insert(entity.clone()) {
                return Err(Error::UnresolvedEntity {
                    kind,
                    name: entity.key(),
                });
            }
        }
        if let Some(missing) = original.iter().find(|e| !seen.contains(*e)) {
            return Err(Error::UnresolvedEntity {
                kind,
                name: missing.key(),
            });
        }
        Ok(())
    };

    let created = resolution
        .created
        .iter()
        .cloned()
        .chain(resolution.renamed.iter().map(|r| r.to.clone()))
        .chain(resolution.moved.iter().map(Move::to_ref))
        .collect();
    check_side(&input.created, created)?;

    let deleted = resolution
        .deleted
        .iter()
        .cloned()
        .chain(resolution.renamed.iter().map(|r| r.from.clone()))
        .chain(resolution.moved.iter().map(Move::from_ref))
        .collect();
    check_side(&input.deleted, deleted)
}
