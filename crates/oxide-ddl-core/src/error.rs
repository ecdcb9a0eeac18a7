//! Error types for snapshot validation, diffing and rendering.

use crate::dialect::Dialect;
use crate::resolver::EntityKind;

/// Errors raised by the diff engine and the SQL renderers.
///
/// Every error is fatal: a diff either returns a complete statement list or
/// one of these, never a partial result.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The snapshot carries a version this build does not understand.
    #[error("Unsupported {dialect} snapshot version '{version}' (expected '{expected}')")]
    UnsupportedVersion {
        /// Dialect of the snapshot.
        dialect: Dialect,
        /// Version found in the snapshot.
        version: String,
        /// Version this build produces and consumes.
        expected: u32,
    },

    /// The snapshot was written by an older format and must be upgraded first.
    #[error(
        "{dialect} snapshot version '{version}' is outdated, upgrade it to '{expected}' before diffing"
    )]
    OutdatedVersion {
        /// Dialect of the snapshot.
        dialect: Dialect,
        /// Version found in the snapshot.
        version: String,
        /// Version this build produces and consumes.
        expected: u32,
    },

    /// The two snapshots target different dialects.
    #[error("Cannot diff a {from} snapshot against a {to} snapshot")]
    DialectMismatch {
        /// Dialect of the source snapshot.
        from: Dialect,
        /// Dialect of the target snapshot.
        to: Dialect,
    },

    /// Two entities of the same kind share a name inside one table.
    #[error("Duplicate {kind} name '{name}' in table '{table}'")]
    DuplicateName {
        /// Entity kind (e.g. "check constraint").
        kind: &'static str,
        /// Owning table.
        table: String,
        /// The duplicated name.
        name: String,
    },

    /// The snapshot uses an entity kind the dialect cannot express.
    #[error("{dialect} does not support {what}")]
    UnsupportedEntity {
        /// Dialect of the snapshot.
        dialect: Dialect,
        /// Description of the offending entity.
        what: String,
    },

    /// A requested change cannot be expressed in the target dialect.
    #[error("{dialect}: {operation} is not supported")]
    UnsupportedTransition {
        /// Target dialect.
        dialect: Dialect,
        /// Human readable description of the rejected change.
        operation: String,
    },

    /// The resolver returned an entity that was not among its candidates.
    #[error("Resolver returned unknown {kind} '{name}'")]
    UnknownEntity {
        /// Entity kind being resolved.
        kind: EntityKind,
        /// Display name of the entity.
        name: String,
    },

    /// The resolver dropped or duplicated a candidate.
    #[error("Resolver did not account for {kind} '{name}' exactly once")]
    UnresolvedEntity {
        /// Entity kind being resolved.
        kind: EntityKind,
        /// Display name of the entity.
        name: String,
    },

    /// A dialect name did not match any supported dialect.
    #[error("Unknown dialect '{0}'")]
    UnknownDialect(String),

    /// A rename hint could not be parsed.
    #[error("Malformed rename hint '{0}', expected 'from->to'")]
    MalformedHint(String),

    /// A statement has no rendering in the requested dialect.
    #[error("Statement '{statement}' cannot be rendered for {dialect}")]
    Unrenderable {
        /// Target dialect.
        dialect: Dialect,
        /// Statement type tag.
        statement: &'static str,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for diffing and rendering.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for an [`Error::UnsupportedTransition`].
    pub(crate) fn unsupported(dialect: Dialect, operation: impl Into<String>) -> Self {
        Self::UnsupportedTransition {
            dialect,
            operation: operation.into(),
        }
    }

    /// Returns `true` for errors raised while validating a snapshot.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedVersion { .. }
                | Self::OutdatedVersion { .. }
                | Self::DialectMismatch { .. }
                | Self::DuplicateName { .. }
                | Self::UnsupportedEntity { .. }
                | Self::Json(_)
        )
    }
}
