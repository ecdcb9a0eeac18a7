//! Snapshot differ and multi-dialect DDL generator.
//!
//! `oxide-ddl-core` compares two JSON snapshots of a database schema and
//! produces the ordered DDL turning the first into the second, for
//! PostgreSQL, MySQL, SQLite, SingleStore and Spanner.
//!
//! # Architecture
//!
//! - **Snapshot** - Versioned, dialect-tagged description of a schema
//! - **Squasher** - Reduces snapshots to comparable keyed maps
//! - **Resolver** - Decides which disappeared/appeared pairs are renames or moves
//! - **Diff engine** - Emits typed [`Statement`]s in dependency order
//! - **Capabilities** - Static table of what each dialect can express
//! - **Dialect** - Renders statements to SQL
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_ddl_core::prelude::*;
//!
//! let from = Snapshot::empty(Dialect::Postgres);
//! let to = Snapshot::empty(Dialect::Postgres).with_table(
//!     Table::new("public", "users")
//!         .column(Column::new("id", "serial").primary_key())
//!         .column(Column::new("email", "text").not_null()),
//! );
//!
//! let plan = diff(&from, &to, &mut NoRenames, &DiffOptions::new())?;
//! for sql in plan.to_sql()? {
//!     println!("{sql}");
//! }
//! ```
//!
//! Renames are never guessed. Pass a [`HintResolver`] with `from->to` hints
//! (or implement [`Resolver`]) to turn a drop and a create into a rename:
//!
//! ```rust,ignore
//! let mut resolver = HintResolver::new(["public.users->public.people"])?;
//! let plan = diff(&from, &to, &mut resolver, &DiffOptions::new())?;
//! ```

pub mod dialect;
pub mod diff;
pub mod error;
pub mod resolver;
pub mod snapshot;
pub mod squash;
pub mod statement;

pub use dialect::{render_all, Dialect, MigrationDialect};
pub use diff::{diff, DiffOptions, DiffWarning, MigrationPlan, ViewRenameFallback};
pub use error::{Error, Result};
pub use resolver::{HintResolver, NoRenames, Resolver};
pub use snapshot::Snapshot;
pub use squash::{squash, SquashMode};
pub use statement::Statement;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::dialect::{
        render_all, Capabilities, Dialect, MigrationDialect, MySqlDialect, PostgresDialect,
        SingleStoreDialect, SpannerDialect, SqliteDialect,
    };
    pub use crate::diff::{diff, DiffOptions, DiffWarning, MigrationPlan, ViewRenameFallback};
    pub use crate::error::{Error, Result};
    pub use crate::resolver::{
        EntityKind, EntityRef, HintResolver, NoRenames, Resolution, ResolveInput, Resolver,
    };
    pub use crate::snapshot::{
        Check, Column, DefaultValue, Domain, Enum, ForeignKey, Function, GeneratedKind, Index,
        IndexColumn, Meta, Policy, PrimaryKey, Sequence, Snapshot, Table, Unique, View,
    };
    pub use crate::squash::{squash, SquashMode};
    pub use crate::statement::Statement;
}
