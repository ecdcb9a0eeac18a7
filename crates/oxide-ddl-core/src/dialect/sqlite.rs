//! SQLite dialect for migrations.
//!
//! SQLite alters almost nothing in place; the diff engine turns most column
//! and constraint changes into a table rebuild, which the provided
//! `recreate_table` renders with a `__new_` shadow table.

use super::{Dialect, MigrationDialect};

/// SQLite dialect for migration SQL generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MigrationDialect for SqliteDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }
}
