//! Static per-dialect capability table.
//!
//! This is the single source of truth for what each dialect can express.
//! The diff engine reads it to choose statement shapes and the renderers
//! read it to choose syntax; neither hard-codes dialect checks of its own.

use crate::snapshot::GeneratedKind;

/// Identifier quoting style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentQuote {
    /// `"name"`, embedded quotes doubled.
    Double,
    /// `` `name` ``, embedded backticks doubled.
    Backtick,
    /// `` `name` ``, embedded backticks backslash-escaped (GoogleSQL).
    BacktickEscaped,
}

/// String literal escaping style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEscape {
    /// Single quotes doubled.
    Standard,
    /// Single quotes doubled and backslashes escaped.
    MySql,
    /// Single quotes and backslashes backslash-escaped.
    GoogleSql,
}

/// How a dialect wraps `DEFAULT` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultStyle {
    /// Values rendered as-is.
    Plain,
    /// Raw SQL expressions wrapped in parentheses.
    ParenthesizeExpressions,
    /// Raw SQL expressions and literals on text/blob/json columns wrapped.
    ParenthesizeExpressionsAndText,
    /// Every default wrapped in parentheses.
    ParenthesizeAll,
}

/// How a change can be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    /// A direct `ALTER`.
    InPlace,
    /// Drop the column and add it back with the new definition.
    DropAndAdd,
    /// Fold every change on the table into a single table recreation.
    Recreate,
    /// The change cannot be expressed at all.
    Unsupported,
}

/// Native enum type support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumSupport {
    /// No standalone enum types.
    None,
    /// `ADD VALUE` can only append.
    AppendOnly,
    /// `ADD VALUE ... BEFORE` inserts at a position.
    Positional,
}

/// How an existing view can be changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAlter {
    /// Only storage parameters can be set/reset in place.
    Options,
    /// `ALTER VIEW` restates the whole definition.
    Definition,
    /// Views are dropped and created again.
    None,
}

/// Order of the statements making up a table recreation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecreateStrategy {
    /// Create `__new_X`, copy, drop `X`, rename `__new_X` to `X`.
    ShadowCopy,
    /// Rename `X` to `__old_X`, create `X`, copy, drop `__old_X`.
    RenameOld,
}

/// Which entity kinds can be renamed in place.
#[derive(Debug, Clone, Copy)]
#[allow(clippy::struct_excessive_bools)]
pub struct RenameRules {
    pub schema: bool,
    pub table: bool,
    pub column: bool,
    pub view: bool,
    pub enum_type: bool,
    pub sequence: bool,
    pub domain: bool,
    pub function: bool,
    pub index: bool,
    pub unique: bool,
    pub policy: bool,
}

/// How column and constraint changes on an existing table are applied.
#[derive(Debug, Clone, Copy)]
pub struct AlterRules {
    pub column_type: Support,
    pub nullability: Support,
    pub default: Support,
    pub autoincrement: Support,
    pub primary_key: Support,
    pub on_update: Support,
    pub add_column: Support,
    pub drop_column: Support,
    pub foreign_keys: Support,
    pub checks: Support,
    pub composite_primary_key: Support,
}

/// Generated column rules.
#[derive(Debug, Clone, Copy)]
pub struct GeneratedRules {
    pub stored: bool,
    pub virtual_: bool,
    /// Adding a brand new stored generated column.
    pub add_stored: Support,
    /// Adding a brand new virtual generated column.
    pub add_virtual: Support,
    /// Turning a plain column into a generated one.
    pub set: Support,
    /// Turning a stored generated column into a plain one.
    pub drop_stored: Support,
    /// Turning a virtual generated column into a plain one.
    pub drop_virtual: Support,
    /// Changing the expression of a stored generated column.
    pub alter_stored: Support,
    /// Changing the expression of a virtual generated column.
    pub alter_virtual: Support,
    /// Switching between stored and virtual.
    pub change_kind: Support,
}

impl GeneratedRules {
    /// Whether the storage kind exists in the dialect.
    #[must_use]
    pub const fn supports(&self, kind: GeneratedKind) -> bool {
        match kind {
            GeneratedKind::Stored => self.stored,
            GeneratedKind::Virtual => self.virtual_,
        }
    }

    /// Strategy for adding a new column with the given generation kind.
    #[must_use]
    pub const fn add(&self, kind: GeneratedKind) -> Support {
        match kind {
            GeneratedKind::Stored => self.add_stored,
            GeneratedKind::Virtual => self.add_virtual,
        }
    }

    /// Strategy for moving an existing column from one generation state to
    /// another. `None` means a plain column.
    #[must_use]
    pub const fn transition(
        &self,
        from: Option<GeneratedKind>,
        to: Option<GeneratedKind>,
        expression_changed: bool,
    ) -> Support {
        match (from, to) {
            (None, None) => Support::InPlace,
            (None, Some(_)) => self.set,
            (Some(GeneratedKind::Stored), None) => self.drop_stored,
            (Some(GeneratedKind::Virtual), None) => self.drop_virtual,
            (Some(GeneratedKind::Stored), Some(GeneratedKind::Stored)) => {
                if expression_changed {
                    self.alter_stored
                } else {
                    Support::InPlace
                }
            }
            (Some(GeneratedKind::Virtual), Some(GeneratedKind::Virtual)) => {
                if expression_changed {
                    self.alter_virtual
                } else {
                    Support::InPlace
                }
            }
            (Some(_), Some(_)) => self.change_kind,
        }
    }
}

/// Everything the diff engine and the renderers need to know about a dialect.
#[derive(Debug, Clone, Copy)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// Snapshot format version this build reads and writes.
    pub snapshot_version: u32,
    pub quote: IdentQuote,
    pub string_escape: StringEscape,
    pub default_style: DefaultStyle,
    /// Whether schemas/namespaces exist. When not, namespace statements are no-ops.
    pub namespaces: bool,
    /// Namespace left unqualified when rendering.
    pub default_namespace: &'static str,
    pub enums: EnumSupport,
    pub sequences: bool,
    pub domains: bool,
    pub functions: bool,
    pub policies: bool,
    pub materialized_views: bool,
    pub view_alter: ViewAlter,
    pub foreign_keys: bool,
    pub check_constraints: bool,
    /// Unique constraints exist only as unique indexes.
    pub uniques_as_indexes: bool,
    /// Foreign keys are declared inside `CREATE TABLE` only.
    pub inline_foreign_keys: bool,
    /// Primary key declared after the column list's closing parenthesis.
    pub trailing_primary_key: bool,
    /// Check expressions may reference columns as `table.column`.
    pub qualified_check_columns: bool,
    /// `DROP INDEX` needs `ON table`.
    pub drop_index_needs_table: bool,
    /// Dropping a table drops its indexes with it.
    pub drop_table_drops_indexes: bool,
    /// `AUTOINCREMENT`-style keyword, `None` when serial types cover it.
    pub autoincrement_keyword: Option<&'static str>,
    /// Column `ON UPDATE` expressions exist.
    pub on_update: bool,
    pub rename: RenameRules,
    pub alter: AlterRules,
    pub generated: GeneratedRules,
    pub recreate: RecreateStrategy,
}

pub(super) const POSTGRES: Capabilities = Capabilities {
    snapshot_version: 7,
    quote: IdentQuote::Double,
    string_escape: StringEscape::Standard,
    default_style: DefaultStyle::Plain,
    namespaces: true,
    default_namespace: "public",
    enums: EnumSupport::Positional,
    sequences: true,
    domains: true,
    functions: true,
    policies: true,
    materialized_views: true,
    view_alter: ViewAlter::Options,
    foreign_keys: true,
    check_constraints: true,
    uniques_as_indexes: false,
    inline_foreign_keys: false,
    trailing_primary_key: false,
    qualified_check_columns: true,
    drop_index_needs_table: false,
    drop_table_drops_indexes: true,
    autoincrement_keyword: None,
    on_update: false,
    rename: RenameRules {
        schema: true,
        table: true,
        column: true,
        view: true,
        enum_type: true,
        sequence: true,
        domain: true,
        function: true,
        index: true,
        unique: true,
        policy: true,
    },
    alter: AlterRules {
        column_type: Support::InPlace,
        nullability: Support::InPlace,
        default: Support::InPlace,
        autoincrement: Support::InPlace,
        primary_key: Support::InPlace,
        on_update: Support::Unsupported,
        add_column: Support::InPlace,
        drop_column: Support::InPlace,
        foreign_keys: Support::InPlace,
        checks: Support::InPlace,
        composite_primary_key: Support::InPlace,
    },
    generated: GeneratedRules {
        stored: true,
        virtual_: false,
        add_stored: Support::InPlace,
        add_virtual: Support::Unsupported,
        set: Support::DropAndAdd,
        drop_stored: Support::InPlace,
        drop_virtual: Support::Unsupported,
        alter_stored: Support::DropAndAdd,
        alter_virtual: Support::Unsupported,
        change_kind: Support::Unsupported,
    },
    recreate: RecreateStrategy::ShadowCopy,
};

pub(super) const MYSQL: Capabilities = Capabilities {
    snapshot_version: 5,
    quote: IdentQuote::Backtick,
    string_escape: StringEscape::MySql,
    default_style: DefaultStyle::ParenthesizeExpressionsAndText,
    namespaces: false,
    default_namespace: "",
    enums: EnumSupport::None,
    sequences: false,
    domains: false,
    functions: false,
    policies: false,
    materialized_views: false,
    view_alter: ViewAlter::Definition,
    foreign_keys: true,
    check_constraints: true,
    uniques_as_indexes: false,
    inline_foreign_keys: false,
    trailing_primary_key: false,
    qualified_check_columns: false,
    drop_index_needs_table: true,
    drop_table_drops_indexes: true,
    autoincrement_keyword: Some("AUTO_INCREMENT"),
    on_update: true,
    rename: RenameRules {
        schema: false,
        table: true,
        column: true,
        view: true,
        enum_type: false,
        sequence: false,
        domain: false,
        function: false,
        index: true,
        unique: true,
        policy: false,
    },
    alter: AlterRules {
        column_type: Support::InPlace,
        nullability: Support::InPlace,
        default: Support::InPlace,
        autoincrement: Support::InPlace,
        primary_key: Support::InPlace,
        on_update: Support::InPlace,
        add_column: Support::InPlace,
        drop_column: Support::InPlace,
        foreign_keys: Support::InPlace,
        checks: Support::InPlace,
        composite_primary_key: Support::InPlace,
    },
    generated: GeneratedRules {
        stored: true,
        virtual_: true,
        add_stored: Support::InPlace,
        add_virtual: Support::InPlace,
        set: Support::DropAndAdd,
        drop_stored: Support::InPlace,
        drop_virtual: Support::Unsupported,
        alter_stored: Support::DropAndAdd,
        alter_virtual: Support::InPlace,
        change_kind: Support::DropAndAdd,
    },
    recreate: RecreateStrategy::ShadowCopy,
};

pub(super) const SQLITE: Capabilities = Capabilities {
    snapshot_version: 6,
    quote: IdentQuote::Backtick,
    string_escape: StringEscape::Standard,
    default_style: DefaultStyle::ParenthesizeExpressions,
    namespaces: false,
    default_namespace: "",
    enums: EnumSupport::None,
    sequences: false,
    domains: false,
    functions: false,
    policies: false,
    materialized_views: false,
    view_alter: ViewAlter::None,
    foreign_keys: true,
    check_constraints: true,
    uniques_as_indexes: true,
    inline_foreign_keys: true,
    trailing_primary_key: false,
    qualified_check_columns: false,
    drop_index_needs_table: false,
    drop_table_drops_indexes: true,
    autoincrement_keyword: Some("AUTOINCREMENT"),
    on_update: false,
    rename: RenameRules {
        schema: false,
        table: true,
        column: true,
        view: false,
        enum_type: false,
        sequence: false,
        domain: false,
        function: false,
        index: false,
        unique: false,
        policy: false,
    },
    alter: AlterRules {
        column_type: Support::Recreate,
        nullability: Support::Recreate,
        default: Support::Recreate,
        autoincrement: Support::Recreate,
        primary_key: Support::Recreate,
        on_update: Support::Unsupported,
        add_column: Support::InPlace,
        drop_column: Support::InPlace,
        foreign_keys: Support::Recreate,
        checks: Support::Recreate,
        composite_primary_key: Support::Recreate,
    },
    generated: GeneratedRules {
        stored: true,
        virtual_: true,
        add_stored: Support::Recreate,
        add_virtual: Support::InPlace,
        set: Support::Recreate,
        drop_stored: Support::Recreate,
        drop_virtual: Support::Recreate,
        alter_stored: Support::Recreate,
        alter_virtual: Support::DropAndAdd,
        change_kind: Support::Recreate,
    },
    recreate: RecreateStrategy::ShadowCopy,
};

pub(super) const SINGLESTORE: Capabilities = Capabilities {
    snapshot_version: 1,
    quote: IdentQuote::Backtick,
    string_escape: StringEscape::MySql,
    default_style: DefaultStyle::ParenthesizeExpressionsAndText,
    namespaces: false,
    default_namespace: "",
    enums: EnumSupport::None,
    sequences: false,
    domains: false,
    functions: false,
    policies: false,
    materialized_views: false,
    view_alter: ViewAlter::None,
    foreign_keys: false,
    check_constraints: false,
    uniques_as_indexes: true,
    inline_foreign_keys: false,
    trailing_primary_key: false,
    qualified_check_columns: false,
    drop_index_needs_table: true,
    drop_table_drops_indexes: true,
    autoincrement_keyword: Some("AUTO_INCREMENT"),
    on_update: true,
    rename: RenameRules {
        schema: false,
        table: true,
        column: true,
        view: false,
        enum_type: false,
        sequence: false,
        domain: false,
        function: false,
        index: false,
        unique: false,
        policy: false,
    },
    alter: AlterRules {
        column_type: Support::Recreate,
        nullability: Support::Recreate,
        default: Support::Recreate,
        autoincrement: Support::Recreate,
        primary_key: Support::Recreate,
        on_update: Support::Recreate,
        add_column: Support::InPlace,
        drop_column: Support::InPlace,
        foreign_keys: Support::Unsupported,
        checks: Support::Unsupported,
        composite_primary_key: Support::Recreate,
    },
    generated: GeneratedRules {
        stored: true,
        virtual_: false,
        add_stored: Support::InPlace,
        add_virtual: Support::Unsupported,
        set: Support::Recreate,
        drop_stored: Support::Recreate,
        drop_virtual: Support::Unsupported,
        alter_stored: Support::Recreate,
        alter_virtual: Support::Unsupported,
        change_kind: Support::Unsupported,
    },
    recreate: RecreateStrategy::ShadowCopy,
};

pub(super) const SPANNER: Capabilities = Capabilities {
    snapshot_version: 1,
    quote: IdentQuote::BacktickEscaped,
    string_escape: StringEscape::GoogleSql,
    default_style: DefaultStyle::ParenthesizeAll,
    namespaces: false,
    default_namespace: "",
    enums: EnumSupport::None,
    sequences: false,
    domains: false,
    functions: false,
    policies: false,
    materialized_views: false,
    view_alter: ViewAlter::None,
    foreign_keys: true,
    check_constraints: true,
    uniques_as_indexes: true,
    inline_foreign_keys: false,
    trailing_primary_key: true,
    qualified_check_columns: false,
    drop_index_needs_table: false,
    drop_table_drops_indexes: false,
    autoincrement_keyword: Some("AUTO_INCREMENT"),
    on_update: false,
    rename: RenameRules {
        schema: false,
        table: true,
        column: false,
        view: false,
        enum_type: false,
        sequence: false,
        domain: false,
        function: false,
        index: false,
        unique: false,
        policy: false,
    },
    alter: AlterRules {
        column_type: Support::InPlace,
        nullability: Support::InPlace,
        default: Support::InPlace,
        autoincrement: Support::Unsupported,
        primary_key: Support::Recreate,
        on_update: Support::Unsupported,
        add_column: Support::InPlace,
        drop_column: Support::InPlace,
        foreign_keys: Support::InPlace,
        checks: Support::InPlace,
        composite_primary_key: Support::Recreate,
    },
    generated: GeneratedRules {
        stored: true,
        virtual_: false,
        add_stored: Support::InPlace,
        add_virtual: Support::Unsupported,
        set: Support::Unsupported,
        drop_stored: Support::Unsupported,
        drop_virtual: Support::Unsupported,
        alter_stored: Support::Unsupported,
        alter_virtual: Support::Unsupported,
        change_kind: Support::Unsupported,
    },
    recreate: RecreateStrategy::RenameOld,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_transitions_follow_table() {
        let pg = &POSTGRES.generated;
        assert_eq!(
            pg.transition(None, Some(GeneratedKind::Stored), true),
            Support::DropAndAdd
        );
        assert_eq!(
            pg.transition(Some(GeneratedKind::Stored), None, false),
            Support::InPlace
        );
        assert_eq!(
            SPANNER
                .generated
                .transition(Some(GeneratedKind::Stored), Some(GeneratedKind::Stored), true),
            Support::Unsupported
        );
        assert_eq!(
            MYSQL.generated.transition(
                Some(GeneratedKind::Stored),
                Some(GeneratedKind::Virtual),
                false
            ),
            Support::DropAndAdd
        );
    }

    #[test]
    fn unchanged_generated_expression_is_a_no_op() {
        assert_eq!(
            SQLITE.generated.transition(
                Some(GeneratedKind::Virtual),
                Some(GeneratedKind::Virtual),
                false
            ),
            Support::InPlace
        );
    }

    #[test]
    fn embedded_dialects_recreate_for_column_alters() {
        assert_eq!(SQLITE.alter.column_type, Support::Recreate);
        assert_eq!(SINGLESTORE.alter.nullability, Support::Recreate);
        assert_eq!(SQLITE.recreate, RecreateStrategy::ShadowCopy);
        assert_eq!(SPANNER.recreate, RecreateStrategy::RenameOld);
    }
}
