//! Dialect-specific SQL generation for migration statements.
//!
//! Every dialect implements [`MigrationDialect`]. The trait's provided
//! methods render standard SQL and consult the dialect's [`Capabilities`]
//! for everything that varies (quoting, literal escaping, constraint
//! placement, recreate order); implementations only override the statements
//! whose syntax differs.

mod capabilities;
mod mysql;
mod postgres;
mod singlestore;
mod spanner;
mod sqlite;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use capabilities::{
    AlterRules, Capabilities, DefaultStyle, EnumSupport, GeneratedRules, IdentQuote,
    RecreateStrategy, RenameRules, StringEscape, Support, ViewAlter,
};
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use singlestore::SingleStoreDialect;
pub use spanner::SpannerDialect;
pub use sqlite::SqliteDialect;

use crate::error::{Error, Result};
use crate::snapshot::{Check, Column, DefaultValue, ForeignKey, IndexColumn, Policy, Table, Unique};
use crate::statement::{
    AddColumnStatement, AddEnumValueStatement, AlterColumnStatement, AlterDomainStatement,
    AlterPrimaryKeyStatement, AlterViewStatement, CheckStatement, CreateEnumStatement,
    CreateFunctionStatement, CreateTableStatement, DomainAction, DomainStatement,
    DropColumnStatement, EntityStatement, FunctionStatement, IndexStatement,
    MoveFunctionStatement, MoveStatement, MoveViewStatement, PolicyStatement,
    PrimaryKeyStatement, RecreateTableStatement, ReferenceStatement, RenameFunctionStatement,
    RenameMemberStatement, RenameSchemaStatement, RenameStatement, RenameViewStatement,
    SchemaStatement, SequenceStatement, SetColumnTypeStatement, Statement, TableStatement,
    UniqueStatement, ViewStatement,
};

/// Target SQL engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    /// PostgreSQL.
    #[serde(rename = "postgresql")]
    Postgres,
    /// MySQL.
    #[serde(rename = "mysql")]
    Mysql,
    /// SQLite.
    #[serde(rename = "sqlite")]
    Sqlite,
    /// SingleStore.
    #[serde(rename = "singlestore")]
    SingleStore,
    /// Cloud Spanner (GoogleSQL).
    #[serde(rename = "spanner")]
    Spanner,
}

impl Dialect {
    /// All dialects.
    pub const ALL: [Self; 5] = [
        Self::Postgres,
        Self::Mysql,
        Self::Sqlite,
        Self::SingleStore,
        Self::Spanner,
    ];

    /// Tag used in snapshot JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgresql",
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
            Self::SingleStore => "singlestore",
            Self::Spanner => "spanner",
        }
    }

    /// The dialect's capability record.
    #[must_use]
    pub const fn capabilities(self) -> &'static Capabilities {
        match self {
            Self::Postgres => &capabilities::POSTGRES,
            Self::Mysql => &capabilities::MYSQL,
            Self::Sqlite => &capabilities::SQLITE,
            Self::SingleStore => &capabilities::SINGLESTORE,
            Self::Spanner => &capabilities::SPANNER,
        }
    }

    /// Snapshot format version this build reads and writes.
    #[must_use]
    pub const fn current_version(self) -> u32 {
        self.capabilities().snapshot_version
    }

    /// The SQL renderer for this dialect.
    #[must_use]
    pub fn renderer(self) -> Box<dyn MigrationDialect> {
        match self {
            Self::Postgres => Box::new(PostgresDialect::new()),
            Self::Mysql => Box::new(MySqlDialect::new()),
            Self::Sqlite => Box::new(SqliteDialect::new()),
            Self::SingleStore => Box::new(SingleStoreDialect::new()),
            Self::Spanner => Box::new(SpannerDialect::new()),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(Self::Postgres),
            "mysql" => Ok(Self::Mysql),
            "sqlite" => Ok(Self::Sqlite),
            "singlestore" => Ok(Self::SingleStore),
            "spanner" => Ok(Self::Spanner),
            _ => Err(Error::UnknownDialect(s.to_string())),
        }
    }
}

/// Renders a statement list, concatenating each statement's output in order.
///
/// # Errors
///
/// Returns the first [`Error::Unrenderable`] raised by `dialect`.
pub fn render_all(dialect: &dyn MigrationDialect, statements: &[Statement]) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for statement in statements {
        out.extend(dialect.generate_sql(statement)?);
    }
    Ok(out)
}

/// Roles rendered without quoting in policies.
const POLICY_KEYWORD_ROLES: [&str; 4] = ["public", "current_role", "current_user", "session_user"];

/// Returns `true` when one pair of parentheses wraps the whole expression.
fn is_wrapped(expr: &str) -> bool {
    let Some(inner) = expr.strip_prefix('(').and_then(|e| e.strip_suffix(')')) else {
        return false;
    };
    let mut depth = 0i32;
    for ch in inner.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn is_text_like(sql_type: &str) -> bool {
    let base = sql_type.trim().to_ascii_lowercase();
    [
        "text",
        "tinytext",
        "mediumtext",
        "longtext",
        "blob",
        "tinyblob",
        "mediumblob",
        "longblob",
        "json",
        "geometry",
    ]
    .iter()
    .any(|t| base == *t || base.starts_with(&format!("{t}(")))
}

/// Trait for dialect-specific SQL generation for migrations.
pub trait MigrationDialect: Send + Sync {
    /// The dialect this renderer targets.
    fn dialect(&self) -> Dialect;

    /// Returns the dialect name.
    #[must_use]
    fn name(&self) -> &'static str {
        self.dialect().as_str()
    }

    /// The dialect's capability record.
    #[must_use]
    fn capabilities(&self) -> &'static Capabilities {
        self.dialect().capabilities()
    }

    /// Generates the SQL units for a statement, each terminated by `;`.
    ///
    /// Namespace statements in dialects without namespaces produce nothing.
    ///
    /// # Errors
    ///
    /// A statement the dialect cannot express is an
    /// [`Error::Unrenderable`].
    #[allow(clippy::too_many_lines, clippy::cognitive_complexity)]
    fn generate_sql(&self, statement: &Statement) -> Result<Vec<String>> {
        let caps = self.capabilities();
        let alter = &caps.alter;
        let generated = &caps.generated;
        let require = |supported: bool| -> Result<()> {
            if supported {
                Ok(())
            } else {
                Err(self.unrenderable(statement.type_tag()))
            }
        };
        let in_place = |s: Support| s == Support::InPlace;

        let sql = match statement {
            // ---- Namespaces ----
            Statement::CreateSchema(s) if caps.namespaces => vec![self.create_schema(s)],
            Statement::DropSchema(s) if caps.namespaces => vec![self.drop_schema(s)],
            Statement::RenameSchema(s) if caps.namespaces => {
                require(caps.rename.schema)?;
                vec![self.rename_schema(s)]
            }
            Statement::CreateSchema(_) | Statement::DropSchema(_) | Statement::RenameSchema(_) => {
                vec![]
            }

            // ---- Enums ----
            Statement::CreateTypeEnum(s) => {
                require(caps.enums != EnumSupport::None)?;
                vec![self.create_enum(s)]
            }
            Statement::DropTypeEnum(s) => {
                require(caps.enums != EnumSupport::None)?;
                vec![self.drop_enum(s)]
            }
            Statement::RenameTypeEnum(s) => {
                require(caps.rename.enum_type)?;
                vec![self.rename_enum(s)]
            }
            Statement::MoveTypeEnum(s) => {
                require(caps.enums != EnumSupport::None && caps.namespaces)?;
                vec![self.move_enum(s)]
            }
            Statement::AlterTypeAddValue(s) => {
                require(match caps.enums {
                    EnumSupport::None => false,
                    EnumSupport::AppendOnly => s.before.is_empty(),
                    EnumSupport::Positional => true,
                })?;
                vec![self.add_enum_value(s)]
            }

            // ---- Sequences ----
            Statement::CreateSequence(s) => {
                require(caps.sequences)?;
                vec![self.create_sequence(s)]
            }
            Statement::DropSequence(s) => {
                require(caps.sequences)?;
                vec![self.drop_sequence(s)]
            }
            Statement::RenameSequence(s) => {
                require(caps.rename.sequence)?;
                vec![self.rename_sequence(s)]
            }
            Statement::MoveSequence(s) => {
                require(caps.sequences && caps.namespaces)?;
                vec![self.move_sequence(s)]
            }
            Statement::AlterSequence(s) => {
                require(caps.sequences)?;
                vec![self.alter_sequence(s)]
            }

            // ---- Domains ----
            Statement::CreateDomain(s) => {
                require(caps.domains)?;
                vec![self.create_domain(s)]
            }
            Statement::DropDomain(s) => {
                require(caps.domains)?;
                vec![self.drop_domain(s)]
            }
            Statement::RenameDomain(s) => {
                require(caps.rename.domain)?;
                vec![self.rename_domain(s)]
            }
            Statement::MoveDomain(s) => {
                require(caps.domains && caps.namespaces)?;
                vec![self.move_domain(s)]
            }
            Statement::AlterDomain(s) => {
                require(caps.domains)?;
                vec![self.alter_domain(s)]
            }

            // ---- Functions ----
            Statement::CreateFunction(s) => {
                require(caps.functions)?;
                vec![self.create_function(s)]
            }
            Statement::DropFunction(s) => {
                require(caps.functions)?;
                vec![self.drop_function(s)]
            }
            Statement::RenameFunction(s) => {
                require(caps.rename.function)?;
                vec![self.rename_function(s)]
            }
            Statement::MoveFunction(s) => {
                require(caps.functions && caps.namespaces)?;
                vec![self.move_function(s)]
            }

            // ---- Tables ----
            Statement::CreateTable(s) => vec![self.create_table(s)],
            Statement::DropTable(s) => vec![self.drop_table(s)],
            Statement::RenameTable(s) => {
                require(caps.rename.table)?;
                vec![self.rename_table(s)]
            }
            Statement::AlterTableSetSchema(s) => {
                require(caps.namespaces)?;
                vec![self.set_table_schema(s)]
            }
            Statement::RecreateTable(s) => self.recreate_table(s),

            // ---- Columns ----
            Statement::AlterTableAddColumn(s) => {
                require(alter.add_column != Support::Unsupported)?;
                vec![self.add_column(s)]
            }
            Statement::AlterTableDropColumn(s) => {
                require(alter.drop_column != Support::Unsupported)?;
                vec![self.drop_column(s)]
            }
            Statement::AlterTableRenameColumn(s) => {
                require(caps.rename.column)?;
                vec![self.rename_column(s)]
            }
            Statement::AlterTableAlterColumnSetType(s) => {
                require(in_place(alter.column_type))?;
                vec![self.set_column_type(s)]
            }
            Statement::AlterTableAlterColumnSetDefault(s) => {
                require(in_place(alter.default))?;
                vec![self.set_column_default(s)]
            }
            Statement::AlterTableAlterColumnDropDefault(s) => {
                require(in_place(alter.default))?;
                vec![self.drop_column_default(s)]
            }
            Statement::AlterTableAlterColumnSetNotnull(s) => {
                require(in_place(alter.nullability))?;
                vec![self.set_column_not_null(s)]
            }
            Statement::AlterTableAlterColumnDropNotnull(s) => {
                require(in_place(alter.nullability))?;
                vec![self.drop_column_not_null(s)]
            }
            Statement::AlterTableAlterColumnSetAutoincrement(s) => {
                require(caps.autoincrement_keyword.is_some() && in_place(alter.autoincrement))?;
                vec![self.set_column_autoincrement(s)]
            }
            Statement::AlterTableAlterColumnDropAutoincrement(s) => {
                require(caps.autoincrement_keyword.is_some() && in_place(alter.autoincrement))?;
                vec![self.drop_column_autoincrement(s)]
            }
            Statement::AlterTableAlterColumnSetOnUpdate(s) => {
                require(caps.on_update && in_place(alter.on_update))?;
                vec![self.set_column_on_update(s)]
            }
            Statement::AlterTableAlterColumnDropOnUpdate(s) => {
                require(caps.on_update && in_place(alter.on_update))?;
                vec![self.drop_column_on_update(s)]
            }
            Statement::AlterTableAlterColumnAlterGenerated(s) => {
                require(
                    in_place(generated.alter_stored)
                        || in_place(generated.alter_virtual)
                        || in_place(generated.change_kind),
                )?;
                vec![self.alter_column_generated(s)]
            }
            Statement::AlterTableAlterColumnDropGenerated(s) => {
                require(in_place(generated.drop_stored) || in_place(generated.drop_virtual))?;
                vec![self.drop_column_generated(s)]
            }
            Statement::AlterTableAlterColumnSetPk(s) => {
                require(in_place(alter.primary_key))?;
                vec![self.set_column_pk(s)]
            }
            Statement::AlterTableAlterColumnDropPk(s) => {
                require(in_place(alter.primary_key))?;
                vec![self.drop_column_pk(s)]
            }

            // ---- Constraints ----
            Statement::CreateCompositePk(s) => {
                require(in_place(alter.composite_primary_key))?;
                vec![self.create_composite_pk(s)]
            }
            Statement::DeleteCompositePk(s) => {
                require(in_place(alter.composite_primary_key))?;
                vec![self.delete_composite_pk(s)]
            }
            Statement::AlterCompositePk(s) => {
                require(in_place(alter.composite_primary_key))?;
                self.alter_composite_pk(s)
            }
            Statement::CreateReference(s) => {
                require(caps.foreign_keys && in_place(alter.foreign_keys))?;
                vec![self.create_reference(s)]
            }
            Statement::DeleteReference(s) => {
                require(caps.foreign_keys && in_place(alter.foreign_keys))?;
                vec![self.delete_reference(s)]
            }
            Statement::CreateUniqueConstraint(s) => {
                require(!caps.uniques_as_indexes)?;
                vec![self.create_unique(s)]
            }
            Statement::DeleteUniqueConstraint(s) => {
                require(!caps.uniques_as_indexes)?;
                vec![self.delete_unique(s)]
            }
            Statement::RenameUniqueConstraint(s) => {
                require(caps.rename.unique)?;
                vec![self.rename_unique(s)]
            }
            Statement::CreateCheckConstraint(s) => {
                require(caps.check_constraints && in_place(alter.checks))?;
                vec![self.create_check(s)]
            }
            Statement::DeleteCheckConstraint(s) => {
                require(caps.check_constraints && in_place(alter.checks))?;
                vec![self.delete_check(s)]
            }

            // ---- Indexes ----
            Statement::CreateIndex(s) => vec![self.create_index(s)],
            Statement::DropIndex(s) => vec![self.drop_index(s)],
            Statement::RenameIndex(s) => {
                require(caps.rename.index)?;
                vec![self.rename_index(s)]
            }

            // ---- Views ----
            Statement::CreateView(s) => {
                require(!s.view.materialized || caps.materialized_views)?;
                vec![self.create_view(s)?]
            }
            Statement::DropView(s) => {
                require(!s.view.materialized || caps.materialized_views)?;
                vec![self.drop_view(s)]
            }
            Statement::RenameView(s) => {
                require(caps.rename.view && (!s.materialized || caps.materialized_views))?;
                vec![self.rename_view(s)]
            }
            Statement::MoveView(s) => {
                require(caps.namespaces)?;
                vec![self.move_view(s)]
            }
            Statement::AlterView(s) => {
                require(caps.view_alter != ViewAlter::None)?;
                self.alter_view(s)?
            }

            // ---- Policies ----
            Statement::CreatePolicy(s) => {
                require(caps.policies)?;
                vec![self.create_policy(s)]
            }
            Statement::DropPolicy(s) => {
                require(caps.policies)?;
                vec![self.drop_policy(s)]
            }
            Statement::RenamePolicy(s) => {
                require(caps.rename.policy)?;
                vec![self.rename_policy(s)]
            }
            Statement::AlterPolicy(s) => {
                require(caps.policies)?;
                vec![self.alter_policy(s)]
            }
            Statement::EnableRls(s) => {
                require(caps.policies)?;
                vec![self.enable_rls(s)]
            }
            Statement::DisableRls(s) => {
                require(caps.policies)?;
                vec![self.disable_rls(s)]
            }
        };

        Ok(sql.into_iter().map(|s| format!("{s};")).collect())
    }

    /// Error for a statement this dialect cannot express.
    #[must_use]
    fn unrenderable(&self, statement: &'static str) -> Error {
        Error::Unrenderable {
            dialect: self.dialect(),
            statement,
        }
    }

    // ========================================================================
    // Quoting
    // ========================================================================

    /// Quotes an identifier.
    #[must_use]
    fn quote_identifier(&self, name: &str) -> String {
        match self.capabilities().quote {
            IdentQuote::Double => format!("\"{}\"", name.replace('"', "\"\"")),
            IdentQuote::Backtick => format!("`{}`", name.replace('`', "``")),
            IdentQuote::BacktickEscaped => {
                format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
            }
        }
    }

    /// Quotes a string literal.
    #[must_use]
    fn quote_string(&self, value: &str) -> String {
        let escaped = match self.capabilities().string_escape {
            StringEscape::Standard => value.replace('\'', "''"),
            StringEscape::MySql => value.replace('\\', "\\\\").replace('\'', "''"),
            StringEscape::GoogleSql => value.replace('\\', "\\\\").replace('\'', "\\'"),
        };
        format!("'{escaped}'")
    }

    /// A table-like name, qualified unless in the default namespace.
    #[must_use]
    fn table_name(&self, schema: &str, name: &str) -> String {
        let caps = self.capabilities();
        if caps.namespaces && !schema.is_empty() && schema != caps.default_namespace {
            format!("{}.{}", self.quote_identifier(schema), self.quote_identifier(name))
        } else {
            self.quote_identifier(name)
        }
    }

    /// A type-like name (enum, sequence, domain, function, view), always
    /// qualified when the dialect has namespaces.
    #[must_use]
    fn object_name(&self, schema: &str, name: &str) -> String {
        if self.capabilities().namespaces && !schema.is_empty() {
            format!("{}.{}", self.quote_identifier(schema), self.quote_identifier(name))
        } else {
            self.quote_identifier(name)
        }
    }

    #[must_use]
    fn quote_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.quote_identifier(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // ========================================================================
    // Column and constraint fragments
    // ========================================================================

    /// The column's type, qualified for user-defined types.
    #[must_use]
    fn column_type(&self, column: &Column) -> String {
        match &column.type_schema {
            Some(schema) if self.capabilities().namespaces && !schema.is_empty() => {
                let base = column.base_type();
                let suffix = &column.sql_type[base.len()..];
                format!("{}{suffix}", self.object_name(schema, base))
            }
            _ => column.sql_type.clone(),
        }
    }

    /// Renders a default value for a column.
    #[must_use]
    fn render_default(&self, column: &Column, value: &DefaultValue) -> String {
        let (sql, expression) = match value {
            DefaultValue::Null => ("NULL".to_string(), false),
            DefaultValue::Boolean(b) => (b.to_string(), false),
            DefaultValue::Integer(i) => (i.to_string(), false),
            DefaultValue::Float(f) => (f.to_string(), false),
            DefaultValue::String(s) => (self.quote_string(s), false),
            DefaultValue::Sql(expr) => (expr.clone(), true),
        };
        let wrap = match self.capabilities().default_style {
            DefaultStyle::Plain => false,
            DefaultStyle::ParenthesizeExpressions => expression,
            DefaultStyle::ParenthesizeExpressionsAndText => {
                expression
                    || (is_text_like(&column.sql_type) && !matches!(value, DefaultValue::Null))
            }
            DefaultStyle::ParenthesizeAll => true,
        };
        if wrap && !is_wrapped(&sql) {
            format!("({sql})")
        } else {
            sql
        }
    }

    /// Generates the generated-expression clause.
    #[must_use]
    fn generated_clause(&self, column: &Column) -> Option<String> {
        column.generated.as_ref().map(|g| {
            format!("GENERATED ALWAYS AS ({}) {}", g.expression, g.kind.as_sql())
        })
    }

    /// Generates SQL for a column definition.
    #[must_use]
    fn column_definition(&self, column: &Column) -> String {
        let caps = self.capabilities();
        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&column.name),
            self.column_type(column)
        );
        if let Some(generated) = self.generated_clause(column) {
            sql.push(' ');
            sql.push_str(&generated);
        }
        if column.primary_key && !caps.trailing_primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if column.autoincrement {
            if let Some(keyword) = caps.autoincrement_keyword {
                sql.push(' ');
                sql.push_str(keyword);
            }
        }
        if let Some(default) = &column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.render_default(column, default));
        }
        if let (Some(on_update), true) = (&column.on_update, caps.on_update) {
            sql.push_str(" ON UPDATE ");
            sql.push_str(on_update);
        }
        if column.not_null {
            sql.push_str(" NOT NULL");
        }
        sql
    }

    /// `CONSTRAINT "name" FOREIGN KEY (...) REFERENCES ...`.
    #[must_use]
    fn foreign_key_clause(&self, fk: &ForeignKey) -> String {
        let mut sql = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({})",
            self.quote_identifier(&fk.name),
            self.quote_list(&fk.columns_from),
            self.table_name(&fk.schema_to, &fk.table_to),
            self.quote_list(&fk.columns_to),
        );
        if let Some(action) = &fk.on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(&action.to_uppercase());
        }
        if let Some(action) = &fk.on_update {
            sql.push_str(" ON UPDATE ");
            sql.push_str(&action.to_uppercase());
        }
        sql
    }

    /// `CONSTRAINT "name" UNIQUE(...)`.
    #[must_use]
    fn unique_clause(&self, unique: &Unique) -> String {
        format!(
            "CONSTRAINT {} UNIQUE{}({})",
            self.quote_identifier(&unique.name),
            if unique.nulls_not_distinct {
                " NULLS NOT DISTINCT"
            } else {
                ""
            },
            self.quote_list(&unique.columns)
        )
    }

    /// Check predicate, with table qualifiers stripped where the dialect
    /// does not accept them.
    #[must_use]
    fn check_expression(&self, table: &str, check: &Check) -> String {
        if self.capabilities().qualified_check_columns {
            return check.value.clone();
        }
        let double = format!("\"{}\".", table.replace('"', "\"\""));
        let backtick = format!("`{}`.", table.replace('`', "``"));
        check.value.replace(&double, "").replace(&backtick, "")
    }

    /// `CONSTRAINT "name" CHECK (...)`.
    #[must_use]
    fn check_clause(&self, table: &str, check: &Check) -> String {
        format!(
            "CONSTRAINT {} CHECK ({})",
            self.quote_identifier(&check.name),
            self.check_expression(table, check)
        )
    }

    /// One key part of an index.
    #[must_use]
    fn index_part(&self, part: &IndexColumn) -> String {
        let mut sql = if part.is_expression {
            part.expression.clone()
        } else {
            self.quote_identifier(&part.expression)
        };
        if let Some(opclass) = &part.opclass {
            sql.push(' ');
            sql.push_str(opclass);
        }
        if !part.asc {
            sql.push_str(" DESC");
        }
        if let Some(nulls) = &part.nulls {
            sql.push_str(" NULLS ");
            sql.push_str(&nulls.to_uppercase());
        }
        sql
    }

    /// The body of a `CREATE TABLE` under the given name.
    #[must_use]
    fn create_table_sql(&self, table: &Table, name: &str) -> String {
        let caps = self.capabilities();
        let composite = !table.composite_primary_keys.is_empty();

        let mut lines: Vec<String> = table
            .columns
            .values()
            .map(|c| {
                if composite && c.primary_key {
                    let mut c = c.clone();
                    c.primary_key = false;
                    self.column_definition(&c)
                } else {
                    self.column_definition(c)
                }
            })
            .collect();
        if !caps.trailing_primary_key {
            for pk in &table.composite_primary_keys {
                lines.push(format!(
                    "CONSTRAINT {} PRIMARY KEY({})",
                    self.quote_identifier(&pk.name),
                    self.quote_list(&pk.columns)
                ));
            }
        }
        if !caps.uniques_as_indexes {
            lines.extend(table.unique_constraints.iter().map(|u| self.unique_clause(u)));
        }
        if caps.inline_foreign_keys {
            lines.extend(table.foreign_keys.iter().map(|fk| self.foreign_key_clause(fk)));
        }
        if caps.check_constraints {
            lines.extend(
                table
                    .check_constraints
                    .iter()
                    .map(|c| self.check_clause(&table.name, c)),
            );
        }

        let body: Vec<String> = lines.iter().map(|l| format!("    {l}")).collect();
        let mut sql = format!(
            "CREATE TABLE {} (\n{}\n)",
            self.table_name(&table.schema, name),
            body.join(",\n")
        );
        if caps.trailing_primary_key {
            sql.push_str(&format!(
                " PRIMARY KEY ({})",
                self.quote_list(&table.primary_key_columns())
            ));
        }
        sql
    }

    // ========================================================================
    // Namespaces
    // ========================================================================

    #[must_use]
    fn create_schema(&self, st: &SchemaStatement) -> String {
        format!("CREATE SCHEMA {}", self.quote_identifier(&st.name))
    }

    #[must_use]
    fn drop_schema(&self, st: &SchemaStatement) -> String {
        format!("DROP SCHEMA {}", self.quote_identifier(&st.name))
    }

    #[must_use]
    fn rename_schema(&self, st: &RenameSchemaStatement) -> String {
        format!(
            "ALTER SCHEMA {} RENAME TO {}",
            self.quote_identifier(&st.from),
            self.quote_identifier(&st.to)
        )
    }

    // ========================================================================
    // Enums
    // ========================================================================

    #[must_use]
    fn create_enum(&self, st: &CreateEnumStatement) -> String {
        let values: Vec<String> = st.values.iter().map(|v| self.quote_string(v)).collect();
        format!(
            "CREATE TYPE {} AS ENUM({})",
            self.object_name(&st.schema, &st.name),
            values.join(", ")
        )
    }

    #[must_use]
    fn drop_enum(&self, st: &EntityStatement) -> String {
        format!("DROP TYPE {}", self.object_name(&st.schema, &st.name))
    }

    #[must_use]
    fn rename_enum(&self, st: &RenameStatement) -> String {
        format!(
            "ALTER TYPE {} RENAME TO {}",
            self.object_name(&st.schema, &st.name_from),
            self.quote_identifier(&st.name_to)
        )
    }

    #[must_use]
    fn move_enum(&self, st: &MoveStatement) -> String {
        format!(
            "ALTER TYPE {} SET SCHEMA {}",
            self.object_name(&st.schema_from, &st.name),
            self.quote_identifier(&st.schema_to)
        )
    }

    #[must_use]
    fn add_enum_value(&self, st: &AddEnumValueStatement) -> String {
        let mut sql = format!(
            "ALTER TYPE {} ADD VALUE {}",
            self.object_name(&st.schema, &st.name),
            self.quote_string(&st.value)
        );
        if !st.before.is_empty() {
            sql.push_str(" BEFORE ");
            sql.push_str(&self.quote_string(&st.before));
        }
        sql
    }

    // ========================================================================
    // Sequences
    // ========================================================================

    #[must_use]
    fn create_sequence(&self, st: &SequenceStatement) -> String {
        let s = &st.sequence;
        let mut sql = format!("CREATE SEQUENCE {}", self.object_name(&s.schema, &s.name));
        let options = [
            ("INCREMENT BY", &s.increment),
            ("MINVALUE", &s.min_value),
            ("MAXVALUE", &s.max_value),
            ("START WITH", &s.start_with),
            ("CACHE", &s.cache),
        ];
        for (keyword, value) in options {
            if let Some(value) = value {
                sql.push_str(&format!(" {keyword} {value}"));
            }
        }
        if s.cycle {
            sql.push_str(" CYCLE");
        }
        sql
    }

    #[must_use]
    fn drop_sequence(&self, st: &EntityStatement) -> String {
        format!("DROP SEQUENCE {}", self.object_name(&st.schema, &st.name))
    }

    #[must_use]
    fn rename_sequence(&self, st: &RenameStatement) -> String {
        format!(
            "ALTER SEQUENCE {} RENAME TO {}",
            self.object_name(&st.schema, &st.name_from),
            self.quote_identifier(&st.name_to)
        )
    }

    #[must_use]
    fn move_sequence(&self, st: &MoveStatement) -> String {
        format!(
            "ALTER SEQUENCE {} SET SCHEMA {}",
            self.object_name(&st.schema_from, &st.name),
            self.quote_identifier(&st.schema_to)
        )
    }

    /// Restates every option so the sequence ends in the target state.
    #[must_use]
    fn alter_sequence(&self, st: &SequenceStatement) -> String {
        let s = &st.sequence;
        let mut sql = format!("ALTER SEQUENCE {}", self.object_name(&s.schema, &s.name));
        sql.push_str(&format!(
            " INCREMENT BY {}",
            s.increment.as_deref().unwrap_or("1")
        ));
        sql.push_str(&s.min_value.as_ref().map_or_else(
            || " NO MINVALUE".to_string(),
            |v| format!(" MINVALUE {v}"),
        ));
        sql.push_str(&s.max_value.as_ref().map_or_else(
            || " NO MAXVALUE".to_string(),
            |v| format!(" MAXVALUE {v}"),
        ));
        if let Some(start) = &s.start_with {
            sql.push_str(&format!(" START WITH {start}"));
        }
        sql.push_str(&format!(" CACHE {}", s.cache.as_deref().unwrap_or("1")));
        sql.push_str(if s.cycle { " CYCLE" } else { " NO CYCLE" });
        sql
    }

    // ========================================================================
    // Domains
    // ========================================================================

    #[must_use]
    fn create_domain(&self, st: &DomainStatement) -> String {
        let d = &st.domain;
        let mut sql = format!(
            "CREATE DOMAIN {} AS {}",
            self.object_name(&d.schema, &d.name),
            d.base_type
        );
        if let Some(default) = &d.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        if d.not_null {
            sql.push_str(" NOT NULL");
        }
        for check in &d.checks {
            sql.push_str(&format!(
                " CONSTRAINT {} CHECK ({})",
                self.quote_identifier(&check.name),
                check.value
            ));
        }
        sql
    }

    #[must_use]
    fn drop_domain(&self, st: &EntityStatement) -> String {
        format!("DROP DOMAIN {}", self.object_name(&st.schema, &st.name))
    }

    #[must_use]
    fn rename_domain(&self, st: &RenameStatement) -> String {
        format!(
            "ALTER DOMAIN {} RENAME TO {}",
            self.object_name(&st.schema, &st.name_from),
            self.quote_identifier(&st.name_to)
        )
    }

    #[must_use]
    fn move_domain(&self, st: &MoveStatement) -> String {
        format!(
            "ALTER DOMAIN {} SET SCHEMA {}",
            self.object_name(&st.schema_from, &st.name),
            self.quote_identifier(&st.schema_to)
        )
    }

    #[must_use]
    fn alter_domain(&self, st: &AlterDomainStatement) -> String {
        let action = match &st.action {
            DomainAction::SetDefault { value } => format!("SET DEFAULT {value}"),
            DomainAction::DropDefault => "DROP DEFAULT".to_string(),
            DomainAction::SetNotNull => "SET NOT NULL".to_string(),
            DomainAction::DropNotNull => "DROP NOT NULL".to_string(),
            DomainAction::AddConstraint { check } => format!(
                "ADD CONSTRAINT {} CHECK ({})",
                self.quote_identifier(&check.name),
                check.value
            ),
            DomainAction::DropConstraint { name } => {
                format!("DROP CONSTRAINT {}", self.quote_identifier(name))
            }
        };
        format!(
            "ALTER DOMAIN {} {action}",
            self.object_name(&st.schema, &st.name)
        )
    }

    // ========================================================================
    // Functions
    // ========================================================================

    #[must_use]
    fn create_function(&self, st: &CreateFunctionStatement) -> String {
        let f = &st.function;
        let args: Vec<String> = f
            .args
            .iter()
            .map(|a| {
                if a.name.is_empty() {
                    a.sql_type.clone()
                } else {
                    format!("{} {}", self.quote_identifier(&a.name), a.sql_type)
                }
            })
            .collect();
        let tag = if f.body.contains("$$") { "$body$" } else { "$$" };
        let volatility = match f.volatility {
            crate::snapshot::Volatility::Volatile => "VOLATILE",
            crate::snapshot::Volatility::Stable => "STABLE",
            crate::snapshot::Volatility::Immutable => "IMMUTABLE",
        };
        let security = match f.security {
            crate::snapshot::FunctionSecurity::Invoker => "INVOKER",
            crate::snapshot::FunctionSecurity::Definer => "DEFINER",
        };
        let or_replace = if st.or_replace { "OR REPLACE " } else { "" };
        format!(
            "CREATE {or_replace}FUNCTION {}({}) RETURNS {} LANGUAGE {} {volatility} \
             SECURITY {security} AS {tag}{}{tag}",
            self.object_name(&f.schema, &f.name),
            args.join(", "),
            f.returns,
            f.language,
            f.body,
        )
    }

    #[must_use]
    fn drop_function(&self, st: &FunctionStatement) -> String {
        format!(
            "DROP FUNCTION {}({})",
            self.object_name(&st.schema, &st.name),
            st.arg_types.join(", ")
        )
    }

    #[must_use]
    fn rename_function(&self, st: &RenameFunctionStatement) -> String {
        format!(
            "ALTER FUNCTION {}({}) RENAME TO {}",
            self.object_name(&st.schema, &st.name_from),
            st.arg_types.join(", "),
            self.quote_identifier(&st.name_to)
        )
    }

    #[must_use]
    fn move_function(&self, st: &MoveFunctionStatement) -> String {
        format!(
            "ALTER FUNCTION {}({}) SET SCHEMA {}",
            self.object_name(&st.schema_from, &st.name),
            st.arg_types.join(", "),
            self.quote_identifier(&st.schema_to)
        )
    }

    // ========================================================================
    // Tables
    // ========================================================================

    /// Generates SQL for CREATE TABLE.
    #[must_use]
    fn create_table(&self, st: &CreateTableStatement) -> String {
        self.create_table_sql(&st.table, &st.table.name)
    }

    /// Generates SQL for DROP TABLE.
    #[must_use]
    fn drop_table(&self, st: &EntityStatement) -> String {
        format!("DROP TABLE {}", self.table_name(&st.schema, &st.name))
    }

    /// Generates SQL for RENAME TABLE.
    #[must_use]
    fn rename_table(&self, st: &RenameStatement) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.table_name(&st.schema, &st.name_from),
            self.quote_identifier(&st.name_to)
        )
    }

    #[must_use]
    fn set_table_schema(&self, st: &MoveStatement) -> String {
        format!(
            "ALTER TABLE {} SET SCHEMA {}",
            self.table_name(&st.schema_from, &st.name),
            self.quote_identifier(&st.schema_to)
        )
    }

    /// Generates the statements rebuilding a table, in the dialect's
    /// recreate order.
    #[must_use]
    fn recreate_table(&self, st: &RecreateTableStatement) -> Vec<String> {
        let table = &st.table;
        let target = self.table_name(&table.schema, &table.name);
        let columns = self.quote_list(&st.copy_columns);

        match self.capabilities().recreate {
            RecreateStrategy::ShadowCopy => {
                let shadow_name = format!("__new_{}", table.name);
                let shadow = self.table_name(&table.schema, &shadow_name);
                let mut out = vec![self.create_table_sql(table, &shadow_name)];
                if !st.copy_columns.is_empty() {
                    out.push(format!(
                        "INSERT INTO {shadow}({columns}) SELECT {columns} FROM {target}"
                    ));
                }
                out.push(format!("DROP TABLE {target}"));
                out.push(format!(
                    "ALTER TABLE {shadow} RENAME TO {}",
                    self.quote_identifier(&table.name)
                ));
                out
            }
            RecreateStrategy::RenameOld => {
                let old_name = format!("__old_{}", table.name);
                let old = self.table_name(&table.schema, &old_name);
                let mut out = vec![
                    format!(
                        "ALTER TABLE {target} RENAME TO {}",
                        self.quote_identifier(&old_name)
                    ),
                    self.create_table_sql(table, &table.name),
                ];
                if !st.copy_columns.is_empty() {
                    out.push(format!(
                        "INSERT INTO {target}({columns}) SELECT {columns} FROM {old}"
                    ));
                }
                out.push(format!("DROP TABLE {old}"));
                out
            }
        }
    }

    // ========================================================================
    // Columns
    // ========================================================================

    /// Generates SQL for ADD COLUMN.
    #[must_use]
    fn add_column(&self, st: &AddColumnStatement) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.table_name(&st.schema, &st.table),
            self.column_definition(&st.column)
        )
    }

    /// Generates SQL for DROP COLUMN.
    #[must_use]
    fn drop_column(&self, st: &DropColumnStatement) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.table_name(&st.schema, &st.table),
            self.quote_identifier(&st.column)
        )
    }

    /// Generates SQL for RENAME COLUMN.
    #[must_use]
    fn rename_column(&self, st: &RenameMemberStatement) -> String {
        format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.table_name(&st.schema, &st.table),
            self.quote_identifier(&st.from),
            self.quote_identifier(&st.to)
        )
    }

    /// `ALTER TABLE t ALTER COLUMN c <action>`.
    #[must_use]
    fn alter_column_sql(&self, schema: &str, table: &str, column: &str, action: &str) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN {} {action}",
            self.table_name(schema, table),
            self.quote_identifier(column)
        )
    }

    /// Restates a whole column definition (`MODIFY COLUMN`).
    #[must_use]
    fn modify_column(&self, st: &AlterColumnStatement) -> String {
        format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.table_name(&st.schema, &st.table),
            self.column_definition(&st.column)
        )
    }

    #[must_use]
    fn set_column_type(&self, st: &SetColumnTypeStatement) -> String {
        let ty = self.column_type(&st.column);
        let mut action = format!("SET DATA TYPE {ty}");
        if st.using_cast {
            action.push_str(&format!(
                " USING {}::{ty}",
                self.quote_identifier(&st.column.name)
            ));
        }
        self.alter_column_sql(&st.schema, &st.table, &st.column.name, &action)
    }

    #[must_use]
    fn set_column_default(&self, st: &AlterColumnStatement) -> String {
        let value = st
            .column
            .default
            .as_ref()
            .map_or_else(|| "NULL".to_string(), |d| self.render_default(&st.column, d));
        self.alter_column_sql(
            &st.schema,
            &st.table,
            &st.column.name,
            &format!("SET DEFAULT {value}"),
        )
    }

    #[must_use]
    fn drop_column_default(&self, st: &AlterColumnStatement) -> String {
        self.alter_column_sql(&st.schema, &st.table, &st.column.name, "DROP DEFAULT")
    }

    #[must_use]
    fn set_column_not_null(&self, st: &AlterColumnStatement) -> String {
        self.alter_column_sql(&st.schema, &st.table, &st.column.name, "SET NOT NULL")
    }

    #[must_use]
    fn drop_column_not_null(&self, st: &AlterColumnStatement) -> String {
        self.alter_column_sql(&st.schema, &st.table, &st.column.name, "DROP NOT NULL")
    }

    #[must_use]
    fn set_column_autoincrement(&self, st: &AlterColumnStatement) -> String {
        self.modify_column(st)
    }

    #[must_use]
    fn drop_column_autoincrement(&self, st: &AlterColumnStatement) -> String {
        self.modify_column(st)
    }

    #[must_use]
    fn set_column_on_update(&self, st: &AlterColumnStatement) -> String {
        self.modify_column(st)
    }

    #[must_use]
    fn drop_column_on_update(&self, st: &AlterColumnStatement) -> String {
        self.modify_column(st)
    }

    #[must_use]
    fn alter_column_generated(&self, st: &AlterColumnStatement) -> String {
        self.modify_column(st)
    }

    #[must_use]
    fn drop_column_generated(&self, st: &AlterColumnStatement) -> String {
        self.alter_column_sql(&st.schema, &st.table, &st.column.name, "DROP EXPRESSION")
    }

    #[must_use]
    fn set_column_pk(&self, st: &AlterColumnStatement) -> String {
        format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({})",
            self.table_name(&st.schema, &st.table),
            self.quote_identifier(&st.column.name)
        )
    }

    #[must_use]
    fn drop_column_pk(&self, st: &AlterColumnStatement) -> String {
        format!(
            "ALTER TABLE {} DROP PRIMARY KEY",
            self.table_name(&st.schema, &st.table)
        )
    }

    // ========================================================================
    // Constraints
    // ========================================================================

    /// `ALTER TABLE t DROP CONSTRAINT name`.
    #[must_use]
    fn drop_constraint_sql(&self, schema: &str, table: &str, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.table_name(schema, table),
            self.quote_identifier(name)
        )
    }

    #[must_use]
    fn create_composite_pk(&self, st: &PrimaryKeyStatement) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY({})",
            self.table_name(&st.schema, &st.table),
            self.quote_identifier(&st.primary_key.name),
            self.quote_list(&st.primary_key.columns)
        )
    }

    #[must_use]
    fn delete_composite_pk(&self, st: &PrimaryKeyStatement) -> String {
        self.drop_constraint_sql(&st.schema, &st.table, &st.primary_key.name)
    }

    #[must_use]
    fn alter_composite_pk(&self, st: &AlterPrimaryKeyStatement) -> Vec<String> {
        vec![
            self.drop_constraint_sql(&st.schema, &st.table, &st.old.name),
            self.create_composite_pk(&PrimaryKeyStatement {
                table: st.table.clone(),
                schema: st.schema.clone(),
                primary_key: st.new.clone(),
            }),
        ]
    }

    #[must_use]
    fn create_reference(&self, st: &ReferenceStatement) -> String {
        format!(
            "ALTER TABLE {} ADD {}",
            self.table_name(&st.schema, &st.table),
            self.foreign_key_clause(&st.foreign_key)
        )
    }

    #[must_use]
    fn delete_reference(&self, st: &ReferenceStatement) -> String {
        self.drop_constraint_sql(&st.schema, &st.table, &st.foreign_key.name)
    }

    #[must_use]
    fn create_unique(&self, st: &UniqueStatement) -> String {
        format!(
            "ALTER TABLE {} ADD {}",
            self.table_name(&st.schema, &st.table),
            self.unique_clause(&st.unique)
        )
    }

    #[must_use]
    fn delete_unique(&self, st: &UniqueStatement) -> String {
        self.drop_constraint_sql(&st.schema, &st.table, &st.unique.name)
    }

    #[must_use]
    fn rename_unique(&self, st: &RenameMemberStatement) -> String {
        format!(
            "ALTER TABLE {} RENAME CONSTRAINT {} TO {}",
            self.table_name(&st.schema, &st.table),
            self.quote_identifier(&st.from),
            self.quote_identifier(&st.to)
        )
    }

    #[must_use]
    fn create_check(&self, st: &CheckStatement) -> String {
        format!(
            "ALTER TABLE {} ADD {}",
            self.table_name(&st.schema, &st.table),
            self.check_clause(&st.table, &st.check)
        )
    }

    #[must_use]
    fn delete_check(&self, st: &CheckStatement) -> String {
        self.drop_constraint_sql(&st.schema, &st.table, &st.check.name)
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    /// Generates SQL for CREATE INDEX.
    #[must_use]
    fn create_index(&self, st: &IndexStatement) -> String {
        let index = &st.index;
        let mut sql = String::from("CREATE ");
        if index.unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        if index.concurrently {
            sql.push_str("CONCURRENTLY ");
        }
        sql.push_str(&self.quote_identifier(&index.name));
        sql.push_str(" ON ");
        sql.push_str(&self.table_name(&st.schema, &st.table));
        if let Some(method) = &index.method {
            sql.push_str(" USING ");
            sql.push_str(method);
        }
        let parts: Vec<String> = index.columns.iter().map(|p| self.index_part(p)).collect();
        sql.push_str(&format!(" ({})", parts.join(", ")));
        if !index.with.is_empty() {
            let with: Vec<String> = index.with.iter().map(|(k, v)| format!("{k} = {v}")).collect();
            sql.push_str(&format!(" WITH ({})", with.join(", ")));
        }
        if let Some(predicate) = &index.r#where {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        sql
    }

    /// Generates SQL for DROP INDEX.
    #[must_use]
    fn drop_index(&self, st: &IndexStatement) -> String {
        if self.capabilities().drop_index_needs_table {
            format!(
                "DROP INDEX {} ON {}",
                self.quote_identifier(&st.index.name),
                self.table_name(&st.schema, &st.table)
            )
        } else {
            format!("DROP INDEX {}", self.table_name(&st.schema, &st.index.name))
        }
    }

    #[must_use]
    fn rename_index(&self, st: &RenameMemberStatement) -> String {
        format!(
            "ALTER INDEX {} RENAME TO {}",
            self.table_name(&st.schema, &st.from),
            self.quote_identifier(&st.to)
        )
    }

    // ========================================================================
    // Views
    // ========================================================================

    #[must_use]
    fn view_keyword(&self, materialized: bool) -> &'static str {
        if materialized {
            "MATERIALIZED VIEW"
        } else {
            "VIEW"
        }
    }

    /// `CREATE [MATERIALIZED] VIEW`.
    ///
    /// # Errors
    ///
    /// Fails when the view carries no definition.
    fn create_view(&self, st: &ViewStatement) -> Result<String> {
        let view = &st.view;
        let definition = view
            .definition
            .as_ref()
            .ok_or_else(|| self.unrenderable("create_view"))?;
        let mut sql = format!(
            "CREATE {} {}",
            self.view_keyword(view.materialized),
            self.object_name(&view.schema, &view.name)
        );
        if let Some(using) = &view.using {
            sql.push_str(&format!(" USING {using}"));
        }
        if !view.with.is_empty() {
            let with: Vec<String> = view.with.iter().map(|(k, v)| format!("{k} = {v}")).collect();
            sql.push_str(&format!(" WITH ({})", with.join(", ")));
        }
        if let Some(tablespace) = &view.tablespace {
            sql.push_str(&format!(" TABLESPACE {}", self.quote_identifier(tablespace)));
        }
        sql.push_str(&format!(" AS {definition}"));
        if view.with_no_data {
            sql.push_str(" WITH NO DATA");
        }
        if let Some(option) = &view.check_option {
            sql.push_str(&format!(" WITH {} CHECK OPTION", option.to_uppercase()));
        }
        Ok(sql)
    }

    #[must_use]
    fn drop_view(&self, st: &ViewStatement) -> String {
        format!(
            "DROP {} {}",
            self.view_keyword(st.view.materialized),
            self.object_name(&st.view.schema, &st.view.name)
        )
    }

    #[must_use]
    fn rename_view(&self, st: &RenameViewStatement) -> String {
        format!(
            "ALTER {} {} RENAME TO {}",
            self.view_keyword(st.materialized),
            self.object_name(&st.schema, &st.name_from),
            self.quote_identifier(&st.name_to)
        )
    }

    #[must_use]
    fn move_view(&self, st: &MoveViewStatement) -> String {
        format!(
            "ALTER {} {} SET SCHEMA {}",
            self.view_keyword(st.materialized),
            self.object_name(&st.schema_from, &st.name),
            self.quote_identifier(&st.schema_to)
        )
    }

    /// Sets and resets storage parameters.
    ///
    /// # Errors
    ///
    /// Fails when the dialect cannot express the alteration.
    fn alter_view(&self, st: &AlterViewStatement) -> Result<Vec<String>> {
        let view = &st.view;
        let target = format!(
            "ALTER {} {}",
            self.view_keyword(view.materialized),
            self.object_name(&view.schema, &view.name)
        );
        let mut out = Vec::new();
        if !view.with.is_empty() {
            let with: Vec<String> = view.with.iter().map(|(k, v)| format!("{k} = {v}")).collect();
            out.push(format!("{target} SET ({})", with.join(", ")));
        }
        if !st.reset.is_empty() {
            out.push(format!("{target} RESET ({})", st.reset.join(", ")));
        }
        Ok(out)
    }

    // ========================================================================
    // Policies
    // ========================================================================

    #[must_use]
    fn policy_roles(&self, policy: &Policy) -> String {
        if policy.to.is_empty() {
            return "public".to_string();
        }
        policy
            .to
            .iter()
            .map(|r| {
                if POLICY_KEYWORD_ROLES.contains(&r.as_str()) {
                    r.clone()
                } else {
                    self.quote_identifier(r)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    #[must_use]
    fn create_policy(&self, st: &PolicyStatement) -> String {
        let p = &st.policy;
        let kind = match p.kind {
            crate::snapshot::PolicyAs::Permissive => "PERMISSIVE",
            crate::snapshot::PolicyAs::Restrictive => "RESTRICTIVE",
        };
        let command = match p.command {
            crate::snapshot::PolicyFor::All => "ALL",
            crate::snapshot::PolicyFor::Select => "SELECT",
            crate::snapshot::PolicyFor::Insert => "INSERT",
            crate::snapshot::PolicyFor::Update => "UPDATE",
            crate::snapshot::PolicyFor::Delete => "DELETE",
        };
        let mut sql = format!(
            "CREATE POLICY {} ON {} AS {kind} FOR {command} TO {}",
            self.quote_identifier(&p.name),
            self.table_name(&st.schema, &st.table),
            self.policy_roles(p)
        );
        if let Some(using) = &p.using {
            sql.push_str(&format!(" USING ({using})"));
        }
        if let Some(check) = &p.with_check {
            sql.push_str(&format!(" WITH CHECK ({check})"));
        }
        sql
    }

    #[must_use]
    fn drop_policy(&self, st: &PolicyStatement) -> String {
        format!(
            "DROP POLICY {} ON {} CASCADE",
            self.quote_identifier(&st.policy.name),
            self.table_name(&st.schema, &st.table)
        )
    }

    #[must_use]
    fn rename_policy(&self, st: &RenameMemberStatement) -> String {
        format!(
            "ALTER POLICY {} ON {} RENAME TO {}",
            self.quote_identifier(&st.from),
            self.table_name(&st.schema, &st.table),
            self.quote_identifier(&st.to)
        )
    }

    #[must_use]
    fn alter_policy(&self, st: &PolicyStatement) -> String {
        let p = &st.policy;
        let mut sql = format!(
            "ALTER POLICY {} ON {} TO {}",
            self.quote_identifier(&p.name),
            self.table_name(&st.schema, &st.table),
            self.policy_roles(p)
        );
        if let Some(using) = &p.using {
            sql.push_str(&format!(" USING ({using})"));
        }
        if let Some(check) = &p.with_check {
            sql.push_str(&format!(" WITH CHECK ({check})"));
        }
        sql
    }

    #[must_use]
    fn enable_rls(&self, st: &TableStatement) -> String {
        format!(
            "ALTER TABLE {} ENABLE ROW LEVEL SECURITY",
            self.table_name(&st.schema, &st.table)
        )
    }

    #[must_use]
    fn disable_rls(&self, st: &TableStatement) -> String {
        format!(
            "ALTER TABLE {} DISABLE ROW LEVEL SECURITY",
            self.table_name(&st.schema, &st.table)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_tags_round_trip() {
        for dialect in Dialect::ALL {
            assert_eq!(dialect.as_str().parse::<Dialect>().unwrap(), dialect);
            assert_eq!(dialect.renderer().dialect(), dialect);
            let json = serde_json::to_string(&dialect).unwrap();
            assert_eq!(json, format!("\"{}\"", dialect.as_str()));
        }
        assert!("oracle".parse::<Dialect>().is_err());
    }

    #[test]
    fn identifiers_escape_their_quote() {
        assert_eq!(PostgresDialect::new().quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(MySqlDialect::new().quote_identifier("a`b"), "`a``b`");
        assert_eq!(SpannerDialect::new().quote_identifier("a`b"), "`a\\`b`");
    }

    #[test]
    fn schema_statements_vanish_without_namespaces() {
        let statement = Statement::CreateSchema(SchemaStatement {
            name: "auth".into(),
        });
        assert!(SqliteDialect::new().generate_sql(&statement).unwrap().is_empty());
        assert_eq!(
            PostgresDialect::new().generate_sql(&statement).unwrap(),
            vec!["CREATE SCHEMA \"auth\";"]
        );
    }

    #[test]
    fn unsupported_statement_is_an_error() {
        let statement = Statement::CreateTypeEnum(CreateEnumStatement {
            name: "mood".into(),
            schema: String::new(),
            values: vec!["sad".into()],
        });
        let err = MySqlDialect::new().generate_sql(&statement).unwrap_err();
        assert!(matches!(
            err,
            Error::Unrenderable {
                dialect: Dialect::Mysql,
                statement: "create_type_enum"
            }
        ));
    }

    #[test]
    fn wrapped_detection_is_balanced() {
        assert!(is_wrapped("(now())"));
        assert!(!is_wrapped("(a) + (b)"));
        assert!(!is_wrapped("now()"));
    }

    #[test]
    fn render_all_concatenates() {
        let statements = vec![
            Statement::CreateSchema(SchemaStatement { name: "a".into() }),
            Statement::DropSchema(SchemaStatement { name: "b".into() }),
        ];
        let sql = render_all(&PostgresDialect::new(), &statements).unwrap();
        assert_eq!(sql, vec!["CREATE SCHEMA \"a\";", "DROP SCHEMA \"b\";"]);
    }
}
