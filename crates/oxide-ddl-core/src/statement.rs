//! Migration statements.
//!
//! A [`Statement`] is one atomic, typed DDL intent. The diff engine emits an
//! ordered list of them and the dialect renderers turn each into SQL. Every
//! variant carries everything its rendering needs, so a persisted statement
//! journal can be rendered without the snapshots it came from.
//!
//! The JSON form is internally tagged by `type` and is part of the external
//! contract.

use serde::{Deserialize, Serialize};

use crate::snapshot::{
    Check, Column, Domain, ForeignKey, Function, Index, Policy, PrimaryKey, Sequence, Table,
    Unique, View,
};

/// A namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaStatement {
    /// Namespace name.
    pub name: String,
}

/// Renames a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameSchemaStatement {
    pub from: String,
    pub to: String,
}

/// Identifies a namespaced entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStatement {
    pub name: String,
    pub schema: String,
}

/// Renames a namespaced entity within its namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameStatement {
    pub schema: String,
    pub name_from: String,
    pub name_to: String,
}

/// Moves a namespaced entity to another namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveStatement {
    pub name: String,
    pub schema_from: String,
    pub schema_to: String,
}

/// Creates an enum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEnumStatement {
    pub name: String,
    pub schema: String,
    pub values: Vec<String>,
}

/// Adds a value to an enum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddEnumValueStatement {
    pub name: String,
    pub schema: String,
    pub value: String,
    /// Existing value to insert before; empty appends.
    pub before: String,
}

/// Creates or alters a sequence to the given state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStatement {
    pub sequence: Sequence,
}

/// Creates a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainStatement {
    pub domain: Domain,
}

/// One domain alteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainAction {
    SetDefault { value: String },
    DropDefault,
    SetNotNull,
    DropNotNull,
    AddConstraint { check: Check },
    DropConstraint { name: String },
}

/// Alters a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterDomainStatement {
    pub name: String,
    pub schema: String,
    pub action: DomainAction,
}

/// Creates a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFunctionStatement {
    pub function: Function,
    /// Emit `CREATE OR REPLACE`.
    pub or_replace: bool,
}

/// Identifies a function overload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionStatement {
    pub name: String,
    pub schema: String,
    pub arg_types: Vec<String>,
}

/// Renames a function overload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameFunctionStatement {
    pub schema: String,
    pub name_from: String,
    pub name_to: String,
    pub arg_types: Vec<String>,
}

/// Moves a function overload to another namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveFunctionStatement {
    pub name: String,
    pub schema_from: String,
    pub schema_to: String,
    pub arg_types: Vec<String>,
}

/// Creates a table with its columns and inline constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTableStatement {
    pub table: Table,
}

/// Rebuilds a table that cannot be altered in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecreateTableStatement {
    /// Final table definition.
    pub table: Table,
    /// Columns whose data is copied over.
    pub copy_columns: Vec<String>,
}

/// Adds a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddColumnStatement {
    pub table: String,
    pub schema: String,
    pub column: Column,
}

/// Drops a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropColumnStatement {
    pub table: String,
    pub schema: String,
    pub column: String,
}

/// Renames a table member (column, constraint, index, policy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameMemberStatement {
    pub table: String,
    pub schema: String,
    pub from: String,
    pub to: String,
}

/// Changes one attribute of a column. Carries the full target column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterColumnStatement {
    pub table: String,
    pub schema: String,
    pub column: Column,
}

/// Changes a column's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetColumnTypeStatement {
    pub table: String,
    pub schema: String,
    /// Target column.
    pub column: Column,
    /// Type before the change.
    pub old_type: String,
    /// Convert existing values with an explicit cast.
    pub using_cast: bool,
}

/// A composite primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryKeyStatement {
    pub table: String,
    pub schema: String,
    pub primary_key: PrimaryKey,
}

/// Replaces a composite primary key keeping its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterPrimaryKeyStatement {
    pub table: String,
    pub schema: String,
    pub old: PrimaryKey,
    pub new: PrimaryKey,
}

/// A foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceStatement {
    pub table: String,
    pub schema: String,
    pub foreign_key: ForeignKey,
}

/// A unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueStatement {
    pub table: String,
    pub schema: String,
    pub unique: Unique,
}

/// A check constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStatement {
    pub table: String,
    pub schema: String,
    pub check: Check,
}

/// An index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatement {
    pub table: String,
    pub schema: String,
    pub index: Index,
}

/// A view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewStatement {
    pub view: View,
}

/// Renames a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameViewStatement {
    pub schema: String,
    pub name_from: String,
    pub name_to: String,
    pub materialized: bool,
}

/// Moves a view to another namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveViewStatement {
    pub name: String,
    pub schema_from: String,
    pub schema_to: String,
    pub materialized: bool,
}

/// Alters a view in place to the given state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterViewStatement {
    pub view: View,
    /// Storage parameters to reset.
    pub reset: Vec<String>,
}

/// A row-level-security policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    pub table: String,
    pub schema: String,
    pub policy: Policy,
}

/// A table-level toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStatement {
    pub table: String,
    pub schema: String,
}

/// One DDL intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Statement {
    // ---- Namespaces ----
    CreateSchema(SchemaStatement),
    DropSchema(SchemaStatement),
    RenameSchema(RenameSchemaStatement),

    // ---- Enums ----
    CreateTypeEnum(CreateEnumStatement),
    DropTypeEnum(EntityStatement),
    RenameTypeEnum(RenameStatement),
    MoveTypeEnum(MoveStatement),
    AlterTypeAddValue(AddEnumValueStatement),

    // ---- Sequences ----
    CreateSequence(SequenceStatement),
    DropSequence(EntityStatement),
    RenameSequence(RenameStatement),
    MoveSequence(MoveStatement),
    AlterSequence(SequenceStatement),

    // ---- Domains ----
    CreateDomain(DomainStatement),
    DropDomain(EntityStatement),
    RenameDomain(RenameStatement),
    MoveDomain(MoveStatement),
    AlterDomain(AlterDomainStatement),

    // ---- Functions ----
    CreateFunction(CreateFunctionStatement),
    DropFunction(FunctionStatement),
    RenameFunction(RenameFunctionStatement),
    MoveFunction(MoveFunctionStatement),

    // ---- Tables ----
    CreateTable(CreateTableStatement),
    DropTable(EntityStatement),
    RenameTable(RenameStatement),
    AlterTableSetSchema(MoveStatement),
    RecreateTable(RecreateTableStatement),

    // ---- Columns ----
    AlterTableAddColumn(AddColumnStatement),
    AlterTableDropColumn(DropColumnStatement),
    AlterTableRenameColumn(RenameMemberStatement),
    AlterTableAlterColumnSetType(SetColumnTypeStatement),
    AlterTableAlterColumnSetDefault(AlterColumnStatement),
    AlterTableAlterColumnDropDefault(AlterColumnStatement),
    AlterTableAlterColumnSetNotnull(AlterColumnStatement),
    AlterTableAlterColumnDropNotnull(AlterColumnStatement),
    AlterTableAlterColumnSetAutoincrement(AlterColumnStatement),
    AlterTableAlterColumnDropAutoincrement(AlterColumnStatement),
    AlterTableAlterColumnSetOnUpdate(AlterColumnStatement),
    AlterTableAlterColumnDropOnUpdate(AlterColumnStatement),
    AlterTableAlterColumnAlterGenerated(AlterColumnStatement),
    AlterTableAlterColumnDropGenerated(AlterColumnStatement),
    AlterTableAlterColumnSetPk(AlterColumnStatement),
    AlterTableAlterColumnDropPk(AlterColumnStatement),

    // ---- Constraints ----
    CreateCompositePk(PrimaryKeyStatement),
    DeleteCompositePk(PrimaryKeyStatement),
    AlterCompositePk(AlterPrimaryKeyStatement),
    CreateReference(ReferenceStatement),
    DeleteReference(ReferenceStatement),
    CreateUniqueConstraint(UniqueStatement),
    DeleteUniqueConstraint(UniqueStatement),
    RenameUniqueConstraint(RenameMemberStatement),
    CreateCheckConstraint(CheckStatement),
    DeleteCheckConstraint(CheckStatement),

    // ---- Indexes ----
    CreateIndex(IndexStatement),
    DropIndex(IndexStatement),
    RenameIndex(RenameMemberStatement),

    // ---- Views ----
    CreateView(ViewStatement),
    DropView(ViewStatement),
    RenameView(RenameViewStatement),
    MoveView(MoveViewStatement),
    AlterView(AlterViewStatement),

    // ---- Policies ----
    CreatePolicy(PolicyStatement),
    DropPolicy(PolicyStatement),
    RenamePolicy(RenameMemberStatement),
    AlterPolicy(PolicyStatement),
    EnableRls(TableStatement),
    DisableRls(TableStatement),
}

impl Statement {
    /// The `type` tag of the statement.
    #[must_use]
    pub const fn type_tag(&self) -> &'static str {
        match self {
            Self::CreateSchema(_) => "create_schema",
            Self::DropSchema(_) => "drop_schema",
            Self::RenameSchema(_) => "rename_schema",
            Self::CreateTypeEnum(_) => "create_type_enum",
            Self::DropTypeEnum(_) => "drop_type_enum",
            Self::RenameTypeEnum(_) => "rename_type_enum",
            Self::MoveTypeEnum(_) => "move_type_enum",
            Self::AlterTypeAddValue(_) => "alter_type_add_value",
            Self::CreateSequence(_) => "create_sequence",
            Self::DropSequence(_) => "drop_sequence",
            Self::RenameSequence(_) => "rename_sequence",
            Self::MoveSequence(_) => "move_sequence",
            Self::AlterSequence(_) => "alter_sequence",
            Self::CreateDomain(_) => "create_domain",
            Self::DropDomain(_) => "drop_domain",
            Self::RenameDomain(_) => "rename_domain",
            Self::MoveDomain(_) => "move_domain",
            Self::AlterDomain(_) => "alter_domain",
            Self::CreateFunction(_) => "create_function",
            Self::DropFunction(_) => "drop_function",
            Self::RenameFunction(_) => "rename_function",
            Self::MoveFunction(_) => "move_function",
            Self::CreateTable(_) => "create_table",
            Self::DropTable(_) => "drop_table",
            Self::RenameTable(_) => "rename_table",
            Self::AlterTableSetSchema(_) => "alter_table_set_schema",
            Self::RecreateTable(_) => "recreate_table",
            Self::AlterTableAddColumn(_) => "alter_table_add_column",
            Self::AlterTableDropColumn(_) => "alter_table_drop_column",
            Self::AlterTableRenameColumn(_) => "alter_table_rename_column",
            Self::AlterTableAlterColumnSetType(_) => "alter_table_alter_column_set_type",
            Self::AlterTableAlterColumnSetDefault(_) => "alter_table_alter_column_set_default",
            Self::AlterTableAlterColumnDropDefault(_) => "alter_table_alter_column_drop_default",
            Self::AlterTableAlterColumnSetNotnull(_) => "alter_table_alter_column_set_notnull",
            Self::AlterTableAlterColumnDropNotnull(_) => "alter_table_alter_column_drop_notnull",
            Self::AlterTableAlterColumnSetAutoincrement(_) => {
                "alter_table_alter_column_set_autoincrement"
            }
            Self::AlterTableAlterColumnDropAutoincrement(_) => {
                "alter_table_alter_column_drop_autoincrement"
            }
            Self::AlterTableAlterColumnSetOnUpdate(_) => "alter_table_alter_column_set_on_update",
            Self::AlterTableAlterColumnDropOnUpdate(_) => {
                "alter_table_alter_column_drop_on_update"
            }
            Self::AlterTableAlterColumnAlterGenerated(_) => {
                "alter_table_alter_column_alter_generated"
            }
            Self::AlterTableAlterColumnDropGenerated(_) => {
                "alter_table_alter_column_drop_generated"
            }
            Self::AlterTableAlterColumnSetPk(_) => "alter_table_alter_column_set_pk",
            Self::AlterTableAlterColumnDropPk(_) => "alter_table_alter_column_drop_pk",
            Self::CreateCompositePk(_) => "create_composite_pk",
            Self::DeleteCompositePk(_) => "delete_composite_pk",
            Self::AlterCompositePk(_) => "alter_composite_pk",
            Self::CreateReference(_) => "create_reference",
            Self::DeleteReference(_) => "delete_reference",
            Self::CreateUniqueConstraint(_) => "create_unique_constraint",
            Self::DeleteUniqueConstraint(_) => "delete_unique_constraint",
            Self::RenameUniqueConstraint(_) => "rename_unique_constraint",
            Self::CreateCheckConstraint(_) => "create_check_constraint",
            Self::DeleteCheckConstraint(_) => "delete_check_constraint",
            Self::CreateIndex(_) => "create_index",
            Self::DropIndex(_) => "drop_index",
            Self::RenameIndex(_) => "rename_index",
            Self::CreateView(_) => "create_view",
            Self::DropView(_) => "drop_view",
            Self::RenameView(_) => "rename_view",
            Self::MoveView(_) => "move_view",
            Self::AlterView(_) => "alter_view",
            Self::CreatePolicy(_) => "create_policy",
            Self::DropPolicy(_) => "drop_policy",
            Self::RenamePolicy(_) => "rename_policy",
            Self::AlterPolicy(_) => "alter_policy",
            Self::EnableRls(_) => "enable_rls",
            Self::DisableRls(_) => "disable_rls",
        }
    }

    /// Parses a statement journal (a JSON array of statements).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] for a malformed journal.
    pub fn journal_from_json(json: &str) -> crate::Result<Vec<Self>> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_matches_serialized_type() {
        let statement = Statement::AlterTypeAddValue(AddEnumValueStatement {
            name: "e".into(),
            schema: "public".into(),
            value: "v2".into(),
            before: "v3".into(),
        });
        let json = serde_json::to_value(&statement).unwrap();
        assert_eq!(json["type"], statement.type_tag());
        assert_eq!(json["before"], "v3");
    }

    #[test]
    fn statement_fields_are_camel_case() {
        let statement = Statement::RenameTable(RenameStatement {
            schema: "public".into(),
            name_from: "users".into(),
            name_to: "accounts".into(),
        });
        let json = serde_json::to_value(&statement).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "rename_table",
                "schema": "public",
                "nameFrom": "users",
                "nameTo": "accounts",
            })
        );
    }

    #[test]
    fn journal_parses() {
        let journal = Statement::journal_from_json(
            r#"[
                {"type": "create_schema", "name": "auth"},
                {"type": "drop_table", "name": "users", "schema": ""},
                {"type": "alter_domain", "name": "d", "schema": "public",
                 "action": {"kind": "drop_not_null"}}
            ]"#,
        )
        .unwrap();
        assert_eq!(journal.len(), 3);
        assert_eq!(journal[1].type_tag(), "drop_table");
    }
}
