//! Namespaced entities that live beside tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::table::Check;

/// A native enum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enum {
    /// Type name.
    pub name: String,
    /// Namespace.
    #[serde(default)]
    pub schema: String,
    /// Values in declaration order.
    pub values: Vec<String>,
}

impl Enum {
    /// Creates an enum type.
    #[must_use]
    pub fn new<I, S>(schema: impl Into<String>, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            schema: schema.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// A sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    pub name: String,
    #[serde(default)]
    pub schema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_with: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<String>,
    #[serde(default)]
    pub cycle: bool,
}

impl Sequence {
    /// Creates a sequence with engine defaults for every option.
    #[must_use]
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            increment: None,
            min_value: None,
            max_value: None,
            start_with: None,
            cache: None,
            cycle: false,
        }
    }
}

/// A domain: a named base type with constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub name: String,
    #[serde(default)]
    pub schema: String,
    /// Underlying type.
    pub base_type: String,
    #[serde(default)]
    pub not_null: bool,
    /// Raw SQL default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub checks: Vec<Check>,
}

/// A function argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionArg {
    /// Argument name, may be empty.
    #[serde(default)]
    pub name: String,
    /// Argument type.
    #[serde(rename = "type")]
    pub sql_type: String,
}

/// Function security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionSecurity {
    #[default]
    Invoker,
    Definer,
}

/// Function volatility class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Volatility {
    #[default]
    Volatile,
    Stable,
    Immutable,
}

/// A stored function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub args: Vec<FunctionArg>,
    /// Return type.
    pub returns: String,
    /// Implementation language, e.g. `plpgsql`.
    pub language: String,
    #[serde(default)]
    pub security: FunctionSecurity,
    #[serde(default)]
    pub volatility: Volatility,
    /// Function body, without dollar quoting.
    pub body: String,
}

impl Function {
    /// Argument types, identifying the overload.
    #[must_use]
    pub fn arg_types(&self) -> Vec<String> {
        self.args.iter().map(|a| a.sql_type.clone()).collect()
    }
}

/// A view or materialized view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub name: String,
    #[serde(default)]
    pub schema: String,
    /// The `SELECT` the view wraps. Absent for existing views.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default)]
    pub materialized: bool,
    /// Storage parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub with: BTreeMap<String, String>,
    /// Managed outside of migrations; never diffed.
    #[serde(default)]
    pub is_existing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tablespace: Option<String>,
    /// Table access method of a materialized view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,
    #[serde(default)]
    pub with_no_data: bool,
    /// MySQL `ALGORITHM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    /// MySQL `SQL SECURITY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_security: Option<String>,
    /// `WITH [CASCADED|LOCAL] CHECK OPTION`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_option: Option<String>,
}

impl View {
    /// Creates a plain view.
    #[must_use]
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            definition: Some(definition.into()),
            materialized: false,
            with: BTreeMap::new(),
            is_existing: false,
            tablespace: None,
            using: None,
            with_no_data: false,
            algorithm: None,
            sql_security: None,
            check_option: None,
        }
    }
}
