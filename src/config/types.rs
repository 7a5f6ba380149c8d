//! Raw entity config types matching the entity JSON files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Storage role of a column. Audit and identity types are stamped by the DAL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    AutoIdentity,
    #[serde(rename = "AutoGUID")]
    AutoGuid,
    CreateDate,
    #[serde(rename = "CreateIDUser")]
    CreateIdUser,
    UpdateDate,
    #[serde(rename = "UpdateIDUser")]
    UpdateIdUser,
    Deleted,
    DeleteDate,
    #[serde(rename = "DeleteIDUser")]
    DeleteIdUser,
    String,
    Text,
    Integer,
    Numeric,
    Decimal,
    DateTime,
    Boolean,
}

impl ColumnType {
    /// Columns the DAL fills in; callers never write them directly.
    pub fn is_managed(&self) -> bool {
        matches!(
            self,
            ColumnType::AutoIdentity
                | ColumnType::CreateDate
                | ColumnType::CreateIdUser
                | ColumnType::UpdateDate
                | ColumnType::UpdateIdUser
                | ColumnType::Deleted
                | ColumnType::DeleteDate
                | ColumnType::DeleteIdUser
        )
    }

    pub fn json_type(&self) -> &'static str {
        match self {
            ColumnType::AutoIdentity
            | ColumnType::CreateIdUser
            | ColumnType::UpdateIdUser
            | ColumnType::DeleteIdUser
            | ColumnType::Integer => "integer",
            ColumnType::Numeric | ColumnType::Decimal => "number",
            ColumnType::Deleted | ColumnType::Boolean => "boolean",
            _ => "string",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub column: String,
    #[serde(rename = "type")]
    pub type_: ColumnType,
    #[serde(default)]
    pub size: Option<u32>,
}

/// One authorizer name or an ordered list of names for an endpoint operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthorizerEntry {
    Single(String),
    List(Vec<String>),
}

impl AuthorizerEntry {
    pub fn names(&self) -> Vec<&str> {
        match self {
            AuthorizerEntry::Single(s) => vec![s.as_str()],
            AuthorizerEntry::List(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// Role name → (endpoint operation → authorizer names).
pub type AuthorizerTable = HashMap<String, HashMap<String, AuthorizerEntry>>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub scope: String,
    pub default_identifier: String,
    #[serde(default)]
    pub guid_identifier: Option<String>,
    pub schema: Vec<ColumnConfig>,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
    /// Template for the New endpoint and for unset fields on create.
    #[serde(default)]
    pub default_object: serde_json::Map<String, serde_json::Value>,
    /// Role names indexed by role index. Empty uses the built-in names.
    #[serde(default)]
    pub role_names: Vec<String>,
    #[serde(default)]
    pub authorizer: AuthorizerTable,
}
