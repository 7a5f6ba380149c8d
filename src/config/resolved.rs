//! Resolved entity: config validated and flattened for runtime use.

use crate::config::{AuthorizerEntry, AuthorizerTable, ColumnType, ValidationRule};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Role names used when an entity does not configure its own.
pub const DEFAULT_ROLE_NAMES: &[&str] = &[
    "Unauthenticated",
    "User",
    "Manager",
    "Director",
    "Executive",
    "Administrator",
];

/// Authorizer table key consulted when the caller's role has no entry.
pub const DEFAULT_API_SECURITY: &str = "__DefaultAPISecurity";

const UNAUTHENTICATED_ROLE: &str = "Unauthenticated";

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: ColumnType,
    pub size: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub scope: String,
    pub default_identifier: String,
    pub guid_identifier: Option<String>,
    pub columns: Vec<ColumnInfo>,
    pub validation: HashMap<String, ValidationRule>,
    pub default_object: Map<String, Value>,
    pub role_names: Vec<String>,
    pub authorizer: AuthorizerTable,
}

impl ResolvedEntity {
    /// Name for a role index; anything out of range is unauthenticated.
    pub fn role_name(&self, role_index: i64) -> &str {
        if role_index < 0 {
            return UNAUTHENTICATED_ROLE;
        }
        self.role_names
            .get(role_index as usize)
            .map(String::as_str)
            .unwrap_or(UNAUTHENTICATED_ROLE)
    }

    /// Authorizer names configured for a role and operation, falling back to the default role entry.
    pub fn authorizer_entry(&self, role: &str, operation: &str) -> Option<&AuthorizerEntry> {
        let table = self
            .authorizer
            .get(role)
            .or_else(|| self.authorizer.get(DEFAULT_API_SECURITY))?;
        table.get(operation)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// First column carrying the given storage role.
    pub fn column_of_type(&self, column_type: ColumnType) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.column_type == column_type)
            .map(|c| c.name.as_str())
    }

    /// JSON schema document describing a record of this entity.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for c in &self.columns {
            let mut prop = Map::new();
            prop.insert("type".into(), Value::String(c.column_type.json_type().into()));
            if let Some(size) = c.size {
                prop.insert("maxLength".into(), json!(size));
            }
            if let Some(rule) = self.validation.get(&c.name) {
                if let Some(format) = &rule.format {
                    prop.insert("format".into(), Value::String(format.clone()));
                }
                if let Some(pattern) = &rule.pattern {
                    prop.insert("pattern".into(), Value::String(pattern.clone()));
                }
                if let Some(allowed) = &rule.allowed {
                    prop.insert("enum".into(), Value::Array(allowed.clone()));
                }
            }
            properties.insert(c.name.clone(), Value::Object(prop));
        }
        let mut required: Vec<&str> = self
            .validation
            .iter()
            .filter(|(_, r)| r.required == Some(true))
            .map(|(col, _)| col.as_str())
            .collect();
        required.sort_unstable();
        json!({
            "title": self.scope,
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}
