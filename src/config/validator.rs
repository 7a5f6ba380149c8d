//! Entity config validation: identifiers, columns and authorizer table consistency.

use crate::config::{ColumnType, EntityConfig};
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(config: &EntityConfig) -> Result<(), ConfigError> {
    if config.scope.trim().is_empty() {
        return Err(ConfigError::Validation("scope must not be empty".into()));
    }

    let mut columns = HashSet::new();
    for c in &config.schema {
        if !columns.insert(c.column.as_str()) {
            return Err(ConfigError::DuplicateColumn(c.column.clone()));
        }
    }

    if !columns.contains(config.default_identifier.as_str()) {
        return Err(ConfigError::InvalidIdentifier {
            scope: config.scope.clone(),
            column: config.default_identifier.clone(),
        });
    }
    if let Some(guid) = &config.guid_identifier {
        if !columns.contains(guid.as_str()) {
            return Err(ConfigError::InvalidIdentifier {
                scope: config.scope.clone(),
                column: guid.clone(),
            });
        }
    }

    for managed in [ColumnType::AutoIdentity, ColumnType::AutoGuid, ColumnType::Deleted] {
        if config.schema.iter().filter(|c| c.type_ == managed).count() > 1 {
            return Err(ConfigError::Validation(format!(
                "at most one {:?} column allowed",
                managed
            )));
        }
    }

    for col in config.validation.keys() {
        if !columns.contains(col.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "column",
                id: col.clone(),
            });
        }
    }

    for (role, operations) in &config.authorizer {
        for (operation, entry) in operations {
            if entry.names().iter().any(|n| n.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "empty authorizer name for role {} operation {}",
                    role, operation
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: serde_json::Value) -> EntityConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn rejects_unknown_default_identifier() {
        let c = config(json!({
            "scope": "Book",
            "default_identifier": "IDAuthor",
            "schema": [{ "column": "IDBook", "type": "AutoIdentity" }]
        }));
        assert!(matches!(validate(&c), Err(ConfigError::InvalidIdentifier { .. })));
    }

    #[test]
    fn rejects_duplicate_columns() {
        let c = config(json!({
            "scope": "Book",
            "default_identifier": "IDBook",
            "schema": [
                { "column": "IDBook", "type": "AutoIdentity" },
                { "column": "IDBook", "type": "Integer" }
            ]
        }));
        assert!(matches!(validate(&c), Err(ConfigError::DuplicateColumn(_))));
    }

    #[test]
    fn rejects_validation_for_missing_column() {
        let c = config(json!({
            "scope": "Book",
            "default_identifier": "IDBook",
            "schema": [{ "column": "IDBook", "type": "AutoIdentity" }],
            "validation": { "Title": { "required": true } }
        }));
        assert!(matches!(validate(&c), Err(ConfigError::MissingReference { .. })));
    }
}
