//! Load entity config from JSON (string or file) and resolve it for runtime use.

use crate::config::resolved::{ColumnInfo, ResolvedEntity, DEFAULT_ROLE_NAMES};
use crate::config::{validate, EntityConfig};
use crate::error::ConfigError;
use std::path::Path;

/// Build the resolved entity from config (validates first).
pub fn resolve(config: &EntityConfig) -> Result<ResolvedEntity, ConfigError> {
    validate(config)?;

    let columns = config
        .schema
        .iter()
        .map(|c| ColumnInfo {
            name: c.column.clone(),
            column_type: c.type_,
            size: c.size,
        })
        .collect();

    let role_names = if config.role_names.is_empty() {
        DEFAULT_ROLE_NAMES.iter().map(|s| s.to_string()).collect()
    } else {
        config.role_names.clone()
    };

    Ok(ResolvedEntity {
        scope: config.scope.clone(),
        default_identifier: config.default_identifier.clone(),
        guid_identifier: config.guid_identifier.clone(),
        columns,
        validation: config.validation.clone(),
        default_object: config.default_object.clone(),
        role_names,
        authorizer: config.authorizer.clone(),
    })
}

pub fn load_from_str(raw: &str) -> Result<EntityConfig, ConfigError> {
    serde_json::from_str(raw).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Read one entity JSON file.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<EntityConfig, ConfigError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading entity config");
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    load_from_str(&raw)
}
