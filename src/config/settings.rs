//! Endpoint settings: authorization mode, paging defaults and per-operation role levels.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::str::FromStr;

/// Maximum records returned by list reads when the caller gives no cap.
pub const DEFAULT_MAX_CAP: u64 = 250;

/// How the authorizer registry is populated and whether it is consulted at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthorizationMode {
    /// Every authorization check succeeds without running a predicate.
    #[default]
    Disabled,
    /// Built-in Allow, Deny, Mine and MyCustomer authorizers are registered.
    SimpleOwnership,
}

impl FromStr for AuthorizationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disabled" => Ok(AuthorizationMode::Disabled),
            "simpleownership" | "simple_ownership" => Ok(AuthorizationMode::SimpleOwnership),
            _ => Err(ConfigError::Validation(format!(
                "invalid authorization mode: {} (expected Disabled or SimpleOwnership)",
                s
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub authorization_mode: AuthorizationMode,
    pub default_max_cap: u64,
    /// Minimum role index per endpoint operation. Missing operations require `default_level`.
    pub endpoint_levels: HashMap<String, i64>,
    pub default_level: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            authorization_mode: AuthorizationMode::Disabled,
            default_max_cap: DEFAULT_MAX_CAP,
            endpoint_levels: HashMap::new(),
            // any authenticated user
            default_level: 1,
        }
    }
}

impl Settings {
    /// Read `ENDPOINT_AUTHORIZATION_MODE` and `ENDPOINT_DEFAULT_MAX_CAP`; unset values keep defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        if let Ok(mode) = std::env::var("ENDPOINT_AUTHORIZATION_MODE") {
            settings.authorization_mode = mode.parse()?;
        }
        if let Ok(cap) = std::env::var("ENDPOINT_DEFAULT_MAX_CAP") {
            settings.default_max_cap = cap
                .trim()
                .parse()
                .map_err(|_| ConfigError::Validation(format!("invalid default max cap: {}", cap)))?;
        }
        Ok(settings)
    }

    pub fn with_authorization_mode(mut self, mode: AuthorizationMode) -> Self {
        self.authorization_mode = mode;
        self
    }

    pub fn with_endpoint_level(mut self, operation: &str, level: i64) -> Self {
        self.endpoint_levels.insert(operation.to_string(), level);
        self
    }

    pub fn endpoint_level(&self, operation: &str) -> i64 {
        self.endpoint_levels
            .get(operation)
            .copied()
            .unwrap_or(self.default_level)
    }
}
