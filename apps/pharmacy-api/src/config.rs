//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pharmacy API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP server port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Maximum pooled connections
    pub db_max_connections: u32,

    /// Dashboard stats cache lifetime in seconds
    pub dashboard_cache_secs: u64,

    /// Supplier assigned to stock-ins that name none; created at startup
    pub default_supplier: String,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = ApiConfig {
            http_port: parse_or(&lookup, "PHARMACY_HTTP_PORT", 8080)?,

            database_path: lookup("PHARMACY_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./pharmacy.db")),

            db_max_connections: parse_or(&lookup, "PHARMACY_DB_MAX_CONNECTIONS", 5)?,

            dashboard_cache_secs: parse_or(&lookup, "PHARMACY_DASHBOARD_CACHE_SECS", 300)?,

            default_supplier: lookup("PHARMACY_DEFAULT_SUPPLIER")
                .unwrap_or_else(|| "Default Supplier".to_string()),
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("PHARMACY_DB_MAX_CONNECTIONS".to_string()));
        }
        if config.default_supplier.trim().is_empty() {
            return Err(ConfigError::MissingRequired("PHARMACY_DEFAULT_SUPPLIER".to_string()));
        }

        Ok(config)
    }

    pub fn dashboard_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.dashboard_cache_secs)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from(&[]).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.database_path, PathBuf::from("./pharmacy.db"));
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.dashboard_cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.default_supplier, "Default Supplier");
    }

    #[test]
    fn test_overrides() {
        let config = from(&[
            ("PHARMACY_HTTP_PORT", "9000"),
            ("PHARMACY_DATABASE_PATH", "/tmp/p.db"),
            ("PHARMACY_DASHBOARD_CACHE_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.database_path, PathBuf::from("/tmp/p.db"));
        assert_eq!(config.dashboard_cache_secs, 0);
    }

    #[test]
    fn test_bad_values() {
        assert!(matches!(
            from(&[("PHARMACY_HTTP_PORT", "eighty")]),
            Err(ConfigError::InvalidValue(key)) if key == "PHARMACY_HTTP_PORT"
        ));
        assert!(from(&[("PHARMACY_DB_MAX_CONNECTIONS", "0")]).is_err());
        assert!(matches!(
            from(&[("PHARMACY_DEFAULT_SUPPLIER", "  ")]),
            Err(ConfigError::MissingRequired(_))
        ));
    }
}
