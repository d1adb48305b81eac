// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Persistence Configuration
//!
//! YAML-backed settings for the database pool, hydration limits and log
//! level. Loaded once at startup via [`PersistenceConfig::load_or_default`].
//!
//! ## Discovery order
//!
//! 1. Explicit path passed by the caller
//! 2. `AAS_PERSISTENCE_CONFIG_PATH` environment variable
//! 3. `./aas-persistence.yaml`
//! 4. `~/.aas-persistence/config.yaml`
//! 5. `/etc/aas-persistence/config.yaml`
//!
//! Environment overrides (`AAS_DATABASE_URL`, `AAS_DATABASE_MAX_CONNECTIONS`,
//! `AAS_LOG_LEVEL`) are applied after loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub hydration: HydrationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydrationConfig {
    /// Page size used when a listing request does not name one.
    #[serde(default = "default_page_limit")]
    pub default_page_limit: usize,
    /// Upper bound on any requested page size.
    #[serde(default = "default_max_page_limit")]
    pub max_page_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_database_url() -> String {
    "postgres://localhost:5432/aas".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_page_limit() -> usize {
    100
}

fn default_max_page_limit() -> usize {
    1000
}

/// Largest page size `validate` accepts for `hydration.max_page_limit`.
pub const PAGE_LIMIT_CEILING: usize = 100_000;

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self {
            default_page_limit: default_page_limit(),
            max_page_limit: default_max_page_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl HydrationConfig {
    /// Resolve a requested page size against the configured bounds.
    pub fn effective_page_limit(&self, requested: usize) -> usize {
        if requested == 0 {
            self.default_page_limit
        } else {
            requested.min(self.max_page_limit)
        }
    }
}

impl PersistenceConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("AAS_PERSISTENCE_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./aas-persistence.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".aas-persistence").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/aas-persistence/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(explicit_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?
        } else if let Some(path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", path);
            Self::from_yaml_file(path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("AAS_DATABASE_URL") {
            tracing::info!("Environment override: AAS_DATABASE_URL");
            self.database.url = url;
        }

        if let Ok(val) = std::env::var("AAS_DATABASE_MAX_CONNECTIONS") {
            match val.parse::<u32>() {
                Ok(n) => {
                    tracing::info!("Environment override: AAS_DATABASE_MAX_CONNECTIONS={}", n);
                    self.database.max_connections = n;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for AAS_DATABASE_MAX_CONNECTIONS: '{}'. \
                         Expected an integer. Ignoring.",
                        val
                    );
                }
            }
        }

        if let Ok(level) = std::env::var("AAS_LOG_LEVEL") {
            tracing::info!("Environment override: AAS_LOG_LEVEL={}", level);
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("database.url cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("database.max_connections must be at least 1");
        }

        if self.hydration.default_page_limit == 0 {
            anyhow::bail!("hydration.default_page_limit must be at least 1");
        }

        if self.hydration.max_page_limit > PAGE_LIMIT_CEILING {
            anyhow::bail!(
                "hydration.max_page_limit ({}) exceeds {}",
                self.hydration.max_page_limit,
                PAGE_LIMIT_CEILING
            );
        }

        if self.hydration.default_page_limit > self.hydration.max_page_limit {
            anyhow::bail!(
                "hydration.default_page_limit ({}) exceeds hydration.max_page_limit ({})",
                self.hydration.default_page_limit,
                self.hydration.max_page_limit
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = PersistenceConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.hydration.default_page_limit, 100);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
database:
  url: postgres://db:5432/registry
hydration:
  max_page_limit: 250
"#;
        let config = PersistenceConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.database.url, "postgres://db:5432/registry");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.hydration.max_page_limit, 250);
        assert_eq!(config.hydration.default_page_limit, 100);
    }

    #[test]
    fn test_validation() {
        let mut config = PersistenceConfig::default();
        config.database.url = String::new();
        assert!(config.validate().is_err());

        let mut config = PersistenceConfig::default();
        config.hydration.default_page_limit = 2000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unbounded_max_page_limit_is_rejected() {
        let mut config = PersistenceConfig::default();
        config.hydration.max_page_limit = usize::MAX;
        assert!(config.validate().is_err());

        config.hydration.max_page_limit = PAGE_LIMIT_CEILING;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_effective_page_limit() {
        let hydration = HydrationConfig::default();
        assert_eq!(hydration.effective_page_limit(0), 100);
        assert_eq!(hydration.effective_page_limit(20), 20);
        assert_eq!(hydration.effective_page_limit(5000), 1000);
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "logging:\n  level: debug").unwrap();

        let config = PersistenceConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
    }
}
