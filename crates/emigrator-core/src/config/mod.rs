mod database;
mod logging;
mod migrations;

pub use database::DatabaseConfig;
pub use logging::LoggingConfig;
pub use migrations::{validate_table_name, MigrationsConfig, DEFAULT_LOG_TABLE};

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{EmigratorError, Result};

/// Root configuration for emigrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmigratorConfig {
    /// Database configuration.
    pub database: DatabaseConfig,

    /// Migration log and migration source configuration.
    #[serde(default)]
    pub migrations: MigrationsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EmigratorConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| EmigratorError::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// `${VAR}` references are replaced from the environment before parsing,
    /// and the log table name is validated afterwards.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let content = substitute_env_vars(content)?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| EmigratorError::Config(format!("Failed to parse config: {}", e)))?;
        validate_table_name(&config.migrations.log_table)?;
        Ok(config)
    }

    /// Configuration with defaults everywhere but the database URL.
    pub fn default_with_database_url(url: &str) -> Self {
        Self {
            database: DatabaseConfig {
                url: url.to_string(),
                ..Default::default()
            },
            migrations: MigrationsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Substitute environment variables in the format ${VAR_NAME}.
///
/// Unset variables are left as written.
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| EmigratorError::Config(e.to_string()))?;

    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    Ok(result)
}
