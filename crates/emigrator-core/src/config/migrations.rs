use serde::{Deserialize, Serialize};

use crate::error::{EmigratorError, Result};

/// Table holding one row per migration attempt unless configured otherwise.
pub const DEFAULT_LOG_TABLE: &str = "migration_log";

/// Migration log and migration source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationsConfig {
    /// Name of the migration log table, optionally schema-qualified.
    #[serde(default = "default_log_table")]
    pub log_table: String,

    /// Directory scanned for `NNNN_description.sql` files.
    #[serde(default = "default_directory")]
    pub directory: String,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            log_table: default_log_table(),
            directory: default_directory(),
        }
    }
}

fn default_log_table() -> String {
    DEFAULT_LOG_TABLE.to_string()
}

fn default_directory() -> String {
    "migrations".to_string()
}

/// Check that `name` is a plain identifier or `schema.identifier`.
///
/// Table names are spliced into SQL text, so anything else is refused.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut parts = name.split('.');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(table), None, _) => is_identifier(table),
        (Some(schema), Some(table), None) => is_identifier(schema) && is_identifier(table),
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(EmigratorError::Config(format!(
            "Invalid table name '{}'",
            name
        )))
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
