use serde::{Deserialize, Serialize};

/// Message recorded when a runner reports failure without saying why.
pub const NO_ERROR_MESSAGE: &str = "No error message returned from runner";

/// One ordered schema/data change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    /// Position in the migration sequence; unique and positive.
    pub order: i64,
    pub description: String,
    /// Raw statement executed verbatim.
    pub query: String,
}

impl Migration {
    pub fn new(order: i64, description: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            order,
            description: description.into(),
            query: query.into(),
        }
    }
}

/// Outcome of running one migration or a whole `migrate()` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationResult {
    pub successful: bool,
    /// Number of migrations attempted, the failing one included.
    pub number_migrated: usize,
    pub error_message: Option<String>,
}

impl MigrationResult {
    pub fn success() -> Self {
        Self {
            successful: true,
            ..Default::default()
        }
    }

    pub fn failure(error_message: impl Into<String>) -> Self {
        Self {
            successful: false,
            number_migrated: 0,
            error_message: Some(error_message.into()),
        }
    }
}

/// A failed migration and the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationError {
    pub migration: Migration,
    pub error_message: String,
}
