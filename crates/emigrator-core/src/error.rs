use thiserror::Error;

/// Core error type for emigrator operations.
#[derive(Error, Debug)]
pub enum EmigratorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    /// A migration could not be registered (non-positive or duplicate order).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A not-null field had no value and no resolvable default.
    #[error("Null constraint violation: field '{field}' is not nullable and no value was found")]
    NullConstraintViolation { field: String },

    /// A present value could not be converted to the declared field kind.
    #[error("Cannot convert value {value} of field '{field}' to {kind}")]
    Conversion {
        field: String,
        kind: String,
        value: String,
    },

    /// A bulk insert/upsert statement failed.
    #[error("Error for the executed insert query:\n{sql},\nvalues: {params}\nOriginal error: {message}")]
    Insert {
        sql: String,
        params: String,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

impl From<serde_json::Error> for EmigratorError {
    fn from(e: serde_json::Error) -> Self {
        EmigratorError::Serialization(e.to_string())
    }
}

/// Result type alias using EmigratorError.
pub type Result<T> = std::result::Result<T, EmigratorError>;
