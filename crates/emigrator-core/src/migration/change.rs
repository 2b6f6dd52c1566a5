//! Schema of a migration log row.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::{EmigratorError, Result};
use crate::schema::{DbRecord, DbValue, FieldDef, FieldObject};

/// Field object describing one row of the migration log.
pub static DATABASE_CHANGE: Lazy<FieldObject> = Lazy::new(|| {
    FieldObject::new()
        .field("creationOrder", FieldDef::integer().not_null())
        .field("description", FieldDef::string().not_null())
        .field("runTs", FieldDef::date().not_null())
        .field("queryExecuted", FieldDef::string().not_null())
        .field("successful", FieldDef::boolean().not_null())
        .field("message", FieldDef::string())
});

/// A migration log row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseChange {
    pub creation_order: i64,
    pub description: String,
    pub run_ts: DateTime<Utc>,
    pub query_executed: String,
    pub successful: bool,
    pub message: Option<String>,
}

impl TryFrom<&DbRecord> for DatabaseChange {
    type Error = EmigratorError;

    fn try_from(record: &DbRecord) -> Result<Self> {
        Ok(Self {
            creation_order: required(record, "creationOrder", DbValue::as_i64)?,
            description: required(record, "description", |v| v.as_str().map(str::to_string))?,
            run_ts: required(record, "runTs", DbValue::as_date)?,
            query_executed: required(record, "queryExecuted", |v| v.as_str().map(str::to_string))?,
            successful: required(record, "successful", DbValue::as_bool)?,
            message: record
                .get("message")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }
}

fn required<T>(record: &DbRecord, field: &str, extract: impl Fn(&DbValue) -> Option<T>) -> Result<T> {
    match record.get(field) {
        Some(value) if !value.is_null() => extract(value).ok_or_else(|| EmigratorError::Conversion {
            field: field.to_string(),
            kind: std::any::type_name::<T>().to_string(),
            value: value.to_json().to_string(),
        }),
        _ => Err(EmigratorError::NullConstraintViolation {
            field: field.to_string(),
        }),
    }
}
