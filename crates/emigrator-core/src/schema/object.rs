use std::collections::HashSet;

use serde_json::Value;

use super::coerce::coerce;
use super::field::{to_snake_case, Fallback, FieldDef};
use super::record::DbRecord;
use super::value::DbValue;
use crate::error::{EmigratorError, Result};
use crate::store::RawRow;

/// A single named field of a `FieldObject`.
#[derive(Debug, Clone)]
pub struct FieldEntry {
    /// Field name as used in `DbRecord` keys.
    pub name: String,
    /// Column name in SQL (snake_case of the field name).
    pub column: String,
    pub def: FieldDef,
}

impl FieldEntry {
    /// Row keys tried in order when looking the field up in a raw row.
    fn lookup_keys(&self) -> [String; 3] {
        [
            self.name.clone(),
            self.name.to_lowercase(),
            self.column.clone(),
        ]
    }

    /// First non-null raw value under any of the lookup keys.
    fn lookup<'r>(&self, row: &'r RawRow) -> Option<&'r Value> {
        self.lookup_keys()
            .iter()
            .filter_map(|key| row.get(key))
            .find(|value| !value.is_null())
    }
}

/// Ordered, static description of a record's fields.
///
/// ```ignore
/// let schema = FieldObject::new()
///     .field("id", FieldDef::bigint().not_null())
///     .field("someValue", FieldDef::string());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldObject {
    fields: Vec<FieldEntry>,
}

impl FieldObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field. Re-declaring a name replaces the earlier definition in place.
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        let name = name.into();
        let entry = FieldEntry {
            column: to_snake_case(&name),
            name,
            def,
        };
        match self.fields.iter_mut().find(|f| f.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.fields.push(entry),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &FieldEntry> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Comma-separated snake_case column list, in declaration order.
    pub fn column_list(&self) -> String {
        self.fields
            .iter()
            .map(|f| f.column.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Convert a raw row into a typed record.
    ///
    /// Every declared field ends up in the record: present values are coerced
    /// to the field kind, missing ones (absent or null) take the resolved
    /// default. Fails with `NullConstraintViolation` when a missing field has
    /// no default. Row keys no field claims are copied through as `Raw`.
    pub fn unmarshal(&self, row: &RawRow) -> Result<DbRecord> {
        let mut record = DbRecord::new();
        let mut claimed: HashSet<String> = HashSet::new();

        for entry in &self.fields {
            claimed.extend(entry.lookup_keys());

            let value = match entry.lookup(row) {
                Some(raw) => coerce(&entry.name, entry.def.kind, raw)?,
                None => match entry.def.resolve_default() {
                    Fallback::Value(value) => value,
                    Fallback::NotNull => {
                        return Err(EmigratorError::NullConstraintViolation {
                            field: entry.name.clone(),
                        })
                    }
                },
            };
            record.insert(entry.name.clone(), value);
        }

        for (key, raw) in row {
            if !claimed.contains(key) {
                record.insert(key.clone(), DbValue::Raw(raw.clone()));
            }
        }

        Ok(record)
    }
}
