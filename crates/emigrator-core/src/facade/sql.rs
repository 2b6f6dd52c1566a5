//! Multi-row INSERT / UPSERT statement compilation.

use crate::error::{EmigratorError, Result};
use crate::schema::{coerce, to_snake_case, DbRecord, DbValue, FieldEntry, FieldKind, FieldObject};
use crate::store::QueryParams;

/// Conflict handling for `multi_upsert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOptions {
    /// Field names forming the conflict target.
    pub upsert_fields: Vec<String>,
    /// Keep stored values and only fill the ones that are currently null.
    pub only_replace_nulls: bool,
}

impl UpsertOptions {
    pub fn new<I, S>(upsert_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            upsert_fields: upsert_fields.into_iter().map(Into::into).collect(),
            only_replace_nulls: false,
        }
    }

    pub fn only_replace_nulls(mut self) -> Self {
        self.only_replace_nulls = true;
        self
    }
}

/// A compiled statement with its named parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkStatement {
    pub sql: String,
    pub params: QueryParams,
}

/// Compile one INSERT for all records, or `None` when there are no records.
///
/// Columns are the schema fields present in at least one record, in schema
/// order. A record missing one of those columns gets `DEFAULT` in its slot.
/// Parameters are named `<column>_<row index>`. Fails with `Validation` when
/// no schema field is present in any record.
pub fn compile_insert(
    schema: &FieldObject,
    table: &str,
    records: &[DbRecord],
    upsert: Option<&UpsertOptions>,
) -> Result<Option<BulkStatement>> {
    if records.is_empty() {
        return Ok(None);
    }

    let columns: Vec<&FieldEntry> = schema
        .entries()
        .filter(|entry| records.iter().any(|r| r.contains_key(&entry.name)))
        .collect();
    if columns.is_empty() {
        return Err(EmigratorError::Validation(format!(
            "No field of the schema is present in the records inserted into {}",
            table
        )));
    }

    let mut params = QueryParams::new();
    let mut rows = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let mut slots = Vec::with_capacity(columns.len());
        for entry in &columns {
            match record.get(&entry.name) {
                Some(value) => {
                    let name = format!("{}_{}", entry.column, index);
                    slots.push(format!(":{}", name));
                    params.insert(name, prepare_value(entry, value)?);
                }
                None => slots.push("DEFAULT".to_string()),
            }
        }
        rows.push(format!("({})", slots.join(",")));
    }

    let column_list = columns
        .iter()
        .map(|c| c.column.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let mut sql = format!("INSERT INTO {}({}) VALUES{}", table, column_list, rows.join(","));

    if let Some(options) = upsert {
        sql.push_str(&conflict_clause(schema, table, &columns, options)?);
    }

    Ok(Some(BulkStatement { sql, params }))
}

fn conflict_clause(
    schema: &FieldObject,
    table: &str,
    columns: &[&FieldEntry],
    options: &UpsertOptions,
) -> Result<String> {
    if options.upsert_fields.is_empty() {
        return Err(EmigratorError::Validation(
            "Upsert requires at least one conflict field".to_string(),
        ));
    }

    let keys: Vec<String> = options
        .upsert_fields
        .iter()
        .map(|name| match schema.get(name) {
            Some(entry) => entry.column.clone(),
            None => to_snake_case(name),
        })
        .collect();

    let updates: Vec<String> = columns
        .iter()
        .filter(|c| !keys.contains(&c.column))
        .map(|c| {
            if options.only_replace_nulls {
                format!("{col}=COALESCE({table}.{col},EXCLUDED.{col})", col = c.column, table = table)
            } else {
                format!("{col}=EXCLUDED.{col}", col = c.column)
            }
        })
        .collect();

    if updates.is_empty() {
        Ok(format!(" ON CONFLICT({}) DO NOTHING", keys.join(",")))
    } else {
        Ok(format!(
            " ON CONFLICT({}) DO UPDATE SET {}",
            keys.join(","),
            updates.join(",")
        ))
    }
}

/// Bring an input value to the field's kind before binding.
fn prepare_value(entry: &FieldEntry, value: &DbValue) -> Result<DbValue> {
    if value.is_null() {
        return Ok(DbValue::Null);
    }
    let matches_kind = matches!(
        (entry.def.kind, value),
        (FieldKind::Integer, DbValue::Integer(_))
            | (FieldKind::BigInt, DbValue::BigInt(_))
            | (FieldKind::Float, DbValue::Float(_))
            | (FieldKind::String, DbValue::String(_))
            | (FieldKind::Date, DbValue::Date(_))
            | (FieldKind::Boolean, DbValue::Boolean(_))
    );
    if matches_kind {
        return Ok(value.clone());
    }
    coerce(&entry.name, entry.def.kind, &value.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn entries() -> FieldObject {
        FieldObject::new()
            .field("id", FieldDef::bigint().not_null())
            .field("value", FieldDef::string())
    }

    #[test]
    fn test_two_row_insert() {
        let records = vec![
            DbRecord::new().with("id", Decimal::from(1)).with("value", "a"),
            DbRecord::new().with("id", Decimal::from(2)).with("value", "b"),
        ];
        let statement = compile_insert(&entries(), "t", &records, None).unwrap().unwrap();

        assert_eq!(
            statement.sql,
            "INSERT INTO t(id,value) VALUES(:id_0,:value_0),(:id_1,:value_1)"
        );
        assert_eq!(
            statement.params,
            QueryParams::new()
                .with("id_0", Decimal::from(1))
                .with("value_0", "a")
                .with("id_1", Decimal::from(2))
                .with("value_1", "b")
        );
    }

    #[test]
    fn test_empty_records_compile_to_nothing() {
        assert!(compile_insert(&entries(), "t", &[], None).unwrap().is_none());
    }

    #[test]
    fn test_columns_follow_record_keys() {
        let schema = FieldObject::new()
            .field("id", FieldDef::integer())
            .field("someValue", FieldDef::string())
            .field("unused", FieldDef::string());
        let records = vec![
            DbRecord::new().with("id", 1).with("someValue", "txt"),
            DbRecord::new().with("id", 2),
        ];
        let statement = compile_insert(&schema, "test_tab", &records, None).unwrap().unwrap();

        assert_eq!(
            statement.sql,
            "INSERT INTO test_tab(id,some_value) VALUES(:id_0,:some_value_0),(:id_1,DEFAULT)"
        );
        assert_eq!(statement.params.len(), 3);
    }

    #[test]
    fn test_keys_outside_schema_are_not_bound() {
        let records = vec![DbRecord::new().with("id", 1).with("extra", true)];
        let statement = compile_insert(&entries(), "t", &records, None).unwrap().unwrap();
        assert_eq!(statement.sql, "INSERT INTO t(id) VALUES(:id_0)");
        assert_eq!(statement.params.get("id_0"), Some(&DbValue::BigInt(Decimal::from(1))));
    }

    #[test]
    fn test_no_schema_field_present_is_rejected() {
        let records = vec![DbRecord::new().with("extra", 1)];
        let err = compile_insert(&entries(), "t", &records, None).unwrap_err();
        assert!(matches!(err, EmigratorError::Validation(_)));
    }

    #[test]
    fn test_date_strings_are_bound_as_dates() {
        let schema = FieldObject::new().field("dateField", FieldDef::date());
        let records = vec![DbRecord::new().with("dateField", "1990-03-11T12:00:00Z")];
        let statement = compile_insert(&schema, "table_name", &records, None).unwrap().unwrap();
        assert_eq!(
            statement.params.get("date_field_0"),
            Some(&DbValue::Date(Utc.with_ymd_and_hms(1990, 3, 11, 12, 0, 0).unwrap()))
        );
    }

    #[test]
    fn test_false_and_null_are_kept_apart() {
        let schema = FieldObject::new().field("bulk", FieldDef::boolean());
        let records = vec![
            DbRecord::new().with("bulk", false),
            DbRecord::new().with("bulk", DbValue::Null),
        ];
        let statement = compile_insert(&schema, "t", &records, None).unwrap().unwrap();
        assert_eq!(statement.params.get("bulk_0"), Some(&DbValue::Boolean(false)));
        assert_eq!(statement.params.get("bulk_1"), Some(&DbValue::Null));
    }

    #[test]
    fn test_upsert_overwrites_by_default() {
        let schema = FieldObject::new()
            .field("id", FieldDef::integer())
            .field("someValue", FieldDef::string())
            .field("amount", FieldDef::float());
        let records = vec![DbRecord::new().with("id", 1).with("someValue", "a").with("amount", 1.5)];
        let statement = compile_insert(&schema, "t", &records, Some(&UpsertOptions::new(["id"])))
            .unwrap()
            .unwrap();
        assert_eq!(
            statement.sql,
            "INSERT INTO t(id,some_value,amount) VALUES(:id_0,:some_value_0,:amount_0) \
             ON CONFLICT(id) DO UPDATE SET some_value=EXCLUDED.some_value,amount=EXCLUDED.amount"
        );
    }

    #[test]
    fn test_upsert_only_replacing_nulls_keeps_stored_values() {
        let schema = FieldObject::new()
            .field("id", FieldDef::integer())
            .field("someValue", FieldDef::string());
        let records = vec![DbRecord::new().with("id", 1).with("someValue", "a")];
        let options = UpsertOptions::new(["id"]).only_replace_nulls();
        let statement = compile_insert(&schema, "t", &records, Some(&options)).unwrap().unwrap();
        assert!(statement
            .sql
            .ends_with(" ON CONFLICT(id) DO UPDATE SET some_value=COALESCE(t.some_value,EXCLUDED.some_value)"));
    }

    #[test]
    fn test_upsert_with_only_key_columns_does_nothing() {
        let schema = FieldObject::new().field("userId", FieldDef::integer());
        let records = vec![DbRecord::new().with("userId", 1)];
        let statement = compile_insert(&schema, "t", &records, Some(&UpsertOptions::new(["userId"])))
            .unwrap()
            .unwrap();
        assert!(statement.sql.ends_with(" ON CONFLICT(user_id) DO NOTHING"));
    }

    #[test]
    fn test_upsert_without_keys_is_rejected() {
        let records = vec![DbRecord::new().with("id", 1)];
        let options = UpsertOptions::new(Vec::<String>::new());
        let err = compile_insert(&entries(), "t", &records, Some(&options)).unwrap_err();
        assert!(matches!(err, EmigratorError::Validation(_)));
    }
}
