use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use sqlx::postgres::{PgArguments, PgPool, PgRow};
use sqlx::types::Json;
use sqlx::{Column, Decode, Postgres, Row, Type, TypeInfo};
use tracing::debug;

use emigrator_core::error::{EmigratorError, Result};
use emigrator_core::schema::DbValue;
use emigrator_core::store::{BoxFuture, QueryInterface, QueryOutput, QueryParams, RawRow};

use super::params::translate_named_params;

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// `QueryInterface` over a PostgreSQL pool.
///
/// Accepts `:name` placeholders and returns every row as a JSON object keyed
/// by column name. A statement without parameters goes through the simple
/// query protocol unchanged, so a body holding several statements runs as
/// one implicit transaction. Columns whose type has no decoding here fail
/// the query; cast them to `text` to read them.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl QueryInterface for PgStore {
    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a QueryParams,
    ) -> BoxFuture<'a, Result<QueryOutput>> {
        Box::pin(async move {
            if params.is_empty() {
                debug!(sql = %sql, "Executing statement");
                let rows = sqlx::raw_sql(sql)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| EmigratorError::Database(e.to_string()))?;
                let records = rows.iter().map(decode_row).collect::<Result<Vec<_>>>()?;
                return Ok(QueryOutput::new(records));
            }

            let translated = translate_named_params(sql, params)?;
            debug!(sql = %translated.sql, binds = translated.binds.len(), "Executing query");

            let query = translated
                .binds
                .iter()
                .fold(sqlx::query(&translated.sql), |q, value| bind_value(q, value));

            let rows = query
                .fetch_all(&self.pool)
                .await
                .map_err(|e| EmigratorError::Database(e.to_string()))?;

            let records = rows.iter().map(decode_row).collect::<Result<Vec<_>>>()?;
            Ok(QueryOutput::new(records))
        })
    }
}

fn bind_value<'q>(query: PgQuery<'q>, value: &DbValue) -> PgQuery<'q> {
    match value {
        DbValue::Null => query.bind(None::<String>),
        DbValue::Integer(v) => query.bind(*v),
        DbValue::BigInt(v) => query.bind(*v),
        DbValue::Float(v) => query.bind(*v),
        DbValue::String(v) => query.bind(v.clone()),
        DbValue::Date(v) => query.bind(*v),
        DbValue::Boolean(v) => query.bind(*v),
        DbValue::Raw(v) => bind_json(query, v),
    }
}

// Scalars keep their natural SQL type; only structured values go as JSONB.
fn bind_json<'q>(query: PgQuery<'q>, value: &Value) -> PgQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(Json(value.clone())),
    }
}

fn decode_row(row: &PgRow) -> Result<RawRow> {
    let mut record = RawRow::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.name(), column.type_info().name())?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

fn decode_column(row: &PgRow, index: usize, name: &str, type_name: &str) -> Result<Value> {
    let value = match type_name {
        "VOID" => None,
        "INT2" => get::<i16>(row, index)?.map(Value::from),
        "INT4" => get::<i32>(row, index)?.map(Value::from),
        "INT8" => get::<i64>(row, index)?.map(Value::from),
        "NUMERIC" => get::<Decimal>(row, index)
            .map_err(|e| {
                EmigratorError::Database(format!(
                    "Column '{}' holds a NUMERIC value that cannot be read exactly ({}); cast it to text",
                    name, e
                ))
            })?
            .map(|d| Value::String(d.to_string())),
        "FLOAT4" => get::<f32>(row, index)?
            .and_then(|f| Number::from_f64(f64::from(f)))
            .map(Value::Number),
        "FLOAT8" => get::<f64>(row, index)?
            .and_then(Number::from_f64)
            .map(Value::Number),
        "BOOL" => get::<bool>(row, index)?.map(Value::Bool),
        "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, index)?
            .map(|d| Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))),
        "TIMESTAMP" => get::<NaiveDateTime>(row, index)?
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())),
        "DATE" => get::<NaiveDate>(row, index)?
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        "JSON" | "JSONB" => get::<Json<Value>>(row, index)?.map(|j| j.0),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "UNKNOWN" => {
            get::<String>(row, index)?.map(Value::String)
        }
        _ => {
            return Err(EmigratorError::Database(format!(
                "Column '{}' has type {} which cannot be read; cast it to text",
                name, type_name
            )))
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

fn get<'r, T>(row: &'r PgRow, index: usize) -> Result<Option<T>>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    Ok(row.try_get::<Option<T>, _>(index)?)
}
