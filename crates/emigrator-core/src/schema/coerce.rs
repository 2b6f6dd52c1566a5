//! Read-path coercion of loosely typed row values into `DbValue`s.
//!
//! Store drivers disagree on how they hand back numbers, timestamps and
//! booleans (native JSON values vs. text), so every kind accepts a few
//! representations. Callers only pass present values: `null` is handled by
//! the field's null policy before coercion.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use super::field::FieldKind;
use super::value::DbValue;
use crate::error::{EmigratorError, Result};

/// Coerce a present raw value to the given field kind.
pub fn coerce(field: &str, kind: FieldKind, raw: &Value) -> Result<DbValue> {
    let converted = match kind {
        FieldKind::Integer => to_integer(raw).map(DbValue::Integer),
        FieldKind::BigInt => to_bigint(raw).map(DbValue::BigInt),
        FieldKind::Float => to_float(raw).map(DbValue::Float),
        FieldKind::String => Some(DbValue::String(to_text(raw))),
        FieldKind::Date => to_date(raw).map(DbValue::Date),
        FieldKind::Boolean => Some(DbValue::Boolean(truthy(raw))),
    };

    converted.ok_or_else(|| EmigratorError::Conversion {
        field: field.to_string(),
        kind: kind.to_string(),
        value: raw.to_string(),
    })
}

fn to_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => integer_prefix(s)?.parse().ok(),
        _ => None,
    }
}

fn to_bigint(raw: &Value) -> Option<Decimal> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                Decimal::try_from(n.as_f64()?.trunc()).ok()
            }
        }
        // NUMERIC columns come back as "100500.00"; only the integral part counts.
        Value::String(s) => Decimal::from_str(integer_prefix(s)?).ok(),
        _ => None,
    }
}

fn to_float(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_date(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => DateTime::from_timestamp_millis(n.as_i64()?),
        _ => None,
    }
}

/// Truthiness of a raw value for boolean fields.
///
/// Stricter than plain non-empty-string truthiness: the strings `false`,
/// `f`, `0`, `no`, `n` and `off` (any case, trimmed) read as false, so
/// PostgreSQL's text rendering of booleans round-trips.
fn truthy(raw: &Value) -> bool {
    match raw {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "false" | "f" | "0" | "no" | "n" | "off"
        ),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Leading `[+-]digits` of a string, ignoring surrounding whitespace.
fn integer_prefix(s: &str) -> Option<&str> {
    let s = s.trim();
    let sign_len = usize::from(s.starts_with(['-', '+']));
    let digits = s[sign_len..]
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    Some(&s[..sign_len + digits])
}

/// Parse the timestamp layouts drivers produce, assuming UTC when no offset is given.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, layout) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
