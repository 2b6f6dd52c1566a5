use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// A natively typed database value.
///
/// `BigInt` holds an integral `Decimal` so values beyond the `i64` range stay
/// exact. `Raw` carries untyped values passed through from a query row for
/// keys that no field describes.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Null,
    Integer(i64),
    BigInt(Decimal),
    Float(f64),
    String(String),
    Date(DateTime<Utc>),
    Boolean(bool),
    Raw(Value),
}

impl DbValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null | DbValue::Raw(Value::Null))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DbValue::Integer(v) => Some(*v),
            DbValue::BigInt(v) => v.to_i64(),
            DbValue::Raw(v) => v.as_i64(),
            _ => None,
        }
    }

    pub fn as_bigint(&self) -> Option<Decimal> {
        match self {
            DbValue::BigInt(v) => Some(*v),
            DbValue::Integer(v) => Some(Decimal::from(*v)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DbValue::Float(v) => Some(*v),
            DbValue::Integer(v) => Some(*v as f64),
            DbValue::Raw(v) => v.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DbValue::String(v) => Some(v),
            DbValue::Raw(v) => v.as_str(),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            DbValue::Date(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DbValue::Boolean(v) => Some(*v),
            DbValue::Raw(v) => v.as_bool(),
            _ => None,
        }
    }

    /// Convert to JSON without losing big integer digits.
    ///
    /// Big integers become decimal strings, dates become RFC 3339 strings.
    pub fn to_json(&self) -> Value {
        match self {
            DbValue::Null => Value::Null,
            DbValue::Integer(v) => Value::from(*v),
            DbValue::BigInt(v) => Value::String(v.to_string()),
            DbValue::Float(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            DbValue::String(v) => Value::String(v.clone()),
            DbValue::Date(v) => Value::String(v.to_rfc3339_opts(SecondsFormat::Millis, true)),
            DbValue::Boolean(v) => Value::Bool(*v),
            DbValue::Raw(v) => v.clone(),
        }
    }
}

impl Serialize for DbValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<i64> for DbValue {
    fn from(v: i64) -> Self {
        DbValue::Integer(v)
    }
}

impl From<i32> for DbValue {
    fn from(v: i32) -> Self {
        DbValue::Integer(i64::from(v))
    }
}

impl From<Decimal> for DbValue {
    fn from(v: Decimal) -> Self {
        DbValue::BigInt(v)
    }
}

impl From<f64> for DbValue {
    fn from(v: f64) -> Self {
        DbValue::Float(v)
    }
}

impl From<String> for DbValue {
    fn from(v: String) -> Self {
        DbValue::String(v)
    }
}

impl From<&str> for DbValue {
    fn from(v: &str) -> Self {
        DbValue::String(v.to_string())
    }
}

impl From<DateTime<Utc>> for DbValue {
    fn from(v: DateTime<Utc>) -> Self {
        DbValue::Date(v)
    }
}

impl From<bool> for DbValue {
    fn from(v: bool) -> Self {
        DbValue::Boolean(v)
    }
}

impl From<Value> for DbValue {
    fn from(v: Value) -> Self {
        DbValue::Raw(v)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(DbValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    #[test]
    fn test_bigint_serializes_as_string() {
        let big = Decimal::from_str("12345678901234567890").unwrap();
        assert_eq!(
            DbValue::BigInt(big).to_json(),
            Value::String("12345678901234567890".to_string())
        );
    }

    #[test]
    fn test_date_serializes_as_rfc3339() {
        let date = Utc.with_ymd_and_hms(1990, 3, 11, 4, 20, 35).unwrap();
        assert_eq!(
            DbValue::Date(date).to_json(),
            Value::String("1990-03-11T04:20:35.000Z".to_string())
        );
    }

    #[test]
    fn test_false_is_not_null() {
        assert!(!DbValue::Boolean(false).is_null());
        assert!(DbValue::Null.is_null());
        assert!(DbValue::Raw(Value::Null).is_null());
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(DbValue::from(None::<i64>), DbValue::Null);
        assert_eq!(DbValue::from(Some("a")), DbValue::String("a".to_string()));
    }
}
