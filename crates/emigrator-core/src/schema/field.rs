use std::fmt;

use super::value::DbValue;

/// Scalar kinds a field can be marshalled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 64-bit integer
    Integer,
    /// Exact integer beyond the 64-bit range
    BigInt,
    /// 64-bit floating point
    Float,
    /// Text
    String,
    /// Timestamp in UTC
    Date,
    /// Boolean
    Boolean,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::BigInt => "bigint",
            FieldKind::Float => "float",
            FieldKind::String => "string",
            FieldKind::Date => "date",
            FieldKind::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of resolving a field's default.
#[derive(Debug, Clone, PartialEq)]
pub enum Fallback {
    /// Use this value (possibly `DbValue::Null`).
    Value(DbValue),
    /// No value may be substituted; the field must be present.
    NotNull,
}

/// What happens when a field has no value in a query row.
#[derive(Debug, Clone)]
pub enum NullPolicy {
    /// Missing values become null.
    Nullable,
    /// Missing values are an error.
    NotNull,
    /// Missing values take a fixed default.
    Default(DbValue),
    /// Missing values are computed; the function may refuse with `Fallback::NotNull`.
    DefaultFn(fn() -> Fallback),
}

impl NullPolicy {
    pub fn resolve(&self) -> Fallback {
        match self {
            NullPolicy::Nullable => Fallback::Value(DbValue::Null),
            NullPolicy::NotNull => Fallback::NotNull,
            NullPolicy::Default(value) => Fallback::Value(value.clone()),
            NullPolicy::DefaultFn(f) => f(),
        }
    }
}

/// Definition of a marshalled field: its kind and null policy.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub kind: FieldKind,
    pub null_policy: NullPolicy,
}

impl FieldDef {
    /// Create a nullable field of the given kind.
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            null_policy: NullPolicy::Nullable,
        }
    }

    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    pub fn bigint() -> Self {
        Self::new(FieldKind::BigInt)
    }

    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    pub fn date() -> Self {
        Self::new(FieldKind::Date)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    /// Require a value for this field.
    pub fn not_null(mut self) -> Self {
        self.null_policy = NullPolicy::NotNull;
        self
    }

    /// Use a fixed value when the field is missing.
    pub fn with_default(mut self, value: impl Into<DbValue>) -> Self {
        self.null_policy = NullPolicy::Default(value.into());
        self
    }

    /// Compute the value when the field is missing.
    pub fn with_default_fn(mut self, f: fn() -> Fallback) -> Self {
        self.null_policy = NullPolicy::DefaultFn(f);
        self
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self.null_policy, NullPolicy::Nullable)
    }

    pub fn resolve_default(&self) -> Fallback {
        self.null_policy.resolve()
    }
}

/// Convert a field name to its snake_case column name.
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
