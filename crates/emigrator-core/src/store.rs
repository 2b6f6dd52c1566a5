//! The store contract every adapter implements.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::schema::DbValue;

/// An untyped result row as returned by a store.
pub type RawRow = serde_json::Map<String, Value>;

/// Boxed future returned by the async contracts in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Named parameters for a statement using `:name` placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    entries: Vec<(String, DbValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<DbValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a parameter, replacing any earlier value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<DbValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DbValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DbValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as a JSON object, big integers as strings.
    pub fn to_json_string(&self) -> String {
        let map: serde_json::Map<String, Value> = self
            .entries
            .iter()
            .map(|(n, v)| (n.clone(), v.to_json()))
            .collect();
        Value::Object(map).to_string()
    }
}

/// Rows returned by a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub records: Vec<RawRow>,
}

impl QueryOutput {
    pub fn new(records: Vec<RawRow>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// A relational store accepting SQL with `:name` placeholders.
pub trait QueryInterface: Send + Sync {
    /// Execute one statement and return its rows (empty for non-queries).
    fn query<'a>(&'a self, sql: &'a str, params: &'a QueryParams)
        -> BoxFuture<'a, Result<QueryOutput>>;
}

impl<T: QueryInterface + ?Sized> QueryInterface for &T {
    fn query<'a>(&'a self, sql: &'a str, params: &'a QueryParams)
        -> BoxFuture<'a, Result<QueryOutput>> {
        (**self).query(sql, params)
    }
}

impl<T: QueryInterface + ?Sized> QueryInterface for Arc<T> {
    fn query<'a>(&'a self, sql: &'a str, params: &'a QueryParams)
        -> BoxFuture<'a, Result<QueryOutput>> {
        (**self).query(sql, params)
    }
}

impl<T: QueryInterface + ?Sized> QueryInterface for Box<T> {
    fn query<'a>(&'a self, sql: &'a str, params: &'a QueryParams)
        -> BoxFuture<'a, Result<QueryOutput>> {
        (**self).query(sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_params_replace_by_name() {
        let mut params = QueryParams::new().with("a", 1).with("b", "x");
        params.insert("a", 2);
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("a"), Some(&DbValue::Integer(2)));
    }

    #[test]
    fn test_params_json_keeps_big_integers() {
        let big = Decimal::from_str("12345678901234567890").unwrap();
        let params = QueryParams::new().with("id_0", big);
        assert_eq!(params.to_json_string(), r#"{"id_0":"12345678901234567890"}"#);
    }

    #[test]
    fn test_shared_store_forwards_queries() {
        let store = Arc::new(crate::testing::MockStore::new());
        let boxed: Box<dyn QueryInterface> = Box::new(Arc::clone(&store));
        let params = QueryParams::new().with("id", 1);

        let output = tokio_test::block_on(boxed.query("SELECT :id", &params)).unwrap();

        assert!(output.records.is_empty());
        store.assert_called_with("SELECT :id", &params);
    }
}
