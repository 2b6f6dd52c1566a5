use std::collections::VecDeque;
use std::sync::{Mutex, RwLock};

use serde_json::Value;

use crate::error::{EmigratorError, Result};
use crate::store::{BoxFuture, QueryInterface, QueryOutput, QueryParams, RawRow};

/// A statement received by a `MockStore`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: QueryParams,
}

/// Scripted store that records every statement it receives.
///
/// Responses are consumed in order; once the script runs out every query
/// returns no rows.
///
/// # Example
///
/// ```ignore
/// let store = MockStore::new().respond_with(rows_from_json(json!([{ "id": 1 }])));
/// let facade = typed_facade(&store);
/// facade.select(&schema, "users", &QueryParams::new()).await?;
/// store.assert_called_with("SELECT id FROM users", &QueryParams::new());
/// ```
pub struct MockStore {
    calls: RwLock<Vec<RecordedQuery>>,
    responses: Mutex<VecDeque<std::result::Result<Vec<RawRow>, String>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            calls: RwLock::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue a successful response.
    pub fn respond_with(self, rows: Vec<RawRow>) -> Self {
        self.push_rows(rows);
        self
    }

    /// Queue a failing response.
    pub fn fail_with(self, message: &str) -> Self {
        self.push_error(message);
        self
    }

    pub fn push_rows(&self, rows: Vec<RawRow>) {
        self.responses.lock().unwrap().push_back(Ok(rows));
    }

    pub fn push_error(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> Vec<RecordedQuery> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Assert that a statement was issued with exactly these parameters.
    pub fn assert_called_with(&self, sql: &str, params: &QueryParams) {
        let calls = self.calls.read().unwrap();
        let found = calls.iter().any(|c| c.sql == sql && c.params == *params);
        assert!(
            found,
            "Expected query '{}' with {:?}, but it wasn't issued. Issued: {:?}",
            sql,
            params,
            calls.iter().map(|c| &c.sql).collect::<Vec<_>>()
        );
    }

    pub fn assert_not_called(&self) {
        let calls = self.calls.read().unwrap();
        assert!(
            calls.is_empty(),
            "Expected no queries, but {} were issued: {:?}",
            calls.len(),
            calls.iter().map(|c| &c.sql).collect::<Vec<_>>()
        );
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryInterface for MockStore {
    fn query<'a>(&'a self, sql: &'a str, params: &'a QueryParams)
        -> BoxFuture<'a, Result<QueryOutput>> {
        Box::pin(async move {
            self.calls.write().unwrap().push(RecordedQuery {
                sql: sql.to_string(),
                params: params.clone(),
            });

            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(rows)) => Ok(QueryOutput::new(rows)),
                Some(Err(message)) => Err(EmigratorError::Database(message)),
                None => Ok(QueryOutput::empty()),
            }
        })
    }
}

/// Turn a JSON array of objects into raw rows. Non-object items are skipped.
pub fn rows_from_json(value: Value) -> Vec<RawRow> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        Value::Object(map) => vec![map],
        _ => Vec::new(),
    }
}
