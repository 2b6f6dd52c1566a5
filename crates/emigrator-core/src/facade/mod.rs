//! Typed facade over a `QueryInterface`.
//!
//! Converts untyped rows into `DbRecord`s through a `FieldObject` and
//! compiles bulk INSERT / UPSERT statements from typed records.

mod sql;

pub use sql::{compile_insert, BulkStatement, UpsertOptions};

use tracing::debug;

use crate::error::{EmigratorError, Result};
use crate::schema::{DbRecord, FieldObject};
use crate::store::{BoxFuture, QueryInterface, QueryOutput, QueryParams};

/// Records produced by `TypedFacade::typed_query`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedQueryOutput {
    pub records: Vec<DbRecord>,
}

/// Typed access to a store.
pub struct TypedFacade<Q> {
    db: Q,
}

/// Wrap a store in a typed facade.
pub fn typed_facade<Q: QueryInterface>(db: Q) -> TypedFacade<Q> {
    TypedFacade::new(db)
}

impl<Q: QueryInterface> TypedFacade<Q> {
    pub fn new(db: Q) -> Self {
        Self { db }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &Q {
        &self.db
    }

    /// Run a statement and return its untyped rows.
    pub async fn query(&self, sql: &str, params: &QueryParams) -> Result<QueryOutput> {
        self.db.query(sql, params).await
    }

    /// Run a statement and convert every row through `schema`.
    ///
    /// Fails on the first row that violates a not-null field; no records are
    /// returned in that case.
    pub async fn typed_query(
        &self,
        schema: &FieldObject,
        sql: &str,
        params: &QueryParams,
    ) -> Result<TypedQueryOutput> {
        let output = self.query(sql, params).await?;
        let records = output
            .records
            .iter()
            .map(|row| schema.unmarshal(row))
            .collect::<Result<Vec<_>>>()?;
        Ok(TypedQueryOutput { records })
    }

    /// Insert all records with a single statement.
    ///
    /// An empty slice issues no query. Fails with `Validation`, before any
    /// query, when none of the schema fields appears in the records; store
    /// failures come back as `Insert`.
    pub async fn multi_insert(
        &self,
        schema: &FieldObject,
        table: &str,
        records: Vec<DbRecord>,
    ) -> Result<Vec<DbRecord>> {
        self.execute_bulk(schema, table, records, None).await
    }

    /// Insert all records, resolving conflicts on `options.upsert_fields`.
    ///
    /// By default incoming values overwrite stored ones. With
    /// `only_replace_nulls` a stored value is kept unless it is null.
    pub async fn multi_upsert(
        &self,
        schema: &FieldObject,
        table: &str,
        records: Vec<DbRecord>,
        options: &UpsertOptions,
    ) -> Result<Vec<DbRecord>> {
        self.execute_bulk(schema, table, records, Some(options)).await
    }

    /// `SELECT <schema columns> FROM <table_expression>`, typed.
    pub async fn select(
        &self,
        schema: &FieldObject,
        table_expression: &str,
        params: &QueryParams,
    ) -> Result<Vec<DbRecord>> {
        let sql = format!("SELECT {} FROM {}", schema.column_list(), table_expression);
        Ok(self.typed_query(schema, &sql, params).await?.records)
    }

    async fn execute_bulk(
        &self,
        schema: &FieldObject,
        table: &str,
        records: Vec<DbRecord>,
        upsert: Option<&UpsertOptions>,
    ) -> Result<Vec<DbRecord>> {
        let Some(statement) = compile_insert(schema, table, &records, upsert)? else {
            return Ok(records);
        };

        debug!(table, rows = records.len(), sql = %statement.sql, "Executing bulk insert");

        self.db
            .query(&statement.sql, &statement.params)
            .await
            .map_err(|e| EmigratorError::Insert {
                sql: statement.sql.clone(),
                params: statement.params.to_json_string(),
                message: e.to_string(),
            })?;

        Ok(records)
    }
}

impl<Q: QueryInterface> QueryInterface for TypedFacade<Q> {
    fn query<'a>(&'a self, sql: &'a str, params: &'a QueryParams)
        -> BoxFuture<'a, Result<QueryOutput>> {
        self.db.query(sql, params)
    }
}
