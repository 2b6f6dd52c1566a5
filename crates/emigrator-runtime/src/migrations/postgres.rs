//! Migration runner keeping its log in a PostgreSQL table.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use emigrator_core::config::{validate_table_name, DEFAULT_LOG_TABLE};
use emigrator_core::error::{EmigratorError, Result};
use emigrator_core::migration::{Migration, MigrationError, MigrationResult, MigrationRunner};
use emigrator_core::store::{BoxFuture, QueryInterface, QueryParams};

/// `MigrationRunner` over any `QueryInterface` speaking PostgreSQL.
///
/// Every attempt is recorded as one row of the log table; failed rows are
/// removed at the start of the next run so a failed migration is retried.
pub struct PostgresRunner<Q> {
    db: Q,
    table: String,
}

impl<Q: QueryInterface> PostgresRunner<Q> {
    /// Runner logging to `migration_log`.
    pub fn new(db: Q) -> Self {
        Self {
            db,
            table: DEFAULT_LOG_TABLE.to_string(),
        }
    }

    /// Runner logging to `table`, which must be a plain or schema-qualified
    /// identifier.
    pub fn with_table(db: Q, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { db, table })
    }

    pub fn migration_table(&self) -> &str {
        &self.table
    }

    async fn insert_log_row(
        &self,
        migration: &Migration,
        successful: bool,
        message: &str,
    ) -> Result<()> {
        let sql = format!(
            "INSERT INTO {}(creation_order,description,run_ts,query_executed,successful,message) \
             VALUES(:creation_order,:description,now(),:query_executed,{},:message)",
            self.table,
            if successful { "TRUE" } else { "FALSE" }
        );
        let params = QueryParams::new()
            .with("creation_order", migration.order)
            .with("description", migration.description.as_str())
            .with("query_executed", migration.query.as_str())
            .with("message", message);

        self.db.query(&sql, &params).await?;
        Ok(())
    }
}

impl<Q: QueryInterface> MigrationRunner for PostgresRunner<Q> {
    fn initialise_log(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let sql = format!(
                "CREATE TABLE IF NOT EXISTS {}(\
                 creation_order bigint primary key,\
                 description varchar(255),\
                 run_ts timestamptz not null,\
                 query_executed text not null,\
                 successful boolean not null,\
                 message text)",
                self.table
            );
            self.db.query(&sql, &QueryParams::new()).await?;
            debug!(table = %self.table, "Migration log table ready");
            Ok(())
        })
    }

    fn first_pending(&self) -> BoxFuture<'_, Result<i64>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT MAX(creation_order) AS max_order FROM {} WHERE successful",
                self.table
            );
            let output = self.db.query(&sql, &QueryParams::new()).await?;
            parse_max_order(
                output
                    .records
                    .first()
                    .and_then(|row| row.get("max_order")),
            )
        })
    }

    /// Sends the whole body as written in one round trip. Without parameters
    /// the store runs it as a single implicit transaction, so a failing
    /// statement leaves nothing of the migration behind.
    fn run<'a>(&'a self, migration: &'a Migration) -> BoxFuture<'a, MigrationResult> {
        Box::pin(async move {
            match self.db.query(&migration.query, &QueryParams::new()).await {
                Ok(_) => MigrationResult::success(),
                Err(e) => {
                    warn!(order = migration.order, "Migration failed: {}", e);
                    MigrationResult::failure(format!("Migration error: {}", e))
                }
            }
        })
    }

    fn report_failure<'a>(&'a self, error: &'a MigrationError) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.insert_log_row(&error.migration, false, &error.error_message)
                .await
        })
    }

    fn report_success<'a>(
        &'a self,
        migration: &'a Migration,
        duration: Duration,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let message = format!("Executed in {}ms", duration.as_millis());
            self.insert_log_row(migration, true, &message).await
        })
    }

    fn cleanup_failed_reports(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let sql = format!("DELETE FROM {} WHERE NOT successful", self.table);
            self.db.query(&sql, &QueryParams::new()).await?;
            Ok(())
        })
    }
}

/// Read `MAX(creation_order)` whether the store returned a number, a numeric
/// string or nothing at all.
fn parse_max_order(value: Option<&Value>) -> Result<i64> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| EmigratorError::Database(format!("Invalid migration order {}", n))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| EmigratorError::Database(format!("Invalid migration order '{}'", s))),
        Some(other) => Err(EmigratorError::Database(format!(
            "Invalid migration order {}",
            other
        ))),
    }
}
