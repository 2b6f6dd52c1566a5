use std::time::Duration;

use super::types::{Migration, MigrationError, MigrationResult};
use crate::error::Result;
use crate::store::BoxFuture;

/// Store-specific execution and logging of migrations.
///
/// The `Migrator` decides what runs and in which order; a runner only knows
/// how to execute one statement and how to persist each attempt.
pub trait MigrationRunner: Send + Sync {
    /// Create the migration log if it does not exist yet.
    fn initialise_log(&self) -> BoxFuture<'_, Result<()>>;

    /// Highest successfully applied order, 0 when nothing was applied.
    fn first_pending(&self) -> BoxFuture<'_, Result<i64>>;

    /// Execute the migration's statement.
    ///
    /// Never fails: store errors come back as an unsuccessful result.
    fn run<'a>(&'a self, migration: &'a Migration) -> BoxFuture<'a, MigrationResult>;

    /// Log a failed attempt.
    fn report_failure<'a>(&'a self, error: &'a MigrationError) -> BoxFuture<'a, Result<()>>;

    /// Log a successful attempt and how long it took.
    fn report_success<'a>(
        &'a self,
        migration: &'a Migration,
        duration: Duration,
    ) -> BoxFuture<'a, Result<()>>;

    /// Delete failure rows left by earlier runs.
    fn cleanup_failed_reports(&self) -> BoxFuture<'_, Result<()>>;
}
