use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::runner::MigrationRunner;
use super::types::{Migration, MigrationError, MigrationResult, NO_ERROR_MESSAGE};
use crate::error::{EmigratorError, Result};

/// Owns the ordered migration set and applies it through a runner.
#[derive(Debug, Clone, Default)]
pub struct Migrator {
    /// Sorted ascending by order.
    migrations: Vec<Migration>,
}

impl Migrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every migration of a list; the first invalid one aborts.
    pub fn from_migrations<I>(migrations: I) -> Result<Self>
    where
        I: IntoIterator<Item = Migration>,
    {
        migrations
            .into_iter()
            .try_fold(Self::new(), |migrator, migration| migrator.register(migration))
    }

    /// Add a migration, keeping the set sorted by order.
    ///
    /// Rejects non-positive and already registered orders.
    pub fn register(mut self, migration: Migration) -> Result<Self> {
        if migration.order <= 0 {
            return Err(EmigratorError::Validation(format!(
                "The order number must be positive, got {} for '{}'",
                migration.order, migration.description
            )));
        }

        match self
            .migrations
            .binary_search_by_key(&migration.order, |m| m.order)
        {
            Ok(_) => Err(EmigratorError::Validation(format!(
                "Trying to add two migrations with the same order number {}",
                migration.order
            ))),
            Err(position) => {
                self.migrations.insert(position, migration);
                Ok(self)
            }
        }
    }

    /// Highest registered order, 0 if none.
    pub fn last_registered_order(&self) -> i64 {
        self.migrations.last().map(|m| m.order).unwrap_or(0)
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Registered migrations with an order above `resume_from`, ascending.
    pub fn pending(&self, resume_from: i64) -> impl Iterator<Item = &Migration> {
        self.migrations.iter().filter(move |m| m.order > resume_from)
    }

    /// Apply all pending migrations in order, stopping at the first failure.
    ///
    /// Always resolves with a structured result. Migrations applied before a
    /// failure stay applied. Runner bookkeeping errors (cleanup, resume point,
    /// log writes) end the run as a failure carrying the error text.
    pub async fn migrate<R>(&self, runner: &R) -> MigrationResult
    where
        R: MigrationRunner + ?Sized,
    {
        let mut attempted = 0;
        match self.migrate_inner(runner, &mut attempted).await {
            Ok(result) => result,
            Err(e) => {
                error!("Migration run aborted: {}", e);
                MigrationResult {
                    successful: false,
                    number_migrated: attempted,
                    error_message: Some(e.to_string()),
                }
            }
        }
    }

    async fn migrate_inner<R>(&self, runner: &R, attempted: &mut usize) -> Result<MigrationResult>
    where
        R: MigrationRunner + ?Sized,
    {
        runner.cleanup_failed_reports().await?;

        let resume_from = runner.first_pending().await?;
        debug!(
            resume_from,
            last_registered = self.last_registered_order(),
            "Resolved migration resume point"
        );

        for migration in self.pending(resume_from) {
            info!("Applying migration {}: {}", migration.order, migration.description);

            let started = Instant::now();
            let result = runner.run(migration).await;
            let elapsed = started.elapsed();
            *attempted += 1;

            if !result.successful {
                let error_message = result
                    .error_message
                    .unwrap_or_else(|| NO_ERROR_MESSAGE.to_string());
                warn!(
                    "Migration {} failed: {}",
                    migration.order, error_message
                );
                runner
                    .report_failure(&MigrationError {
                        migration: migration.clone(),
                        error_message: error_message.clone(),
                    })
                    .await?;
                return Ok(MigrationResult {
                    successful: false,
                    number_migrated: *attempted,
                    error_message: Some(error_message),
                });
            }

            runner.report_success(migration, elapsed).await?;
            info!(
                "Migration {} applied in {}ms",
                migration.order,
                elapsed.as_millis()
            );
        }

        Ok(MigrationResult {
            successful: true,
            number_migrated: *attempted,
            error_message: None,
        })
    }
}
