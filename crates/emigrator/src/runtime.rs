use std::path::PathBuf;

use emigrator_core::config::EmigratorConfig;
use emigrator_core::error::{EmigratorError, Result};
use emigrator_core::migration::{
    load_migrations_from_dir, Migration, MigrationResult, MigrationRunner, Migrator,
};
use emigrator_runtime::db::Database;
use emigrator_runtime::migrations::PostgresRunner;

/// Prelude module for common imports.
pub mod prelude {
    pub use chrono::{DateTime, Utc};
    pub use serde_json::{json, Value};

    pub use emigrator_core::config::EmigratorConfig;
    pub use emigrator_core::error::{EmigratorError, Result};
    pub use emigrator_core::facade::{typed_facade, TypedFacade, TypedQueryOutput, UpsertOptions};
    pub use emigrator_core::migration::{
        DatabaseChange, Migration, MigrationError, MigrationResult, MigrationRunner, Migrator,
        DATABASE_CHANGE,
    };
    pub use emigrator_core::schema::{DbRecord, DbValue, FieldDef, FieldKind, FieldObject};
    pub use emigrator_core::store::{QueryInterface, QueryOutput, QueryParams, RawRow};
    pub use emigrator_runtime::{
        init_tracing, list_database_changes, Database, PgStore, PostgresRunner,
    };

    pub use crate::{Emigrator, EmigratorBuilder};
}

/// Connects to the configured database and applies pending migrations.
pub struct Emigrator {
    config: EmigratorConfig,
    migrations_dir: PathBuf,
    migrator: Migrator,
}

impl Emigrator {
    pub fn builder() -> EmigratorBuilder {
        EmigratorBuilder::new()
    }

    pub fn config(&self) -> &EmigratorConfig {
        &self.config
    }

    /// Programmatic migrations registered on the builder.
    pub fn migrator(&self) -> &Migrator {
        &self.migrator
    }

    /// Every migration `run` would consider: directory files merged with the
    /// programmatic ones.
    pub fn collect_migrations(&self) -> Result<Migrator> {
        let from_dir = load_migrations_from_dir(&self.migrations_dir)?;
        from_dir
            .into_iter()
            .try_fold(self.migrator.clone(), Migrator::register)
    }

    /// Apply every pending migration and close the pool.
    ///
    /// Connection and log-table setup failures are errors; a failing
    /// migration is reported in the returned result.
    pub async fn run(self) -> Result<MigrationResult> {
        let migrator = self.collect_migrations()?;

        let db = Database::from_config(&self.config.database).await?;
        tracing::info!("Connected to database");

        let runner = PostgresRunner::with_table(db.store(), &self.config.migrations.log_table)?;
        let outcome = match runner.initialise_log().await {
            Ok(()) => Ok(migrator.migrate(&runner).await),
            Err(e) => Err(e),
        };
        db.close().await;

        let result = outcome?;
        if result.successful {
            tracing::info!("Migrations completed: {} applied", result.number_migrated);
        } else {
            tracing::error!(
                "Migrations stopped after {}: {}",
                result.number_migrated,
                result.error_message.as_deref().unwrap_or_default()
            );
        }
        Ok(result)
    }
}

/// Builder for configuring an `Emigrator`.
pub struct EmigratorBuilder {
    config: Option<EmigratorConfig>,
    migrations_dir: Option<PathBuf>,
    extra_migrations: Vec<Migration>,
}

impl EmigratorBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            migrations_dir: None,
            extra_migrations: Vec::new(),
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: EmigratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Directory to load `NNNN_description.sql` files from.
    ///
    /// Defaults to `migrations.directory` from the configuration.
    pub fn migrations_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.migrations_dir = Some(path.into());
        self
    }

    /// Add a migration programmatically.
    pub fn migration(
        mut self,
        order: i64,
        description: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        self.extra_migrations
            .push(Migration::new(order, description, query));
        self
    }

    /// Build the emigrator, validating programmatic migrations.
    pub fn build(self) -> Result<Emigrator> {
        let config = self
            .config
            .ok_or_else(|| EmigratorError::Config("Configuration is required".to_string()))?;
        let migrations_dir = self
            .migrations_dir
            .unwrap_or_else(|| PathBuf::from(&config.migrations.directory));
        let migrator = Migrator::from_migrations(self.extra_migrations)?;

        Ok(Emigrator {
            config,
            migrations_dir,
            migrator,
        })
    }
}

impl Default for EmigratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmigratorConfig {
        EmigratorConfig::default_with_database_url("postgres://localhost/test")
    }

    #[test]
    fn test_builder_requires_config() {
        assert!(matches!(
            EmigratorBuilder::new().build(),
            Err(EmigratorError::Config(_))
        ));
    }

    #[test]
    fn test_builder_rejects_duplicate_orders() {
        let result = Emigrator::builder()
            .config(config())
            .migration(1, "a", "SELECT 1")
            .migration(1, "b", "SELECT 2")
            .build();
        assert!(matches!(result, Err(EmigratorError::Validation(_))));
    }

    #[test]
    fn test_directory_and_programmatic_migrations_merge() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0001_create_users.sql"), "CREATE TABLE users(id INT)").unwrap();
        std::fs::write(dir.path().join("0003_seed.sql"), "INSERT INTO users VALUES (1)").unwrap();

        let emigrator = Emigrator::builder()
            .config(config())
            .migrations_dir(dir.path())
            .migration(2, "add email", "ALTER TABLE users ADD COLUMN email TEXT")
            .build()
            .unwrap();

        let migrator = emigrator.collect_migrations().unwrap();
        let orders: Vec<i64> = migrator.migrations().iter().map(|m| m.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(migrator.migrations()[0].description, "create users");
    }

    #[test]
    fn test_directory_clash_with_programmatic_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0001_create_users.sql"), "SELECT 1").unwrap();

        let emigrator = Emigrator::builder()
            .config(config())
            .migrations_dir(dir.path())
            .migration(1, "clash", "SELECT 2")
            .build()
            .unwrap();

        assert!(matches!(
            emigrator.collect_migrations(),
            Err(EmigratorError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_directory_means_programmatic_only() {
        let emigrator = Emigrator::builder()
            .config(config())
            .migrations_dir("/nonexistent/emigrator/migrations")
            .migration(5, "only", "SELECT 5")
            .build()
            .unwrap();
        assert_eq!(emigrator.collect_migrations().unwrap().last_registered_order(), 5);
    }
}
