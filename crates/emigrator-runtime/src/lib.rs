//! PostgreSQL plumbing for emigrator: pooled connections, a named-parameter
//! `QueryInterface` over sqlx, and the migration-log runner.

pub mod db;
pub mod migrations;
pub mod telemetry;

pub use db::{Database, PgStore};
pub use migrations::{list_database_changes, PostgresRunner};
pub use telemetry::init_tracing;
