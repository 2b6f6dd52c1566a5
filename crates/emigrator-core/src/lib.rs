//! Core types for emigrator: ordered migrations, the runner contract and a
//! schema-typed query facade over any store speaking `QueryInterface`.

pub mod config;
pub mod error;
pub mod facade;
pub mod migration;
pub mod schema;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{EmigratorConfig, DEFAULT_LOG_TABLE};
pub use error::{EmigratorError, Result};
pub use facade::{typed_facade, TypedFacade, TypedQueryOutput, UpsertOptions};
pub use migration::{
    load_migrations_from_dir, DatabaseChange, Migration, MigrationError, MigrationResult,
    MigrationRunner, Migrator, DATABASE_CHANGE, NO_ERROR_MESSAGE,
};
pub use schema::{DbRecord, DbValue, FieldDef, FieldKind, FieldObject, NullPolicy};
pub use store::{BoxFuture, QueryInterface, QueryOutput, QueryParams, RawRow};
