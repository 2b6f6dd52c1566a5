//! emigrator - ordered, logged schema migrations and a typed query facade
//! for PostgreSQL.
//!
//! Migrations are registered with an order number and applied once, in
//! order, by a [`Migrator`](emigrator_core::migration::Migrator); every
//! attempt is written to a log table so a failed run resumes where it
//! stopped.

mod runtime;

#[doc(hidden)]
pub use emigrator_core;
#[doc(hidden)]
pub use emigrator_runtime;

pub use emigrator_core::migration::{Migration, MigrationResult, Migrator};

pub use runtime::prelude;
pub use runtime::{Emigrator, EmigratorBuilder};
