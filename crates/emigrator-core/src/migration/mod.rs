mod change;
mod loader;
mod migrator;
mod runner;
mod types;

pub use change::{DatabaseChange, DATABASE_CHANGE};
pub use loader::load_migrations_from_dir;
pub use migrator::Migrator;
pub use runner::MigrationRunner;
pub use types::{Migration, MigrationError, MigrationResult, NO_ERROR_MESSAGE};
