mod changes;
mod postgres;

pub use changes::list_database_changes;
pub use postgres::PostgresRunner;
