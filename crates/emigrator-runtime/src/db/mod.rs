mod params;
mod pool;
mod store;

pub use params::{translate_named_params, TranslatedQuery};
pub use pool::{Database, DatabasePool};
pub use store::PgStore;
