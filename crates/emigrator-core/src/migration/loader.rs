use std::path::Path;

use tracing::debug;

use super::types::Migration;
use crate::error::{EmigratorError, Result};

/// Load migrations from a directory of `.sql` files.
///
/// Files are named `<order>_<description>.sql`, e.g. `0001_create_users.sql`
/// becomes order 1 with description "create users". Other files are ignored
/// and a missing directory yields no migrations.
pub fn load_migrations_from_dir(dir: &Path) -> Result<Vec<Migration>> {
    if !dir.exists() {
        debug!("Migrations directory does not exist: {:?}", dir);
        return Ok(Vec::new());
    }

    let mut migrations = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().map(|e| e == "sql").unwrap_or(false) {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| EmigratorError::Config("Invalid migration filename".into()))?;
            let (order, description) = parse_file_stem(stem)?;
            let query = std::fs::read_to_string(&path)?;

            migrations.push(Migration::new(order, description, query));
        }
    }

    migrations.sort_by_key(|m| m.order);

    debug!("Loaded {} migrations from {:?}", migrations.len(), dir);
    Ok(migrations)
}

fn parse_file_stem(stem: &str) -> Result<(i64, String)> {
    let (prefix, rest) = stem.split_once('_').unwrap_or((stem, ""));
    let order = prefix.parse::<i64>().map_err(|_| {
        EmigratorError::Validation(format!(
            "Migration file '{}' must start with a numeric order",
            stem
        ))
    })?;
    let description = if rest.is_empty() {
        stem.to_string()
    } else {
        rest.replace('_', " ")
    };
    Ok((order, description))
}
