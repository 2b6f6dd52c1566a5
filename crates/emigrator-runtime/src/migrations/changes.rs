use emigrator_core::config::validate_table_name;
use emigrator_core::error::Result;
use emigrator_core::facade::TypedFacade;
use emigrator_core::migration::{DatabaseChange, DATABASE_CHANGE};
use emigrator_core::store::{QueryInterface, QueryParams};

/// Every row of the migration log `table`, newest first.
pub async fn list_database_changes<Q: QueryInterface>(
    facade: &TypedFacade<Q>,
    table: &str,
) -> Result<Vec<DatabaseChange>> {
    validate_table_name(table)?;

    let records = facade
        .select(
            &DATABASE_CHANGE,
            &format!("{} ORDER BY run_ts DESC", table),
            &QueryParams::new(),
        )
        .await?;

    records.iter().map(DatabaseChange::try_from).collect()
}
