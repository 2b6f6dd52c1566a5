//! Integration tests against a real PostgreSQL instance.
//!
//! Set TEST_DATABASE_URL to run them; every test returns early otherwise.
//! DATABASE_URL is never read here.

use std::str::FromStr;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use emigrator_core::config::DatabaseConfig;
use emigrator_core::facade::{typed_facade, UpsertOptions};
use emigrator_core::migration::{Migration, MigrationRunner, Migrator};
use emigrator_core::schema::{DbRecord, DbValue, FieldDef, FieldObject};
use emigrator_core::store::{QueryInterface, QueryParams};
use emigrator_runtime::{list_database_changes, Database, PgStore, PostgresRunner};

async fn connect() -> Option<Database> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let config = DatabaseConfig {
        url,
        ..Default::default()
    };
    Some(Database::from_config(&config).await.unwrap())
}

async fn exec(store: &PgStore, sql: &str) {
    store.query(sql, &QueryParams::new()).await.unwrap();
}

async fn table_exists(store: &PgStore, table: &str) -> bool {
    let out = store
        .query(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = :table) AS present",
            &QueryParams::new().with("table", table),
        )
        .await
        .unwrap();
    out.records[0]["present"] == serde_json::Value::Bool(true)
}

async fn log_row(store: &PgStore, table: &str, order: i64) -> Option<serde_json::Value> {
    let out = store
        .query(
            &format!("SELECT successful, message FROM {} WHERE creation_order = :order", table),
            &QueryParams::new().with("order", order),
        )
        .await
        .unwrap();
    out.records
        .into_iter()
        .next()
        .map(serde_json::Value::Object)
}

async fn fresh_runner(store: &PgStore, log_table: &str, drop: &[&str]) -> PostgresRunner<PgStore> {
    exec(store, &format!("DROP TABLE IF EXISTS {}", log_table)).await;
    for table in drop {
        exec(store, &format!("DROP TABLE IF EXISTS {}", table)).await;
    }
    let runner = PostgresRunner::with_table(store.clone(), log_table).unwrap();
    runner.initialise_log().await.unwrap();
    runner
}

#[tokio::test]
async fn migration_log_is_created() {
    let Some(db) = connect().await else { return };
    let store = db.store();
    fresh_runner(&store, "it_log_created", &[]).await;

    assert!(table_exists(&store, "it_log_created").await);
    assert!(!table_exists(&store, "it_surely_missing_table").await);
}

#[tokio::test]
async fn successful_migration_is_reported() {
    let Some(db) = connect().await else { return };
    let store = db.store();
    let runner = fresh_runner(&store, "it_log_success", &["it_success_table"]).await;

    let result = Migrator::new()
        .register(Migration::new(1, "Test table created", "CREATE TABLE it_success_table(message TEXT)"))
        .unwrap()
        .migrate(&runner)
        .await;

    assert!(result.successful);
    assert!(table_exists(&store, "it_success_table").await);
    let row = log_row(&store, "it_log_success", 1).await.unwrap();
    assert_eq!(row["successful"], serde_json::Value::Bool(true));
    assert!(row["message"].as_str().unwrap().starts_with("Executed in "));
}

#[tokio::test]
async fn failed_migration_stops_execution() {
    let Some(db) = connect().await else { return };
    let store = db.store();
    let runner = fresh_runner(&store, "it_log_failure", &[]).await;

    let result = Migrator::from_migrations([
        Migration::new(1, "Broken", "Nonsense that PostgreSQL does not understand"),
        Migration::new(2, "Successful placeholder", "SELECT 1"),
    ])
    .unwrap()
    .migrate(&runner)
    .await;

    assert!(!result.successful);
    assert_eq!(result.number_migrated, 1);
    let row = log_row(&store, "it_log_failure", 1).await.unwrap();
    assert_eq!(row["successful"], serde_json::Value::Bool(false));
    assert!(log_row(&store, "it_log_failure", 2).await.is_none());
}

#[tokio::test]
async fn consecutive_runs_only_apply_new_migrations() {
    let Some(db) = connect().await else { return };
    let store = db.store();
    let runner = fresh_runner(&store, "it_log_consecutive", &["it_consecutive_table"]).await;
    let first = Migration::new(1, "Table", "CREATE TABLE it_consecutive_table(message TEXT)");

    let once = Migrator::new().register(first).unwrap();
    assert_eq!(once.migrate(&runner).await.number_migrated, 1);

    let twice = once
        .register(Migration::new(
            2,
            "Seed",
            "INSERT INTO it_consecutive_table VALUES ('a;b'); INSERT INTO it_consecutive_table VALUES ('c')",
        ))
        .unwrap();
    let result = twice.migrate(&runner).await;
    assert!(result.successful, "{:?}", result.error_message);
    assert_eq!(result.number_migrated, 1);

    let changes = list_database_changes(&typed_facade(store.clone()), "it_log_consecutive")
        .await
        .unwrap();
    let orders: Vec<i64> = changes.iter().map(|c| c.creation_order).collect();
    assert_eq!(orders.len(), 2);
    assert!(orders.contains(&1) && orders.contains(&2));
}

#[tokio::test]
async fn partially_failed_migration_is_rolled_back_and_retried() {
    let Some(db) = connect().await else { return };
    let store = db.store();
    let runner = fresh_runner(&store, "it_log_partial", &["it_partial", "it_partial_missing"]).await;

    let broken = Migrator::from_migrations([Migration::new(
        1,
        "Partial",
        "CREATE TABLE it_partial(x INT);\nINSERT INTO it_partial_missing VALUES (1);",
    )])
    .unwrap()
    .migrate(&runner)
    .await;
    assert!(!broken.successful);
    assert!(!table_exists(&store, "it_partial").await);

    let fixed = Migrator::from_migrations([Migration::new(
        1,
        "Partial",
        "/* retried at 10:30 */ CREATE TABLE it_partial(x INT);\nINSERT INTO it_partial VALUES (1);",
    )])
    .unwrap()
    .migrate(&runner)
    .await;
    assert!(fixed.successful, "{:?}", fixed.error_message);
    assert_eq!(fixed.number_migrated, 1);

    let out = store
        .query("SELECT x FROM it_partial", &QueryParams::new())
        .await
        .unwrap();
    assert_eq!(out.records.len(), 1);
    let row = log_row(&store, "it_log_partial", 1).await.unwrap();
    assert_eq!(row["successful"], serde_json::Value::Bool(true));
}

fn storage_schema() -> FieldObject {
    FieldObject::new()
        .field("id", FieldDef::integer().not_null())
        .field("intValue", FieldDef::integer())
        .field("somethingBig", FieldDef::bigint())
        .field("somethingFloat", FieldDef::float())
        .field("label", FieldDef::string())
        .field("happenedAt", FieldDef::date())
        .field("veritas", FieldDef::boolean())
}

async fn storage_table(store: &PgStore, name: &str) {
    exec(store, &format!("DROP TABLE IF EXISTS {}", name)).await;
    exec(
        store,
        &format!(
            "CREATE TABLE {}(id INT PRIMARY KEY, int_value INT, something_big NUMERIC(30,0), \
             something_float DOUBLE PRECISION, label TEXT, happened_at TIMESTAMPTZ, veritas BOOLEAN)",
            name
        ),
    )
    .await;
}

#[tokio::test]
async fn typed_facade_round_trip() {
    let Some(db) = connect().await else { return };
    let store = db.store();
    storage_table(&store, "it_storage_round_trip").await;
    let facade = typed_facade(store.clone());
    let schema = storage_schema();
    let when = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
    let big = Decimal::from_str("12345678901234567890").unwrap();

    facade
        .multi_insert(
            &schema,
            "it_storage_round_trip",
            vec![
                DbRecord::new()
                    .with("id", 1)
                    .with("intValue", 10)
                    .with("somethingBig", big)
                    .with("somethingFloat", 1.5)
                    .with("label", "first")
                    .with("happenedAt", when)
                    .with("veritas", false),
                DbRecord::new().with("id", 2).with("label", "second"),
            ],
        )
        .await
        .unwrap();

    let records = facade
        .select(&schema, "it_storage_round_trip ORDER BY id", &QueryParams::new())
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("intValue"), Some(&DbValue::Integer(10)));
    assert_eq!(records[0].get("somethingBig"), Some(&DbValue::BigInt(big)));
    assert_eq!(records[0].get("somethingFloat"), Some(&DbValue::Float(1.5)));
    assert_eq!(records[0].get("happenedAt"), Some(&DbValue::Date(when)));
    assert_eq!(records[0].get("veritas"), Some(&DbValue::Boolean(false)));
    assert_eq!(records[1].get("intValue"), Some(&DbValue::Null));
    assert_eq!(records[1].get("veritas"), Some(&DbValue::Null));
    assert_eq!(records[1].get("label"), Some(&DbValue::String("second".into())));
}

#[tokio::test]
async fn unreadable_columns_are_errors() {
    let Some(db) = connect().await else { return };
    let store = db.store();

    let too_big = store
        .query("SELECT '1e40'::numeric AS huge", &QueryParams::new())
        .await;
    assert!(too_big.is_err());

    let uuid = store
        .query(
            "SELECT '00000000-0000-0000-0000-000000000000'::uuid AS id",
            &QueryParams::new().with("unused", 1),
        )
        .await;
    assert!(uuid.is_err());

    let out = store
        .query(
            "SELECT '1e40'::numeric::text AS huge, '00000000-0000-0000-0000-000000000000'::uuid::text AS id",
            &QueryParams::new(),
        )
        .await
        .unwrap();
    assert_eq!(out.records[0]["id"], "00000000-0000-0000-0000-000000000000");
    assert!(out.records[0]["huge"].as_str().is_some_and(|s| s.starts_with('1')));
}

#[tokio::test]
async fn upsert_modes() {
    let Some(db) = connect().await else { return };
    let store = db.store();
    storage_table(&store, "it_storage_upsert").await;
    let facade = typed_facade(store.clone());
    let schema = storage_schema();

    facade
        .multi_insert(
            &schema,
            "it_storage_upsert",
            vec![
                DbRecord::new().with("id", 1).with("label", "kept"),
                DbRecord::new().with("id", 2).with("intValue", 5),
            ],
        )
        .await
        .unwrap();

    let incoming = vec![
        DbRecord::new().with("id", 1).with("label", "new").with("intValue", 7),
        DbRecord::new().with("id", 2).with("label", "fresh").with("intValue", 9),
    ];
    facade
        .multi_upsert(
            &schema,
            "it_storage_upsert",
            incoming.clone(),
            &UpsertOptions::new(["id"]).only_replace_nulls(),
        )
        .await
        .unwrap();

    let records = facade
        .select(&schema, "it_storage_upsert ORDER BY id", &QueryParams::new())
        .await
        .unwrap();
    assert_eq!(records[0].get("label"), Some(&DbValue::String("kept".into())));
    assert_eq!(records[0].get("intValue"), Some(&DbValue::Integer(7)));
    assert_eq!(records[1].get("intValue"), Some(&DbValue::Integer(5)));

    facade
        .multi_upsert(&schema, "it_storage_upsert", incoming, &UpsertOptions::new(["id"]))
        .await
        .unwrap();

    let records = facade
        .select(&schema, "it_storage_upsert ORDER BY id", &QueryParams::new())
        .await
        .unwrap();
    assert_eq!(records[0].get("label"), Some(&DbValue::String("new".into())));
    assert_eq!(records[1].get("intValue"), Some(&DbValue::Integer(9)));
}
