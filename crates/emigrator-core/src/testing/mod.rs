//! In-memory collaborators for testing code built on emigrator.
//!
//! `MockStore` stands in for a database behind `QueryInterface`;
//! `RecordingRunner` is a `MigrationRunner` keeping its log in memory.

mod mock_store;
mod runner;

pub use mock_store::{rows_from_json, MockStore, RecordedQuery};
pub use runner::{RecordingRunner, RunnerCall};
