use std::sync::Mutex;
use std::time::Duration;

use crate::error::{EmigratorError, Result};
use crate::migration::{Migration, MigrationError, MigrationResult, MigrationRunner};
use crate::store::BoxFuture;

/// A call received by a `RecordingRunner`, with the migration order where relevant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerCall {
    InitialiseLog,
    FirstPending,
    Run(i64),
    ReportFailure(i64),
    ReportSuccess(i64),
    CleanupFailedReports,
}

#[derive(Debug, Clone)]
struct LogRow {
    order: i64,
    successful: bool,
}

#[derive(Default)]
struct RunnerState {
    log: Vec<LogRow>,
    calls: Vec<RunnerCall>,
    failures: Vec<MigrationError>,
    fail_on: Option<(i64, Option<String>)>,
    cleanup_error: Option<String>,
}

/// Migration runner with an in-memory log that records its calls.
#[derive(Default)]
pub struct RecordingRunner {
    state: Mutex<RunnerState>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `order` was applied by an earlier run.
    pub fn with_applied(self, order: i64) -> Self {
        self.state.lock().unwrap().log.push(LogRow {
            order,
            successful: true,
        });
        self
    }

    /// Make `run` fail for the given order.
    pub fn failing_on(self, order: i64, message: Option<&str>) -> Self {
        self.state.lock().unwrap().fail_on = Some((order, message.map(str::to_string)));
        self
    }

    /// Make `cleanup_failed_reports` fail.
    pub fn failing_cleanup(self, message: &str) -> Self {
        self.state.lock().unwrap().cleanup_error = Some(message.to_string());
        self
    }

    pub fn stop_failing(&self) {
        self.state.lock().unwrap().fail_on = None;
    }

    pub fn calls(&self) -> Vec<RunnerCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Orders passed to `run`, in call order.
    pub fn executed_orders(&self) -> Vec<i64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RunnerCall::Run(order) => Some(order),
                _ => None,
            })
            .collect()
    }

    pub fn successful_orders(&self) -> Vec<i64> {
        self.log()
            .into_iter()
            .filter(|(_, ok)| *ok)
            .map(|(order, _)| order)
            .collect()
    }

    /// Current log rows as `(order, successful)`.
    pub fn log(&self) -> Vec<(i64, bool)> {
        self.state
            .lock()
            .unwrap()
            .log
            .iter()
            .map(|row| (row.order, row.successful))
            .collect()
    }

    pub fn failures(&self) -> Vec<MigrationError> {
        self.state.lock().unwrap().failures.clone()
    }

    fn record(&self, call: RunnerCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl MigrationRunner for RecordingRunner {
    fn initialise_log(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.record(RunnerCall::InitialiseLog);
            Ok(())
        })
    }

    fn first_pending(&self) -> BoxFuture<'_, Result<i64>> {
        Box::pin(async move {
            self.record(RunnerCall::FirstPending);
            let state = self.state.lock().unwrap();
            Ok(state
                .log
                .iter()
                .filter(|row| row.successful)
                .map(|row| row.order)
                .max()
                .unwrap_or(0))
        })
    }

    fn run<'a>(&'a self, migration: &'a Migration) -> BoxFuture<'a, MigrationResult> {
        Box::pin(async move {
            self.record(RunnerCall::Run(migration.order));
            let state = self.state.lock().unwrap();
            match &state.fail_on {
                Some((order, message)) if *order == migration.order => MigrationResult {
                    successful: false,
                    number_migrated: 0,
                    error_message: message.clone(),
                },
                _ => MigrationResult::success(),
            }
        })
    }

    fn report_failure<'a>(&'a self, error: &'a MigrationError) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(RunnerCall::ReportFailure(error.migration.order));
            let mut state = self.state.lock().unwrap();
            state.log.push(LogRow {
                order: error.migration.order,
                successful: false,
            });
            state.failures.push(error.clone());
            Ok(())
        })
    }

    fn report_success<'a>(
        &'a self,
        migration: &'a Migration,
        _duration: Duration,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(RunnerCall::ReportSuccess(migration.order));
            self.state.lock().unwrap().log.push(LogRow {
                order: migration.order,
                successful: true,
            });
            Ok(())
        })
    }

    fn cleanup_failed_reports(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.record(RunnerCall::CleanupFailedReports);
            let mut state = self.state.lock().unwrap();
            if let Some(message) = &state.cleanup_error {
                return Err(EmigratorError::Database(message.clone()));
            }
            state.log.retain(|row| row.successful);
            Ok(())
        })
    }
}
