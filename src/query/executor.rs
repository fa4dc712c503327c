//! Read-only query pipeline: validate, submit, wait, materialize.
//!
//! The same submission path serves caller SQL and the generated
//! introspection statements; only caller SQL goes through the read-only gate.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::athena::{ExecutionState, QueryEngine, Record, RecordSet, SubmitRequest};
use crate::config::AthenaConfig;
use crate::error::{LensError, Result};
use crate::safety::{validate_identifier, StatementValidator, Verdict};

use super::materialize::Materializer;
use super::poller::QueryPoller;

/// Row cap used when a statement does not name one.
pub const DEFAULT_MAX_ROWS: usize = 50;

/// Row cap for the generated introspection statements.
const INTROSPECTION_MAX_ROWS: usize = 1000;

/// A SQL text together with where and how much of it to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub database: String,
    pub max_rows: usize,
    /// Overrides the configured query timeout.
    pub timeout: Option<Duration>,
}

impl Statement {
    /// Creates a statement with the default row cap.
    pub fn new(sql: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            database: database.into(),
            max_rows: DEFAULT_MAX_ROWS,
            timeout: None,
        }
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// One column as reported by `DESCRIBE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub comment: String,
}

/// Runs statements against a query engine with fixed configuration.
#[derive(Clone)]
pub struct QueryExecutor {
    engine: Arc<dyn QueryEngine>,
    config: AthenaConfig,
    validator: StatementValidator,
}

impl QueryExecutor {
    /// Creates a new executor. The configuration is read-only from here on.
    pub fn new(engine: Arc<dyn QueryEngine>, config: AthenaConfig) -> Self {
        let validator = StatementValidator::new(config.strict_validation);
        Self {
            engine,
            config,
            validator,
        }
    }

    pub fn config(&self) -> &AthenaConfig {
        &self.config
    }

    /// Builds a statement, filling in the configured database and row cap.
    pub fn statement(
        &self,
        sql: impl Into<String>,
        database: Option<&str>,
        max_rows: Option<usize>,
    ) -> Statement {
        Statement::new(sql, self.resolve_database(database))
            .with_max_rows(max_rows.unwrap_or(self.config.default_max_rows))
    }

    /// Validates and runs caller-supplied SQL.
    pub async fn run_readonly_query(&self, statement: &Statement) -> Result<RecordSet> {
        if let Verdict::Rejected(reason) = self.validator.validate(&statement.sql) {
            warn!("Rejected query on {}: {}", statement.database, reason);
            return Err(LensError::rejected(reason));
        }
        if statement.max_rows == 0 {
            return Err(LensError::rejected("max_rows must be greater than zero"));
        }

        // The database travels in the execution context, never in the SQL text.
        self.execute(statement).await
    }

    /// Lists table names in a database (the configured default when `None`).
    pub async fn list_tables(&self, database: Option<&str>) -> Result<Vec<String>> {
        let database = self.resolve_database(database);
        check_identifier("Database", &database)?;

        let statement = Statement::new(format!("SHOW TABLES IN {database}"), database)
            .with_max_rows(INTROSPECTION_MAX_ROWS);
        let records = self.execute(&statement).await?;

        Ok(records
            .records
            .iter()
            .filter_map(|record| record.value_at(0).flatten())
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect())
    }

    /// Describes the columns of a table.
    pub async fn describe_table(
        &self,
        database: Option<&str>,
        table: &str,
    ) -> Result<Vec<ColumnDescription>> {
        let database = self.resolve_database(database);
        check_identifier("Database", &database)?;
        check_identifier("Table", table)?;

        let statement = Statement::new(format!("DESCRIBE {table}"), database)
            .with_max_rows(INTROSPECTION_MAX_ROWS);
        let records = self.execute(&statement).await?;

        Ok(records.records.iter().filter_map(describe_row).collect())
    }

    /// Like [`Self::run_readonly_query`], but stops waiting when `cancel` fires.
    pub async fn run_readonly_query_with_cancel(
        &self,
        statement: &Statement,
        cancel: &CancellationToken,
    ) -> Result<RecordSet> {
        let what = format!("`{}` on {}", statement.sql, statement.database);
        with_cancel(cancel, what, self.run_readonly_query(statement)).await
    }

    /// Like [`Self::list_tables`], but stops waiting when `cancel` fires.
    pub async fn list_tables_with_cancel(
        &self,
        database: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let what = format!("table listing of {}", self.resolve_database(database));
        with_cancel(cancel, what, self.list_tables(database)).await
    }

    /// Like [`Self::describe_table`], but stops waiting when `cancel` fires.
    pub async fn describe_table_with_cancel(
        &self,
        database: Option<&str>,
        table: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ColumnDescription>> {
        let what = format!("description of {}.{}", self.resolve_database(database), table);
        with_cancel(cancel, what, self.describe_table(database, table)).await
    }

    fn resolve_database(&self, database: Option<&str>) -> String {
        match database {
            Some(db) if !db.trim().is_empty() => db.trim().to_string(),
            _ => self.config.default_database.clone(),
        }
    }

    /// Submits, waits and materializes without any validation.
    async fn execute(&self, statement: &Statement) -> Result<RecordSet> {
        let request = SubmitRequest {
            sql: statement.sql.clone(),
            database: statement.database.clone(),
            workgroup: self.config.workgroup.clone(),
            output_location: self.config.output_location.clone(),
        };

        info!(
            "Running query on {} (max_rows={}): {}",
            statement.database, statement.max_rows, statement.sql
        );

        let mut handle = self
            .engine
            .submit(&request)
            .await
            .map_err(|e| attach_context(e, statement))?;
        info!("Submitted query {}", handle.query_id());

        let timeout = statement.timeout.unwrap_or_else(|| self.config.query_timeout());
        let state = QueryPoller::new(self.engine.as_ref(), self.config.poll_interval())
            .await_completion(&mut handle, timeout)
            .await
            .map_err(|e| attach_context(e, statement))?;

        let query_id = handle.query_id().to_string();
        match state {
            ExecutionState::Succeeded => {}
            ExecutionState::Failed(reason) => {
                return Err(LensError::ExecutionFailed {
                    query_id,
                    reason,
                    sql: statement.sql.clone(),
                    database: statement.database.clone(),
                })
            }
            ExecutionState::Cancelled(reason) => {
                return Err(LensError::ExecutionCancelled {
                    query_id,
                    reason,
                    sql: statement.sql.clone(),
                    database: statement.database.clone(),
                })
            }
            ExecutionState::TimedOut(elapsed) => {
                return Err(LensError::ExecutionTimedOut {
                    query_id,
                    elapsed_secs: elapsed.as_secs(),
                    sql: statement.sql.clone(),
                    database: statement.database.clone(),
                })
            }
            ExecutionState::Running => {
                return Err(LensError::internal(format!(
                    "query {query_id} left the poller while still running"
                )))
            }
        }

        let records = Materializer::new(self.engine.as_ref())
            .materialize(&handle, statement.max_rows)
            .await
            .map_err(|e| attach_context(e, statement))?;

        info!("Query {} returned {} row(s)", query_id, records.len());
        if let Some(warning) = records.truncation_warning() {
            info!("{}", warning);
        }

        Ok(records)
    }
}

fn check_identifier(kind: &str, name: &str) -> Result<()> {
    match validate_identifier(kind, name) {
        Verdict::Allowed => Ok(()),
        Verdict::Rejected(reason) => Err(LensError::rejected(reason)),
    }
}

/// Adds the attempted SQL and database to transport-level errors.
fn attach_context(err: LensError, statement: &Statement) -> LensError {
    let context = format!(
        "while running `{}` on {}",
        statement.sql, statement.database
    );
    match err {
        LensError::Submission(msg) => LensError::submission(format!("{msg} ({context})")),
        LensError::Engine(msg) => LensError::engine(format!("{msg} ({context})")),
        LensError::Materialization(msg) => {
            LensError::materialization(format!("{msg} ({context})"))
        }
        other => other,
    }
}

async fn with_cancel<T, F>(cancel: &CancellationToken, what: String, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;

        _ = cancel.cancelled() => {
            warn!("Stopped waiting for {}", what);
            Err(LensError::aborted(format!(
                "stopped waiting for {what}; the remote query may still be running"
            )))
        }
        result = fut => result,
    }
}

/// Reads one `DESCRIBE` row, skipping blanks and `#` section headers.
///
/// Athena may return each row as a single tab-separated cell.
fn describe_row(record: &Record) -> Option<ColumnDescription> {
    let cells: Vec<String> = match record.fields() {
        [(_, Some(only))] if only.contains('\t') => {
            only.split('\t').map(|c| c.trim().to_string()).collect()
        }
        fields => fields
            .iter()
            .map(|(_, value)| value.as_deref().unwrap_or_default().trim().to_string())
            .collect(),
    };

    let name = cells.first()?;
    if name.is_empty() || name.starts_with('#') {
        return None;
    }

    Some(ColumnDescription {
        name: name.clone(),
        data_type: cells.get(1).cloned().unwrap_or_default(),
        comment: cells.get(2).cloned().unwrap_or_default(),
    })
}
