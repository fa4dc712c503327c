//! Execution and result types shared by every query engine.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Everything the engine needs to start one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitRequest {
    /// Statement text, sent unchanged.
    pub sql: String,
    /// Target database (the query execution context).
    pub database: String,
    /// Workgroup the query runs in.
    pub workgroup: String,
    /// Result location; `None` defers to the workgroup setting.
    pub output_location: Option<String>,
}

/// Status reported by the engine on a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    Queued,
    Running,
    Succeeded,
    Failed(String),
    Cancelled(String),
}

impl EngineStatus {
    /// Maps an Athena state name and optional reason to a status.
    ///
    /// Unknown states are treated as still running.
    pub fn from_state(state: &str, reason: Option<String>) -> Self {
        let reason = reason.unwrap_or_else(|| "Unknown".to_string());
        match state {
            "QUEUED" => Self::Queued,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed(reason),
            "CANCELLED" => Self::Cancelled(reason),
            _ => Self::Running,
        }
    }
}

/// Lifecycle state of one execution as seen by the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionState {
    Running,
    Succeeded,
    Failed(String),
    Cancelled(String),
    TimedOut(Duration),
}

impl ExecutionState {
    /// Returns true for states that never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed(reason) => write!(f, "Failed ({reason})"),
            Self::Cancelled(reason) => write!(f, "Cancelled ({reason})"),
            Self::TimedOut(elapsed) => write!(f, "TimedOut ({}s)", elapsed.as_secs()),
        }
    }
}

/// Opaque handle for one submitted query.
///
/// The state starts as `Running` and is advanced only by the poller.
#[derive(Debug, Clone)]
pub struct ExecutionHandle {
    query_id: String,
    submitted_at: Instant,
    state: ExecutionState,
}

impl ExecutionHandle {
    /// Creates a handle for a query the engine has just accepted.
    pub fn new(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            submitted_at: Instant::now(),
            state: ExecutionState::Running,
        }
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Time since submission.
    pub fn elapsed(&self) -> Duration {
        self.submitted_at.elapsed()
    }

    /// Moves the handle to `next`. Terminal states are final; returns false if ignored.
    pub(crate) fn transition(&mut self, next: ExecutionState) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = next;
        true
    }
}

/// One page of results: row-major, header row first on the first page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    pub rows: Vec<Vec<Option<String>>>,
    /// Continuation token when more rows are available.
    pub next_token: Option<String>,
}

impl ResultPage {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            rows,
            next_token: None,
        }
    }

    pub fn with_next_token(mut self, token: impl Into<String>) -> Self {
        self.next_token = Some(token.into());
        self
    }
}

/// One result row keyed by column name.
///
/// Fields keep the result's column order, duplicates included. A `None`
/// value is SQL NULL and stays distinct from an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, Option<String>)>,
}

impl Record {
    /// Zips column names to cells by position. Missing cells become NULL.
    pub fn from_row(columns: &[String], cells: Vec<Option<String>>) -> Self {
        let mut cells = cells.into_iter();
        let fields = columns
            .iter()
            .map(|name| (name.clone(), cells.next().flatten()))
            .collect();
        Self { fields }
    }

    /// Returns the value of the first column with this name.
    ///
    /// The outer `None` means no such column; the inner one means NULL.
    pub fn get(&self, column: &str) -> Option<Option<&str>> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_deref())
    }

    /// Returns the value at a position.
    pub fn value_at(&self, index: usize) -> Option<Option<&str>> {
        self.fields.get(index).map(|(_, value)| value.as_deref())
    }

    pub fn fields(&self) -> &[(String, Option<String>)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Records materialized from a successful query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordSet {
    /// Header row, in result order.
    pub columns: Vec<String>,
    /// At most the requested number of records.
    pub records: Vec<Record>,
    /// Whether rows were dropped to respect the cap.
    pub was_truncated: bool,
}

impl RecordSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns a truncation warning message if the result was truncated.
    pub fn truncation_warning(&self) -> Option<String> {
        self.was_truncated
            .then(|| format!("Result truncated: showing the first {} rows", self.len()))
    }
}
