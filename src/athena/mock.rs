//! Mock query engine for testing.
//!
//! Provides an in-memory engine with scripted statuses and result pages,
//! used by unit tests and the `--mock-engine` CLI flag.

use super::{EngineStatus, ExecutionHandle, QueryEngine, ResultPage, SubmitRequest};
use crate::error::{LensError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A mock engine that replays a status script and returns predefined pages.
///
/// Every query sees the same status script from the start; once the script is
/// exhausted its last entry repeats. Without explicit pages, results are
/// canned per statement kind (tables listing, describe, anything else).
#[derive(Debug)]
pub struct MockQueryEngine {
    statuses: Vec<EngineStatus>,
    pages: Option<Vec<ResultPage>>,
    submit_error: Option<String>,
    state: Mutex<MockState>,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    submissions: HashMap<String, SubmitRequest>,
    submission_order: Vec<String>,
    status_checks: HashMap<String, usize>,
    results_requests: Vec<ResultsRequest>,
}

/// One recorded call to `results`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsRequest {
    pub query_id: String,
    pub next_token: Option<String>,
    pub max_results: usize,
}

impl MockQueryEngine {
    /// Creates a mock whose queries succeed on the first check with canned results.
    pub fn new() -> Self {
        Self {
            statuses: vec![EngineStatus::Succeeded],
            pages: None,
            submit_error: None,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Replaces the status script.
    pub fn with_statuses(mut self, statuses: Vec<EngineStatus>) -> Self {
        if !statuses.is_empty() {
            self.statuses = statuses;
        }
        self
    }

    /// Returns `rows` as a single result page (header first).
    pub fn with_rows(self, rows: Vec<Vec<Option<String>>>) -> Self {
        self.with_pages(vec![ResultPage::new(rows)])
    }

    /// Returns these pages in order. Continuation tokens are filled in.
    pub fn with_pages(mut self, pages: Vec<ResultPage>) -> Self {
        let count = pages.len();
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, page)| {
                if page.next_token.is_none() && i + 1 < count {
                    page.with_next_token(page_token(i + 1))
                } else {
                    page
                }
            })
            .collect();
        self.pages = Some(pages);
        self
    }

    /// Makes every submission fail with the given message.
    pub fn with_submit_error(mut self, message: impl Into<String>) -> Self {
        self.submit_error = Some(message.into());
        self
    }

    /// Submitted requests, in submission order.
    pub fn submissions(&self) -> Vec<SubmitRequest> {
        let state = self.lock();
        state
            .submission_order
            .iter()
            .filter_map(|id| state.submissions.get(id).cloned())
            .collect()
    }

    /// Number of status checks made for a query.
    pub fn status_checks(&self, query_id: &str) -> usize {
        self.lock().status_checks.get(query_id).copied().unwrap_or(0)
    }

    /// Recorded results requests, in call order.
    pub fn results_requests(&self) -> Vec<ResultsRequest> {
        self.lock().results_requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockQueryEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryEngine for MockQueryEngine {
    async fn submit(&self, request: &SubmitRequest) -> Result<ExecutionHandle> {
        if let Some(message) = &self.submit_error {
            return Err(LensError::submission(message.clone()));
        }

        let mut state = self.lock();
        state.next_id += 1;
        let query_id = format!("mock-query-{}", state.next_id);
        state.submissions.insert(query_id.clone(), request.clone());
        state.submission_order.push(query_id.clone());

        Ok(ExecutionHandle::new(query_id))
    }

    async fn status(&self, query_id: &str) -> Result<EngineStatus> {
        let mut state = self.lock();
        if !state.submissions.contains_key(query_id) {
            return Err(LensError::engine(format!(
                "Unknown query execution id: {query_id}"
            )));
        }

        let checks = state.status_checks.entry(query_id.to_string()).or_insert(0);
        let index = (*checks).min(self.statuses.len() - 1);
        *checks += 1;

        Ok(self.statuses[index].clone())
    }

    async fn results(
        &self,
        query_id: &str,
        next_token: Option<&str>,
        max_results: usize,
    ) -> Result<ResultPage> {
        let mut state = self.lock();
        state.results_requests.push(ResultsRequest {
            query_id: query_id.to_string(),
            next_token: next_token.map(String::from),
            max_results,
        });

        let Some(request) = state.submissions.get(query_id) else {
            return Err(LensError::engine(format!(
                "Unknown query execution id: {query_id}"
            )));
        };

        let Some(pages) = &self.pages else {
            return Ok(canned_page(&request.sql));
        };

        let index = match next_token {
            None => 0,
            Some(token) => parse_page_token(token)
                .ok_or_else(|| LensError::engine(format!("Invalid next token: {token}")))?,
        };

        Ok(pages.get(index).cloned().unwrap_or_default())
    }
}

fn page_token(index: usize) -> String {
    format!("page-{index}")
}

fn parse_page_token(token: &str) -> Option<usize> {
    token.strip_prefix("page-")?.parse().ok()
}

fn row(cells: &[&str]) -> Vec<Option<String>> {
    cells.iter().map(|c| Some(c.to_string())).collect()
}

/// Demo data keyed on the statement kind.
fn canned_page(sql: &str) -> ResultPage {
    let lowered = sql.trim_start().to_lowercase();

    if lowered.starts_with("show tables") {
        return ResultPage::new(vec![
            row(&["tab_name"]),
            row(&["accounts"]),
            row(&["merchants"]),
            row(&["transactions"]),
        ]);
    }

    if lowered.starts_with("describe") {
        return ResultPage::new(vec![
            row(&["col_name", "data_type", "comment"]),
            row(&["id", "bigint", ""]),
            row(&["merchant", "string", "merchant display name"]),
            row(&["amount", "double", ""]),
            row(&["", "", ""]),
            row(&["# Partition Information", "", ""]),
            row(&["dt", "string", ""]),
        ]);
    }

    ResultPage::new(vec![
        row(&["status_color", "count", "percentage"]),
        row(&["green", "691200", "50.0"]),
        row(&["yellow", "576960", "41.7"]),
        row(&["red", "114240", "8.3"]),
    ])
}
