//! Turns the engine's row-major result pages into capped records.

use tracing::{debug, error};

use crate::athena::{
    ExecutionHandle, ExecutionState, QueryEngine, Record, RecordSet, MAX_PAGE_SIZE,
};
use crate::error::{LensError, Result};

/// Fetches and shapes results for a succeeded query.
pub struct Materializer<'a> {
    engine: &'a dyn QueryEngine,
}

impl<'a> Materializer<'a> {
    pub fn new(engine: &'a dyn QueryEngine) -> Self {
        Self { engine }
    }

    /// Returns at most `max_rows` records for a query that has succeeded.
    ///
    /// The first row of the first page is the header. Continuation pages are
    /// followed only until one row past the cap is known, so truncation can be
    /// reported. The cap is applied here even if the engine already honored it.
    pub async fn materialize(&self, handle: &ExecutionHandle, max_rows: usize) -> Result<RecordSet> {
        if handle.state() != &ExecutionState::Succeeded {
            error!(
                "Materialize called for query {} in state {}",
                handle.query_id(),
                handle.state()
            );
            return Err(LensError::materialization(format!(
                "query {} is {}, results are only available after success",
                handle.query_id(),
                handle.state()
            )));
        }
        if max_rows == 0 {
            return Err(LensError::materialization("row cap must be greater than zero"));
        }

        let query_id = handle.query_id();
        let wanted = max_rows.saturating_add(1);

        let first = self
            .engine
            .results(query_id, None, wanted.min(MAX_PAGE_SIZE))
            .await?;

        let mut rows = first.rows.into_iter();
        let Some(header) = rows.next() else {
            debug!("Query {} returned no rows", query_id);
            return Ok(RecordSet::default());
        };
        let columns: Vec<String> = header.into_iter().map(Option::unwrap_or_default).collect();
        let mut data: Vec<Vec<Option<String>>> = rows.collect();

        let mut next_token = first.next_token;
        while data.len() < wanted {
            let Some(token) = next_token.take() else {
                break;
            };
            let remaining = wanted - data.len();
            let page = self
                .engine
                .results(query_id, Some(&token), remaining.min(MAX_PAGE_SIZE))
                .await?;
            debug!(
                "Query {}: fetched continuation page with {} rows",
                query_id,
                page.rows.len()
            );
            if page.rows.is_empty() {
                break;
            }
            data.extend(page.rows);
            next_token = page.next_token;
        }

        let was_truncated = data.len() > max_rows;
        data.truncate(max_rows);

        let records = data
            .into_iter()
            .map(|cells| Record::from_row(&columns, cells))
            .collect();

        Ok(RecordSet {
            columns,
            records,
            was_truncated,
        })
    }
}
