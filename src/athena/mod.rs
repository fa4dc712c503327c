//! Query engine abstraction for athena-lens.
//!
//! Provides a trait-based interface over the asynchronous query service so the
//! HTTP client and the in-memory mock can be used interchangeably.

mod http;
mod mock;
mod types;

pub use http::AthenaHttpClient;
pub use mock::{MockQueryEngine, ResultsRequest};
pub use types::{
    EngineStatus, ExecutionHandle, ExecutionState, Record, RecordSet, ResultPage, SubmitRequest,
};

use crate::error::Result;
use async_trait::async_trait;

/// Largest page the engine returns per results request.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Trait defining the operations the pipeline needs from the query service.
///
/// Implementations retry transient transport failures themselves; callers
/// never retry a definitive answer.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Starts a query and returns its handle.
    ///
    /// Fails with `LensError::Submission` when the service refuses the request.
    async fn submit(&self, request: &SubmitRequest) -> Result<ExecutionHandle>;

    /// Fetches the current status of a query.
    async fn status(&self, query_id: &str) -> Result<EngineStatus>;

    /// Fetches one page of results for a finished query.
    async fn results(
        &self,
        query_id: &str,
        next_token: Option<&str>,
        max_results: usize,
    ) -> Result<ResultPage>;
}
