//! Query pipeline for athena-lens.
//!
//! Keeps submission, waiting and result shaping apart so each stage can be
//! driven and tested on its own.

pub mod executor;
pub mod materialize;
pub mod poller;

pub use executor::{ColumnDescription, QueryExecutor, Statement, DEFAULT_MAX_ROWS};
pub use materialize::Materializer;
pub use poller::{QueryPoller, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
