//! Integration tests for athena-lens.

pub mod chart_test;
pub mod live_test;
pub mod pipeline_test;
pub mod tools_test;
