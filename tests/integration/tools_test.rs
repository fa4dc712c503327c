//! Agent tool surface against the mock engine.

use std::sync::Arc;

use athena_lens::athena::MockQueryEngine;
use athena_lens::config::AthenaConfig;
use athena_lens::error::LensError;
use athena_lens::query::QueryExecutor;
use athena_lens::tools::{get_tool_definitions, ToolService};
use serde_json::json;

fn service(engine: Arc<MockQueryEngine>) -> ToolService {
    ToolService::new(QueryExecutor::new(engine, AthenaConfig::default()))
}

#[test]
fn test_every_definition_is_an_object_schema() {
    for tool in get_tool_definitions() {
        assert_eq!(tool.parameters["type"], "object", "{}", tool.name);
        assert!(!tool.description.is_empty());
    }
}

#[tokio::test]
async fn test_every_defined_tool_is_dispatchable() {
    let engine = Arc::new(MockQueryEngine::new());
    let service = service(engine.clone());

    let arguments = [
        json!({}),
        json!({ "table": "transactions" }),
        json!({ "sql": "SELECT 1" }),
    ];
    for (tool, args) in get_tool_definitions().iter().zip(arguments) {
        service.call(&tool.name, args).await.unwrap();
    }
    assert_eq!(engine.submissions().len(), 3);
}

#[tokio::test]
async fn test_database_argument_is_used() {
    let engine = Arc::new(MockQueryEngine::new());
    service(engine.clone())
        .call("list_tables", json!({ "database": "pfm" }))
        .await
        .unwrap();

    assert_eq!(engine.submissions()[0].sql, "SHOW TABLES IN pfm");
    assert_eq!(engine.submissions()[0].database, "pfm");
}

#[tokio::test]
async fn test_injection_through_table_name_is_rejected() {
    let engine = Arc::new(MockQueryEngine::new());
    let err = service(engine.clone())
        .call("describe_table", json!({ "table": "users; DROP TABLE users" }))
        .await
        .unwrap_err();

    assert!(matches!(err, LensError::ValidationRejected(_)));
    assert!(engine.submissions().is_empty());
}

#[tokio::test]
async fn test_default_row_cap_applies() {
    let engine = Arc::new(MockQueryEngine::new());
    let result = service(engine.clone())
        .call("run_readonly_query", json!({ "sql": "SELECT * FROM status" }))
        .await
        .unwrap();

    assert_eq!(result["rows"].as_array().map(Vec::len), Some(3));
    assert_eq!(result["truncated"], json!(false));
    assert_eq!(engine.results_requests()[0].max_results, 51);
}
