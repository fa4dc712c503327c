//! Tests against a real Athena endpoint.
//!
//! The endpoint must accept unsigned requests, typically a local signing
//! proxy. Set ATHENA_TEST_ENDPOINT (and optionally ATHENA_TEST_DATABASE).

use std::sync::Arc;

use athena_lens::athena::AthenaHttpClient;
use athena_lens::config::AthenaConfig;
use athena_lens::query::QueryExecutor;

fn get_test_config() -> Option<AthenaConfig> {
    let endpoint = std::env::var("ATHENA_TEST_ENDPOINT").ok()?;
    let mut config = AthenaConfig {
        endpoint: Some(endpoint),
        ..Default::default()
    };
    config.apply_env_overrides();
    if let Ok(database) = std::env::var("ATHENA_TEST_DATABASE") {
        config.default_database = database;
    }
    Some(config)
}

fn get_test_executor() -> Option<QueryExecutor> {
    let config = get_test_config()?;
    let client = AthenaHttpClient::new(&config).ok()?;
    Some(QueryExecutor::new(Arc::new(client), config))
}

#[tokio::test]
async fn test_live_select_literal() {
    let Some(executor) = get_test_executor() else {
        eprintln!("Skipping test: ATHENA_TEST_ENDPOINT not set");
        return;
    };

    let statement = executor.statement("SELECT 1 AS num, 'hello' AS greeting", None, Some(5));
    let set = executor.run_readonly_query(&statement).await.unwrap();

    assert_eq!(set.columns, vec!["num".to_string(), "greeting".to_string()]);
    assert_eq!(set.len(), 1);
    assert_eq!(set.records[0].get("greeting"), Some(Some("hello")));
}

#[tokio::test]
async fn test_live_list_tables() {
    let Some(executor) = get_test_executor() else {
        eprintln!("Skipping test: ATHENA_TEST_ENDPOINT not set");
        return;
    };

    executor.list_tables(None).await.unwrap();
}
