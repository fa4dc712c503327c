//! Validate, submit, wait and materialize through the public API.

use std::sync::Arc;
use std::time::Duration;

use athena_lens::athena::{EngineStatus, MockQueryEngine, ResultPage};
use athena_lens::config::{AthenaConfig, Config};
use athena_lens::error::LensError;
use athena_lens::query::{QueryExecutor, Statement};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

fn row(cells: &[&str]) -> Vec<Option<String>> {
    cells.iter().map(|c| Some(c.to_string())).collect()
}

fn config() -> AthenaConfig {
    let mut config = AthenaConfig::default();
    config.apply_overrides_from(|key| match key {
        "ATHENA_WORKGROUP" => Some("analysts".to_string()),
        "ATHENA_DEFAULT_DB" => Some("pfm".to_string()),
        "ATHENA_OUTPUT_LOCATION" => Some("s3://query-results/pfm/".to_string()),
        _ => None,
    });
    config
}

#[tokio::test(start_paused = true)]
async fn test_query_lifecycle_end_to_end() {
    let engine = Arc::new(
        MockQueryEngine::new()
            .with_statuses(vec![
                EngineStatus::Queued,
                EngineStatus::Running,
                EngineStatus::Succeeded,
            ])
            .with_pages(vec![
                ResultPage::new(vec![
                    row(&["merchant", "txn_count"]),
                    row(&["Rakuten Card", "998080550"]),
                    row(&["SMBC Card", "870562703"]),
                ]),
                ResultPage::new(vec![row(&["JCB", "12"])]),
            ]),
    );
    let executor = QueryExecutor::new(engine.clone(), config());

    let statement = executor.statement(
        "SELECT merchant, COUNT(*) AS txn_count FROM transactions GROUP BY 1",
        None,
        Some(10),
    );
    let set = executor.run_readonly_query(&statement).await.unwrap();

    assert_eq!(set.columns, vec!["merchant".to_string(), "txn_count".to_string()]);
    assert_eq!(set.len(), 3);
    assert!(!set.was_truncated);
    assert_eq!(set.records[2].get("merchant"), Some(Some("JCB")));

    let submitted = &engine.submissions()[0];
    assert_eq!(submitted.workgroup, "analysts");
    assert_eq!(submitted.database, "pfm");
    assert_eq!(
        submitted.output_location.as_deref(),
        Some("s3://query-results/pfm/")
    );
}

#[tokio::test]
async fn test_forbidden_keyword_anywhere_is_rejected() {
    let engine = Arc::new(MockQueryEngine::new());
    let executor = QueryExecutor::new(engine.clone(), config());

    for sql in [
        "SELECT * FROM t; DROP TABLE t",
        "select 'Drop' as word",
        "SELECT * FROM updates",
    ] {
        let err = executor
            .run_readonly_query(&Statement::new(sql, "pfm"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, LensError::ValidationRejected(_)),
            "expected rejection for {sql}"
        );
    }
    assert!(engine.submissions().is_empty());
}

#[tokio::test]
async fn test_show_tables_through_query_path_is_rejected() {
    let engine = Arc::new(MockQueryEngine::new());
    let executor = QueryExecutor::new(engine.clone(), config());

    let err = executor
        .run_readonly_query(&Statement::new("  SHOW TABLES", "pfm"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("must start with SELECT"));

    // The dedicated operation still works.
    let tables = executor.list_tables(None).await.unwrap();
    assert_eq!(tables.len(), 3);
}

#[tokio::test]
async fn test_strict_mode_adds_rejections() {
    let engine = Arc::new(MockQueryEngine::new());
    let strict = AthenaConfig {
        strict_validation: true,
        ..config()
    };
    let executor = QueryExecutor::new(engine.clone(), strict);

    let err = executor
        .run_readonly_query(&Statement::new("SELECT 1; SELECT 2", "pfm"))
        .await
        .unwrap_err();
    assert!(matches!(err, LensError::ValidationRejected(_)));

    executor
        .run_readonly_query(&Statement::new("SELECT 1", "pfm"))
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_reported_distinctly() {
    let engine = Arc::new(MockQueryEngine::new().with_statuses(vec![EngineStatus::Running]));
    let executor = QueryExecutor::new(engine, config());

    let statement = Statement::new("SELECT * FROM huge", "pfm").with_timeout(Duration::from_secs(10));
    let err = executor.run_readonly_query(&statement).await.unwrap_err();

    assert!(err.is_retryable_by_caller());
    assert_eq!(err.category(), "Execution Timed Out");
    let message = err.to_string();
    assert!(message.contains("SELECT * FROM huge"));
    assert!(message.contains("pfm"));
}

#[tokio::test]
async fn test_failure_carries_engine_reason_and_context() {
    let engine = Arc::new(MockQueryEngine::new().with_statuses(vec![EngineStatus::Failed(
        "TABLE_NOT_FOUND: line 1:15: Table awsdatacatalog.pfm.nope does not exist".to_string(),
    )]));
    let executor = QueryExecutor::new(engine, config());

    let err = executor
        .run_readonly_query(&Statement::new("SELECT * FROM nope", "pfm"))
        .await
        .unwrap_err();

    assert!(!err.is_retryable_by_caller());
    let message = err.to_string();
    assert!(message.contains("TABLE_NOT_FOUND"));
    assert!(message.contains("SELECT * FROM nope"));
}

#[tokio::test]
async fn test_describe_table() {
    let engine = Arc::new(MockQueryEngine::new());
    let executor = QueryExecutor::new(engine, config());

    let columns = executor.describe_table(None, "transactions").await.unwrap();

    assert_eq!(columns.len(), 4);
    assert_eq!(columns[0].name, "id");
    assert_eq!(columns[0].data_type, "bigint");
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_returns_aborted() {
    let engine = Arc::new(MockQueryEngine::new().with_statuses(vec![EngineStatus::Running]));
    let executor = QueryExecutor::new(engine, config());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = executor
        .list_tables_with_cancel(None, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, LensError::Aborted(_)));
}

#[test]
fn test_config_file_and_env_layering() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[athena]\nworkgroup = \"from-file\"\ndefault_database = \"filedb\"\n",
    )
    .unwrap();

    let mut config = Config::load_from_file(&path).unwrap();
    config.athena.apply_overrides_from(|key| {
        (key == "ATHENA_DEFAULT_DB").then(|| "envdb".to_string())
    });

    assert_eq!(config.athena.workgroup, "from-file");
    assert_eq!(config.athena.default_database, "envdb");
    assert_eq!(config.athena.query_timeout(), Duration::from_secs(180));
    config.athena.validate().unwrap();
}
