//! Athena client over the JSON HTTP protocol.
//!
//! Each operation is a POST to the service endpoint with an
//! `X-Amz-Target: AmazonAthena.<Action>` header and an
//! `application/x-amz-json-1.1` body. Requests go out unsigned, so the
//! configured endpoint must be a SigV4 signing proxy.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::athena::{EngineStatus, ExecutionHandle, QueryEngine, ResultPage, SubmitRequest};
use crate::config::AthenaConfig;
use crate::error::{LensError, Result};

/// Timeout for a single HTTP request. Query duration is handled by the poller.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of attempts for one call on transient failures.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "AmazonAthena";

/// Athena client speaking the service's JSON protocol.
#[derive(Debug, Clone)]
pub struct AthenaHttpClient {
    endpoint: String,
    client: Client,
}

impl AthenaHttpClient {
    /// Creates a client for the configured signing endpoint. Fails when none is set.
    pub fn new(config: &AthenaConfig) -> Result<Self> {
        let endpoint = config.signing_endpoint()?.to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LensError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            endpoint,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends one action, retrying transient failures with exponential backoff.
    async fn call<I, O>(&self, action: &str, input: &I) -> std::result::Result<O, CallError>
    where
        I: Serialize + Sync,
        O: DeserializeOwned + Send,
    {
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let mut attempt = 1;

        loop {
            debug!("{} attempt {} of {}", action, attempt, MAX_RETRY_ATTEMPTS);
            match self.call_once(action, input).await {
                Ok(output) => return Ok(output),
                Err(e) if e.is_transient() && attempt < MAX_RETRY_ATTEMPTS => {
                    warn!(
                        "{} attempt {} failed ({}), retrying in {:?}",
                        action, attempt, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn call_once<I, O>(&self, action: &str, input: &I) -> std::result::Result<O, CallError>
    where
        I: Serialize + Sync,
        O: DeserializeOwned + Send,
    {
        let body = serde_json::to_vec(input)
            .map_err(|e| CallError::Decode(format!("Failed to encode {action} request: {e}")))?;

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{action}"))
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CallError::Transport("Request timed out".to_string())
                } else if e.is_connect() {
                    CallError::Transport(format!("Failed to connect to {}", self.endpoint))
                } else {
                    CallError::Transport(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CallError::Transport(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(parse_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| CallError::Decode(format!("Failed to parse {action} response: {e}")))
    }
}

#[async_trait]
impl QueryEngine for AthenaHttpClient {
    async fn submit(&self, request: &SubmitRequest) -> Result<ExecutionHandle> {
        let token = Uuid::new_v4().to_string();
        debug!("Submitting with client request token {}", token);
        let input = StartQueryExecutionInput::new(request, token);
        let output: StartQueryExecutionOutput = self
            .call("StartQueryExecution", &input)
            .await
            .map_err(|e| LensError::submission(e.to_string()))?;

        Ok(ExecutionHandle::new(output.query_execution_id))
    }

    async fn status(&self, query_id: &str) -> Result<EngineStatus> {
        let input = GetQueryExecutionInput {
            query_execution_id: query_id.to_string(),
        };
        let output: GetQueryExecutionOutput = self
            .call("GetQueryExecution", &input)
            .await
            .map_err(|e| LensError::engine(format!("Status check for {query_id} failed: {e}")))?;

        Ok(output.into_status())
    }

    async fn results(
        &self,
        query_id: &str,
        next_token: Option<&str>,
        max_results: usize,
    ) -> Result<ResultPage> {
        let input = GetQueryResultsInput {
            query_execution_id: query_id.to_string(),
            next_token: next_token.map(String::from),
            max_results: max_results.clamp(1, super::MAX_PAGE_SIZE) as u32,
        };
        let output: GetQueryResultsOutput = self
            .call("GetQueryResults", &input)
            .await
            .map_err(|e| LensError::engine(format!("Fetching results for {query_id} failed: {e}")))?;

        Ok(output.into_page())
    }
}

/// Failure of one HTTP call, before it is mapped to a pipeline error.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CallError {
    /// Network-level failure; no answer from the service.
    Transport(String),
    /// The service answered with an error.
    Service {
        status: u16,
        code: String,
        message: String,
    },
    /// The service answered with something we could not read.
    Decode(String),
}

impl CallError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Service { status, code, .. } => {
                *status >= 500
                    || *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
                    || code == "ThrottlingException"
                    || code == "TooManyRequestsException"
            }
            Self::Decode(_) => false,
        }
    }
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(msg) | Self::Decode(msg) => write!(f, "{msg}"),
            Self::Service {
                status,
                code,
                message,
            } => write!(f, "{code} (HTTP {status}): {message}"),
        }
    }
}

/// Parses an API error response body.
fn parse_error(status: StatusCode, body: &str) -> CallError {
    let (code, message) = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(error) => (
            error
                .error_type
                .map(|t| t.rsplit('#').next().unwrap_or(&t).to_string())
                .unwrap_or_else(|| "UnknownError".to_string()),
            error
                .message
                .or(error.message_upper)
                .unwrap_or_else(|| body.to_string()),
        ),
        Err(_) => ("UnknownError".to_string(), body.to_string()),
    };

    CallError::Service {
        status: status.as_u16(),
        code,
        message,
    }
}

// Wire types.

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionInput {
    query_string: String,
    query_execution_context: QueryExecutionContext,
    work_group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_configuration: Option<ResultConfiguration>,
    /// Idempotency token. Every retry of one submission carries the same value,
    /// so the service starts the query at most once.
    client_request_token: String,
}

impl StartQueryExecutionInput {
    fn new(request: &SubmitRequest, client_request_token: String) -> Self {
        Self {
            query_string: request.sql.clone(),
            query_execution_context: QueryExecutionContext {
                database: request.database.clone(),
            },
            work_group: request.workgroup.clone(),
            result_configuration: request
                .output_location
                .as_ref()
                .map(|location| ResultConfiguration {
                    output_location: location.clone(),
                }),
            client_request_token,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecutionContext {
    database: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ResultConfiguration {
    output_location: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionOutput {
    query_execution_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryExecutionInput {
    query_execution_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryExecutionOutput {
    query_execution: QueryExecution,
}

impl GetQueryExecutionOutput {
    fn into_status(self) -> EngineStatus {
        let status = self.query_execution.status;
        EngineStatus::from_state(&status.state, status.state_change_reason)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecution {
    status: QueryExecutionStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecutionStatus {
    state: String,
    #[serde(default)]
    state_change_reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsInput {
    query_execution_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<String>,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsOutput {
    result_set: ResultSet,
    #[serde(default)]
    next_token: Option<String>,
}

impl GetQueryResultsOutput {
    fn into_page(self) -> ResultPage {
        let rows = self
            .result_set
            .rows
            .into_iter()
            .map(|row| row.data.into_iter().map(|datum| datum.var_char_value).collect())
            .collect();
        ResultPage {
            rows,
            next_token: self.next_token,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultSet {
    #[serde(default)]
    rows: Vec<WireRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireRow {
    #[serde(default)]
    data: Vec<Datum>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Datum {
    #[serde(default)]
    var_char_value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    message: Option<String>,
    #[serde(rename = "Message")]
    message_upper: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_start_request_wire_format() {
        let request = SubmitRequest {
            sql: "SELECT 1".to_string(),
            database: "lakehouse".to_string(),
            workgroup: "analytics".to_string(),
            output_location: Some("s3://results/".to_string()),
        };
        let wire = serde_json::to_value(StartQueryExecutionInput::new(
            &request,
            "3f1c2a9e-0b4d-4c1e-9a57-2d6f1e8b7c40".to_string(),
        ))
        .unwrap();
        assert_eq!(
            wire,
            json!({
                "QueryString": "SELECT 1",
                "QueryExecutionContext": { "Database": "lakehouse" },
                "WorkGroup": "analytics",
                "ResultConfiguration": { "OutputLocation": "s3://results/" },
                "ClientRequestToken": "3f1c2a9e-0b4d-4c1e-9a57-2d6f1e8b7c40"
            })
        );
    }

    #[test]
    fn test_start_request_omits_missing_output_location() {
        let request = SubmitRequest {
            sql: "SELECT 1".to_string(),
            database: "db".to_string(),
            workgroup: "primary".to_string(),
            output_location: None,
        };
        let wire =
            serde_json::to_value(StartQueryExecutionInput::new(&request, "t".to_string())).unwrap();
        assert!(wire.get("ResultConfiguration").is_none());
        assert_eq!(wire["ClientRequestToken"], json!("t"));
    }

    #[test]
    fn test_results_request_omits_missing_token() {
        let input = GetQueryResultsInput {
            query_execution_id: "q-1".to_string(),
            next_token: None,
            max_results: 51,
        };
        let wire = serde_json::to_value(input).unwrap();
        assert_eq!(wire, json!({ "QueryExecutionId": "q-1", "MaxResults": 51 }));
    }

    #[test]
    fn test_status_response_parsing() {
        let body = r#"{"QueryExecution":{"QueryExecutionId":"q-1","Status":{"State":"FAILED","StateChangeReason":"TABLE_NOT_FOUND: line 1:15"}}}"#;
        let output: GetQueryExecutionOutput = serde_json::from_str(body).unwrap();
        assert_eq!(
            output.into_status(),
            EngineStatus::Failed("TABLE_NOT_FOUND: line 1:15".to_string())
        );
    }

    #[test]
    fn test_results_response_keeps_nulls() {
        let body = r#"{
            "ResultSet": {
                "Rows": [
                    {"Data": [{"VarCharValue": "a"}, {"VarCharValue": "b"}]},
                    {"Data": [{"VarCharValue": "1"}, {}]}
                ],
                "ResultSetMetadata": {"ColumnInfo": []}
            },
            "NextToken": "tok"
        }"#;
        let output: GetQueryResultsOutput = serde_json::from_str(body).unwrap();
        let page = output.into_page();
        assert_eq!(
            page.rows,
            vec![
                vec![Some("a".to_string()), Some("b".to_string())],
                vec![Some("1".to_string()), None],
            ]
        );
        assert_eq!(page.next_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_parse_error_with_type_and_message() {
        let err = parse_error(
            StatusCode::BAD_REQUEST,
            r#"{"__type":"com.amazonaws#InvalidRequestException","Message":"Database not found"}"#,
        );
        assert_eq!(
            err,
            CallError::Service {
                status: 400,
                code: "InvalidRequestException".to_string(),
                message: "Database not found".to_string(),
            }
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn test_throttling_and_server_errors_are_transient() {
        let throttled = parse_error(
            StatusCode::BAD_REQUEST,
            r#"{"__type":"ThrottlingException","message":"Rate exceeded"}"#,
        );
        assert!(throttled.is_transient());

        let unavailable = parse_error(StatusCode::SERVICE_UNAVAILABLE, "<html>");
        assert!(unavailable.is_transient());
        assert_eq!(unavailable.to_string(), "UnknownError (HTTP 503): <html>");

        assert!(CallError::Transport("reset".to_string()).is_transient());
        assert!(!CallError::Decode("bad json".to_string()).is_transient());
    }

    #[test]
    fn test_endpoint_from_config() {
        let config = AthenaConfig {
            endpoint: Some("http://localhost:8080".to_string()),
            ..Default::default()
        };
        let client = AthenaHttpClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080");
    }

    #[test]
    fn test_missing_endpoint_is_a_config_error() {
        let err = AthenaHttpClient::new(&AthenaConfig::default()).unwrap_err();
        assert!(matches!(err, LensError::Config(_)));
        assert!(err.to_string().contains("ATHENA_ENDPOINT"));
    }

    /// Reads one HTTP request and returns its body.
    async fn read_request_body(stream: &mut tokio::net::TcpStream) -> String {
        use tokio::io::AsyncReadExt;

        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-request");
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                let body_start = header_end + 4;
                if buf.len() >= body_start + length {
                    return String::from_utf8_lossy(&buf[body_start..body_start + length])
                        .into_owned();
                }
            }
        }
    }

    #[tokio::test]
    async fn test_submit_retries_reuse_client_request_token() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        // Drops every connection after reading the request, which the client
        // sees as a transient transport failure.
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let body = read_request_body(&mut stream).await;
                let _ = tx.send(body);
            }
        });

        let client = AthenaHttpClient::new(&AthenaConfig {
            endpoint: Some(format!("http://{addr}")),
            ..Default::default()
        })
        .unwrap();
        let request = SubmitRequest {
            sql: "SELECT 1".to_string(),
            database: "db".to_string(),
            workgroup: "primary".to_string(),
            output_location: None,
        };

        let err = client.submit(&request).await.unwrap_err();
        assert!(matches!(err, LensError::Submission(_)));

        let mut tokens = Vec::new();
        while let Ok(body) = rx.try_recv() {
            let wire: serde_json::Value = serde_json::from_str(&body).unwrap();
            tokens.push(wire["ClientRequestToken"].as_str().unwrap().to_string());
        }
        assert_eq!(tokens.len(), MAX_RETRY_ATTEMPTS as usize);
        assert!(!tokens[0].is_empty());
        assert!(tokens.iter().all(|t| t == &tokens[0]));
    }
}
