//! Agent tool definitions and dispatch.
//!
//! Exposes the read-only operations as function-calling tools: table
//! listing, table description and validated queries.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{LensError, Result};
use crate::query::QueryExecutor;

/// Tool definition for agent function calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Input parameters for the list_tables tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListTablesInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Input parameters for the describe_table tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescribeTableInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    pub table: String,
}

/// Input parameters for the run_readonly_query tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunReadonlyQueryInput {
    pub sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<usize>,
}

/// Returns the tool definitions available to the agent.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_tables".to_string(),
            description: "List the tables in an Athena database. Uses the default database \
                          when none is given."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "database": {
                        "type": "string",
                        "description": "Database to list (optional)"
                    }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "describe_table".to_string(),
            description: "Describe the columns of a table: name, type and comment.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "database": {
                        "type": "string",
                        "description": "Database containing the table (optional)"
                    },
                    "table": {
                        "type": "string",
                        "description": "Table name"
                    }
                },
                "required": ["table"]
            }),
        },
        ToolDefinition {
            name: "run_readonly_query".to_string(),
            description: "Run a read-only SELECT statement and return at most max_rows \
                          records. Statements containing INSERT, UPDATE, DELETE, CREATE, \
                          DROP, ALTER or TRUNCATE anywhere are rejected."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "sql": {
                        "type": "string",
                        "description": "SQL statement starting with SELECT"
                    },
                    "database": {
                        "type": "string",
                        "description": "Database to run against (optional)"
                    },
                    "max_rows": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of records to return (default: 50)"
                    }
                },
                "required": ["sql"]
            }),
        },
    ]
}

/// Dispatches tool calls to a [`QueryExecutor`].
#[derive(Clone)]
pub struct ToolService {
    executor: QueryExecutor,
}

impl ToolService {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Runs a tool and returns its JSON result.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value> {
        self.call_with_cancel(name, arguments, &CancellationToken::new())
            .await
    }

    /// Runs a tool, giving up the wait when `cancel` fires.
    pub async fn call_with_cancel(
        &self,
        name: &str,
        arguments: Value,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        debug!("Tool call {} with {}", name, arguments);

        match name {
            "list_tables" => {
                let input: ListTablesInput = parse_arguments(name, arguments)?;
                let database = input.database.as_deref();
                let tables = self.executor.list_tables_with_cancel(database, cancel).await?;
                Ok(json!({ "tables": tables }))
            }
            "describe_table" => {
                let input: DescribeTableInput = parse_arguments(name, arguments)?;
                let columns = self
                    .executor
                    .describe_table_with_cancel(input.database.as_deref(), &input.table, cancel)
                    .await?;
                Ok(json!({ "table": input.table, "columns": columns }))
            }
            "run_readonly_query" => {
                let input: RunReadonlyQueryInput = parse_arguments(name, arguments)?;
                let statement =
                    self.executor
                        .statement(input.sql, input.database.as_deref(), input.max_rows);
                let records = self
                    .executor
                    .run_readonly_query_with_cancel(&statement, cancel)
                    .await?;
                Ok(json!({
                    "columns": records.columns,
                    "rows": records.records,
                    "truncated": records.was_truncated,
                    "warning": records.truncation_warning(),
                }))
            }
            other => Err(LensError::rejected(format!(
                "Unknown tool '{other}'. Available tools: {}",
                tool_names().join(", ")
            ))),
        }
    }
}

fn tool_names() -> Vec<String> {
    get_tool_definitions().into_iter().map(|t| t.name).collect()
}

fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T> {
    // Tools without required arguments may be called with `null`.
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments)
        .map_err(|e| LensError::rejected(format!("Invalid arguments for {tool}: {e}")))
}
