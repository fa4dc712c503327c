//! athena-lens - read-only Athena queries and chart extraction.

use std::io::Read;
use std::sync::Arc;

use athena_lens::answer::AnswerView;
use athena_lens::athena::{AthenaHttpClient, MockQueryEngine, QueryEngine};
use athena_lens::cli::{Cli, Command, OutputFormat};
use athena_lens::config::Config;
use athena_lens::error::{LensError, Result};
use athena_lens::logging;
use athena_lens::output::CommandOutput;
use athena_lens::query::QueryExecutor;
use athena_lens::tools::ToolService;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();

    match cli.log_path() {
        Some(path) => logging::init_file_logging(&path),
        None => logging::init_stderr_logging(),
    }

    if let Err(e) = run(cli).await {
        if e.is_programming_error() {
            error!("Fatal: {}: {}", e.category(), e);
            eprintln!("athena-lens hit an internal error; see the log for details");
        } else {
            error!("{}: {}", e.category(), e);
        }
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let output = match cli.command.clone() {
        Command::Chart { file, label, value } => {
            let text = read_answer(file.as_deref())?;
            let view = AnswerView::parse(&text, label.as_deref(), value.as_deref());
            CommandOutput::answer(&view)
        }
        command => {
            let executor = build_executor(&cli)?;
            let cancel = cancel_on_ctrl_c();
            run_engine_command(&executor, command, &cancel).await?
        }
    };

    print_output(&output, cli.format);
    Ok(())
}

fn build_executor(cli: &Cli) -> Result<QueryExecutor> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load(&config_path)?;

    let engine: Arc<dyn QueryEngine> = if cli.mock_engine {
        info!("Using mock query engine");
        Arc::new(MockQueryEngine::new())
    } else {
        let client = AthenaHttpClient::new(&config.athena)?;
        info!(
            "Using Athena at {} (workgroup {})",
            client.endpoint(),
            config.athena.workgroup
        );
        Arc::new(client)
    };

    Ok(QueryExecutor::new(engine, config.athena))
}

async fn run_engine_command(
    executor: &QueryExecutor,
    command: Command,
    cancel: &CancellationToken,
) -> Result<CommandOutput> {
    match command {
        Command::Query {
            database,
            max_rows,
            sql,
        } => {
            let statement = executor.statement(sql, database.as_deref(), max_rows);
            let records = executor
                .run_readonly_query_with_cancel(&statement, cancel)
                .await?;
            Ok(CommandOutput::records(&records))
        }
        Command::Tables { database } => {
            let tables = executor
                .list_tables_with_cancel(database.as_deref(), cancel)
                .await?;
            Ok(CommandOutput::table_names(&tables))
        }
        Command::Describe { database, table } => {
            let columns = executor
                .describe_table_with_cancel(database.as_deref(), &table, cancel)
                .await?;
            Ok(CommandOutput::columns(&table, &columns))
        }
        Command::Tool { name, arguments } => {
            let arguments: serde_json::Value = serde_json::from_str(&arguments)
                .map_err(|e| LensError::rejected(format!("Tool arguments are not JSON: {e}")))?;
            let result = ToolService::new(executor.clone())
                .call_with_cancel(&name, arguments, cancel)
                .await?;
            Ok(CommandOutput::Json(result))
        }
        Command::Chart { .. } => Err(LensError::internal(
            "chart does not use the query engine",
        )),
    }
}

/// Cancels the returned token on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; no longer waiting for the query");
            trigger.cancel();
        }
    });
    cancel
}

fn read_answer(file: Option<&str>) -> Result<String> {
    match file {
        Some(path) if path != "-" => std::fs::read_to_string(path)
            .map_err(|e| LensError::config(format!("Failed to read {path}: {e}"))),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| LensError::internal(format!("Failed to read stdin: {e}")))?;
            Ok(text)
        }
    }
}

fn print_output(output: &CommandOutput, format: OutputFormat) {
    let rendered = output.render(format);
    if !rendered.is_empty() {
        println!("{rendered}");
    }
}
