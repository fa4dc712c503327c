//! Command-line argument parsing for athena-lens.
//!
//! Uses clap derive: global options plus one subcommand per operation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned plain-text tables.
    #[default]
    Text,
    /// JSON documents, one per command.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "Invalid output format: {s}. Expected: text or json"
            )),
        }
    }
}

/// Read-only Athena queries and chart extraction.
#[derive(Parser, Debug)]
#[command(name = "athena-lens")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Use the in-memory mock engine instead of Athena
    #[arg(long, global = true)]
    pub mock_engine: bool,

    /// Write logs to a file instead of stderr (default location when no path is given)
    #[arg(long, value_name = "PATH", num_args = 0..=1, global = true)]
    pub log_file: Option<Option<PathBuf>>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations exposed on the command line.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run a read-only SELECT statement
    Query {
        /// Database to run against (defaults to the configured database)
        #[arg(short = 'd', long, value_name = "DATABASE")]
        database: Option<String>,

        /// Maximum number of records to return
        #[arg(short = 'n', long, value_name = "N")]
        max_rows: Option<usize>,

        /// SQL text
        #[arg(value_name = "SQL")]
        sql: String,
    },

    /// List the tables in a database
    Tables {
        #[arg(short = 'd', long, value_name = "DATABASE")]
        database: Option<String>,
    },

    /// Describe the columns of a table
    Describe {
        #[arg(short = 'd', long, value_name = "DATABASE")]
        database: Option<String>,

        #[arg(value_name = "TABLE")]
        table: String,
    },

    /// Extract a table and chart columns from an answer text
    Chart {
        /// Read the answer from a file instead of stdin ("-" for stdin)
        #[arg(short = 'f', long, value_name = "PATH")]
        file: Option<String>,

        /// Preferred label column
        #[arg(long, value_name = "COLUMN")]
        label: Option<String>,

        /// Preferred value column
        #[arg(long, value_name = "COLUMN")]
        value: Option<String>,
    },

    /// Call an agent tool with JSON arguments
    Tool {
        /// Tool name (list_tables, describe_table, run_readonly_query)
        #[arg(value_name = "NAME")]
        name: String,

        /// JSON arguments
        #[arg(value_name = "JSON", default_value = "{}")]
        arguments: String,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }

    /// Returns the log file, if logging to a file was requested.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .as_ref()
            .map(|path| path.clone().unwrap_or_else(crate::logging::default_log_path))
    }
}
