//! Configuration management for athena-lens.
//!
//! Handles loading configuration from TOML files and environment variables.
//! Everything here is read once at startup and passed explicitly to the
//! executor; nothing reads the process environment after that.

use crate::error::{LensError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

/// Main configuration structure for athena-lens.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Query engine settings.
    #[serde(default)]
    pub athena: AthenaConfig,
}

/// Settings shared by every query submitted to Athena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthenaConfig {
    /// Workgroup the queries run in.
    #[serde(default = "default_workgroup")]
    pub workgroup: String,

    /// S3 location for query results. When unset the workgroup's own setting applies.
    #[serde(default)]
    pub output_location: Option<String>,

    /// Database used when a caller does not name one.
    #[serde(default = "default_database")]
    pub default_database: String,

    /// How long to wait for a query before giving up.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// Delay between status checks.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Row cap applied when a caller does not give one.
    #[serde(default = "default_max_rows")]
    pub default_max_rows: usize,

    /// Signing proxy in front of the Athena API. Requests leave this crate
    /// unsigned, so the HTTP engine refuses to start without one.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Also parse statements with sqlparser before running them.
    #[serde(default)]
    pub strict_validation: bool,
}

fn default_workgroup() -> String {
    "primary".to_string()
}

fn default_database() -> String {
    "default".to_string()
}

fn default_query_timeout_secs() -> u64 {
    180
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_rows() -> usize {
    50
}

impl Default for AthenaConfig {
    fn default() -> Self {
        Self {
            workgroup: default_workgroup(),
            output_location: None,
            default_database: default_database(),
            query_timeout_secs: default_query_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            default_max_rows: default_max_rows(),
            endpoint: None,
            strict_validation: false,
        }
    }
}

impl AthenaConfig {
    /// Returns the query timeout as a duration.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Returns the poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the endpoint the HTTP engine posts to.
    pub fn signing_endpoint(&self) -> Result<&str> {
        match self.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => Ok(endpoint),
            _ => Err(LensError::config(
                "No endpoint configured. Requests are sent unsigned; set `endpoint` \
                 (or ATHENA_ENDPOINT) to a SigV4 signing proxy, or use --mock-engine",
            )),
        }
    }

    /// Applies `ATHENA_*` environment variables on top of file values. Each name
    /// is also accepted with an `MTB_` prefix; the unprefixed name wins.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary lookup, so tests can supply fixtures.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).or_else(|| lookup(&format!("MTB_{name}")));

        if let Some(workgroup) = var("ATHENA_WORKGROUP") {
            self.workgroup = workgroup;
        }
        if let Some(location) = var("ATHENA_OUTPUT_LOCATION") {
            self.output_location = Some(location);
        }
        if let Some(database) = var("ATHENA_DEFAULT_DB") {
            self.default_database = database;
        }
        if let Some(timeout) = var("ATHENA_QUERY_TIMEOUT_SEC") {
            if let Ok(secs) = timeout.trim().parse() {
                self.query_timeout_secs = secs;
            }
        }
        if let Some(endpoint) = var("ATHENA_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
    }

    /// Checks values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.workgroup.trim().is_empty() {
            return Err(LensError::config("workgroup must not be empty"));
        }
        if self.default_database.trim().is_empty() {
            return Err(LensError::config("default_database must not be empty"));
        }
        if self.default_max_rows == 0 {
            return Err(LensError::config("default_max_rows must be greater than zero"));
        }
        if self.poll_interval_ms == 0 {
            return Err(LensError::config("poll_interval_ms must be greater than zero"));
        }

        if let Some(location) = &self.output_location {
            let url = Url::parse(location).map_err(|e| {
                LensError::config(format!("Invalid output_location '{location}': {e}"))
            })?;
            if url.scheme() != "s3" {
                return Err(LensError::config(format!(
                    "Invalid output_location scheme '{}'. Expected 's3'",
                    url.scheme()
                )));
            }
        }

        if let Some(endpoint) = &self.endpoint {
            let url = Url::parse(endpoint)
                .map_err(|e| LensError::config(format!("Invalid endpoint '{endpoint}': {e}")))?;
            if url.scheme() != "https" && url.scheme() != "http" {
                return Err(LensError::config(format!(
                    "Invalid endpoint scheme '{}'. Expected 'http' or 'https'",
                    url.scheme()
                )));
            }
            if url
                .host_str()
                .is_some_and(|host| host.ends_with(".amazonaws.com"))
            {
                return Err(LensError::config(format!(
                    "Endpoint '{endpoint}' is the AWS API itself, which rejects unsigned \
                     requests. Point it at a signing proxy"
                )));
            }
        }

        Ok(())
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("athena-lens")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| LensError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Loads the file, applies environment overrides and validates the result.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::load_from_file(path)?;
        config.athena.apply_env_overrides();
        config.athena.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            LensError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}
