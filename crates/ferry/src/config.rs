//! Connection and pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FerryError, Result};
use crate::input::ParserConfig;

/// Rows fetched per page by the streaming exporter.
pub const DEFAULT_EXPORT_BATCH_SIZE: u64 = 1000;

/// Rows per INSERT statement during ingest.
pub const DEFAULT_INSERT_BATCH_SIZE: usize = 1000;

/// Rows returned by a preview.
pub const DEFAULT_PREVIEW_LIMIT: u64 = 100;

/// Upper bound for any operation that buffers a full result in memory.
pub const DEFAULT_MAX_BUFFERED_ROWS: u64 = 1_000_000;

/// How to reach the ClickHouse HTTP interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    /// Use HTTPS.
    #[serde(default)]
    pub secure: bool,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8123,
            database: "default".to_string(),
            user: "default".to_string(),
            password: String::new(),
            secure: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ConnectionConfig {
    /// Build from `CLICKHOUSE_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = match std::env::var("CLICKHOUSE_PORT") {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|_| {
                FerryError::Config(format!("CLICKHOUSE_PORT is not a valid port: {}", raw))
            })?,
            Err(_) => defaults.port,
        };

        let secure = match std::env::var("CLICKHOUSE_SECURE") {
            Ok(raw) => matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
            Err(_) => defaults.secure,
        };

        Ok(Self {
            host: std::env::var("CLICKHOUSE_HOST").unwrap_or(defaults.host),
            port,
            database: std::env::var("CLICKHOUSE_DATABASE").unwrap_or(defaults.database),
            user: std::env::var("CLICKHOUSE_USER").unwrap_or(defaults.user),
            password: std::env::var("CLICKHOUSE_PASSWORD").unwrap_or(defaults.password),
            secure,
            timeout_secs: defaults.timeout_secs,
        })
    }

    /// Base URL of the HTTP interface.
    pub fn url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}/", scheme, self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for a [`crate::Ferry`] instance.
#[derive(Debug, Clone)]
pub struct FerryConfig {
    /// Store connection.
    pub connection: ConnectionConfig,
    /// Parser configuration for uploads.
    pub parser: ParserConfig,
    /// Page size of the streaming exporter.
    pub export_batch_size: u64,
    /// Rows per INSERT statement.
    pub insert_batch_size: usize,
    /// Row cap for previews.
    pub preview_limit: u64,
    /// Row cap for buffered queries and downloads.
    pub max_buffered_rows: u64,
}

impl Default for FerryConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            parser: ParserConfig::default(),
            export_batch_size: DEFAULT_EXPORT_BATCH_SIZE,
            insert_batch_size: DEFAULT_INSERT_BATCH_SIZE,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            max_buffered_rows: DEFAULT_MAX_BUFFERED_ROWS,
        }
    }
}

impl FerryConfig {
    /// Configuration with the given connection and default pipeline settings.
    pub fn with_connection(connection: ConnectionConfig) -> Self {
        Self {
            connection,
            ..Self::default()
        }
    }
}
