//! ClickHouse store over the HTTP interface.

use std::io::{BufRead, BufReader};

use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::error::{FerryError, Result};

use super::provider::{ColumnInfo, QueryResult, RowStream, Store};

/// ClickHouse error code for `max_result_rows` overflow.
const TOO_MANY_ROWS_OR_BYTES: u32 = 396;

/// Longest statement prefix written to debug logs.
const LOG_SQL_CHARS: usize = 200;

/// Set when the server failed after it had already sent a 200 status.
const EXCEPTION_CODE_HEADER: &str = "X-ClickHouse-Exception-Code";

/// Buffered results.
const BUFFERED_FORMAT: &str = "JSONCompact";

/// Streamed results: a names line, a types line, then one JSON array per row.
const STREAM_FORMAT: &str = "JSONCompactEachRowWithNamesAndTypes";

/// Store backed by a ClickHouse server.
pub struct ClickHouseStore {
    client: Client,
    config: ConnectionConfig,
}

/// Body of a `JSONCompact` response.
#[derive(Debug, Deserialize)]
struct CompactResponse {
    #[serde(default)]
    meta: Vec<ColumnInfo>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
    #[serde(default)]
    exception: Option<String>,
}

impl ClickHouseStore {
    /// Create a store without contacting the server.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FerryError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create a store and verify it answers `SELECT 1`.
    pub fn connect(config: ConnectionConfig) -> Result<Self> {
        let store = Self::new(config)?;
        store.ping()?;
        debug!(
            host = %store.config.host,
            port = store.config.port,
            database = %store.config.database,
            "ClickHouse connection successful"
        );
        Ok(store)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// POST a statement, returning the response once its status is known good.
    fn post(&self, sql: &str, format: &str, settings: &[(&str, String)]) -> Result<Response> {
        debug!(sql = %log_prefix(sql), format, "sending statement");

        let mut params: Vec<(&str, String)> = vec![
            ("database", self.config.database.clone()),
            ("default_format", format.to_string()),
            ("output_format_json_quote_64bit_integers", "0".to_string()),
        ];
        params.extend(settings.iter().cloned());

        let response = self
            .client
            .post(self.config.url())
            .query(&params)
            .header("X-ClickHouse-User", &self.config.user)
            .header("X-ClickHouse-Key", &self.config.password)
            .body(sql.to_string())
            .send()
            .map_err(|e| FerryError::Connection(e.to_string()))?;

        let status = response.status();
        let header_code = response
            .headers()
            .get(EXCEPTION_CODE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok());
        if status.is_success() && header_code.is_none() {
            return Ok(response);
        }

        let body = read_text(response)?;
        if body.trim().is_empty() {
            return Err(FerryError::Store {
                code: header_code,
                message: format!("ClickHouse returned HTTP {}", status),
            });
        }
        Err(FerryError::from_server_message(body))
    }

    /// POST a statement and return the whole response body.
    ///
    /// `wait_end_of_query` makes the server buffer the result, so errors raised
    /// while producing it arrive as an error status instead of a cut-off body.
    fn send(&self, sql: &str, settings: &[(&str, String)]) -> Result<String> {
        let mut settings = settings.to_vec();
        settings.push(("wait_end_of_query", "1".to_string()));
        read_text(self.post(sql, BUFFERED_FORMAT, &settings)?)
    }

    fn parse_result(body: &str) -> Result<QueryResult> {
        if body.trim().is_empty() {
            return Ok(QueryResult::default());
        }
        match serde_json::from_str::<CompactResponse>(body) {
            Ok(CompactResponse {
                exception: Some(message),
                ..
            }) => Err(FerryError::from_server_message(message)),
            Ok(parsed) => Ok(QueryResult::new(parsed.meta, parsed.data)),
            Err(e) => Err(embedded_exception(body).unwrap_or(FerryError::Json(e))),
        }
    }
}

impl Store for ClickHouseStore {
    fn query(&self, sql: &str) -> Result<QueryResult> {
        let body = self.send(sql, &[])?;
        Self::parse_result(&body)
    }

    fn execute(&self, sql: &str) -> Result<()> {
        self.send(sql, &[]).map(|_| ())
    }

    fn query_limited(&self, sql: &str, max_rows: u64) -> Result<QueryResult> {
        let settings = [
            ("max_result_rows", max_rows.to_string()),
            ("result_overflow_mode", "throw".to_string()),
        ];
        self.send(sql, &settings)
            .and_then(|body| Self::parse_result(&body))
            .map_err(|e| match e {
                FerryError::Store {
                    code: Some(TOO_MANY_ROWS_OR_BYTES),
                    ..
                } => FerryError::ResultTooLarge { limit: max_rows },
                other => other,
            })
    }

    fn stream(&self, sql: &str) -> Result<RowStream> {
        let response = self.post(sql, STREAM_FORMAT, &[])?;
        let mut lines = BufReader::new(response).lines();

        let names = header_line(lines.next())?;
        let types = header_line(lines.next())?;
        let columns = names
            .into_iter()
            .zip(types)
            .map(|(name, type_name)| ColumnInfo::new(name, type_name))
            .collect();

        let rows = lines.filter_map(|line| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(parse_row(&line)),
            Err(e) => Some(Err(read_failure(e))),
        });
        Ok(RowStream::new(columns, rows))
    }

    fn name(&self) -> &str {
        "clickhouse"
    }
}

fn read_text(response: Response) -> Result<String> {
    response
        .text()
        .map_err(|e| FerryError::Connection(format!("Failed to read response: {}", e)))
}

fn read_failure(e: std::io::Error) -> FerryError {
    FerryError::Connection(format!("Failed to read response: {}", e))
}

/// An exception the server wrote into a response body after a 200 status.
fn embedded_exception(text: &str) -> Option<FerryError> {
    text.find("Code:")
        .map(|start| FerryError::from_server_message(&text[start..]))
}

/// Names or types line of a streamed result; a missing line means no columns.
fn header_line(line: Option<std::io::Result<String>>) -> Result<Vec<String>> {
    match line {
        None => Ok(Vec::new()),
        Some(Err(e)) => Err(read_failure(e)),
        Some(Ok(line)) => serde_json::from_str(&line)
            .map_err(|e| embedded_exception(&line).unwrap_or(FerryError::Json(e))),
    }
}

fn parse_row(line: &str) -> Result<Vec<Value>> {
    serde_json::from_str(line).map_err(|e| embedded_exception(line).unwrap_or(FerryError::Json(e)))
}

fn log_prefix(sql: &str) -> String {
    if sql.chars().count() <= LOG_SQL_CHARS {
        sql.to_string()
    } else {
        let prefix: String = sql.chars().take(LOG_SQL_CHARS).collect();
        format!("{}...", prefix)
    }
}
