//! Main Ferry struct and public API.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::FerryConfig;
use crate::error::{FerryError, Result};
use crate::export::{CsvRowChunks, DownloadFormat, ExportStream, Exporter, write_csv, write_xlsx};
use crate::ingest::{BatchIngestor, IngestOptions, IngestResult};
use crate::input::Parser;
use crate::query::{QuerySpec, compose};
use crate::store::{ClickHouseStore, ColumnInfo, QueryResult, Store, catalog};

/// A serialized table, ready to hand to a client.
#[derive(Debug, Clone)]
pub struct Download {
    /// `<table>.<extension>`
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// First rows of an upload, parsed but not ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePreview {
    /// Column headers as they appear in the file.
    pub columns: Vec<String>,
    /// Up to the requested number of rows, keyed by header.
    pub data: Vec<IndexMap<String, Value>>,
    /// Rows in the whole file.
    pub total_rows: usize,
}

/// Moves data between ClickHouse tables and flat files.
pub struct Ferry {
    config: FerryConfig,
    store: Arc<dyn Store>,
    parser: Parser,
    exporter: Exporter,
    ingestor: BatchIngestor,
}

impl Ferry {
    /// Connect to the configured ClickHouse server.
    pub fn connect(config: FerryConfig) -> Result<Self> {
        let store = ClickHouseStore::connect(config.connection.clone())?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Use an existing store.
    pub fn with_store(config: FerryConfig, store: Arc<dyn Store>) -> Self {
        let parser = Parser::with_config(config.parser.clone());
        let exporter = Exporter::new(Arc::clone(&store)).with_batch_size(config.export_batch_size);
        let ingestor = BatchIngestor::new(Arc::clone(&store))
            .with_parser_config(config.parser.clone())
            .with_batch_size(config.insert_batch_size);

        Self {
            config,
            store,
            parser,
            exporter,
            ingestor,
        }
    }

    pub fn config(&self) -> &FerryConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Names of the tables in the current database.
    pub fn tables(&self) -> Result<Vec<String>> {
        let result = self.store.query(&catalog::show_tables_sql())?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| row.first())
            .map(value_text)
            .collect())
    }

    /// Column names and types of `table`.
    pub fn describe(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let result = self.store.query(&catalog::describe_table_sql(table))?;
        Ok(result
            .rows
            .iter()
            .filter(|row| row.len() >= 2)
            .map(|row| ColumnInfo::new(value_text(&row[0]), value_text(&row[1])))
            .collect())
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count = self
            .store
            .query(&catalog::table_exists_sql(table))?
            .scalar_u64()?;
        Ok(count > 0)
    }

    /// Run a raw query and buffer its result, up to `max_buffered_rows` rows.
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        if sql.trim().is_empty() {
            return Err(FerryError::InvalidQuery("Query is empty".to_string()));
        }
        self.store.query_limited(sql, self.config.max_buffered_rows)
    }

    /// Run a raw query as an export stream.
    pub fn stream_query(&self, sql: &str) -> Result<ExportStream> {
        self.exporter.export_query(sql)
    }

    /// First `preview_limit` rows selected by `spec`.
    pub fn preview(&self, spec: &QuerySpec) -> Result<QueryResult> {
        let sql = compose(spec, Some(self.config.preview_limit), None)?;
        self.store.query(&sql)
    }

    /// Stream the rows selected by `spec` as progress and row events.
    pub fn export(&self, spec: &QuerySpec) -> Result<ExportStream> {
        self.exporter.export(spec)
    }

    /// Serialize a whole table, buffering at most `max_buffered_rows` rows.
    pub fn download(&self, table: &str, format: DownloadFormat) -> Result<Download> {
        self.ensure_table(table)?;

        let result = self
            .store
            .query_limited(&catalog::select_all_sql(table), self.config.max_buffered_rows)?;
        if result.is_empty() {
            return Err(no_data(table));
        }

        let columns = result.column_names();
        let bytes = match format {
            DownloadFormat::Csv => write_csv(&columns, &result.rows)?,
            DownloadFormat::Xlsx => write_xlsx(&columns, &result.rows)?,
        };
        debug!(table, format = %format, rows = result.row_count(), bytes = bytes.len(), "download ready");

        Ok(Download {
            file_name: format.file_name(table),
            content_type: format.content_type(),
            bytes,
        })
    }

    /// Stream a whole table as CSV chunks from a single unpaginated query.
    pub fn download_csv_stream(&self, table: &str) -> Result<CsvRowChunks> {
        self.ensure_table(table)?;
        let rows = self.store.stream(&catalog::select_all_sql(table))?;
        Ok(CsvRowChunks::new(rows, table, self.config.export_batch_size as usize))
    }

    /// Ingest an uploaded file.
    pub fn ingest_bytes(
        &self,
        file_name: &str,
        bytes: &[u8],
        options: &IngestOptions,
    ) -> Result<IngestResult> {
        self.ingestor.ingest_bytes(file_name, bytes, options)
    }

    /// Ingest a file from disk.
    pub fn ingest_file(&self, path: impl AsRef<Path>, options: &IngestOptions) -> Result<IngestResult> {
        self.ingestor.ingest_file(path, options)
    }

    /// Parse an upload and return its first `rows` rows without ingesting it.
    pub fn preview_file(&self, file_name: &str, bytes: &[u8], rows: usize) -> Result<FilePreview> {
        let (table, _) = self.parser.parse_bytes(file_name, bytes)?;

        let data = table
            .rows
            .iter()
            .take(rows)
            .map(|row| {
                table
                    .headers
                    .iter()
                    .cloned()
                    .zip(row.iter().map(|cell| cell.to_json()))
                    .collect()
            })
            .collect();

        Ok(FilePreview {
            columns: table.headers.clone(),
            data,
            total_rows: table.row_count(),
        })
    }

    fn ensure_table(&self, table: &str) -> Result<()> {
        if self.table_exists(table)? {
            Ok(())
        } else {
            Err(FerryError::NotFound(format!(
                "Table '{}' not found in database '{}'",
                table, self.config.connection.database
            )))
        }
    }
}

fn no_data(table: &str) -> FerryError {
    FerryError::NotFound(format!("No data found in table '{}'", table))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
