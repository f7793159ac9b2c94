//! Batch ingestion of uploaded files.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DEFAULT_INSERT_BATCH_SIZE;
use crate::error::Result;
use crate::input::{DataTable, Parser, ParserConfig, SourceMetadata};
use crate::schema::SchemaBuilder;
use crate::store::Store;

use super::insert::insert_sql;

/// Caller choices for an ingest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestOptions {
    /// Destination table; the file stem is used when absent or empty.
    pub table_name: Option<String>,
    /// Subset of file columns to load, in the order given.
    pub columns: Option<Vec<String>>,
}

impl IngestOptions {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table_name: Some(name.into()),
            columns: None,
        }
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }
}

/// Outcome of a successful ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResult {
    pub table_name: String,
    pub rows_inserted: u64,
    /// Sanitized column names, in table order.
    pub columns: Vec<String>,
    pub source: SourceMetadata,
}

/// Parses uploads, creates the destination table and inserts rows in batches.
pub struct BatchIngestor {
    store: Arc<dyn Store>,
    parser: Parser,
    batch_size: usize,
}

impl BatchIngestor {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            parser: Parser::new(),
            batch_size: DEFAULT_INSERT_BATCH_SIZE,
        }
    }

    pub fn with_parser_config(mut self, config: ParserConfig) -> Self {
        self.parser = Parser::with_config(config);
        self
    }

    /// Rows per INSERT statement (at least 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Ingest an uploaded file; the format is implied by `file_name`.
    pub fn ingest_bytes(
        &self,
        file_name: &str,
        bytes: &[u8],
        options: &IngestOptions,
    ) -> Result<IngestResult> {
        let (table, source) = self.parser.parse_bytes(file_name, bytes)?;
        self.ingest_table(&table, source, options)
    }

    /// Ingest a file from disk.
    pub fn ingest_file(&self, path: impl AsRef<Path>, options: &IngestOptions) -> Result<IngestResult> {
        let (table, source) = self.parser.parse_file(path)?;
        self.ingest_table(&table, source, options)
    }

    /// Ingest already parsed rows.
    ///
    /// The first failing statement aborts the ingest. Batches inserted before
    /// the failure are not rolled back.
    pub fn ingest_table(
        &self,
        table: &DataTable,
        source: SourceMetadata,
        options: &IngestOptions,
    ) -> Result<IngestResult> {
        let selected;
        let table = match &options.columns {
            Some(columns) if !columns.is_empty() => {
                selected = table.select_columns(columns)?;
                &selected
            }
            _ => table,
        };

        let raw_name = options
            .table_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| source.stem());

        let spec = SchemaBuilder::build(&raw_name, &table.headers, &table.rows)?;
        self.store.execute(&spec.create_table_sql())?;
        debug!(table = %spec.name, columns = spec.column_count(), "destination table ready");

        let mut rows_inserted = 0u64;
        for batch in table.rows.chunks(self.batch_size) {
            if let Err(e) = self.store.execute(&insert_sql(&spec, batch)) {
                warn!(table = %spec.name, rows_inserted, error = %e, "ingest aborted");
                return Err(e);
            }
            rows_inserted += batch.len() as u64;
            debug!(table = %spec.name, rows_inserted, "inserted batch");
        }

        info!(table = %spec.name, rows = rows_inserted, file = %source.file, "ingest complete");

        Ok(IngestResult {
            table_name: spec.name.clone(),
            rows_inserted,
            columns: spec.column_names().into_iter().map(str::to_string).collect(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::MockStore;
    use serde_json::{Value, json};

    const PEOPLE: &[u8] = b"id,First Name,score\n1,Ada,9.5\n2,Bo,\n3,Cy,7\n";

    #[test]
    fn test_ingest_creates_and_fills_table() {
        let store = Arc::new(MockStore::new());
        let result = BatchIngestor::new(store.clone())
            .ingest_bytes("people-2024.csv", PEOPLE, &IngestOptions::default())
            .unwrap();

        assert_eq!(result.table_name, "people_2024");
        assert_eq!(result.columns, vec!["id", "First_Name", "score"]);
        assert_eq!(result.rows_inserted, 3);
        assert_eq!(result.source.row_count, 3);

        let rows = store.rows("people_2024").unwrap();
        assert_eq!(rows[1], vec![json!(2.0), json!("Bo"), Value::Null]);

        let columns = store.columns("people_2024").unwrap();
        assert_eq!(columns[0].type_name, "Nullable(Float64)");
        assert_eq!(columns[1].type_name, "Nullable(String)");
    }

    #[test]
    fn test_batches_statements() {
        let store = Arc::new(MockStore::new());
        let mut csv = String::from("n\n");
        for i in 0..25 {
            csv.push_str(&format!("{}\n", i));
        }

        let result = BatchIngestor::new(store.clone())
            .with_batch_size(10)
            .ingest_bytes("numbers.csv", csv.as_bytes(), &IngestOptions::default())
            .unwrap();
        assert_eq!(result.rows_inserted, 25);

        let inserts = store
            .statements()
            .into_iter()
            .filter(|s| s.starts_with("INSERT"))
            .count();
        assert_eq!(inserts, 3);
    }

    #[test]
    fn test_declared_name_and_column_subset() {
        let store = Arc::new(MockStore::new());
        let options = IngestOptions::table("my-table").with_columns(vec!["score".to_string(), "id".to_string()]);
        let result = BatchIngestor::new(store.clone())
            .ingest_bytes("people.csv", PEOPLE, &options)
            .unwrap();

        assert_eq!(result.table_name, "my_table");
        assert_eq!(result.columns, vec!["score", "id"]);
        assert_eq!(store.rows("my_table").unwrap()[0], vec![json!(9.5), json!(1.0)]);
    }

    #[test]
    fn test_empty_declared_name_falls_back_to_stem() {
        let store = Arc::new(MockStore::new());
        let result = BatchIngestor::new(store)
            .ingest_bytes("people.csv", PEOPLE, &IngestOptions::table(""))
            .unwrap();
        assert_eq!(result.table_name, "people");
    }

    #[test]
    fn test_header_only_file_creates_empty_table() {
        let store = Arc::new(MockStore::new());
        let result = BatchIngestor::new(store.clone())
            .ingest_bytes("empty.csv", b"a,b\n", &IngestOptions::default())
            .unwrap();
        assert_eq!(result.rows_inserted, 0);
        assert_eq!(store.rows("empty").unwrap().len(), 0);
    }

    #[test]
    fn test_unsupported_format_is_rejected() {
        let store = Arc::new(MockStore::new());
        let err = BatchIngestor::new(store.clone())
            .ingest_bytes("data.json", b"{}", &IngestOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert!(store.statements().is_empty());
    }

    #[test]
    fn test_store_failure_aborts() {
        let store = Arc::new(MockStore::new());
        store.fail_on("INSERT");
        let err = BatchIngestor::new(store)
            .ingest_bytes("people.csv", PEOPLE, &IngestOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connectivity);
    }
}
