//! Ferry: move tabular data between ClickHouse and flat files.
//!
//! Ferry ingests CSV/TSV/XLSX uploads into ClickHouse tables and exports
//! query results back out, either as a progress-annotated event stream or as
//! downloadable CSV/XLSX files.
//!
//! # Core Principles
//!
//! - **Streaming first**: exports are pulled page by page; buffering is bounded and opt-in
//! - **Typed once**: cell values are decided at parse time and never re-inferred
//! - **Safe SQL**: identifiers and literals are always quoted and escaped
//!
//! # Example
//!
//! ```no_run
//! use ferry::{ConnectionConfig, Ferry, FerryConfig, IngestOptions, QuerySpec};
//!
//! let config = FerryConfig::with_connection(ConnectionConfig::from_env().unwrap());
//! let ferry = Ferry::connect(config).unwrap();
//!
//! let result = ferry.ingest_file("sales-2024.csv", &IngestOptions::default()).unwrap();
//! println!("Inserted {} rows into {}", result.rows_inserted, result.table_name);
//!
//! let spec = QuerySpec::table(result.table_name, vec!["*".to_string()]);
//! for event in ferry.export(&spec).unwrap() {
//!     print!("{}", event.unwrap().to_ndjson_line().unwrap());
//! }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod inference;
pub mod ingest;
pub mod input;
pub mod query;
pub mod schema;
pub mod sql;
pub mod store;

mod ferry;

pub use crate::ferry::{Download, Ferry, FilePreview};
pub use config::{ConnectionConfig, FerryConfig};
pub use error::{ErrorKind, FerryError, Result};
pub use export::{
    CsvChunks, CsvRowChunks, DownloadFormat, ExportEvent, ExportStream, Exporter, records_to_csv,
};
pub use ingest::{BatchIngestor, IngestOptions, IngestResult};
pub use input::{CellValue, DataTable, FileFormat, Parser, ParserConfig, SourceMetadata};
pub use query::{JoinCondition, JoinType, QuerySpec};
pub use schema::{ColumnSpec, ColumnType, SchemaBuilder, TableSpec};
pub use store::{ClickHouseStore, ColumnInfo, MockStore, QueryResult, RowStream, Store};
