//! Batch ingestion: parse an upload, create its table, insert its rows.

mod ingestor;
mod insert;

pub use ingestor::{BatchIngestor, IngestOptions, IngestResult};
pub use insert::insert_sql;
