//! Streaming export and download serialization.

mod events;
mod exporter;
mod writer;

pub use events::{ExportEvent, percent_complete};
pub use exporter::{ExportStream, Exporter};
pub use writer::{CsvChunks, CsvRowChunks, DownloadFormat, records_to_csv, write_csv, write_xlsx};
