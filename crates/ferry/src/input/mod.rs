//! Upload parsing: delimited text and spreadsheets into typed rows.

mod parser;
mod source;
mod value;

pub use parser::{Parser, ParserConfig};
pub use source::{DataTable, FileFormat, SourceMetadata};
pub use value::{CellValue, is_missing, parse_number};
