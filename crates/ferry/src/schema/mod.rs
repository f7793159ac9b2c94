//! Destination table schema: column specs, table specs and the schema builder.

mod builder;
mod column;
mod table;
mod types;

pub use builder::{SchemaBuilder, sanitize_name};
pub use column::ColumnSpec;
pub use table::TableSpec;
pub use types::{ColumnType, TableEngine};
