//! Build a destination table specification from parsed rows.

use std::collections::HashSet;

use crate::error::{FerryError, Result};
use crate::inference::infer_column_type;
use crate::input::CellValue;

use super::column::ColumnSpec;
use super::table::TableSpec;

/// Replace spaces and hyphens with underscores.
pub fn sanitize_name(raw: &str) -> String {
    raw.replace([' ', '-'], "_")
}

/// Builds [`TableSpec`]s from raw column names and sample rows.
pub struct SchemaBuilder;

impl SchemaBuilder {
    /// Sanitize names, infer one type per column and assemble the table spec.
    ///
    /// Sanitized names that collide get a numeric suffix (`a_b`, `a_b_2`, ...).
    pub fn build(
        table_name: &str,
        raw_column_names: &[String],
        sample_rows: &[Vec<CellValue>],
    ) -> Result<TableSpec> {
        let name = sanitize_name(table_name);
        if name.is_empty() {
            return Err(FerryError::InvalidQuery("Table name is empty".to_string()));
        }
        if raw_column_names.is_empty() {
            return Err(FerryError::EmptyData("No columns found".to_string()));
        }

        let mut seen = HashSet::new();
        let columns = raw_column_names
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let column_name = unique_name(sanitize_name(raw), &mut seen);
                let inferred_type =
                    infer_column_type(sample_rows.iter().filter_map(|row| row.get(index)));
                ColumnSpec::new(column_name, inferred_type)
            })
            .collect();

        Ok(TableSpec::new(name, columns))
    }
}

fn unique_name(base: String, seen: &mut HashSet<String>) -> String {
    if seen.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
