//! Table-level specification and DDL.

use serde::{Deserialize, Serialize};

use crate::sql::quote_identifier;

use super::column::ColumnSpec;
use super::types::TableEngine;

/// Specification for a destination table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Sanitized table name.
    pub name: String,
    /// Columns in file order.
    pub columns: Vec<ColumnSpec>,
    /// Storage engine.
    #[serde(default)]
    pub engine: TableEngine,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.into(),
            columns,
            engine: TableEngine::default(),
        }
    }

    /// Get a column by name.
    pub fn get_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get all column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Idempotent `CREATE TABLE IF NOT EXISTS` statement.
    pub fn create_table_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), c.inferred_type.sql_type()))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({}) {}",
            quote_identifier(&self.name),
            columns,
            self.engine.clause()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    #[test]
    fn test_create_table_sql() {
        let spec = TableSpec::new(
            "my_table",
            vec![
                ColumnSpec::new("id", ColumnType::Numeric),
                ColumnSpec::new("First_Name", ColumnType::Text),
            ],
        );

        assert_eq!(
            spec.create_table_sql(),
            "CREATE TABLE IF NOT EXISTS `my_table` (`id` Nullable(Float64), \
             `First_Name` Nullable(String)) ENGINE = MergeTree() ORDER BY tuple()"
        );
        assert_eq!(spec.column_names(), vec!["id", "First_Name"]);
        assert!(spec.get_column("id").is_some());
    }
}
