//! Store trait and result types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FerryError, Result};

/// Name and type of a result or table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// A fully buffered query result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Result columns, in projection order.
    pub columns: Vec<ColumnInfo>,
    /// Rows, each in projection order.
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// First cell of the first row as an unsigned integer (for `count()` results).
    pub fn scalar_u64(&self) -> Result<u64> {
        let cell = self
            .rows
            .first()
            .and_then(|row| row.first())
            .ok_or_else(|| FerryError::Store {
                code: None,
                message: "Expected a scalar result, got no rows".to_string(),
            })?;

        match cell {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse::<u64>().ok(),
            _ => None,
        }
        .ok_or_else(|| FerryError::Store {
            code: None,
            message: format!("Expected an unsigned integer, got {}", cell),
        })
    }
}

/// Rows of a single query, yielded as the store produces them.
pub struct RowStream {
    columns: Vec<ColumnInfo>,
    rows: Box<dyn Iterator<Item = Result<Vec<Value>>> + Send>,
}

impl RowStream {
    pub fn new(
        columns: Vec<ColumnInfo>,
        rows: impl Iterator<Item = Result<Vec<Value>>> + Send + 'static,
    ) -> Self {
        Self {
            columns,
            rows: Box::new(rows),
        }
    }

    /// Stream over an already buffered result.
    pub fn buffered(result: QueryResult) -> Self {
        Self::new(result.columns, result.rows.into_iter().map(Ok))
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }
}

impl Iterator for RowStream {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

/// A SQL store.
///
/// Implementations must be thread-safe (Send + Sync); calls are independent
/// and share no mutable state.
pub trait Store: Send + Sync {
    /// Run a statement that returns rows.
    fn query(&self, sql: &str) -> Result<QueryResult>;

    /// Run a statement for its side effect (DDL, INSERT).
    fn execute(&self, sql: &str) -> Result<()>;

    /// Run a query, failing with [`FerryError::ResultTooLarge`] past `max_rows`.
    fn query_limited(&self, sql: &str, max_rows: u64) -> Result<QueryResult> {
        let result = self.query(sql)?;
        if result.row_count() as u64 > max_rows {
            return Err(FerryError::ResultTooLarge { limit: max_rows });
        }
        Ok(result)
    }

    /// Run one query and yield its rows without paging.
    ///
    /// The default buffers the whole result; stores that can read a response
    /// incrementally should override it.
    fn stream(&self, sql: &str) -> Result<RowStream> {
        self.query(sql).map(RowStream::buffered)
    }

    /// Check that the store is reachable.
    fn ping(&self) -> Result<()> {
        self.query("SELECT 1").map(|_| ())
    }

    /// Get the name of this store (for logging/debugging).
    fn name(&self) -> &str;
}
