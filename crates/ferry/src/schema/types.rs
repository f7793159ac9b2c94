//! Column type and storage engine definitions.

use serde::{Deserialize, Serialize};

/// Destination type for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Floating-point numbers.
    Numeric,
    /// Text/string values.
    Text,
}

impl ColumnType {
    /// ClickHouse type used when creating the column.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "Nullable(Float64)",
            ColumnType::Text => "Nullable(String)",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Numeric)
    }
}

impl Default for ColumnType {
    fn default() -> Self {
        ColumnType::Text
    }
}

/// Storage engine for created tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableEngine {
    /// Append-optimized MergeTree without a sort key.
    MergeTree,
}

impl TableEngine {
    /// Engine clause, including the (empty) ordering key.
    pub fn clause(&self) -> &'static str {
        match self {
            TableEngine::MergeTree => "ENGINE = MergeTree() ORDER BY tuple()",
        }
    }
}

impl Default for TableEngine {
    fn default() -> Self {
        TableEngine::MergeTree
    }
}
