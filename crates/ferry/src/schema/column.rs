//! Column specification.

use serde::{Deserialize, Serialize};

use super::types::ColumnType;

/// A destination column: sanitized name plus inferred type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Sanitized column name.
    pub name: String,
    /// Inferred data type.
    pub inferred_type: ColumnType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, inferred_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            inferred_type,
        }
    }
}
