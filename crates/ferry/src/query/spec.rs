//! Query specifications supplied by callers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FerryError;

/// Join type between two tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", rename_all = "UPPERCASE")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for JoinType {
    type Err = FerryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INNER" => Ok(JoinType::Inner),
            "LEFT" => Ok(JoinType::Left),
            "RIGHT" => Ok(JoinType::Right),
            "FULL" => Ok(JoinType::Full),
            other => Err(FerryError::InvalidQuery(format!("Unsupported join type: '{}'", other))),
        }
    }
}

impl TryFrom<String> for JoinType {
    type Error = FerryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One join between a table already in scope and an additional table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCondition {
    pub join_type: JoinType,
    pub left_table: String,
    pub left_column: String,
    pub right_table: String,
    pub right_column: String,
}

impl JoinCondition {
    pub fn new(
        join_type: JoinType,
        left_table: impl Into<String>,
        left_column: impl Into<String>,
        right_table: impl Into<String>,
        right_column: impl Into<String>,
    ) -> Self {
        Self {
            join_type,
            left_table: left_table.into(),
            left_column: left_column.into(),
            right_table: right_table.into(),
            right_column: right_column.into(),
        }
    }
}

impl FromStr for JoinCondition {
    type Err = FerryError;

    /// Parse `TYPE:left_table.left_column=right_table.right_column`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            FerryError::InvalidQuery(format!(
                "Invalid join '{}', expected TYPE:left_table.left_column=right_table.right_column",
                s
            ))
        };

        let (join_type, rest) = s.split_once(':').ok_or_else(invalid)?;
        let (left, right) = rest.split_once('=').ok_or_else(invalid)?;
        let (left_table, left_column) = left.trim().rsplit_once('.').ok_or_else(invalid)?;
        let (right_table, right_column) = right.trim().rsplit_once('.').ok_or_else(invalid)?;

        Ok(JoinCondition::new(
            join_type.parse()?,
            left_table,
            left_column,
            right_table,
            right_column,
        ))
    }
}

/// Tables, projected columns and join conditions for a read query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Base table first, then one entry per joined table.
    pub tables: Vec<String>,
    /// Projected columns, in output order.
    pub columns: Vec<String>,
    /// Join conditions, used only when there is more than one table.
    #[serde(default, alias = "joinConditions")]
    pub join_conditions: Vec<JoinCondition>,
}

impl QuerySpec {
    /// Single-table spec.
    pub fn table(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            tables: vec![table.into()],
            columns,
            join_conditions: Vec::new(),
        }
    }

    /// Add a joined table.
    pub fn join(mut self, condition: JoinCondition) -> Self {
        self.tables.push(condition.right_table.clone());
        self.join_conditions.push(condition);
        self
    }

    pub fn is_multi_table(&self) -> bool {
        self.tables.len() > 1
    }
}
