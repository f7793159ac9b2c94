//! Events produced by an export.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One step of an export, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExportEvent {
    /// Percent complete (0-100) and the total row count.
    Progress { progress: u8, total: u64 },
    /// One result row, in projection order.
    Row { data: Vec<Value> },
}

impl ExportEvent {
    pub fn progress(progress: u8, total: u64) -> Self {
        ExportEvent::Progress { progress, total }
    }

    pub fn row(data: Vec<Value>) -> Self {
        ExportEvent::Row { data }
    }

    pub fn is_progress(&self) -> bool {
        matches!(self, ExportEvent::Progress { .. })
    }

    /// Serialize as one newline-terminated JSON line.
    pub fn to_ndjson_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// `min(100, floor(offset / total * 100))`; zero when there is nothing to export.
pub fn percent_complete(offset: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (offset as u128 * 100) / total as u128;
    percent.min(100) as u8
}
