//! Typed cell values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single parsed cell.
///
/// The variant is decided once, when the file is parsed, and carried unchanged
/// through schema inference and insert-statement building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, CellValue::Number(_))
    }

    /// Classify a raw text cell on its own: missing marker, number, or text.
    pub fn from_raw(raw: &str) -> Self {
        if is_missing(raw) {
            CellValue::Null
        } else if let Some(n) = parse_number(raw) {
            CellValue::Number(n)
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    /// JSON view of this cell (NaN/inf become null).
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Null => Value::Null,
            CellValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CellValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// Exact, case-sensitive spellings read as missing.
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Check if a raw value represents a missing value.
///
/// Matching is exact: `Na`, `none` or a whitespace-only cell stay text.
pub fn is_missing(value: &str) -> bool {
    MISSING_MARKERS.contains(&value)
}

/// Parse a raw value as a number, ignoring surrounding whitespace.
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_missing() {
        assert!(is_missing(""));
        assert!(is_missing("NA"));
        assert!(is_missing("n/a"));
        assert!(is_missing("#N/A"));
        assert!(is_missing("NULL"));
        assert!(is_missing("null"));
        assert!(is_missing("NaN"));
        assert!(is_missing("None"));
        assert!(is_missing("<NA>"));
        assert!(!is_missing("value"));
        assert!(!is_missing("0"));
        assert!(!is_missing("-"));
    }

    #[test]
    fn test_missing_markers_are_case_sensitive() {
        for raw in ["Na", "na", "none", "NONE", "Null", " NA", "  "] {
            assert!(!is_missing(raw), "{:?} must not be missing", raw);
            assert_eq!(CellValue::from_raw(raw), CellValue::Text(raw.to_string()));
        }
    }

    #[test]
    fn test_from_raw() {
        assert_eq!(CellValue::from_raw(""), CellValue::Null);
        assert_eq!(CellValue::from_raw(" 3.5 "), CellValue::Number(3.5));
        assert_eq!(CellValue::from_raw("-12"), CellValue::Number(-12.0));
        assert_eq!(CellValue::from_raw("1,234"), CellValue::Text("1,234".to_string()));
        assert_eq!(CellValue::from_raw("Alice"), CellValue::Text("Alice".to_string()));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(CellValue::Null.to_json(), Value::Null);
        assert_eq!(CellValue::Number(2.5).to_json(), serde_json::json!(2.5));
        assert_eq!(CellValue::Number(f64::NAN).to_json(), Value::Null);
        assert_eq!(CellValue::from("x").to_json(), serde_json::json!("x"));
    }
}
