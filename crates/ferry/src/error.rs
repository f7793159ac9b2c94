//! Error types for the Ferry library.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Main error type for Ferry operations.
#[derive(Debug, Error)]
pub enum FerryError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error reading a spreadsheet.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// Error writing an XLSX workbook.
    #[error("XLSX write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    /// File or export format not supported.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Empty file or no header to build a table from.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Query specification or identifier rejected before reaching the store.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Table or data not found.
    #[error("{0}")]
    NotFound(String),

    /// Cannot reach or authenticate to the store.
    #[error("Error connecting to ClickHouse: {0}")]
    Connection(String),

    /// A value could not be coerced to its column type.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// A buffered result exceeded the configured row bound.
    #[error("Result exceeds {limit} rows; use the streaming variant instead")]
    ResultTooLarge { limit: u64 },

    /// Any other error reported by the store.
    #[error("{message}")]
    Store { code: Option<u32>, message: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a [`FerryError`], used by callers to pick a response class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad query syntax, unsupported file format, unsupported export format.
    MalformedInput,
    /// Table absent, or an empty result where data is required.
    NotFound,
    /// Store unreachable or credentials rejected.
    Connectivity,
    /// A row value does not fit its inferred column type.
    TypeMismatch,
    /// Anything unexpected.
    Internal,
}

impl ErrorKind {
    /// Stable snake_case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Connectivity => "connectivity_failure",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::Internal => "internal",
        }
    }
}

impl FerryError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FerryError::Csv(_)
            | FerryError::Spreadsheet(_)
            | FerryError::UnsupportedFormat(_)
            | FerryError::EmptyData(_)
            | FerryError::InvalidQuery(_)
            | FerryError::ResultTooLarge { .. } => ErrorKind::MalformedInput,
            FerryError::NotFound(_) => ErrorKind::NotFound,
            FerryError::Connection(_) => ErrorKind::Connectivity,
            FerryError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            FerryError::Io { .. }
            | FerryError::XlsxWrite(_)
            | FerryError::Store { .. }
            | FerryError::Config(_)
            | FerryError::Json(_) => ErrorKind::Internal,
        }
    }

    /// Build an error from a ClickHouse exception body (`Code: 60. DB::Exception: ...`).
    ///
    /// The error code picks the variant; the message is kept verbatim.
    pub fn from_server_message(message: impl Into<String>) -> Self {
        static CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Code:\s*(\d+)").unwrap());

        let message = message.into().trim().to_string();
        let code = CODE
            .captures(&message)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok());

        match code {
            Some(60) | Some(81) => FerryError::NotFound(message),
            Some(46) | Some(47) | Some(62) => FerryError::InvalidQuery(message),
            Some(6) | Some(26) | Some(27) | Some(53) | Some(70) | Some(72) => {
                FerryError::TypeMismatch(message)
            }
            Some(192) | Some(194) | Some(516) => FerryError::Connection(message),
            _ => FerryError::Store { code, message },
        }
    }
}

/// Result type alias for Ferry operations.
pub type Result<T> = std::result::Result<T, FerryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_classification() {
        let err = FerryError::from_server_message(
            "Code: 60. DB::Exception: Table default.missing does not exist. (UNKNOWN_TABLE)",
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("default.missing"));

        let err = FerryError::from_server_message("Code: 62. DB::Exception: Syntax error");
        assert_eq!(err.kind(), ErrorKind::MalformedInput);

        let err = FerryError::from_server_message(
            "Code: 27. DB::Exception: Cannot parse input: expected ',' before: 'x'",
        );
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);

        let err = FerryError::from_server_message("Code: 516. DB::Exception: default: Authentication failed");
        assert_eq!(err.kind(), ErrorKind::Connectivity);
    }

    #[test]
    fn test_unknown_code_is_internal() {
        let err = FerryError::from_server_message("Code: 241. DB::Exception: Memory limit exceeded");
        assert_eq!(err.kind(), ErrorKind::Internal);
        match err {
            FerryError::Store { code, .. } => assert_eq!(code, Some(241)),
            other => panic!("unexpected variant: {other:?}"),
        }

        let err = FerryError::from_server_message("something odd");
        assert!(matches!(err, FerryError::Store { code: None, .. }));
    }
}
