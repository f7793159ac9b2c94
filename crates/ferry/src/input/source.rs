//! Parsed tabular data and source metadata.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FerryError, Result};

use super::value::CellValue;

/// File formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    /// Comma-delimited text (`.csv`).
    Csv,
    /// Tab-delimited text (`.tsv`).
    Tsv,
    /// Delimited text with an auto-detected delimiter (`.txt`).
    Delimited,
    /// Spreadsheet workbook (`.xls`, `.xlsx`, `.xlsm`, `.ods`).
    Spreadsheet,
}

impl FileFormat {
    /// Pick the format from a file name's extension.
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let ext = Path::new(file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "tsv" | "tab" => Ok(FileFormat::Tsv),
            "txt" => Ok(FileFormat::Delimited),
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Ok(FileFormat::Spreadsheet),
            _ => Err(FerryError::UnsupportedFormat(format!(
                "Unsupported file format: '{}'",
                file_name
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Tsv => "tsv",
            FileFormat::Delimited => "delimited",
            FileFormat::Spreadsheet => "spreadsheet",
        }
    }
}

/// Metadata about an uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path.
    pub file: String,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Detected format.
    pub format: FileFormat,
    /// Number of data rows (excluding header).
    pub row_count: usize,
    /// Number of columns.
    pub column_count: usize,
    /// When the file was parsed.
    pub parsed_at: DateTime<Utc>,
}

impl SourceMetadata {
    pub fn new(
        file_name: &str,
        hash: String,
        size_bytes: u64,
        format: FileFormat,
        row_count: usize,
        column_count: usize,
    ) -> Self {
        let file = Path::new(file_name)
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file,
            hash,
            size_bytes,
            format,
            row_count,
            column_count,
            parsed_at: Utc::now(),
        }
    }

    /// File name with its extension stripped.
    pub fn stem(&self) -> String {
        Path::new(&self.file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Represents parsed tabular data.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    /// Column headers as they appear in the file.
    pub headers: Vec<String>,
    /// Row data (row-major order), each row exactly `headers.len()` long.
    pub rows: Vec<Vec<CellValue>>,
}

impl DataTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { headers, rows }
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of rows (excluding header).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get all values for a column by index.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &CellValue> {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Get a specific cell value.
    pub fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Keep only the named columns, in the order given.
    pub fn select_columns(&self, names: &[String]) -> Result<DataTable> {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let index = self
                .headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| {
                    FerryError::InvalidQuery(format!("Column '{}' not found in file", name))
                })?;
            indices.push(index);
        }

        let headers = indices.iter().map(|&i| self.headers[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(DataTable::new(headers, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataTable {
        DataTable::new(
            vec!["id".to_string(), "name".to_string(), "score".to_string()],
            vec![
                vec![1.0.into(), "Alice".into(), 9.5.into()],
                vec![2.0.into(), "Bob".into(), CellValue::Null],
            ],
        )
    }

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(FileFormat::from_file_name("a.csv").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_file_name("a.TSV").unwrap(), FileFormat::Tsv);
        assert_eq!(FileFormat::from_file_name("b.xlsx").unwrap(), FileFormat::Spreadsheet);
        assert_eq!(FileFormat::from_file_name("b.xls").unwrap(), FileFormat::Spreadsheet);
        assert!(FileFormat::from_file_name("c.parquet").is_err());
        assert!(FileFormat::from_file_name("noext").is_err());
    }

    #[test]
    fn test_metadata_stem() {
        let meta = SourceMetadata::new("uploads/my-data.csv", String::new(), 0, FileFormat::Csv, 0, 0);
        assert_eq!(meta.file, "my-data.csv");
        assert_eq!(meta.stem(), "my-data");
    }

    #[test]
    fn test_select_columns() {
        let table = sample();
        let selected = table
            .select_columns(&["score".to_string(), "id".to_string()])
            .unwrap();
        assert_eq!(selected.headers, vec!["score", "id"]);
        assert_eq!(selected.get(0, 0), Some(&CellValue::Number(9.5)));
        assert_eq!(selected.get(1, 1), Some(&CellValue::Number(2.0)));

        assert!(table.select_columns(&["missing".to_string()]).is_err());
    }

    #[test]
    fn test_column_values() {
        let table = sample();
        let names: Vec<_> = table.column_values(1).cloned().collect();
        assert_eq!(names, vec![CellValue::from("Alice"), CellValue::from("Bob")]);
    }
}
