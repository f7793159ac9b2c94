//! CSV/TSV and spreadsheet parser.

use std::fs;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{FerryError, Result};

use super::source::{DataTable, FileFormat, SourceMetadata};
use super::value::{CellValue, is_missing, parse_number};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Delimiter to use for delimited text (None = implied by the extension).
    pub delimiter: Option<u8>,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
    /// Quote character.
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            max_rows: None,
            quote: b'"',
        }
    }
}

/// Parses uploaded tabular files into typed rows.
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a file from disk.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(DataTable, SourceMetadata)> {
        let path = path.as_ref();
        let contents = fs::read(path).map_err(|e| FerryError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.parse_bytes(&file_name, &contents)
    }

    /// Parse uploaded bytes; the format is implied by `file_name`'s extension.
    pub fn parse_bytes(&self, file_name: &str, bytes: &[u8]) -> Result<(DataTable, SourceMetadata)> {
        let format = FileFormat::from_file_name(file_name)?;

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let table = match format {
            FileFormat::Csv => self.parse_delimited(bytes, self.config.delimiter.unwrap_or(b','))?,
            FileFormat::Tsv => self.parse_delimited(bytes, self.config.delimiter.unwrap_or(b'\t'))?,
            FileFormat::Delimited => {
                let delimiter = match self.config.delimiter {
                    Some(d) => d,
                    None => detect_delimiter(bytes)?,
                };
                self.parse_delimited(bytes, delimiter)?
            }
            FileFormat::Spreadsheet => self.parse_spreadsheet(bytes)?,
        };

        debug!(
            file = file_name,
            format = format.as_str(),
            rows = table.row_count(),
            columns = table.column_count(),
            "parsed upload"
        );

        let metadata = SourceMetadata::new(
            file_name,
            hash,
            bytes.len() as u64,
            format,
            table.row_count(),
            table.column_count(),
        );

        Ok((table, metadata))
    }

    /// Parse delimited text. Columns whose non-missing cells are all numeric
    /// become numeric columns; any other column is text.
    fn parse_delimited(&self, bytes: &[u8], delimiter: u8) -> Result<DataTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let headers = normalize_headers(reader.headers()?.iter().map(|s| s.to_string()));
        if headers.is_empty() {
            return Err(FerryError::EmptyData("No columns found".to_string()));
        }
        let expected_cols = headers.len();

        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            if let Some(max) = self.config.max_rows {
                if row_idx >= max {
                    break;
                }
            }

            let record = result?;
            let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
            if row.iter().all(|v| v.is_empty()) && row.len() <= 1 {
                continue;
            }

            while row.len() < expected_cols {
                row.push(String::new());
            }
            row.truncate(expected_cols);

            raw_rows.push(row);
        }

        let numeric_columns: Vec<bool> = (0..expected_cols)
            .map(|col| {
                raw_rows
                    .iter()
                    .map(|row| row[col].as_str())
                    .filter(|v| !is_missing(v))
                    .all(|v| parse_number(v).is_some())
            })
            .collect();

        let rows = raw_rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&numeric_columns)
                    .map(|(raw, &numeric)| typed_cell(raw, numeric))
                    .collect()
            })
            .collect();

        Ok(DataTable::new(headers, rows))
    }

    /// Parse the first worksheet of a workbook; cells keep their native type.
    fn parse_spreadsheet(&self, bytes: &[u8]) -> Result<DataTable> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| FerryError::Spreadsheet(e.to_string()))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| FerryError::EmptyData("Workbook has no worksheets".to_string()))?
            .map_err(|e| FerryError::Spreadsheet(e.to_string()))?;

        let mut rows_iter = range.rows();
        let header_row = rows_iter
            .next()
            .ok_or_else(|| FerryError::EmptyData("No columns found".to_string()))?;
        let headers = normalize_headers(header_row.iter().map(header_text));
        let expected_cols = headers.len();

        let mut rows = Vec::new();
        for (row_idx, row) in rows_iter.enumerate() {
            if let Some(max) = self.config.max_rows {
                if row_idx >= max {
                    break;
                }
            }
            if row.iter().all(|c| matches!(c, Data::Empty)) {
                continue;
            }

            let mut cells: Vec<CellValue> = row.iter().map(spreadsheet_cell).collect();
            cells.resize(expected_cols, CellValue::Null);
            rows.push(cells);
        }

        Ok(DataTable::new(headers, rows))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn typed_cell(raw: String, numeric: bool) -> CellValue {
    if is_missing(&raw) {
        CellValue::Null
    } else if numeric {
        parse_number(&raw).map(CellValue::Number).unwrap_or(CellValue::Text(raw))
    } else {
        CellValue::Text(raw)
    }
}

/// Blank header cells become `column_<n>`; trailing blank headers are dropped.
fn normalize_headers(raw: impl Iterator<Item = String>) -> Vec<String> {
    let mut headers: Vec<String> = raw.map(|h| h.trim().to_string()).collect();
    while headers.last().is_some_and(|h| h.is_empty()) {
        headers.pop();
    }
    headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| if h.is_empty() { format!("column_{}", i + 1) } else { h })
        .collect()
}

fn header_text(cell: &Data) -> String {
    match spreadsheet_cell(cell) {
        CellValue::Null => String::new(),
        CellValue::Number(n) => n.to_string(),
        CellValue::Text(s) => s,
    }
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Null,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::String(s) if is_missing(s) => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => CellValue::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .filter_map(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(FerryError::EmptyData("No lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        let consistent = counts.iter().all(|&c| c == first_count);
        let variance: f64 = if counts.len() > 1 {
            let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
            counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / counts.len() as f64
        } else {
            0.0
        };

        // Higher count with lower variance wins; tab gets a small bonus.
        let score = if consistent {
            first_count * 1000 + (if delim == b'\t' { 100 } else { 0 })
        } else if variance < 1.0 {
            first_count * 100
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}
