//! File serialization for downloads: CSV and XLSX.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use rust_xlsxwriter::Workbook;
use serde_json::Value;

use crate::error::{FerryError, Result};

use crate::store::RowStream;

use super::events::ExportEvent;
use super::exporter::ExportStream;

/// Download file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DownloadFormat {
    #[default]
    Csv,
    Xlsx,
}

impl DownloadFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DownloadFormat::Csv => "csv",
            DownloadFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            DownloadFormat::Csv => "text/csv",
            DownloadFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    /// `<table>.<extension>`
    pub fn file_name(&self, table: &str) -> String {
        format!("{}.{}", table, self.extension())
    }
}

impl fmt::Display for DownloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for DownloadFormat {
    type Err = FerryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(DownloadFormat::Csv),
            "xlsx" => Ok(DownloadFormat::Xlsx),
            other => Err(FerryError::UnsupportedFormat(format!(
                "'{}' (expected csv or xlsx)",
                other
            ))),
        }
    }
}

/// Text form of a cell for CSV output. Null is the empty field.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn write_csv_rows<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    rows: impl IntoIterator<Item = Vec<Value>>,
) -> Result<()> {
    for row in rows {
        writer.write_record(row.iter().map(cell_text))?;
    }
    Ok(())
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| FerryError::Csv(e.into_error().into()))
}

/// Serialize a header and rows as CSV.
pub fn write_csv(columns: &[String], rows: &[Vec<Value>]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns)?;
    write_csv_rows(&mut writer, rows.iter().cloned())?;
    finish_csv(writer)
}

/// Serialize a header and rows as a single-sheet XLSX workbook.
pub fn write_xlsx(columns: &[String], rows: &[Vec<Value>]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in columns.iter().enumerate() {
        sheet.write_string(0, xlsx_col(col)?, name)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = u32::try_from(i + 1)
            .map_err(|_| FerryError::UnsupportedFormat("too many rows for XLSX".to_string()))?;
        for (col, value) in row.iter().enumerate() {
            let c = xlsx_col(col)?;
            match value {
                Value::Null => {}
                Value::Bool(b) => {
                    sheet.write_boolean(r, c, *b)?;
                }
                Value::Number(n) => match n.as_f64() {
                    Some(f) => {
                        sheet.write_number(r, c, f)?;
                    }
                    None => {
                        sheet.write_string(r, c, n.to_string())?;
                    }
                },
                Value::String(s) => {
                    sheet.write_string(r, c, s)?;
                }
                other => {
                    sheet.write_string(r, c, other.to_string())?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn xlsx_col(col: usize) -> Result<u16> {
    u16::try_from(col)
        .map_err(|_| FerryError::UnsupportedFormat("too many columns for XLSX".to_string()))
}

/// Convert JSON records to CSV text.
///
/// The header is the union of record keys in first-seen order; keys missing
/// from a record become empty fields.
pub fn records_to_csv(records: &[IndexMap<String, Value>]) -> Result<String> {
    let mut headers: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !headers.contains(&key.as_str()) {
                headers.push(key);
            }
        }
    }

    if headers.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&headers)?;
    for record in records {
        writer.write_record(
            headers
                .iter()
                .map(|h| record.get(*h).map(cell_text).unwrap_or_default()),
        )?;
    }

    let bytes = finish_csv(writer)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// CSV chunks produced from an export, one per fetched page.
///
/// The first chunk starts with the header row. An export with no rows fails
/// with [`FerryError::NotFound`].
pub struct CsvChunks {
    stream: ExportStream,
    header_written: bool,
    rows: Vec<Vec<Value>>,
    label: String,
    done: bool,
}

impl CsvChunks {
    /// `label` names the source in the "no data" error.
    pub fn new(stream: ExportStream, label: impl Into<String>) -> Self {
        Self {
            stream,
            header_written: false,
            rows: Vec::new(),
            label: label.into(),
            done: false,
        }
    }

    fn flush(&mut self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if !self.header_written {
            let header: Vec<&str> = self.stream.columns().iter().map(|c| c.name.as_str()).collect();
            writer.write_record(&header)?;
            self.header_written = true;
        }
        write_csv_rows(&mut writer, self.rows.drain(..))?;
        finish_csv(writer)
    }

    fn fail(&mut self, e: FerryError) -> Option<Result<Vec<u8>>> {
        self.done = true;
        Some(Err(e))
    }
}

impl Iterator for CsvChunks {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            match self.stream.next() {
                Some(Ok(ExportEvent::Row { data })) => self.rows.push(data),
                Some(Ok(ExportEvent::Progress { total: 0, .. })) => {
                    let label = self.label.clone();
                    return self.fail(FerryError::NotFound(format!(
                        "No data found in table '{}'",
                        label
                    )));
                }
                Some(Ok(ExportEvent::Progress { .. })) if self.rows.is_empty() => {}
                Some(Ok(ExportEvent::Progress { .. })) => return Some(self.flush()),
                Some(Err(e)) => return self.fail(e),
                None => {
                    self.done = true;
                    if self.rows.is_empty() {
                        return None;
                    }
                    return Some(self.flush());
                }
            }
        }
    }
}

/// CSV chunks of one streamed query, `chunk_rows` rows each.
///
/// The first chunk starts with the header row. A result with no rows fails
/// with [`FerryError::NotFound`].
pub struct CsvRowChunks {
    rows: RowStream,
    chunk_rows: usize,
    header_written: bool,
    label: String,
    done: bool,
}

impl CsvRowChunks {
    pub fn new(rows: RowStream, label: impl Into<String>, chunk_rows: usize) -> Self {
        Self {
            rows,
            chunk_rows: chunk_rows.max(1),
            header_written: false,
            label: label.into(),
            done: false,
        }
    }
}

impl Iterator for CsvRowChunks {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut batch = Vec::with_capacity(self.chunk_rows);
        while batch.len() < self.chunk_rows {
            match self.rows.next() {
                Some(Ok(row)) => batch.push(row),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        if batch.is_empty() {
            if self.header_written {
                return None;
            }
            self.done = true;
            return Some(Err(FerryError::NotFound(format!(
                "No data found in table '{}'",
                self.label
            ))));
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        if !self.header_written {
            let header: Vec<&str> = self.rows.columns().iter().map(|c| c.name.as_str()).collect();
            if let Err(e) = writer.write_record(&header) {
                self.done = true;
                return Some(Err(e.into()));
            }
            self.header_written = true;
        }
        let chunk = write_csv_rows(&mut writer, batch.into_iter()).and_then(|_| finish_csv(writer));
        if chunk.is_err() {
            self.done = true;
        }
        Some(chunk)
    }
}
