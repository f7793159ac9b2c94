//! CLI command implementations.

pub mod describe;
pub mod download;
pub mod export;
pub mod import;
pub mod preview;
pub mod query;
pub mod serve;
pub mod tables;

use colored::Colorize;
use ferry::QueryResult;
use serde_json::Value;

/// Widest cell printed before truncation.
const MAX_CELL_WIDTH: usize = 32;

/// Render a buffered result as an aligned text table.
pub(crate) fn print_result(result: &QueryResult) {
    let headers = result.column_names();
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(display_cell).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", h, w = *w))
        .collect();
    println!("{}", header_line.join("  ").bold());

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect();
        println!("{}", line.join("  "));
    }

    println!();
    println!("{} row(s)", result.row_count().to_string().white().bold());
}

fn display_cell(value: &Value) -> String {
    let text = match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if text.chars().count() > MAX_CELL_WIDTH {
        let cut: String = text.chars().take(MAX_CELL_WIDTH - 1).collect();
        format!("{}…", cut)
    } else {
        text
    }
}
