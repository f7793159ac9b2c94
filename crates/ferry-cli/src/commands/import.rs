//! Import command - load a CSV/TSV/XLSX file into a table.

use std::path::PathBuf;

use colored::Colorize;
use ferry::{Ferry, FerryConfig, IngestOptions};

pub fn run(
    mut config: FerryConfig,
    file: PathBuf,
    table: Option<String>,
    columns: Option<String>,
    batch_size: Option<usize>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    if let Some(size) = batch_size {
        config.insert_batch_size = size.max(1);
    }

    let options = IngestOptions {
        table_name: table,
        columns: columns.map(|c| {
            c.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        }),
    };

    if verbose {
        println!("Importing {}", file.display());
    }

    let ferry = Ferry::connect(config)?;
    let result = ferry.ingest_file(&file, &options)?;

    println!(
        "{} {} rows into {}",
        "Inserted".green().bold(),
        result.rows_inserted.to_string().white().bold(),
        result.table_name.cyan()
    );
    println!();
    println!("  Source: {} ({})", result.source.file, result.source.format.as_str());
    println!("  Columns: {}", result.columns.join(", "));

    Ok(())
}
