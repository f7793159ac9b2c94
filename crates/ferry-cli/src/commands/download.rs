//! Download command - save a whole table as CSV or XLSX.

use std::path::PathBuf;

use colored::Colorize;
use ferry::{DownloadFormat, Ferry, FerryConfig};

pub fn run(
    config: FerryConfig,
    table: String,
    format: String,
    output: Option<PathBuf>,
    _verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let format: DownloadFormat = format.parse()?;
    let ferry = Ferry::connect(config)?;
    let download = ferry.download(&table, format)?;

    let path = output.unwrap_or_else(|| PathBuf::from(&download.file_name));
    std::fs::write(&path, &download.bytes)?;

    println!(
        "{} {} ({} bytes) to {}",
        "Saved".green().bold(),
        table.cyan(),
        download.bytes.len(),
        path.display()
    );

    Ok(())
}
