//! Export command - stream a table or join to NDJSON or CSV.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use colored::Colorize;
use ferry::{CsvChunks, ExportEvent, Ferry, FerryConfig};

use crate::cli::{ExportFormat, SpecArgs};

pub fn run(
    config: FerryConfig,
    spec: SpecArgs,
    output: Option<PathBuf>,
    format: ExportFormat,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let spec = spec.to_spec()?;
    let ferry = Ferry::connect(config)?;
    let stream = ferry.export(&spec)?;

    if verbose {
        eprintln!("Running: {}", stream.query());
    }

    let mut writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let rows = match format {
        ExportFormat::Ndjson => {
            let mut rows = 0u64;
            for event in stream {
                let event = event?;
                match &event {
                    ExportEvent::Progress { progress, total } => {
                        eprint!("\rExporting... {:>3}% of {} rows", progress, total);
                    }
                    ExportEvent::Row { .. } => rows += 1,
                }
                writer.write_all(event.to_ndjson_line()?.as_bytes())?;
            }
            eprintln!();
            rows
        }
        ExportFormat::Csv => {
            let label = spec.tables.join(", ");
            write_chunks(CsvChunks::new(stream, label), &mut writer)?
        }
    };

    writer.flush()?;

    if let Some(path) = output {
        let unit = if format == ExportFormat::Ndjson { "rows" } else { "batches" };
        eprintln!(
            "{} {} {} to {}",
            "Exported".green().bold(),
            rows,
            unit,
            path.display()
        );
    }

    Ok(())
}

/// Write CSV chunks, one per fetched batch, and return how many were written.
fn write_chunks(
    chunks: impl IntoIterator<Item = ferry::Result<Vec<u8>>>,
    writer: &mut dyn Write,
) -> Result<u64, Box<dyn std::error::Error>> {
    let mut written = 0u64;
    for chunk in chunks {
        writer.write_all(&chunk?)?;
        written += 1;
        eprint!("\rExporting... {} batch(es) written", written);
    }
    eprintln!();
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ferry::{MockStore, QuerySpec};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_csv_batch_count_matches_pages() {
        let store = Arc::new(MockStore::new().with_table(
            "orders",
            &[("id", "Nullable(Float64)")],
            vec![vec![json!(1.0)], vec![json!(2.0)], vec![json!(3.0)]],
        ));
        let config = FerryConfig {
            export_batch_size: 2,
            ..FerryConfig::default()
        };
        let ferry = Ferry::with_store(config, store);
        let stream = ferry
            .export(&QuerySpec::table("orders", vec!["id".to_string()]))
            .unwrap();

        let mut out = Vec::new();
        let batches = write_chunks(CsvChunks::new(stream, "orders"), &mut out).unwrap();
        assert_eq!(batches, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "id\n1.0\n2.0\n3.0\n");
    }
}
