//! Example: ingest a flat file and export it again, against the in-memory store.
//!
//! Usage:
//!   cargo run --example roundtrip -- <file_path> [table_name]
//!
//! Example:
//!   cargo run --example roundtrip -- sales-2024.csv

use std::env;
use std::path::Path;
use std::sync::Arc;

use ferry::{DownloadFormat, ExportEvent, Ferry, FerryConfig, IngestOptions, MockStore, QuerySpec};

fn main() -> ferry::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: cargo run --example roundtrip -- <file_path> [table_name]");
        eprintln!("\nExample:");
        eprintln!("  cargo run --example roundtrip -- sales-2024.csv");
        std::process::exit(1);
    }

    let file_path = &args[1];
    let path = Path::new(file_path);

    if !path.exists() {
        eprintln!("Error: File not found: {}", file_path);
        std::process::exit(1);
    }

    let separator = "=".repeat(80);
    println!("{}", separator);
    println!("Ferry Roundtrip: {}", file_path);
    println!("{}", separator);
    println!();

    // In-memory store, so the example runs without a ClickHouse server
    let ferry = Ferry::with_store(FerryConfig::default(), Arc::new(MockStore::new()));

    let options = IngestOptions {
        table_name: args.get(2).cloned(),
        columns: None,
    };
    let result = ferry.ingest_file(path, &options)?;

    println!("## Ingest");
    println!("  File: {}", result.source.file);
    println!("  Format: {}", result.source.format.as_str());
    println!("  Table: {}", result.table_name);
    println!("  Rows inserted: {}", result.rows_inserted);
    println!();

    println!("## Schema ({} columns)", result.columns.len());
    println!();
    for column in ferry.describe(&result.table_name)? {
        println!("  {:30} {}", column.name, column.type_name);
    }
    println!();

    println!("## Export");
    println!();
    let spec = QuerySpec::table(result.table_name.clone(), vec!["*".to_string()]);
    let mut rows = 0u64;
    for event in ferry.export(&spec)? {
        match event? {
            ExportEvent::Progress { progress, total } => {
                println!("  progress: {:>3}% of {} rows", progress, total);
            }
            ExportEvent::Row { data } => {
                if rows < 5 {
                    println!("  row: {}", serde_json::Value::Array(data));
                }
                rows += 1;
            }
        }
    }
    println!("  exported {} rows", rows);
    println!();

    if rows > 0 {
        let download = ferry.download(&result.table_name, DownloadFormat::Csv)?;
        println!("## Download");
        println!("  {} ({} bytes)", download.file_name, download.bytes.len());
        println!();
    }

    println!("{}", separator);

    Ok(())
}
