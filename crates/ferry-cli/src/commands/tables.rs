//! Tables command - list tables in the configured database.

use colored::Colorize;
use ferry::{Ferry, FerryConfig};

pub fn run(config: FerryConfig, json_output: bool, _verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let database = config.connection.database.clone();
    let ferry = Ferry::connect(config)?;
    let tables = ferry.tables()?;

    if json_output {
        let body = serde_json::json!({ "tables": tables });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("{} {}", "Tables in".cyan().bold(), database.white());
    println!();
    if tables.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for table in &tables {
        println!("  {}", table);
    }

    Ok(())
}
