//! Describe command - show a table's columns and types.

use colored::Colorize;
use ferry::{Ferry, FerryConfig};

pub fn run(
    config: FerryConfig,
    table: String,
    json_output: bool,
    _verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ferry = Ferry::connect(config)?;
    let columns = ferry.describe(&table)?;

    if json_output {
        let body = serde_json::json!({ "columns": columns });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("{} {}", "Columns of".cyan().bold(), table.white());
    println!();

    let width = columns.iter().map(|c| c.name.chars().count()).max().unwrap_or(0);
    for column in &columns {
        println!("  {:<width$}  {}", column.name, column.type_name.dimmed(), width = width);
    }

    Ok(())
}
