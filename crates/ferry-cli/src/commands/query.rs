//! Query command - run SQL and print the buffered result.

use ferry::{Ferry, FerryConfig};

pub fn run(
    config: FerryConfig,
    sql: String,
    json_output: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ferry = Ferry::connect(config)?;
    if verbose {
        eprintln!("Running: {}", sql);
    }

    let result = ferry.query(&sql)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        super::print_result(&result);
    }

    Ok(())
}
