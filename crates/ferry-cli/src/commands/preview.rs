//! Preview command - first rows of a table or join.

use ferry::{Ferry, FerryConfig};

use crate::cli::SpecArgs;

pub fn run(
    config: FerryConfig,
    spec: SpecArgs,
    json_output: bool,
    _verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let spec = spec.to_spec()?;
    let ferry = Ferry::connect(config)?;
    let result = ferry.preview(&spec)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        super::print_result(&result);
    }

    Ok(())
}
