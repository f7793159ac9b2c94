//! Ferry CLI - move tabular data between ClickHouse and flat files.

mod cli;
mod commands;
mod server;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use ferry::FerryConfig;
use tracing_subscriber::EnvFilter;

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = FerryConfig::with_connection(cli.connection.to_config());

    let result = match cli.command {
        Commands::Serve {
            bind,
            listen_port,
            max_upload_mb,
        } => commands::serve::run(config, bind, listen_port, max_upload_mb, cli.verbose),

        Commands::Tables { json } => commands::tables::run(config, json, cli.verbose),

        Commands::Describe { table, json } => {
            commands::describe::run(config, table, json, cli.verbose)
        }

        Commands::Query { sql, json } => commands::query::run(config, sql, json, cli.verbose),

        Commands::Preview { spec, json } => commands::preview::run(config, spec, json, cli.verbose),

        Commands::Export {
            spec,
            output,
            format,
        } => commands::export::run(config, spec, output, format, cli.verbose),

        Commands::Import {
            file,
            table,
            columns,
            batch_size,
        } => commands::import::run(config, file, table, columns, batch_size, cli.verbose),

        Commands::Download {
            table,
            format,
            output,
        } => commands::download::run(config, table, format, output, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` wins unless `--verbose` asks for debug output.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("ferry=debug,ferry_cli=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("ferry=info,ferry_cli=info,tower_http=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
