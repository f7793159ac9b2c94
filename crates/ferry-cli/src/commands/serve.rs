//! Serve command - run the HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;

use colored::Colorize;
use ferry::{ClickHouseStore, Ferry, FerryConfig, Store};
use tracing::warn;

use crate::server::{AppState, run_server};

pub fn run(
    config: FerryConfig,
    bind: String,
    port: u16,
    max_upload_mb: usize,
    _verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;

    // The server starts even when ClickHouse is down; requests report the failure.
    let store = ClickHouseStore::new(config.connection.clone())?;
    if let Err(e) = store.ping() {
        warn!(error = %e, url = %config.connection.url(), "ClickHouse is not reachable");
    }

    let clickhouse_url = config.connection.url();
    let ferry = Ferry::with_store(config, Arc::new(store));
    let state = AppState::new(ferry).with_max_upload_bytes(max_upload_mb.saturating_mul(1024 * 1024));

    println!();
    println!("{}", "Ferry API server".cyan().bold());
    println!();
    println!("  Listening: http://{}", addr);
    println!("  ClickHouse: {}", clickhouse_url);
    println!();
    println!("Press {} to stop the server", "Ctrl+C".yellow().bold());
    println!();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_server(state, addr))?;

    println!("{}", "Server stopped".yellow());
    Ok(())
}
