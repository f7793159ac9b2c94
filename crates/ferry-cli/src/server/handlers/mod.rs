//! HTTP request handlers.

mod bridge;
mod clickhouse;
mod flatfile;

pub use clickhouse::*;
pub use flatfile::*;

use axum::Json;
use serde_json::{Value, json};

/// Liveness banner.
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Data Ingestion Tool API" }))
}
