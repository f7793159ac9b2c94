//! ClickHouse-side handlers: queries, schema, previews and streamed exports.

use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use ferry::{ColumnInfo, ExportStream, QueryResult, QuerySpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::bridge::{run_blocking, stream_body};
use crate::server::error::ApiError;
use crate::server::state::AppState;

const NDJSON: &str = "application/x-ndjson";

/// Body of the raw query endpoints.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// A buffered result.
#[derive(Serialize)]
pub struct QueryResponse {
    pub data: Vec<Vec<Value>>,
    pub columns: Vec<ColumnInfo>,
    pub count: usize,
}

impl From<QueryResult> for QueryResponse {
    fn from(result: QueryResult) -> Self {
        Self {
            count: result.row_count(),
            data: result.rows,
            columns: result.columns,
        }
    }
}

#[derive(Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

#[derive(Serialize)]
pub struct SchemaResponse {
    pub columns: Vec<ColumnInfo>,
}

/// Run a query and return the whole result.
pub async fn run_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let result = run_blocking(&state, move |ferry| ferry.query(&request.query)).await?;
    Ok(Json(result.into()))
}

/// Run a query and stream the result as NDJSON progress and row events.
pub async fn stream_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Response, ApiError> {
    let body = stream_body(&state, move |ferry| {
        ferry.stream_query(&request.query).map(ndjson_chunks)
    })
    .await?;
    Ok(([(header::CONTENT_TYPE, NDJSON)], body).into_response())
}

pub async fn list_tables(State(state): State<AppState>) -> Result<Json<TablesResponse>, ApiError> {
    let tables = run_blocking(&state, |ferry| ferry.tables()).await?;
    Ok(Json(TablesResponse { tables }))
}

pub async fn table_schema(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Json<SchemaResponse>, ApiError> {
    let columns = run_blocking(&state, move |ferry| ferry.describe(&table)).await?;
    Ok(Json(SchemaResponse { columns }))
}

/// First rows of a table or join.
pub async fn preview_query(
    State(state): State<AppState>,
    Json(spec): Json<QuerySpec>,
) -> Result<Json<QueryResponse>, ApiError> {
    let result = run_blocking(&state, move |ferry| ferry.preview(&spec)).await?;
    Ok(Json(result.into()))
}

/// Stream a table or join as NDJSON.
pub async fn export_query(
    State(state): State<AppState>,
    Json(spec): Json<QuerySpec>,
) -> Result<Response, ApiError> {
    let body = stream_body(&state, move |ferry| ferry.export(&spec).map(ndjson_chunks)).await?;
    Ok(([(header::CONTENT_TYPE, NDJSON)], body).into_response())
}

fn ndjson_chunks(stream: ExportStream) -> impl Iterator<Item = ferry::Result<Vec<u8>>> {
    stream.map(|event| event.and_then(|e| e.to_ndjson_line()).map(String::into_bytes))
}
