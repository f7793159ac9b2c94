//! Flat-file handlers: uploads, file previews, table downloads and record conversion.

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use ferry::{DownloadFormat, FilePreview, IngestOptions, IngestResult, records_to_csv};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::bridge::{run_blocking, stream_body};
use crate::server::error::ApiError;
use crate::server::state::AppState;

/// Rows returned by a file preview when the client does not ask.
const DEFAULT_PREVIEW_ROWS: usize = 100;

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewParams {
    pub rows: Option<usize>,
}

#[derive(Serialize)]
pub struct ConvertResponse {
    pub data: String,
}

/// Fields of a multipart upload.
struct Upload {
    file_name: String,
    bytes: Bytes,
    table_name: Option<String>,
    columns: Option<Vec<String>>,
}

impl Upload {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut file = None;
        let mut table_name = None;
        let mut columns = None;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let file_name = field.file_name().unwrap_or("upload.csv").to_string();
                    file = Some((file_name, field.bytes().await?));
                }
                "table_name" => {
                    let text = field.text().await?;
                    if !text.trim().is_empty() {
                        table_name = Some(text.trim().to_string());
                    }
                }
                "columns" => {
                    let list: Vec<String> = field
                        .text()
                        .await?
                        .split(',')
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty())
                        .collect();
                    if !list.is_empty() {
                        columns = Some(list);
                    }
                }
                _ => {}
            }
        }

        let (file_name, bytes) =
            file.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;

        Ok(Self {
            file_name,
            bytes,
            table_name,
            columns,
        })
    }
}

/// Ingest an uploaded file into a table.
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<IngestResult>, ApiError> {
    let upload = Upload::read(multipart).await?;
    let options = IngestOptions {
        table_name: upload.table_name,
        columns: upload.columns,
    };

    let result = run_blocking(&state, move |ferry| {
        ferry.ingest_bytes(&upload.file_name, &upload.bytes, &options)
    })
    .await?;

    info!(table = %result.table_name, rows = result.rows_inserted, "upload ingested");
    Ok(Json(result))
}

/// Parse an uploaded file and return its first rows without ingesting it.
pub async fn preview_file(
    State(state): State<AppState>,
    Query(params): Query<PreviewParams>,
    multipart: Multipart,
) -> Result<Json<FilePreview>, ApiError> {
    let upload = Upload::read(multipart).await?;
    let rows = params.rows.unwrap_or(DEFAULT_PREVIEW_ROWS);

    let preview = run_blocking(&state, move |ferry| {
        ferry.preview_file(&upload.file_name, &upload.bytes, rows)
    })
    .await?;
    Ok(Json(preview))
}

/// Download a whole table. CSV is streamed page by page; XLSX is buffered.
pub async fn download_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, ApiError> {
    let format: DownloadFormat = match params.format.as_deref() {
        Some(raw) => raw.parse()?,
        None => DownloadFormat::default(),
    };

    let disposition = format!("attachment; filename=\"{}\"", format.file_name(&table));
    let content_type = format.content_type();

    let body = match format {
        DownloadFormat::Csv => {
            stream_body(&state, move |ferry| ferry.download_csv_stream(&table)).await?
        }
        DownloadFormat::Xlsx => {
            let download = run_blocking(&state, move |ferry| ferry.download(&table, format)).await?;
            download.bytes.into()
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Convert JSON records to CSV text.
pub async fn convert_records(
    Json(records): Json<Vec<IndexMap<String, Value>>>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let data = records_to_csv(&records)?;
    Ok(Json(ConvertResponse { data }))
}
