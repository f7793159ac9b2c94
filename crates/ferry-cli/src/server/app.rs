//! Axum application setup.

use std::net::SocketAddr;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use super::state::AppState;

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    // Any origin may call the API
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let clickhouse_routes = Router::new()
        .route("/query", post(handlers::run_query))
        .route("/query/stream", post(handlers::stream_query))
        .route("/tables", get(handlers::list_tables))
        .route("/schema/:table", get(handlers::table_schema))
        .route("/preview", post(handlers::preview_query))
        .route("/export", post(handlers::export_query));

    let flatfile_routes = Router::new()
        .route("/download/:table", get(handlers::download_table))
        .route("/upload", post(handlers::upload_file))
        .route("/preview", post(handlers::preview_file))
        .route("/convert", post(handlers::convert_records));

    Router::new()
        .route("/", get(handlers::root))
        .nest("/api/clickhouse", clickhouse_routes)
        .nest("/api/flatfile", flatfile_routes)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until Ctrl+C.
pub async fn run_server(state: AppState, addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use ferry::{Ferry, FerryConfig, MockStore};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    const BOUNDARY: &str = "ferry-test-boundary";

    fn test_app() -> (Router, Arc<MockStore>) {
        let store = Arc::new(MockStore::new().with_table(
            "orders",
            &[("id", "Nullable(Float64)"), ("label", "Nullable(String)")],
            (0..5).map(|i| vec![json!(i as f64), json!(format!("item-{}", i))]).collect(),
        ));
        let ferry = Ferry::with_store(FerryConfig::default(), store.clone());
        (create_router(AppState::new(ferry)), store)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn multipart_request(
        uri: &str,
        file_name: &str,
        content: impl AsRef<[u8]>,
        fields: &[(&str, &str)],
    ) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(content.as_ref());
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_root() {
        let (app, _) = test_app();
        let response = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "Data Ingestion Tool API");
    }

    #[tokio::test]
    async fn test_tables_and_schema() {
        let (app, _) = test_app();

        let response = app.clone().oneshot(get_request("/api/clickhouse/tables")).await.unwrap();
        assert_eq!(body_json(response).await, json!({ "tables": ["orders"] }));

        let response = app.oneshot(get_request("/api/clickhouse/schema/orders")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["columns"][1], json!({ "name": "label", "type": "Nullable(String)" }));
    }

    #[tokio::test]
    async fn test_schema_of_missing_table_is_404() {
        let (app, _) = test_app();
        let response = app.oneshot(get_request("/api/clickhouse/schema/ghosts")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "not_found");
    }

    #[tokio::test]
    async fn test_query() {
        let (app, _) = test_app();
        let request = json_request(
            "POST",
            "/api/clickhouse/query",
            json!({ "query": "SELECT label FROM orders LIMIT 2" }),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["data"], json!([["item-0"], ["item-1"]]));
    }

    #[tokio::test]
    async fn test_malformed_query_is_400() {
        let (app, _) = test_app();
        let request = json_request("POST", "/api/clickhouse/query", json!({ "query": "SELEC nonsense" }));
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "malformed_input");
    }

    #[tokio::test]
    async fn test_store_outage_is_500() {
        let (app, store) = test_app();
        store.fail_on("FROM orders");

        let request = json_request(
            "POST",
            "/api/clickhouse/query",
            json!({ "query": "SELECT * FROM orders" }),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "connectivity_failure");
    }

    #[tokio::test]
    async fn test_export_streams_ndjson() {
        let (app, _) = test_app();
        let request = json_request(
            "POST",
            "/api/clickhouse/export",
            json!({ "tables": ["orders"], "columns": ["id"], "join_conditions": [] }),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/x-ndjson"
        );

        let text = body_text(response).await;
        let lines: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 1 + 5 + 1);
        assert_eq!(lines[0], json!({ "type": "progress", "progress": 0, "total": 5 }));
        assert_eq!(lines[1], json!({ "type": "row", "data": [0.0] }));
        assert_eq!(lines[6], json!({ "type": "progress", "progress": 100, "total": 5 }));
    }

    #[tokio::test]
    async fn test_export_of_missing_table_reports_status() {
        let (app, _) = test_app();
        let request = json_request(
            "POST",
            "/api/clickhouse/export",
            json!({ "tables": ["ghosts"], "columns": ["*"], "join_conditions": [] }),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_rejects_unbalanced_join() {
        let (app, store) = test_app();
        let request = json_request(
            "POST",
            "/api/clickhouse/export",
            json!({ "tables": ["orders", "customers"], "columns": ["*"], "join_conditions": [] }),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.statements().is_empty());
    }

    #[tokio::test]
    async fn test_download_csv() {
        let (app, _) = test_app();
        let response = app
            .oneshot(get_request("/api/flatfile/download/orders?format=csv"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"orders.csv\""
        );

        let text = body_text(response).await;
        assert_eq!(text.lines().next(), Some("id,label"));
        assert_eq!(text.lines().count(), 6);
    }

    #[tokio::test]
    async fn test_download_xlsx() {
        let (app, _) = test_app();
        let response = app
            .oneshot(get_request("/api/flatfile/download/orders?format=xlsx"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        // XLSX files are zip archives
        assert_eq!(&bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn test_download_errors() {
        let (app, _) = test_app();

        let response = app
            .clone()
            .oneshot(get_request("/api/flatfile/download/ghosts"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(get_request("/api/flatfile/download/orders?format=parquet"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_ingests_file() {
        let (app, store) = test_app();
        let request = multipart_request(
            "/api/flatfile/upload",
            "cities.csv",
            "city,pop,country\nOslo,709000,NO\nLyon,522000,FR\n",
            &[("table_name", "big cities"), ("columns", "city, pop")],
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["table_name"], "big_cities");
        assert_eq!(body["rows_inserted"], 2);
        assert_eq!(body["columns"], json!(["city", "pop"]));
        assert_eq!(store.rows("big_cities").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upload_xlsx_with_mixed_column_is_500() {
        let (app, store) = test_app();
        let workbook = ferry::export::write_xlsx(
            &["sensor".to_string(), "value".to_string()],
            &[vec![json!("s1"), json!(1.0)], vec![json!("s2"), json!("x")]],
        )
        .unwrap();

        let request = multipart_request("/api/flatfile/upload", "readings.xlsx", workbook, &[]);
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "type_mismatch");
        assert_eq!(store.rows("readings").unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_upload_without_file_is_400() {
        let (app, _) = test_app();
        let body = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"table_name\"\r\n\r\nt\r\n--{}--\r\n",
            BOUNDARY, BOUNDARY
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/flatfile/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_file_preview() {
        let (app, store) = test_app();
        let request = multipart_request(
            "/api/flatfile/preview?rows=1",
            "cities.csv",
            "city,pop\nOslo,709000\nLyon,522000\n",
            &[],
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["columns"], json!(["city", "pop"]));
        assert_eq!(body["total_rows"], 2);
        assert_eq!(body["data"], json!([{ "city": "Oslo", "pop": 709000.0 }]));
        assert!(store.statements().is_empty());
    }

    #[tokio::test]
    async fn test_convert_records() {
        let (app, _) = test_app();
        // Raw text keeps the key order the client sent
        let request = Request::builder()
            .method("POST")
            .uri("/api/flatfile/convert")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"[{"b": 1, "a": "x"}, {"b": 2, "c": true}]"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let csv = body["data"].as_str().unwrap();
        assert_eq!(csv.lines().next(), Some("b,a,c"));
        assert_eq!(csv.lines().count(), 3);
    }
}
