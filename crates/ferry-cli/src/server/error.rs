//! API error types and handling.

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ferry::{ErrorKind, FerryError};
use serde::Serialize;
use tracing::error;

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from client.
    BadRequest(String),
    /// Internal server error.
    Internal(String),
    /// Error from the ferry library, classified by its kind.
    Ferry(FerryError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Ferry(e) => match e.kind() {
                ErrorKind::MalformedInput => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Connectivity | ErrorKind::TypeMismatch | ErrorKind::Internal => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message) = match self {
            ApiError::BadRequest(msg) => ("malformed_input", msg),
            ApiError::Internal(msg) => ("internal", msg),
            ApiError::Ferry(e) => (e.kind().as_str(), e.to_string()),
        };

        if status.is_server_error() {
            error!(kind = error, %message, "request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

impl From<FerryError> for ApiError {
    fn from(err: FerryError) -> Self {
        ApiError::Ferry(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("Worker task failed: {}", err))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Ferry(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_error_kind() {
        let not_found = ApiError::from(FerryError::NotFound("t".into()));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let bad = ApiError::from(FerryError::InvalidQuery("x".into()));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let down = ApiError::from(FerryError::Connection("refused".into()));
        assert_eq!(down.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let mismatch = ApiError::from(FerryError::TypeMismatch("Code: 27".into()));
        assert_eq!(mismatch.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
