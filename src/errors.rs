use crate::services::media_service::{DeliveryError, UploadError};
use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// HTTP-facing error: a status and a short client-safe message.
///
/// Internal detail (paths, SQL errors) is logged where the error is
/// converted and never copied into `message`.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub headers: HeaderMap,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// 416 with the `Content-Range: bytes */{size}` header clients use to
    /// learn the resource length.
    pub fn range_not_satisfiable(size: u64) -> Self {
        let mut err = Self::new(StatusCode::RANGE_NOT_SATISFIABLE, "Range not satisfiable");
        if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", size)) {
            err.headers.insert(header::CONTENT_RANGE, value);
        }
        err
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, self.headers, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("unhandled error: {:#}", err);
        AppError::internal("Internal server error")
    }
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::NotFound => AppError::not_found("File not found"),
            DeliveryError::RangeNotSatisfiable { size } => AppError::range_not_satisfiable(size),
            DeliveryError::Storage(err) => {
                tracing::error!("storage failure during delivery: {}", err);
                AppError::internal("Internal server error")
            }
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::UnsupportedType => {
                AppError::new(StatusCode::BAD_REQUEST, "File type not allowed")
            }
            UploadError::TooLarge { limit } => AppError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("File exceeds {} bytes", limit),
            ),
            UploadError::Storage(err) => {
                tracing::error!("storage failure during upload: {}", err);
                AppError::internal("Internal server error")
            }
        }
    }
}
