use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use service::StorageError;

/// HTTP-facing failure of an entry operation.
#[derive(Debug)]
pub enum ApiError {
    /// The entry name fell outside the `\w+` route shape.
    NotFound,
    /// The backing store could not complete the operation. Detail is
    /// logged here and never exposed to the caller.
    Storage(StorageError),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::Storage(err) => {
                error!(error = %err, "storage backend failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"error": "storage failure"})),
                )
                    .into_response()
            }
        }
    }
}
