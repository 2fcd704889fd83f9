use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::errors::AppError;

// The IntoResponse implementation converts AppError into a well-formed HTTP
// response: a status code plus a JSON body carrying a human-readable message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            // Malformed input is the caller's problem
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,

            // Duplicate keys and failed availability guards both mean the
            // request lost against current state
            AppError::Conflict(_) | AppError::Insufficient { .. } => StatusCode::CONFLICT,

            AppError::NotFound(_) => StatusCode::NOT_FOUND,

            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,

            // Store and hashing failures are internal server errors
            AppError::Store(_) | AppError::Credential(_) | AppError::TornState(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self);
        }

        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
