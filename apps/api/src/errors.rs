#![allow(dead_code)]

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::Envelope;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, ApiError>`.
///
/// LLM/generation failures never appear here: the assistant absorbs them and
/// substitutes deterministic local content instead (see `assistant`).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    /// Name-uniqueness violation. Carries an alternative the client can
    /// resubmit with (`_2` inserted before the file extension).
    #[error("{message}")]
    Conflict {
        message: String,
        suggested_name: String,
    },

    /// Export preconditions unmet; the client must finish the checklist first.
    #[error("{0}")]
    ExportNotReady(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, suggested_name) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Conflict {
                message,
                suggested_name,
            } => (StatusCode::CONFLICT, message, Some(suggested_name)),
            ApiError::ExportNotReady(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(Envelope::failure(message, suggested_name));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = ApiError::NotFound("Run not found.".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let response = ApiError::Conflict {
            message: "A run with that name already exists.".to_string(),
            suggested_name: "a_2.pdf".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_export_not_ready_maps_to_400() {
        let response = ApiError::ExportNotReady("Complete all deliverables first.".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
