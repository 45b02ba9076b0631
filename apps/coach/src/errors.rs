use axum::{
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::coaching::session::SessionError;
use crate::coaching::settings::SettingsError;
use crate::extraction::ExtractionError;
use crate::guard::GuardError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Invalid request body: {0}")]
    JsonBody(#[from] JsonRejection),

    #[error("Invalid path: {0}")]
    Path(#[from] PathRejection),

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Blocked(#[from] GuardError),

    #[error("LLM error: {0}")]
    Llm(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Multipart(e) => (e.status(), "INVALID_UPLOAD", e.body_text()),
            AppError::JsonBody(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.body_text()),
            AppError::Path(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.body_text()),
            AppError::Settings(e) => (StatusCode::BAD_REQUEST, "INVALID_SETTINGS", e.to_string()),
            AppError::Extraction(e) => {
                tracing::warn!("Extraction error: {e}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "EXTRACTION_FAILED",
                    e.to_string(),
                )
            }
            AppError::Blocked(e) => {
                tracing::warn!("Blocked input: {e:?}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "BLOCKED_CONTENT",
                    e.to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    format!("API error: {msg}"),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::EmptyMessage => {
                AppError::Validation(SessionError::EmptyMessage.to_string())
            }
            SessionError::Settings(e) => AppError::Settings(e),
            SessionError::Extraction(e) => AppError::Extraction(e),
            SessionError::Blocked(e) => AppError::Blocked(e),
            SessionError::Llm(e) => AppError::Llm(e.to_string()),
        }
    }
}
