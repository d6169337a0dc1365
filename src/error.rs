use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Generic wording shared by the 404 and 401 download responses so the
/// body never reveals whether the email or the password was wrong.
pub const NO_DOWNLOAD_MSG: &str = "No download available for these credentials";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid webhook signature")]
    SignatureInvalid,

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Credential mismatch")]
    CredentialMismatch,

    #[error("Download quota exceeded")]
    QuotaExceeded,

    #[error("Signed URL generation failed: {0}")]
    SignedUrlFailed(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::SignatureInvalid => (StatusCode::UNAUTHORIZED, "Invalid signature", None),
            AppError::VerificationFailed(msg) => {
                // Provider error bodies stay in the logs, never in the response.
                tracing::warn!("Verification failed: {}", msg);
                (StatusCode::BAD_REQUEST, "Verification failed", None)
            }
            AppError::NotFound(msg) => {
                tracing::debug!("Not found: {}", msg);
                (StatusCode::NOT_FOUND, NO_DOWNLOAD_MSG, None)
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "Bad request", Some(msg.clone()))
            }
            AppError::CredentialMismatch => (StatusCode::UNAUTHORIZED, NO_DOWNLOAD_MSG, None),
            AppError::QuotaExceeded => (StatusCode::FORBIDDEN, "Maximum downloads exceeded", None),
            AppError::SignedUrlFailed(msg) => {
                tracing::error!("Signed URL error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate download link",
                    None,
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid JSON", Some(e.to_string()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
