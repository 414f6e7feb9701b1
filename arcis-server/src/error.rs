//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;
use thiserror::Error;

use arcis_core::{ClassifyError, FrameError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    // Auth errors
    #[error("authentication required")]
    Unauthorized,
    #[error("invalid token")]
    TokenInvalid,
    #[error("token has expired")]
    TokenExpired,
    #[error("invalid device API key")]
    InvalidApiKey,
    #[error("insufficient clearance level: required {required}, yours {actual}")]
    InsufficientClearance { required: u8, actual: u8 },

    // Resource errors
    #[error("{message}")]
    NotFound { message: String, code: &'static str },
    #[error("{message}")]
    Conflict { message: String, code: &'static str },

    // Validation errors
    #[error("{message}")]
    BadRequest { message: String, code: &'static str },

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    // Database errors
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    // Generic errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(message: impl Into<String>, code: &'static str) -> Self {
        AppError::NotFound { message: message.into(), code }
    }

    pub fn bad_request(message: impl Into<String>, code: &'static str) -> Self {
        AppError::BadRequest { message: message.into(), code }
    }

    pub fn conflict(message: impl Into<String>, code: &'static str) -> Self {
        AppError::Conflict { message: message.into(), code }
    }

    pub fn detection_not_found() -> Self {
        Self::not_found("Detection not found", "DETECTION_NOT_FOUND")
    }

    pub fn alert_not_found() -> Self {
        Self::not_found("Alert not found", "ALERT_NOT_FOUND")
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized
            | AppError::TokenInvalid
            | AppError::TokenExpired
            | AppError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            AppError::InsufficientClearance { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::BadRequest { .. } | AppError::Frame(_) | AppError::Classify(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show clients; server-side details stay in the logs
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::TokenInvalid => "TOKEN_INVALID",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::InvalidApiKey => "INVALID_API_KEY",
            AppError::InsufficientClearance { .. } => "INSUFFICIENT_CLEARANCE",
            AppError::NotFound { code, .. }
            | AppError::BadRequest { code, .. }
            | AppError::Conflict { code, .. } => *code,
            AppError::Frame(err) => err.code(),
            AppError::Classify(err) => err.code(),
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Database(err) => tracing::error!("Database error: {}", err),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            _ => {}
        }

        let body = Json(json!({
            "error": self.public_message(),
            "code": self.code(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::TokenInvalid,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<&str> = errors.errors().keys().copied().collect();
        fields.sort_unstable();
        AppError::bad_request(
            format!("Invalid fields: {}", fields.join(", ")),
            "VALIDATION_ERROR",
        )
    }
}
