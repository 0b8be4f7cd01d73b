use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::migrate::MigrateError;
use thiserror::Error;
use tracing::error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Sale ledger error: {0}")]
    Sale(#[from] SaleError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        details: serde_json::Value,
    },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Insufficient permissions")]
    PermissionDenied,

    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Errors raised by the sale ledger reconciler
#[derive(Error, Debug)]
pub enum SaleError {
    #[error("Client not found: {0}")]
    ClientNotFound(i64),

    #[error("Sale not found: {0}")]
    SaleNotFound(i64),

    #[error("Field `{0}` cannot be changed after the sale is created")]
    ImmutableField(&'static str),
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn validation(message: impl Into<String>, details: serde_json::Value) -> Self {
        AppError::Validation {
            message: message.into(),
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            AppError::Validation { message, details } => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                message,
                Some(details),
            ),
            AppError::InvalidInput(message) => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT", message, None)
            }
            AppError::Sale(SaleError::ImmutableField(field)) => (
                StatusCode::BAD_REQUEST,
                "IMMUTABLE_FIELD",
                format!("Field `{}` cannot be changed after the sale is created", field),
                Some(serde_json::json!({ "field": field })),
            ),
            AppError::Sale(SaleError::ClientNotFound(_)) => (
                StatusCode::NOT_FOUND,
                "CLIENT_NOT_FOUND",
                "Client not found".to_string(),
                None,
            ),
            AppError::Sale(SaleError::SaleNotFound(_)) => (
                StatusCode::NOT_FOUND,
                "SALE_NOT_FOUND",
                "Sale not found".to_string(),
                None,
            ),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} not found", what),
                None,
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Missing or invalid caller context".to_string(),
                None,
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                "PERMISSION_DENIED",
                "Insufficient permissions".to_string(),
                None,
            ),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "Rate limit exceeded. Please try again later.".to_string(),
                None,
            ),
            internal @ (AppError::Database(_) | AppError::Internal(_) | AppError::Config(_)) => {
                error!("Request failed: {}", internal);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<MigrateError> for AppError {
    fn from(error: MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {:?}", error))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let messages: Vec<String> = errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect::<Vec<String>>()
            .join("; ");

        let details = serde_json::to_value(&errors).unwrap_or(serde_json::Value::Null);
        AppError::validation(format!("Invalid input: {}", message), details)
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
