//! Error handling module for the Quarry backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and the
//! structured error body API clients branch on via `error_name`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error names as constants to avoid stringly-typed errors.
pub mod names {
    pub const BAD_PARAMETER: &str = "bad_parameter";
    pub const NOT_FOUND: &str = "not_found";
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const DATABASE_ERROR: &str = "database_error";
    pub const NETWORK_ERROR: &str = "network_error";
    pub const ARCHIVE_ERROR: &str = "archive_error";
    pub const DATA_INTEGRITY: &str = "data_integrity";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Malformed or missing request parameter
    BadParameter(String),
    /// Resource not found
    NotFound(String),
    /// Database error
    Database(String),
    /// Archive download or metadata check failed
    Network(String),
    /// Archive extraction or dump parse failed
    Archive(String),
    /// Dump contents reference data that does not exist
    DataIntegrity(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadParameter(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
            AppError::Archive(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DataIntegrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the stable error name for this error.
    pub fn error_name(&self) -> &'static str {
        match self {
            AppError::BadParameter(_) => names::BAD_PARAMETER,
            AppError::NotFound(_) => names::NOT_FOUND,
            AppError::Database(_) => names::DATABASE_ERROR,
            AppError::Network(_) => names::NETWORK_ERROR,
            AppError::Archive(_) => names::ARCHIVE_ERROR,
            AppError::DataIntegrity(_) => names::DATA_INTEGRITY,
            AppError::Internal(_) => names::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        match self {
            AppError::BadParameter(msg)
            | AppError::NotFound(msg)
            | AppError::Database(msg)
            | AppError::Network(msg)
            | AppError::Archive(msg)
            | AppError::DataIntegrity(msg)
            | AppError::Internal(msg) => msg,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_name(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Network error: {:?}", err);
        AppError::Network(format!("Network error: {}", err))
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        tracing::error!("Archive error: {:?}", err);
        AppError::Archive(format!("Archive error: {}", err))
    }
}

impl From<quick_xml::Error> for AppError {
    fn from(err: quick_xml::Error) -> Self {
        tracing::error!("Dump parse error: {:?}", err);
        AppError::Archive(format!("Dump parse error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O error: {:?}", err);
        AppError::Archive(format!("I/O error: {}", err))
    }
}

/// Error response body, mirroring the public Stack Exchange API shape.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error_id: u16,
    pub error_name: String,
    pub error_message: String,
}

impl ErrorBody {
    pub fn new(error: &AppError) -> Self {
        Self {
            error_id: error.status_code().as_u16(),
            error_name: error.error_name().to_string(),
            error_message: error.message().to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody::new(&self);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_parameter_maps_to_400() {
        let err = AppError::BadParameter("Invalid date: fromdate".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_name(), "bad_parameter");
    }

    #[test]
    fn error_body_carries_status_and_name() {
        let err = AppError::NotFound("no such site".to_string());
        let body = ErrorBody::new(&err);
        assert_eq!(body.error_id, 404);
        assert_eq!(body.error_name, "not_found");
        assert_eq!(body.error_message, "no such site");
    }
}
