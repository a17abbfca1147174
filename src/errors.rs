use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::fmt;

use crate::config::MissingEnv;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Anything other than POST or OPTIONS.
    MethodNotAllowed,
    /// Required Airtable configuration is absent.
    EnvMissing(MissingEnv),
    /// Airtable answered with a non-success status.
    Airtable {
        /// Upstream HTTP status.
        status: u16,
        /// Upstream body, echoed for diagnosis.
        details: Value,
    },
    /// Unexpected local or transport failure.
    Internal(String),
}

impl AppError {
    /// Stable error code returned in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            AppError::EnvMissing(_) => "ENV_MISSING",
            AppError::Airtable { .. } => "AIRTABLE_ERROR",
            AppError::Internal(_) => "SERVER_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::EnvMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Airtable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body sent to the caller. Internal details never leave the process.
    pub fn body(&self) -> Value {
        match self {
            AppError::EnvMissing(missing) => json!({
                "ok": false,
                "error": self.code(),
                "missing": missing,
            }),
            AppError::Airtable { status, details } => json!({
                "ok": false,
                "error": self.code(),
                "status": status,
                "details": details,
            }),
            AppError::MethodNotAllowed | AppError::Internal(_) => json!({
                "ok": false,
                "error": self.code(),
            }),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MethodNotAllowed => write!(f, "Method not allowed"),
            AppError::EnvMissing(missing) => write!(f, "Missing configuration: {:?}", missing),
            AppError::Airtable { status, details } => {
                write!(f, "Airtable returned {}: {}", status, details)
            }
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Logs errors appropriately based on their severity.
    fn into_response(self) -> Response {
        match &self {
            AppError::MethodNotAllowed => tracing::debug!("Rejected request method"),
            AppError::EnvMissing(missing) => {
                tracing::error!("Lead rejected, configuration missing: {:?}", missing)
            }
            AppError::Airtable { status, details } => {
                tracing::error!("Airtable error {}: {}", status, details)
            }
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
        }

        (self.status_code(), Json(self.body())).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Internal(format!("Airtable request failed: {}", err))
    }
}
