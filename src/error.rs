use crate::backend::{BlobError, IdentityError, StoreError};
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::export::ExportError;
use crate::workflows::licenses::LicenseImportError;
use crate::workflows::DashboardError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Dashboard(DashboardError),
    Export(ExportError),
    Import(LicenseImportError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Dashboard(DashboardError::Validation(err)) => write!(f, "{}", err),
            AppError::Dashboard(err) => write!(f, "backend error: {}", err),
            AppError::Export(err) => write!(f, "export error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Dashboard(err) => Some(err),
            AppError::Export(err) => Some(err),
            AppError::Import(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Dashboard(DashboardError::Validation(_)) | AppError::Import(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Dashboard(DashboardError::Store(StoreError::NotFound { .. })) => {
                StatusCode::NOT_FOUND
            }
            AppError::Dashboard(DashboardError::Store(StoreError::PermissionDenied(_))) => {
                StatusCode::FORBIDDEN
            }
            AppError::Dashboard(DashboardError::Identity(
                IdentityError::InvalidCredentials | IdentityError::UnknownAccount(_),
            )) => StatusCode::UNAUTHORIZED,
            AppError::Dashboard(DashboardError::Identity(
                IdentityError::EmailInUse(_) | IdentityError::WeakPassword(_),
            )) => StatusCode::BAD_REQUEST,
            AppError::Dashboard(DashboardError::Blob(BlobError::NotFound(_))) => {
                StatusCode::NOT_FOUND
            }
            AppError::Dashboard(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<DashboardError> for AppError {
    fn from(value: DashboardError) -> Self {
        Self::Dashboard(value)
    }
}

impl From<ExportError> for AppError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<LicenseImportError> for AppError {
    fn from(value: LicenseImportError) -> Self {
        Self::Import(value)
    }
}
