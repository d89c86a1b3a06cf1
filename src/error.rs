use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors produced while turning a descriptor plus arguments into a request.
///
/// Everything except `MalformedDescriptor` is a caller-input error. A malformed
/// descriptor is a defect in the catalog source and is logged at error level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Missing account context: header '{0}' is required but no account id was supplied")]
    MissingAccountContext(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Malformed descriptor '{action}': {reason}")]
    MalformedDescriptor { action: String, reason: String },
}

impl DispatchError {
    pub(crate) fn malformed(action: &str, reason: impl Into<String>) -> Self {
        DispatchError::MalformedDescriptor {
            action: action.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        DispatchError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the caller rather than the catalog.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, DispatchError::MalformedDescriptor { .. })
    }
}

/// Errors raised while loading or validating a catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Malformed descriptor '{action}': {reason}")]
    Malformed { action: String, reason: String },

    #[error("Duplicate action name: {0}")]
    DuplicateName(String),

    #[error("Invalid filter pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl CatalogError {
    pub(crate) fn malformed(action: &str, reason: impl Into<String>) -> Self {
        CatalogError::Malformed {
            action: action.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum AppError {
    #[error(transparent)]
    DispatchError(#[from] DispatchError),

    #[error(transparent)]
    CatalogError(#[from] CatalogError),

    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("Service temporarily unavailable: {0}")]
    ResourceError(String),

    #[error("Transport failed: {0}")]
    TransportError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::DispatchError(DispatchError::UnknownAction(name)) => {
                tracing::warn!(action = %name, "Unknown action");
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::DispatchError(e) if e.is_caller_error() => {
                tracing::warn!(error = %e, "Dispatch validation error");
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::DispatchError(e) => {
                tracing::error!(error = %e, "Malformed action descriptor");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::CatalogError(e) => {
                tracing::error!(error = %e, "Catalog error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::ValidationError(msg) => {
                tracing::warn!(error = %msg, "Validation error");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::ResourceError(msg) => {
                tracing::warn!(error = %msg, "Resource error");
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            AppError::TransportError(msg) => {
                tracing::error!(error = %msg, "Transport error");
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
