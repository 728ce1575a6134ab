//! Error types for the storefront client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Informal error categories the storefront reacts to differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing form fields, duplicate domain. Recoverable in place.
    Validation,
    /// Missing or expired token, 401. Forces a new login.
    Authentication,
    /// Transport or server failure. Surfaced per call.
    Network,
    /// Payment could not be confirmed. Terminal for the thank-you flow.
    PaymentVerification,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Domain {0} already has a license")]
    DuplicateDomain(String),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Payment verification failed: {0}")]
    PaymentVerification(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::BadRequest(_) | AppError::DuplicateDomain(_) => ErrorKind::Validation,
            AppError::Unauthorized => ErrorKind::Authentication,
            AppError::PaymentVerification(_) => ErrorKind::PaymentVerification,
            AppError::NotFound(_)
            | AppError::Upstream { .. }
            | AppError::Network(_)
            | AppError::Internal(_) => ErrorKind::Network,
        }
    }

    /// Page the customer must be sent to after this error, if any.
    pub fn redirect_target(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::Authentication => Some("/login"),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) | AppError::DuplicateDomain(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PaymentVerification(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::Upstream { .. } | AppError::Network(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        (status, self.to_string()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Map a failed API response to an error.
///
/// `domain` is the domain the request was about, used when the API reports a
/// unique-index violation on license creation.
pub(crate) fn map_upstream_error(status: u16, message: &str, domain: Option<&str>) -> AppError {
    let lower_message = message.to_lowercase();

    match status {
        401 | 403 => AppError::Unauthorized,
        400 if lower_message.contains("duplicate key") => {
            AppError::DuplicateDomain(domain.unwrap_or_default().to_string())
        }
        400 | 422 => AppError::BadRequest(message.to_string()),
        404 => AppError::NotFound(message.to_string()),
        _ => AppError::Upstream {
            status,
            message: message.to_string(),
        },
    }
}
