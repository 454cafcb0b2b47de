//! API error handling
//!
//! Every failure leaves the service as `{ "error": "<message>" }` with a
//! status that reflects where it came from: the caller (400), our own
//! configuration (500), or the last provider tried (its own status).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use raidclaim_vision::{GatewayError, ProviderId};

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    // =========================================================================
    // Request Errors
    // =========================================================================
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Invalid JSON body")]
    InvalidJsonBody,

    #[error("Missing image data")]
    MissingImage,

    #[error("Invalid image data")]
    InvalidImage,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Request timed out")]
    RequestTimeout,

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Missing {0} API key")]
    MissingCredential(ProviderId),

    // =========================================================================
    // Provider Errors
    // =========================================================================
    /// Last provider in the chain failed; `status` is the one it returned
    #[error("{message}")]
    Upstream { status: u16, message: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,

            Self::InvalidJsonBody | Self::MissingImage | Self::InvalidImage => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RequestTimeout => StatusCode::REQUEST_TIMEOUT,

            Self::MissingCredential(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // A failed call can carry a 2xx (unparsable body) or our own
            // transport marker; only real error statuses are mirrored.
            Self::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
        }
    }
}

/// API error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::MissingImage => Self::MissingImage,
            GatewayError::MissingCredential(provider) => Self::MissingCredential(provider),
            GatewayError::Provider { status, message, .. } => Self::Upstream { status, message },
            GatewayError::Vision(e) => Self::Internal(e.to_string()),
        }
    }
}
