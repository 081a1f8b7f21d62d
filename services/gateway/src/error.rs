//! Custom error types for the gateway

use axum::{
    Json,
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::UpstreamError;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, warn};

use crate::models::FieldError;

/// Errors produced by the gateway handlers
///
/// Each variant renders with a stable body shape; none of them carries the
/// session token.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Request body failed schema validation
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Request body exceeds the configured limit
    #[error("Request body too large")]
    PayloadTooLarge,

    /// Upstream rejected the call, relayed verbatim
    #[error("Upstream responded with {status}")]
    Upstream { status: StatusCode, body: Value },

    /// Upstream answered with something that is not JSON
    #[error("Unparsable response from upstream")]
    UnparsableUpstream,

    /// Upstream answered 2xx with a token payload of the wrong shape
    #[error("Invalid token response from upstream: {0}")]
    InvalidTokenResponse(String),

    /// Upstream did not answer within the configured timeout
    #[error("Upstream timeout")]
    UpstreamTimeout,

    /// Upstream logout failed; the session cookie is kept
    #[error("Failed to logout")]
    LogoutFailed,

    /// Any failure while proxying
    #[error("Proxy failure: {0}")]
    Proxy(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,
}

impl From<UpstreamError> for GatewayError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status {
                status,
                message,
                code,
                details,
                body,
            } => {
                warn!(
                    "Upstream rejected call with {}: {} (code: {:?}, fields: {:?})",
                    status,
                    message,
                    code,
                    details.as_ref().map(|d| d.keys().collect::<Vec<_>>())
                );
                GatewayError::Upstream { status, body }
            }
            UpstreamError::Unparsable { .. } => GatewayError::UnparsableUpstream,
            UpstreamError::Timeout => GatewayError::UpstreamTimeout,
            UpstreamError::Transport(e) => {
                error!("Upstream transport error: {}", e);
                GatewayError::InternalServerError
            }
        }
    }
}

impl From<BytesRejection> for GatewayError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            GatewayError::PayloadTooLarge
        } else {
            GatewayError::Validation(vec![FieldError::body(rejection.body_text())])
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            GatewayError::Validation(errors) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "detail": errors }))
            }
            GatewayError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({ "detail": "Request body too large" }),
            ),
            GatewayError::Upstream { status, body } => (status, body),
            GatewayError::UnparsableUpstream => (
                StatusCode::BAD_GATEWAY,
                json!({ "detail": "Unparsable response from upstream" }),
            ),
            GatewayError::InvalidTokenResponse(reason) => {
                error!("Invalid token response from upstream: {}", reason);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "detail": "Invalid token response from upstream" }),
                )
            }
            GatewayError::UpstreamTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                json!({ "detail": "Upstream timeout" }),
            ),
            GatewayError::LogoutFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to logout" }),
            ),
            GatewayError::Proxy(reason) => {
                error!("Proxy error: {}", reason);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error" }),
                )
            }
            GatewayError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "detail": "Internal server error" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for gateway results
pub type GatewayResult<T> = Result<T, GatewayError>;
