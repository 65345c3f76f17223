//! Error types for the gateway crate.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use smart_access_core::{CoreError, HttpMethod, LogicalId};

/// Errors raised while building or serving the local gateway.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// The stack model failed assembly.
    #[error("stack model error: {0}")]
    Core(#[from] CoreError),

    /// A function's package entry has no local handler.
    #[error("function '{function}' has no handler for entry '{entry}'")]
    UnknownFunction { function: LogicalId, entry: String },

    /// A route names a function missing from the registry.
    #[error("route function '{0}' is not registered")]
    UnregisteredFunction(LogicalId),

    /// A route uses a method the router cannot mount.
    #[error("unsupported route method: {0}")]
    UnsupportedMethod(HttpMethod),

    /// A CORS origin is not a valid header value.
    #[error("invalid CORS origin: {0}")]
    InvalidOrigin(String),

    /// A path or query parameter could not be decoded.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}
