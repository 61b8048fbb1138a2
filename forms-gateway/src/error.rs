//! Error types for the gateway crate and their HTTP rendering.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use forms_engine::EngineError;
use serde_json::json;

use crate::auth::AuthError;

/// Errors that can occur during gateway request handling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// Missing or invalid credentials. Checked before anything else runs.
    #[error("authentication required: {0}")]
    Unauthenticated(#[from] AuthError),

    /// A lifecycle operation did not succeed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl GatewayError {
    /// HTTP status this error renders as.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Engine(EngineError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Engine(EngineError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Engine(EngineError::Forbidden(_)) => StatusCode::FORBIDDEN,
            Self::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Engine(EngineError::Validation(e)) => {
                json!({"error": self.to_string(), "field": e.field()})
            }
            // Storage details stay in the server log.
            Self::Engine(EngineError::Operation(_)) => json!({"error": "operation failed"}),
            _ => json!({"error": self.to_string()}),
        };
        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
