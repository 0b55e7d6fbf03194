//! Relay error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use avatar_chat_core::error::AvatarChatError;

/// JSON error body returned by the relay.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug)]
pub enum RelayError {
    /// 400: the query string is malformed or a required parameter is absent.
    BadRequest(String),
    /// 500: the upstream fetch failed; the payload is the diagnostic detail.
    Upstream(String),
}

impl From<AvatarChatError> for RelayError {
    fn from(err: AvatarChatError) -> Self {
        match err {
            AvatarChatError::MissingParameter(_) => RelayError::BadRequest(err.to_string()),
            AvatarChatError::Network(detail) => RelayError::Upstream(detail),
            other => RelayError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            RelayError::BadRequest(error) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error,
                    details: None,
                },
            ),
            RelayError::Upstream(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Failed to fetch audio file".to_string(),
                    details: Some(details),
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}
