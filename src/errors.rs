//! Error taxonomy for the relay handler
//!
//! Every failure is terminal for its request and is rendered as a JSON body with an `error`
//! field (and a `detail` field where one is available). The `Display` text of each variant is
//! exactly the `error` string the widget sees.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::models::ErrorBody;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Anything other than POST or OPTIONS.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The body had no `messages` array.
    #[error("Missing messages[]")]
    MissingMessages,

    /// The server was started without an upstream credential.
    #[error("Missing OPENAI_API_KEY env")]
    MissingApiKey,

    /// The upstream answered, but not with a readable success stream.
    #[error("OpenAI upstream error")]
    Upstream { detail: String },

    /// Catch-all for transport and internal failures.
    #[error("Server error")]
    Server(String),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::MissingMessages => StatusCode::BAD_REQUEST,
            RelayError::MissingApiKey | RelayError::Upstream { .. } | RelayError::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            RelayError::Upstream { detail } | RelayError::Server(detail) => Some(detail),
            _ => None,
        }
    }

    pub fn server(err: impl std::fmt::Display) -> Self {
        RelayError::Server(err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            detail: self.detail().map(str::to_owned),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
