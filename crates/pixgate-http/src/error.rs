//! Errors raised while serving a request.

use http::StatusCode;

/// Failure of an [`ImageHandler`](crate::ImageHandler) or of request decoding.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The handler does not serve this request.
    #[error("Not implemented: {method} {path}")]
    NotImplemented {
        /// Request method.
        method: http::Method,
        /// Request path.
        path: String,
    },

    /// The request cannot be served as sent.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl HttpError {
    /// Status code sent to the client.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}
