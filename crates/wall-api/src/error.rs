use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use wall_types::api::ErrorResponse;

/// Errors a handler can hand back to the client.
///
/// The `Display` text is exactly what ends up in the `{ "error": ... }` body,
/// so storage details never leak: they are logged where the error is built.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),

    /// Blocklist hit. Deliberately does not say which rule matched.
    #[error("Submission rejected")]
    Blocked,

    #[error("{0}")]
    BadRequest(String),

    #[error("{context}")]
    Storage {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Blocked | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log a storage failure and wrap it with the message the client sees.
    pub fn storage(context: &'static str, source: impl Into<anyhow::Error>) -> Self {
        let source = source.into();
        error!("{}: {:#}", context, source);
        Self::Storage { context, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}
