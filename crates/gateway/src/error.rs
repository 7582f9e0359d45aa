//! Mapping from core errors to HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use carimbo_core::Error;
use tracing::{error, warn};

/// Wrapper turning a [`carimbo_core::Error`] into an HTTP response.
///
/// Bodies carry only the display message; internal detail stays in the logs.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Transport { .. } | Error::UpstreamStatus { .. } => StatusCode::BAD_GATEWAY,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Archive { .. } | Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(%status, error = %self.0, "request failed");
        } else {
            warn!(%status, error = %self.0, "request rejected");
        }

        (status, self.0.to_string()).into_response()
    }
}
