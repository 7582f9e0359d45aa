//! Error types shared by every layer of the gateway

use miette::Diagnostic;
use thiserror::Error;

/// Error type for gateway operations.
///
/// `Clone` is deliberate: a single failed fetch is handed to every waiter of a
/// shared in-flight request, so the error must be duplicable after the fact.
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum Error {
    /// Network-level failure talking to the release store
    #[error("upstream transport error: {message}")]
    #[diagnostic(
        code(carimbo::fetch::transport),
        help("Check network connectivity and the upstream base URL")
    )]
    Transport {
        /// Description of the underlying network failure
        message: String,
    },

    /// The release store responded, but not with success
    #[error("upstream returned HTTP {status} for {url}")]
    #[diagnostic(
        code(carimbo::fetch::upstream_status),
        help("Verify the requested version exists as a published release")
    )]
    UpstreamStatus {
        /// HTTP status code returned by the upstream
        status: u16,
        /// URL that was requested
        url: String,
    },

    /// A zip archive could not be read, or a rewritten one could not be written
    #[error("archive error: {message}")]
    #[diagnostic(code(carimbo::archive::invalid))]
    Archive {
        /// Description of the structural problem
        message: String,
    },

    /// An expected named entry was missing from an otherwise-valid archive
    #[error("not found: {what}")]
    #[diagnostic(code(carimbo::fetch::not_found))]
    NotFound {
        /// What was looked for and not found
        what: String,
    },

    /// The request itself was malformed (bad coordinates, unknown preset)
    #[error("invalid request: {message}")]
    #[diagnostic(code(carimbo::gateway::invalid_request))]
    InvalidRequest {
        /// Description of what was wrong with the request
        message: String,
    },

    /// A failure inside the gateway itself
    #[error("internal error: {message}")]
    #[diagnostic(code(carimbo::internal))]
    Internal {
        /// Description of the internal failure
        message: String,
    },
}

impl Error {
    /// Create a transport error
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an upstream status error
    #[must_use]
    pub fn upstream_status(status: u16, url: impl Into<String>) -> Self {
        Self::UpstreamStatus {
            status,
            url: url.into(),
        }
    }

    /// Create an archive error
    #[must_use]
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive {
            message: message.into(),
        }
    }

    /// Create a not-found error
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create an invalid-request error
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create an internal error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this is an upstream 404, i.e. the artifact does not exist at
    /// the URL that was tried (used to decide fallback URLs, not to retry).
    #[must_use]
    pub fn is_upstream_not_found(&self) -> bool {
        matches!(self, Self::UpstreamStatus { status: 404, .. })
    }
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_404_is_recognized() {
        assert!(Error::upstream_status(404, "https://example.com/x").is_upstream_not_found());
        assert!(!Error::upstream_status(500, "https://example.com/x").is_upstream_not_found());
        assert!(!Error::not_found("carimbo.js").is_upstream_not_found());
    }

    #[test]
    fn display_messages_carry_context() {
        let err = Error::upstream_status(503, "https://github.com/a/b");
        assert_eq!(
            err.to_string(),
            "upstream returned HTTP 503 for https://github.com/a/b"
        );
    }
}
