//! Error types for qualtrics-client
//!
//! Every failure a call can produce is captured as an [`Error`] value and
//! returned to the caller. The variants follow the failure taxonomy of the
//! remote API:
//! - transport failures (`Network`)
//! - non-2xx HTTP statuses (`Http`, `Forbidden`)
//! - envelope violations (`Protocol`)
//! - server-reported domain failures (`Application`)
//! - broken export artifacts (`Format`)

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for qualtrics-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for qualtrics-client
///
/// The `Display` output of each variant is the human-readable message the
/// session stores as its last error, so it is kept free of prefixes for the
/// variants whose text comes straight from the server.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure (DNS, refused connection, TLS, timeout, redirect loop)
    #[error("{0}")]
    Network(String),

    /// Non-2xx HTTP status
    #[error("{message}")]
    Http {
        /// Numeric HTTP status code
        code: u16,
        /// Server-supplied error text, or a message embedding the code
        message: String,
    },

    /// HTTP 403 with no server message to report
    ///
    /// The legacy dialect always answers a 403 this way without reading the
    /// body. The export API does so only when the body carries no
    /// `meta.error.errorMessage`.
    #[error("API Error: HTTP Code 403 (Forbidden)")]
    Forbidden,

    /// Response body violates the envelope the dialect guarantees
    #[error("{0}")]
    Protocol(String),

    /// Server understood the request and reported a domain failure (verbatim text)
    #[error("{0}")]
    Application(String),

    /// Downloaded artifact failed structural validation
    #[error("{0}")]
    Format(String),

    /// I/O error while persisting or reading an export
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "QUALTRICS_USER")
        key: Option<String>,
    },

    /// Caller asked for something this client does not do (unknown command, unsupported method)
    #[error("{0}")]
    NotSupported(String),
}

/// Closed set of failure kinds, independent of the message text
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transport failure; retrying may help
    Network,
    /// Non-2xx status
    Http,
    /// HTTP 403 without a server message
    Forbidden,
    /// Envelope contract violation
    Protocol,
    /// Server-reported domain failure
    Application,
    /// Invalid export archive
    Format,
    /// Local I/O failure
    Io,
    /// Invalid or missing configuration
    Config,
    /// Caller defect
    NotSupported,
}

impl Error {
    /// Build an [`Error::Http`] whose message embeds the status code
    pub fn http(code: u16) -> Self {
        Error::Http {
            code,
            message: format!("HTTP Code {}", code),
        }
    }

    /// Build an [`Error::Http`] carrying the server's own error text
    pub fn http_message(code: u16, message: impl Into<String>) -> Self {
        Error::Http {
            code,
            message: message.into(),
        }
    }

    /// Build a configuration error for a named key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Failure kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Network(_) => ErrorKind::Network,
            Error::Http { .. } => ErrorKind::Http,
            Error::Forbidden => ErrorKind::Forbidden,
            Error::Protocol(_) => ErrorKind::Protocol,
            Error::Application(_) => ErrorKind::Application,
            Error::Format(_) => ErrorKind::Format,
            Error::Io(_) => ErrorKind::Io,
            Error::Config { .. } => ErrorKind::Config,
            Error::NotSupported(_) => ErrorKind::NotSupported,
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &str {
        match self {
            Error::Network(_) => "network_error",
            Error::Http { .. } => "http_error",
            Error::Forbidden => "forbidden",
            Error::Protocol(_) => "protocol_error",
            Error::Application(_) => "application_error",
            Error::Format(_) => "format_error",
            Error::Io(_) => "io_error",
            Error::Config { .. } => "config_error",
            Error::NotSupported(_) => "not_supported",
        }
    }

    /// HTTP status code attached to this error, if the server answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Http { code, .. } => Some(*code),
            Error::Forbidden => Some(403),
            _ => None,
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn all_error_variants() -> Vec<(Error, ErrorKind, &'static str)> {
        vec![
            (
                Error::Network("connection refused".into()),
                ErrorKind::Network,
                "network_error",
            ),
            (Error::http(400), ErrorKind::Http, "http_error"),
            (Error::Forbidden, ErrorKind::Forbidden, "forbidden"),
            (
                Error::Protocol("no Meta key".into()),
                ErrorKind::Protocol,
                "protocol_error",
            ),
            (
                Error::Application("Invalid surveyId parameter.".into()),
                ErrorKind::Application,
                "application_error",
            ),
            (
                Error::Format("File is not a zip file".into()),
                ErrorKind::Format,
                "format_error",
            ),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                ErrorKind::Io,
                "io_error",
            ),
            (
                Error::config("missing", "QUALTRICS_USER"),
                ErrorKind::Config,
                "config_error",
            ),
            (
                Error::NotSupported("trace".into()),
                ErrorKind::NotSupported,
                "not_supported",
            ),
        ]
    }

    #[test]
    fn test_kind_and_code_for_every_variant() {
        for (error, kind, code) in all_error_variants() {
            assert_eq!(error.kind(), kind, "kind mismatch for {:?}", error);
            assert_eq!(error.error_code(), code, "code mismatch for {:?}", error);
        }
    }

    #[test]
    fn test_server_messages_are_passed_through_verbatim() {
        let err = Error::Application("Invalid surveyId parameter.".into());
        assert_eq!(err.to_string(), "Invalid surveyId parameter.");

        let err = Error::Format("File is not a zip file".into());
        assert_eq!(err.to_string(), "File is not a zip file");
    }

    #[test]
    fn test_http_message_includes_code() {
        let err = Error::http(400);
        assert_eq!(err.to_string(), "HTTP Code 400");
        assert_eq!(err.status_code(), Some(400));
    }

    #[test]
    fn test_http_error_with_server_text_keeps_code() {
        let err = Error::http_message(404, "Export id not found");
        assert_eq!(err.kind(), ErrorKind::Http);
        assert_eq!(err.to_string(), "Export id not found");
        assert_eq!(err.status_code(), Some(404));
    }

    #[test]
    fn test_forbidden_message() {
        assert_eq!(
            Error::Forbidden.to_string(),
            "API Error: HTTP Code 403 (Forbidden)"
        );
        assert_eq!(Error::Forbidden.status_code(), Some(403));
    }

    #[test]
    fn test_network_error_has_no_status_code() {
        assert_eq!(Error::Network("dns".into()).status_code(), None);
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NotSupported).unwrap();
        assert_eq!(json, "\"not_supported\"");
    }
}
