use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by REST client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Base URL is not a valid absolute URL.
    ///
    /// This is the configuration error: it is only produced while a client is
    /// being constructed or reconfigured.
    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    /// Endpoint path could not be joined to the base URL.
    #[error("invalid endpoint path '{0}'")]
    InvalidPath(String),

    /// A session value cannot be sent as an HTTP header.
    #[error("invalid value for header '{name}': {reason}")]
    InvalidHeader { name: &'static str, reason: String },

    /// The client was closed and its transport released.
    #[error("client is closed")]
    Closed,

    /// HTTP transport-layer request failure other than a deadline expiry.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Request or response body could not be encoded or parsed as JSON.
    #[error("failed to encode or parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Status `>= 400`, or a timed out call remapped to `504 Gateway Timeout`.
    #[error("server returned status {status}: {reason}")]
    HttpStatus {
        status: StatusCode,
        reason: String,
        body: String,
    },
}

impl ClientError {
    /// Builds the error a standard client reports when its deadline expires.
    pub(crate) fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::HttpStatus {
            status: StatusCode::GATEWAY_TIMEOUT,
            reason: message.into(),
            body: String::new(),
        }
    }

    /// Returns the HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Request(err) => err.status(),
            _ => None,
        }
    }

    /// Returns the reason phrase (or timeout message) of an HTTP status error.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::HttpStatus { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
