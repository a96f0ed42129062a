//! Error types for the client.

use bytes::Bytes;
use reqwest::StatusCode;

/// A classified failure of one request.
///
/// Every call either yields a complete result envelope or exactly one of
/// these. The client never retries on its own.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connect, TLS, timeout or an interrupted exchange before a status arrived.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The agent answered with a status the response policy does not accept.
    ///
    /// `raw` is the body exactly as received. `body` is the same bytes as
    /// text, with invalid UTF-8 sequences replaced by U+FFFD.
    #[error("unexpected response code {status}: {body}")]
    Status {
        status: StatusCode,
        body: String,
        raw: Bytes,
    },

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// A 2xx body did not match the expected shape.
    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// A protocol header or required field could not be interpreted.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The request body could not be serialised.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The request could not be turned into a URL.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Reading a line stream failed.
    #[error("stream read failed: {0}")]
    Stream(#[source] std::io::Error),
}

impl ClientError {
    /// The HTTP status for [`ClientError::Status`], `None` otherwise.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

/// Errors from building a [`ClientConfig`](crate::ClientConfig) or the HTTP
/// client it describes.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid agent address {value:?}: {reason}")]
    InvalidAddress { value: String, reason: String },

    #[error("invalid port in agent address {value:?}")]
    InvalidPort { value: String },

    #[error("{variable} must be a boolean, got {value:?}")]
    InvalidFlag { variable: &'static str, value: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
