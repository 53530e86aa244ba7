use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by REDCap client operations.
///
/// Malformed overrides, malformed import payloads and unrecognized response
/// bodies are not errors: they are logged and the call continues. Only
/// transport failures, and the strict checks enabled through
/// [`crate::ClientOptions::strict_errors`], surface here.
#[derive(Debug, Error)]
pub enum ClientError {
    /// API endpoint is not a valid absolute URL.
    #[error("invalid API URL '{0}'")]
    InvalidBaseUrl(String),

    /// HTTP transport-layer request failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// A JSON value could not be serialized into an import payload.
    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The local file attached to a file import could not be read.
    #[error("failed to read attachment '{}': {source}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Non-success HTTP status with response payload (strict mode only).
    #[error("server returned status {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Body was neither a URL, JSON nor an XML error envelope (strict mode only).
    #[error("unrecognized response body: {0}")]
    UnrecognizedResponse(String),
}
