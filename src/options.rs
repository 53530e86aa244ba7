use serde::{Deserialize, Serialize};

/// Transport and error-surfacing options shared by both clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Verify the server's TLS certificate and host name.
    pub verify_ssl: bool,
    /// Return [`crate::ClientError::HttpStatus`] for non-success statuses and
    /// [`crate::ClientError::UnrecognizedResponse`] for unrecognized bodies
    /// instead of passing them through.
    pub strict_errors: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            verify_ssl: true,
            strict_errors: false,
        }
    }
}
