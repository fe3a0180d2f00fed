//! Error types for the mainchain RPC facade.

use thiserror::Error;

/// Errors produced below the facade. Callers above the facade never see
/// these directly — the facade retries internally and surfaces absence as
/// `None`, not an error (see [`crate::client::MainchainClient`]).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Connection-level failure. Retrying may help.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server returned a non-2xx status.
    #[error("rpc server returned status {0}: {1}")]
    Status(u16, String),

    /// The server's JSON-RPC envelope carried an error object.
    #[error("rpc error {code}: {message}")]
    Server { code: i64, message: String },

    /// The response body could not be decoded into the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Credentials were not configured.
    #[error("missing rpc username or password")]
    MissingCredentials,
}

impl ClientError {
    /// Whether a retry has any chance of succeeding. [`ClientError::Server`]
    /// with application-level errors (bad params, etc.) is not retried by
    /// the facade's own internal loop, but the watcher still backs off on it
    /// since mainchain nodes commonly return transient "still syncing"
    /// errors through the same code path.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, ClientError::MissingCredentials)
    }
}
