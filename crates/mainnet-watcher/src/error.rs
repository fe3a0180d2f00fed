//! Error types for the watcher's own component seams (§7): configuration and
//! supervisor/startup failures. The RPC and parser seams carry their own
//! `thiserror` enums in their respective crates.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidField(&'static str),

    #[error("invalid hex in configuration field {field}: {source}")]
    InvalidHex {
        field: &'static str,
        source: hex::FromHexError,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SupervisorError {
    #[error("startup sanity check failed: {0}")]
    SanityCheckFailed(String),

    #[error("no mainchain rpc client configured")]
    NoRpcClient,
}
