//! Mainnet watcher: observes an external proof-of-work chain and derives the
//! staking and cross-chain governance inputs that drive this node's
//! validator-set and monitor-set rotation.
//!
//! [`supervisor::Supervisor`] is the entry point; it wires the RPC facade
//! ([`mainnet_watcher_rpc`]), the catch-up pipeline, the epoch aggregator,
//! the fast-sync primer, and exposes the channels and read-only accessors
//! other subsystems consume. The UTXO collector ([`collector`]) runs as an
//! independent task alongside the pipeline.

pub mod aggregator;
pub mod buffer;
pub mod collector;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod primer;
pub mod state;
pub mod supervisor;

pub use config::WatcherConfig;
pub use error::{ConfigError, SupervisorError};
pub use supervisor::Supervisor;
