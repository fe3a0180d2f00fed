//! Extracts cross-chain UTXO transfers from mainchain blocks inside a
//! rescan window.

pub mod config;
pub mod error;
pub mod parser;
pub mod types;

pub use config::CovenantConfig;
pub use error::ParseError;
pub use parser::Parser;
pub use types::{TransferInfo, TransferKind};
