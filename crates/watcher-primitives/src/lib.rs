//! Core data model for the mainnet watcher: mainchain blocks, nominations,
//! and the derived epoch / monitor-vote records.

pub mod block;
pub mod epoch;
pub mod nomination;
pub mod pubkey;
pub mod sort;

pub use block::{BlockInfo, MainchainBlock};
pub use epoch::{Epoch, MonitorVoteInfo, VoteInfoRecord, MONITOR_INFO_CLEAN_THRESHOLD};
pub use nomination::{CcNomination, Nomination};
pub use pubkey::{Pubkey32, Pubkey33};
