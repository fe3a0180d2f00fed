use serde::{Deserialize, Serialize};

use crate::nomination::{CcNomination, Nomination};

/// A contiguous, fixed-length window of finalized mainchain blocks folded
/// into one staking directive.
///
/// `number` is assigned by the consumer (e.g. the sidechain's fast-sync
/// response), never by the watcher itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epoch {
    pub number: u64,
    pub start_height: u64,
    pub end_height: u64,
    /// Maximum timestamp of any block in the window, *not* the last block's
    /// timestamp — mainchain timestamps are not monotonic within a window.
    pub end_time: i64,
    pub nominations: Vec<Nomination>,
}

/// The cross-chain analog of [`Epoch`], governing the monitor set. Only
/// constructed for windows starting at or after `StartMainnetHeightForCC`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorVoteInfo {
    pub start_height: u64,
    pub end_time: i64,
    pub nominations: Vec<CcNomination>,
}

/// Retained history pair, appended once per window closure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoteInfoRecord {
    pub epoch: Epoch,
    pub monitor_vote: Option<MonitorVoteInfo>,
}

/// Bound on the length of the retained vote-info history list.
pub const MONITOR_INFO_CLEAN_THRESHOLD: usize = 5;
