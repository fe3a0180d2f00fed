use bitcoin::Transaction;

use crate::nomination::{CcNomination, Nomination};

/// A finalized mainchain block, as consumed by the epoch aggregator.
///
/// Immutable once finalized: a buffered block at height `h` is never
/// replaced, since the watcher does not handle reorgs beyond the fixed
/// finalization depth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MainchainBlock {
    pub height: u64,
    /// Seconds since epoch, as reported by the mainchain block header. Not
    /// guaranteed monotonic across adjacent blocks.
    pub timestamp: i64,
    pub nominations: Vec<Nomination>,
    pub cc_nominations: Vec<CcNomination>,
}

/// The lighter sibling of [`MainchainBlock`] used by the UTXO collector: just
/// enough to run the transfer parser, without the nomination bookkeeping the
/// aggregator needs.
#[derive(Clone, Debug)]
pub struct BlockInfo {
    pub height: u64,
    pub block_hash: bitcoin::BlockHash,
    pub transactions: Vec<Transaction>,
}
