use serde::{Deserialize, Serialize};

use crate::pubkey::{Pubkey32, Pubkey33};

/// A staking nomination contributed by a single mainchain block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nomination {
    pub pubkey: Pubkey32,
    pub count: u64,
}

/// The cross-chain analog of [`Nomination`], governing the monitor set.
///
/// `metadata` is opaque to the aggregator; it is carried through unmerged
/// (last-seen wins) since the fold only needs to accumulate `count`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CcNomination {
    pub pubkey: Pubkey33,
    pub count: u64,
    pub metadata: Vec<u8>,
}
