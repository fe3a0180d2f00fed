use bitcoin::{Address, OutPoint};

/// One recognized cross-chain transfer, as handed to the executor in a
/// per-rescan-window batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferInfo {
    pub kind: TransferKind,
    pub outpoint: OutPoint,
    pub covenant_address: Address,
    pub amount_sats: u64,
    /// The sidechain-side destination, for deposits. Empty for withdrawal
    /// settlements, where matching against the pending request is the
    /// executor's job.
    pub destination: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferKind {
    Deposit,
    WithdrawalSettlement,
}
