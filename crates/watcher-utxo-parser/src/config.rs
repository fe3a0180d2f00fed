use bitcoin::{Address, Network};

/// Configuration refreshed into the parser on every collector iteration
/// (§4.6.1 of the design): the covenant-address pair and the magic bytes
/// identifying a deposit's `OP_RETURN` payload.
#[derive(Clone, Debug)]
pub struct CovenantConfig {
    pub network: Network,
    /// The active cross-chain custody address.
    pub current_covenant_address: Address,
    /// The previous custody address, still honored so in-flight transfers
    /// against it are recognized during a covenant rotation.
    pub prev_covenant_address: Option<Address>,
    /// Magic byte prefix identifying the rollup in a deposit's OP_RETURN.
    pub magic_bytes: Vec<u8>,
    /// The minimum amount, in satoshis, a deposit output must carry.
    pub deposit_quantity: u64,
}

impl CovenantConfig {
    pub fn pays_covenant(&self, address: &Address) -> bool {
        address == &self.current_covenant_address
            || self.prev_covenant_address.as_ref() == Some(address)
    }
}
