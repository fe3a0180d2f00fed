use async_trait::async_trait;
use mainnet_watcher_primitives::{BlockInfo, MainchainBlock};

/// Typed block / height / block-info fetchers. Errors below this trait are
/// logged and retried internally; above it, only `None` signals absence.
///
/// Implementations are stateless apart from credentials, so a client can
/// freely be wrapped in an `Arc` and shared across the catch-up pipeline and
/// the UTXO collector.
#[async_trait]
pub trait MainchainClient: Send + Sync + 'static {
    /// Current mainchain tip. When `retry_forever` is `true` this resolves
    /// only once a value greater than zero is obtained (bounded backoff
    /// between attempts). When `false`, a transient failure surfaces as
    /// `None`.
    async fn get_latest_height(&self, retry_forever: bool) -> Option<u64>;

    /// Full block at `height`, with nominations. `None` on failure (if
    /// `retry_forever` is `false`) or if the height doesn't exist yet.
    async fn get_block_by_height(&self, height: u64, retry_forever: bool) -> Option<MainchainBlock>;

    /// Lighter block variant sufficient for UTXO parsing.
    async fn get_block_info_by_height(
        &self,
        height: u64,
        retry_forever: bool,
    ) -> Option<BlockInfo>;
}
