//! Cross-chain UTXO collector (§4.6): polls an externally supplied rescan
//! window, snapshots the mainchain blocks inside it, parses transfers out of
//! them, and atomically publishes the result to an executor under its own
//! mutex — distinct from, and running alongside, the catch-up pipeline.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use mainnet_watcher_primitives::BlockInfo;
use mainnet_watcher_rpc::MainchainClient;
use mainnet_watcher_utxo_parser::{CovenantConfig, Parser, TransferInfo};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::state::WatcherState;

const COLLECTOR_TICK: Duration = Duration::from_secs(1);
const FINALITY_POLL: Duration = Duration::from_secs(30);

/// One rescan instruction, supplied externally (§4.6 step 3). `None` from
/// [`UtxoRescanContextProvider::next_window`] means "no pending rescan".
#[derive(Clone, Debug)]
pub struct UtxoCollectParam {
    pub begin_height: u64,
    pub end_height: u64,
    pub current_covenant_address: bitcoin::Address,
    pub prev_covenant_address: Option<bitcoin::Address>,
}

/// Externally supplied source of rescan windows. A scoped call: the context
/// getter must not be held across the remainder of the collector iteration,
/// matching §4.6's "called outside the executor's mutex" note.
#[async_trait]
pub trait UtxoRescanContextProvider: Send + Sync + 'static {
    async fn next_window(&self) -> Option<UtxoCollectParam>;
}

/// The collaborator that owns pending withdrawal state and ultimately
/// consumes transfer snapshots. Out of scope per §1; only the interface
/// contract this collector needs is retained here. The collector wraps `E`
/// in its own mutex and holds the guard across a full rescan-window write
/// (§4.6 step 5–11), so the executor never observes a partial update —
/// implementors don't need interior mutability of their own.
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    async fn write_collection_result(
        &mut self,
        infos: Vec<TransferInfo>,
        last_end_rescan_block: u64,
    );
    async fn mark_collect_initialized(&mut self);
}

/// Only `C` stays generic; `context_provider` and `executor` are behind
/// trait objects so the supervisor can hold and spawn a collector without
/// itself becoming generic over the embedding node's provider/executor
/// types.
pub struct UtxoCollector<C: MainchainClient> {
    client: Arc<C>,
    context_provider: Arc<dyn UtxoRescanContextProvider>,
    executor: Arc<Mutex<dyn Executor>>,
    parallelism: usize,
    finalize_depth: u64,
    start_height_for_cc: u64,
    magic_bytes: Vec<u8>,
    deposit_quantity: u64,
}

impl<C: MainchainClient> UtxoCollector<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: Arc<C>,
        context_provider: Arc<dyn UtxoRescanContextProvider>,
        executor: Arc<Mutex<dyn Executor>>,
        parallelism: usize,
        finalize_depth: u64,
        start_height_for_cc: u64,
        magic_bytes: Vec<u8>,
        deposit_quantity: u64,
    ) -> Self {
        Self {
            client,
            context_provider,
            executor,
            parallelism,
            finalize_depth,
            start_height_for_cc,
            magic_bytes,
            deposit_quantity,
        }
    }

    /// Runs until `shutdown` fires, looping once per second. Skips gracefully
    /// when there is nothing to do yet — none of the skip conditions in
    /// §4.6 leave the executor half-updated.
    pub async fn run(&self, state: Arc<RwLock<WatcherState>>, shutdown: CancellationToken) {
        let mut last_end_height_processed = 0u64;
        let mut initialized = false;

        loop {
            if shutdown.is_cancelled() {
                return;
            }

            let latest_finalized_height = state.read().await.latest_finalized_height();
            if latest_finalized_height < self.start_height_for_cc {
                self.sleep_or_stop(&shutdown).await;
                continue;
            }

            let Some(param) = self.context_provider.next_window().await else {
                self.sleep_or_stop(&shutdown).await;
                continue;
            };

            if param.end_height == last_end_height_processed || param.begin_height == 0 {
                self.sleep_or_stop(&shutdown).await;
                continue;
            }

            let mut executor = self.executor.lock().await;

            let Some(block_infos) = self
                .get_finalized_bch_block_infos(param.begin_height, param.end_height, &shutdown)
                .await
            else {
                drop(executor);
                self.sleep_or_stop(&shutdown).await;
                continue;
            };

            let mut parser = Parser::new();
            parser.refresh(CovenantConfig {
                network: bitcoin::Network::Bitcoin,
                current_covenant_address: param.current_covenant_address,
                prev_covenant_address: param.prev_covenant_address,
                magic_bytes: self.magic_bytes.clone(),
                deposit_quantity: self.deposit_quantity,
            });

            let infos: Vec<TransferInfo> = block_infos
                .iter()
                .flat_map(|blk| parser.extract_transfers(blk))
                .collect();

            info!(
                begin = param.begin_height,
                end = param.end_height,
                transfers = infos.len(),
                "publishing rescan-window collection result"
            );

            executor
                .write_collection_result(infos, param.end_height)
                .await;
            last_end_height_processed = param.end_height;

            if !initialized {
                executor.mark_collect_initialized().await;
                initialized = true;
            }

            drop(executor);
            self.sleep_or_stop(&shutdown).await;
        }
    }

    /// Waits for mainchain tip to clear `end_height + finalize_depth`, then
    /// fans out `(begin_height, end_height]` concurrently. Returns `None`
    /// when the window is empty (`begin_height >= end_height`).
    async fn get_finalized_bch_block_infos(
        &self,
        begin_height: u64,
        end_height: u64,
        shutdown: &CancellationToken,
    ) -> Option<Vec<BlockInfo>> {
        if begin_height >= end_height {
            return None;
        }

        loop {
            if shutdown.is_cancelled() {
                return None;
            }
            let tip = self.client.get_latest_height(true).await.unwrap_or(0);
            if tip >= end_height + self.finalize_depth {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(FINALITY_POLL) => {}
                _ = shutdown.cancelled() => return None,
            }
        }

        let heights: Vec<u64> = (begin_height + 1..=end_height).collect();
        let mut pending = FuturesUnordered::new();
        for chunk in heights.chunks(self.parallelism.max(1)) {
            for &height in chunk {
                let client = self.client.clone();
                pending.push(async move {
                    let info = client.get_block_info_by_height(height, true).await;
                    (height, info)
                });
            }
        }

        let mut by_height = std::collections::BTreeMap::new();
        while let Some((height, info)) = pending.next().await {
            match info {
                Some(info) => {
                    by_height.insert(height, info);
                }
                None => warn!(height, "failed to fetch block info for rescan window"),
            }
        }

        Some(by_height.into_values().collect())
    }

    async fn sleep_or_stop(&self, shutdown: &CancellationToken) {
        tokio::select! {
            _ = tokio::time::sleep(COLLECTOR_TICK) => {}
            _ = shutdown.cancelled() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bitcoin::{Address, Network};
    use mainnet_watcher_rpc::mock::MockMainchainClient;
    use tokio::sync::Mutex as AsyncMutex;

    use super::*;

    struct FixedWindow(AsyncMutex<Option<UtxoCollectParam>>);

    #[async_trait]
    impl UtxoRescanContextProvider for FixedWindow {
        async fn next_window(&self) -> Option<UtxoCollectParam> {
            self.0.lock().await.clone()
        }
    }

    #[derive(Default)]
    struct RecordingExecutor {
        writes: Vec<(Vec<TransferInfo>, u64)>,
        initialized: bool,
    }

    #[async_trait]
    impl Executor for RecordingExecutor {
        async fn write_collection_result(&mut self, infos: Vec<TransferInfo>, last_end: u64) {
            self.writes.push((infos, last_end));
        }

        async fn mark_collect_initialized(&mut self) {
            self.initialized = true;
        }
    }

    fn address() -> Address {
        Address::from_str("bcrt1qw508d6qejxtdg4y5r3zarvary0c5xw7kygt080")
            .unwrap()
            .require_network(Network::Regtest)
            .unwrap()
    }

    #[tokio::test]
    async fn skips_iteration_when_window_unchanged() {
        let client = Arc::new(MockMainchainClient::new(100));
        let context: Arc<dyn UtxoRescanContextProvider> =
            Arc::new(FixedWindow(AsyncMutex::new(None)));
        let executor = Arc::new(Mutex::new(RecordingExecutor::default()));

        let collector = UtxoCollector::new(
            client,
            context,
            executor.clone(),
            10,
            1,
            0,
            b"mgc".to_vec(),
            1_000,
        );
        let shutdown = CancellationToken::new();

        let (epoch_tx, _epoch_rx) = tokio::sync::mpsc::channel(16);
        let (mv_tx, _mv_rx) = tokio::sync::mpsc::channel(16);
        let state = Arc::new(RwLock::new(WatcherState::new(
            1000, 0, 10, 0, 5, epoch_tx, mv_tx,
        )));

        let shutdown_clone = shutdown.clone();
        let handle = tokio::spawn(async move {
            collector.run(state, shutdown_clone).await;
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown.cancel();
        let _ = handle.await;

        let executor = executor.lock().await;
        assert!(executor.writes.is_empty());
    }

    #[test]
    fn rescan_param_carries_both_covenant_addresses() {
        let param = UtxoCollectParam {
            begin_height: 1,
            end_height: 2,
            current_covenant_address: address(),
            prev_covenant_address: Some(address()),
        };
        assert!(param.prev_covenant_address.is_some());
    }
}
