//! Catch-up pipeline (§4.3): parallel range fetch on startup, transitioning
//! to a steady-state serial tail fetch, without ever losing height ordering
//! on the way into the aggregator.

use std::{sync::Arc, time::Duration};

use futures::stream::{FuturesUnordered, StreamExt};
use mainnet_watcher_rpc::MainchainClient;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::state::WatcherState;

pub struct CatchupPipeline<C: MainchainClient> {
    client: Arc<C>,
    parallelism: usize,
    finalize_depth: u64,
    waiting_block_delay: Duration,
    catchup_latch: CancellationToken,
}

impl<C: MainchainClient> CatchupPipeline<C> {
    pub fn new(
        client: Arc<C>,
        parallelism: usize,
        finalize_depth: u64,
        waiting_block_delay: Duration,
        catchup_latch: CancellationToken,
    ) -> Self {
        Self {
            client,
            parallelism,
            finalize_depth,
            waiting_block_delay,
            catchup_latch,
        }
    }

    /// Runs until `shutdown` fires. Never returns otherwise.
    pub async fn run(&self, state: Arc<RwLock<WatcherState>>, shutdown: CancellationToken) {
        let mut wanted = state.read().await.latest_finalized_height() + 1;
        let tip = self.client.get_latest_height(true).await.unwrap_or(0);

        if wanted + self.finalize_depth + self.parallelism as u64 <= tip {
            wanted = self
                .run_parallel_phase(&state, wanted, tip - self.finalize_depth)
                .await;
        }

        self.run_serial_phase(&state, wanted, shutdown).await;
    }

    /// Fetches `[from, through]` concurrently, then drains results into the
    /// buffer strictly in height order so the aggregator never observes a
    /// gap. Returns the next height still wanted.
    async fn run_parallel_phase(
        &self,
        state: &Arc<RwLock<WatcherState>>,
        from: u64,
        through: u64,
    ) -> u64 {
        info!(from, through, "starting parallel catch-up phase");

        let mut pending = FuturesUnordered::new();
        for height in from..=through {
            let client = self.client.clone();
            pending.push(async move {
                let block = client.get_block_by_height(height, true).await;
                (height, block)
            });
        }

        let mut results = std::collections::BTreeMap::new();
        while let Some((height, block)) = pending.next().await {
            match block {
                Some(block) => {
                    results.insert(height, block);
                }
                None => warn!(height, "failed to fetch block during parallel catch-up"),
            }
        }

        let mut state = state.write().await;
        let mut next = from;
        for (height, block) in results {
            debug_assert_eq!(height, next);
            state.add_finalized_block(block).await;
            next += 1;
        }

        next
    }

    async fn run_serial_phase(
        &self,
        state: &Arc<RwLock<WatcherState>>,
        mut wanted: u64,
        shutdown: CancellationToken,
    ) {
        let mut caught_up = false;

        loop {
            if shutdown.is_cancelled() {
                return;
            }

            let mut tip = self.client.get_latest_height(true).await.unwrap_or(0);
            while wanted + self.finalize_depth <= tip {
                if shutdown.is_cancelled() {
                    return;
                }
                let Some(block) = self.client.get_block_by_height(wanted, true).await else {
                    warn!(wanted, "serial fetch returned nothing despite retry_forever");
                    break;
                };
                state.write().await.add_finalized_block(block).await;
                wanted += 1;
                tip = self.client.get_latest_height(true).await.unwrap_or(tip);
            }

            if !caught_up {
                caught_up = true;
                self.catchup_latch.cancel();
            }

            tokio::select! {
                _ = tokio::time::sleep(self.waiting_block_delay) => {}
                _ = shutdown.cancelled() => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mainnet_watcher_primitives::MainchainBlock;
    use mainnet_watcher_rpc::mock::MockMainchainClient;
    use tokio::sync::{mpsc, RwLock};

    use super::*;

    fn block(height: u64) -> MainchainBlock {
        MainchainBlock {
            height,
            timestamp: height as i64,
            nominations: vec![],
            cc_nominations: vec![],
        }
    }

    #[tokio::test]
    async fn parallel_phase_orders_results_by_height() {
        let client = Arc::new(MockMainchainClient::new(100));
        for h in 1..=99 {
            client.insert_block(block(h));
        }

        let (epoch_tx, _epoch_rx) = mpsc::channel(16);
        let (mv_tx, _mv_rx) = mpsc::channel(16);
        let state = Arc::new(RwLock::new(crate::state::WatcherState::new(
            0, 0, 1_000_000, 0, 5, epoch_tx, mv_tx,
        )));

        let pipeline = CatchupPipeline::new(
            client.clone(),
            10,
            1,
            std::time::Duration::from_millis(1),
            CancellationToken::new(),
        );

        let next = pipeline.run_parallel_phase(&state, 1, 99).await;

        assert_eq!(next, 100);
        assert_eq!(state.read().await.latest_finalized_height(), 99);
    }
}
