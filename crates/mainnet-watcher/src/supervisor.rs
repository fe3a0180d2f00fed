//! Wires the RPC facade, pipeline, aggregator state, primer, and collector
//! together (§4.7), and exposes the read-only accessors other subsystems
//! poll for telemetry/RPC responses.

use std::{sync::Arc, time::Duration};

use mainnet_watcher_primitives::{Epoch, MonitorVoteInfo, VoteInfoRecord};
use mainnet_watcher_rpc::MainchainClient;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    collector::{Executor, UtxoCollector, UtxoRescanContextProvider},
    config::WatcherConfig,
    error::SupervisorError,
    pipeline::CatchupPipeline,
    primer::SidechainClient,
    state::WatcherState,
};

type CollectorDeps = (Arc<dyn UtxoRescanContextProvider>, Arc<Mutex<dyn Executor>>);

pub struct Supervisor<C: MainchainClient> {
    client: Option<Arc<C>>,
    config: WatcherConfig,
    state: Arc<RwLock<WatcherState>>,
    catchup_latch: CancellationToken,
    shutdown: CancellationToken,
    collector_deps: Option<CollectorDeps>,
}

impl<C: MainchainClient> Supervisor<C> {
    /// `client: None` immediately closes the catch-up latch and makes
    /// `Run()` a no-op — this is what lets consumers unit test the
    /// supervisor's read-only accessors without a live mainchain RPC
    /// endpoint (§4.7).
    ///
    /// `collector_deps`, when supplied, is the `(context_provider,
    /// executor)` pair the UTXO collector needs (§4.6); `run` spawns it
    /// alongside the catch-up pipeline unless `config.is_amber` is set.
    pub fn new(
        client: Option<Arc<C>>,
        config: WatcherConfig,
        last_height: u64,
        last_known_epoch_num: u64,
        collector_deps: Option<CollectorDeps>,
    ) -> (Self, mpsc::Receiver<Epoch>, mpsc::Receiver<MonitorVoteInfo>) {
        let (epoch_tx, epoch_rx) = mpsc::channel(10_000);
        let (mv_tx, mv_rx) = mpsc::channel(5_000);

        let state = WatcherState::new(
            last_height,
            last_known_epoch_num,
            config.num_blocks_in_epoch,
            config.start_mainnet_height_for_cc,
            config.monitor_info_clean_threshold,
            epoch_tx,
            mv_tx,
        );

        let supervisor = Self {
            client,
            config,
            state: Arc::new(RwLock::new(state)),
            catchup_latch: CancellationToken::new(),
            shutdown: CancellationToken::new(),
            collector_deps,
        };

        (supervisor, epoch_rx, mv_rx)
    }

    /// Drives the primer (if configured) then the catch-up pipeline forever.
    /// Returns immediately if no RPC client is configured.
    pub async fn run(&self, sidechain_client: Option<&dyn SidechainClient>) {
        let Some(client) = self.client.clone() else {
            info!("no mainchain rpc client configured; closing catch-up latch immediately");
            self.catchup_latch.cancel();
            return;
        };

        if self.config.speedup {
            if let Some(sidechain_client) = sidechain_client {
                let mut state = self.state.write().await;
                crate::primer::prime(
                    &mut state,
                    sidechain_client,
                    self.config.num_blocks_in_epoch,
                    0,
                )
                .await;
            } else {
                warn!("speedup enabled but no sidechain client supplied; skipping primer");
            }
        }

        let collector_task = self.spawn_collector(client.clone());

        let pipeline = CatchupPipeline::new(
            client,
            self.config.parallelism,
            self.config.finalize_depth,
            Duration::from_secs(self.config.waiting_block_delay_secs),
            self.catchup_latch.clone(),
        );

        pipeline.run(self.state.clone(), self.shutdown.clone()).await;

        if let Some(task) = collector_task {
            let _ = task.await;
        }
    }

    /// Spawns the UTXO collector alongside the pipeline (§4.6, §4.7), unless
    /// the chain is the "amber" test variant or no collector deps were
    /// supplied to [`Supervisor::new`].
    fn spawn_collector(&self, client: Arc<C>) -> Option<tokio::task::JoinHandle<()>> {
        if self.config.is_amber {
            info!("amber chain variant; utxo collector disabled");
            return None;
        }

        let (context_provider, executor) = self.collector_deps.as_ref()?;

        let magic_bytes = match self.config.deposit_magic_bytes_decoded() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%err, "invalid deposit magic bytes; utxo collector not started");
                return None;
            }
        };

        let collector = UtxoCollector::new(
            client,
            context_provider.clone(),
            executor.clone(),
            self.config.parallelism,
            self.config.finalize_depth,
            self.config.start_mainnet_height_for_cc,
            magic_bytes,
            self.config.deposit_quantity_sats,
        );

        let state = self.state.clone();
        let shutdown = self.shutdown.clone();
        Some(tokio::spawn(async move {
            collector.run(state, shutdown).await;
        }))
    }

    /// Resolves once the catch-up pipeline first reaches the mainchain tip.
    pub async fn wait_catchup(&self) {
        self.catchup_latch.cancelled().await;
    }

    /// Probes the facade with a single non-retrying fetch and panics if the
    /// RPC is unhealthy (§4.7's `CheckSanity`). `skip` lets startup code
    /// bypass the probe entirely, e.g. in environments with no live
    /// mainchain RPC configured.
    ///
    /// # Panics
    ///
    /// Panics if `skip` is `false` and the probe fetch fails or returns a
    /// zero height. Startup-time sanity checks are the one place this crate
    /// treats an unhealthy dependency as fatal rather than recoverable,
    /// matching the distilled spec's literal `CheckSanity` behavior.
    pub async fn check_sanity(&self, skip: bool) {
        if skip {
            return;
        }

        let Some(client) = &self.client else {
            panic!("{}", SupervisorError::NoRpcClient);
        };

        match client.get_latest_height(false).await {
            Some(height) if height > 0 => {}
            _ => panic!(
                "{}",
                SupervisorError::SanityCheckFailed("mainchain rpc returned no usable tip".into())
            ),
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub async fn current_block_timestamp(&self) -> i64 {
        self.state.read().await.current_block_timestamp()
    }

    pub async fn latest_finalized_height(&self) -> u64 {
        self.state.read().await.latest_finalized_height()
    }

    /// Closed epoch/monitor-vote history, with the still-open epoch
    /// appended as its own record (§4.7).
    pub async fn history(&self) -> Vec<VoteInfoRecord> {
        self.state.read().await.history_with_in_progress()
    }

    /// The still-open epoch, built on demand from whatever blocks have
    /// landed in the current window so far. `None` before the first block
    /// of a new window has been finalized.
    pub async fn current_epoch(&self) -> Option<Epoch> {
        self.state.read().await.current_epoch()
    }
}

#[cfg(test)]
mod tests {
    use mainnet_watcher_rpc::mock::MockMainchainClient;

    use super::*;

    fn test_config() -> WatcherConfig {
        WatcherConfig {
            mainnet_rpc_url: "http://localhost".into(),
            mainnet_rpc_username: String::new(),
            mainnet_rpc_password: String::new(),
            smartbch_rpc_url: None,
            speedup: false,
            num_blocks_in_epoch: 10,
            waiting_block_delay_secs: 1,
            parallelism: 10,
            start_mainnet_height_for_cc: 0,
            finalize_depth: 1,
            is_amber: false,
            monitor_info_clean_threshold: 5,
            deposit_magic_bytes: String::new(),
            deposit_quantity_sats: 0,
        }
    }

    #[tokio::test]
    async fn no_client_closes_latch_immediately() {
        let (supervisor, _epoch_rx, _mv_rx) =
            Supervisor::<MockMainchainClient>::new(None, test_config(), 0, 0, None);

        supervisor.run(None).await;
        supervisor.wait_catchup().await;
    }

    #[tokio::test]
    #[should_panic(expected = "no mainchain rpc client configured")]
    async fn sanity_check_panics_without_client() {
        let (supervisor, _epoch_rx, _mv_rx) =
            Supervisor::<MockMainchainClient>::new(None, test_config(), 0, 0, None);
        supervisor.check_sanity(false).await;
    }

    #[tokio::test]
    async fn sanity_check_skipped_without_client() {
        let (supervisor, _epoch_rx, _mv_rx) =
            Supervisor::<MockMainchainClient>::new(None, test_config(), 0, 0, None);
        supervisor.check_sanity(true).await;
    }

    #[tokio::test]
    async fn sanity_check_passes_with_healthy_client() {
        let client = Arc::new(MockMainchainClient::new(42));
        let (supervisor, _epoch_rx, _mv_rx) =
            Supervisor::new(Some(client), test_config(), 0, 0, None);
        supervisor.check_sanity(false).await;
    }

    #[tokio::test]
    async fn current_epoch_is_none_before_any_block() {
        let (supervisor, _epoch_rx, _mv_rx) =
            Supervisor::<MockMainchainClient>::new(None, test_config(), 0, 0, None);
        assert!(supervisor.current_epoch().await.is_none());
    }
}
