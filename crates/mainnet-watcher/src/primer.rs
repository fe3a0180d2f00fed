//! Fast-sync primer (§4.5): on startup, pulls already-known epoch/monitor-vote
//! records from the sidechain's own RPC in a rolling window, so the pipeline
//! does not have to replay mainchain history the sidechain has already
//! processed.

use async_trait::async_trait;
use mainnet_watcher_primitives::VoteInfoRecord;
use tracing::info;

use crate::state::WatcherState;

const PRIME_WINDOW: u64 = 100;

/// The sidechain's own self-query surface. Out of scope per §1 (treated as an
/// external collaborator); only its interface contract is retained here.
#[async_trait]
pub trait SidechainClient: Send + Sync + 'static {
    /// Returns records for epochs in `[start, end)`, or an empty vec once
    /// the sidechain has nothing further to report.
    async fn get_vote_info_by_epoch_number(&self, start: u64, end: u64) -> Vec<VoteInfoRecord>;
}

/// Runs the rolling-window prime loop, advancing `state`'s counters as
/// batches are absorbed. Terminates when a batch comes back empty.
pub async fn prime(
    state: &mut WatcherState,
    client: &dyn SidechainClient,
    num_blocks_in_epoch: u64,
    last_known_epoch_num: u64,
) {
    let mut window_start = last_known_epoch_num + 1;

    loop {
        let batch = client
            .get_vote_info_by_epoch_number(window_start, window_start + PRIME_WINDOW)
            .await;
        if batch.is_empty() {
            break;
        }

        let batch_len = batch.len() as u64;
        for record in batch {
            info!(epoch = record.epoch.number, "priming known epoch");
            state.absorb_primed_record(record, num_blocks_in_epoch).await;
        }

        window_start += PRIME_WINDOW;
    }

    state.finish_priming();
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use mainnet_watcher_primitives::{Epoch, MonitorVoteInfo};
    use tokio::sync::mpsc;

    use super::*;

    struct ScriptedClient {
        batches: Mutex<Vec<Vec<VoteInfoRecord>>>,
    }

    #[async_trait]
    impl SidechainClient for ScriptedClient {
        async fn get_vote_info_by_epoch_number(&self, _start: u64, _end: u64) -> Vec<VoteInfoRecord> {
            self.batches.lock().unwrap().pop().unwrap_or_default()
        }
    }

    fn record(number: u64, with_monitor_vote: bool) -> VoteInfoRecord {
        VoteInfoRecord {
            epoch: Epoch {
                number,
                start_height: 0,
                end_height: 0,
                end_time: 100 + number as i64,
                nominations: vec![],
            },
            monitor_vote: with_monitor_vote.then(|| MonitorVoteInfo {
                start_height: 0,
                end_time: 100 + number as i64,
                nominations: vec![],
            }),
        }
    }

    #[tokio::test]
    async fn stops_on_empty_batch_and_advances_height() {
        let (epoch_tx, mut epoch_rx) = mpsc::channel(16);
        let (mv_tx, mut mv_rx) = mpsc::channel(16);
        let mut state = WatcherState::new(0, 0, 10, 0, 5, epoch_tx, mv_tx);

        // Popped in reverse: first call gets the two-record batch, second the
        // empty one that terminates the loop.
        let client = ScriptedClient {
            batches: Mutex::new(vec![vec![], vec![record(1, false), record(2, true)]]),
        };

        prime(&mut state, &client, 10, 0).await;

        assert_eq!(state.latest_finalized_height(), 20);
        assert_eq!(state.history().len(), 2);

        let forwarded_epoch = epoch_rx.try_recv().expect("first primed epoch forwarded");
        assert_eq!(forwarded_epoch.number, 1);
        let forwarded_epoch = epoch_rx.try_recv().expect("second primed epoch forwarded");
        assert_eq!(forwarded_epoch.number, 2);
        assert!(epoch_rx.try_recv().is_err(), "no extra epochs forwarded");

        let forwarded_mv = mv_rx.try_recv().expect("monitor vote on second record forwarded");
        assert_eq!(forwarded_mv.end_time, 102);
        assert!(mv_rx.try_recv().is_err(), "only one monitor vote forwarded");
    }
}
