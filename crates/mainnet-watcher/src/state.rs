//! Owns the buffer, the vote-info history, and all watcher counters. Wrapped
//! in a [`tokio::sync::RwLock`] by the supervisor so a window-close sequence
//! (fold -> send epoch -> send monitor-vote -> append history -> GC) runs
//! under one write-lock acquisition: the teacher's own pipeline holds a
//! single mutable borrow of its tip state for the same span, we just make
//! that borrow explicit with a lock instead of single-goroutine ownership.

use mainnet_watcher_primitives::{
    sort::{merge_cc_nominations, merge_nominations},
    Epoch, MainchainBlock, MonitorVoteInfo, VoteInfoRecord,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{aggregator, buffer::FinalizationBuffer};

pub struct WatcherState {
    buffer: FinalizationBuffer,
    history: Vec<VoteInfoRecord>,

    latest_finalized_height: u64,
    last_epoch_end_height: u64,
    current_block_timestamp: i64,
    next_epoch_number: u64,

    num_blocks_in_epoch: u64,
    start_height_for_cc: u64,
    history_cap: usize,

    epoch_tx: mpsc::Sender<Epoch>,
    monitor_vote_tx: mpsc::Sender<MonitorVoteInfo>,
}

impl WatcherState {
    /// `last_known_epoch_num` and `last_height` seed the counters the way the
    /// fast-sync primer and the caller-supplied restart checkpoint would:
    /// the watcher keeps no persistence of its own (§1 Non-goals).
    pub fn new(
        last_height: u64,
        last_known_epoch_num: u64,
        num_blocks_in_epoch: u64,
        start_height_for_cc: u64,
        history_cap: usize,
        epoch_tx: mpsc::Sender<Epoch>,
        monitor_vote_tx: mpsc::Sender<MonitorVoteInfo>,
    ) -> Self {
        Self {
            buffer: FinalizationBuffer::new(),
            history: Vec::new(),
            latest_finalized_height: last_height,
            last_epoch_end_height: last_height,
            current_block_timestamp: 0,
            next_epoch_number: last_known_epoch_num + 1,
            num_blocks_in_epoch,
            start_height_for_cc,
            history_cap,
            epoch_tx,
            monitor_vote_tx,
        }
    }

    pub fn latest_finalized_height(&self) -> u64 {
        self.latest_finalized_height
    }

    pub fn current_block_timestamp(&self) -> i64 {
        self.current_block_timestamp
    }

    pub fn history(&self) -> &[VoteInfoRecord] {
        &self.history
    }

    /// Builds the still-open epoch on demand, out of whatever blocks have
    /// accumulated in the current window since the last close. `None` if no
    /// block has landed in the window yet.
    pub fn current_epoch(&self) -> Option<Epoch> {
        if self.latest_finalized_height <= self.last_epoch_end_height {
            return None;
        }

        let start_height = self.last_epoch_end_height + 1;
        let end_height = self.latest_finalized_height;
        let window: Vec<&MainchainBlock> = (start_height..=end_height)
            .map(|h| {
                self.buffer
                    .get(h)
                    .expect("buffered block missing for in-progress epoch")
            })
            .collect();

        Some(Epoch {
            number: self.next_epoch_number,
            start_height,
            end_height,
            end_time: window.iter().map(|blk| blk.timestamp).max().unwrap_or(0),
            nominations: merge_nominations(&window),
        })
    }

    fn current_epoch_record(&self) -> Option<VoteInfoRecord> {
        let epoch = self.current_epoch()?;
        let monitor_vote = (epoch.start_height >= self.start_height_for_cc).then(|| {
            let window: Vec<&MainchainBlock> = (epoch.start_height..=epoch.end_height)
                .map(|h| {
                    self.buffer
                        .get(h)
                        .expect("buffered block missing for in-progress epoch")
                })
                .collect();
            MonitorVoteInfo {
                start_height: epoch.start_height,
                end_time: epoch.end_time,
                nominations: merge_cc_nominations(&window),
            }
        });
        Some(VoteInfoRecord { epoch, monitor_vote })
    }

    /// [`Self::history`] plus the still-open epoch appended as its own
    /// record, matching §4.7's "history with the in-progress epoch" view.
    pub fn history_with_in_progress(&self) -> Vec<VoteInfoRecord> {
        let mut history = self.history.clone();
        if let Some(record) = self.current_epoch_record() {
            history.push(record);
        }
        history
    }

    /// Inserts the next finalized block (must be `latest_finalized_height +
    /// 1`) and, if the window has closed, folds it and publishes the result.
    /// Sends block on the output channels if a consumer is slow — that
    /// backpressure is intentional (§4.4): the watcher must not drop epochs.
    pub async fn add_finalized_block(&mut self, block: MainchainBlock) {
        assert_eq!(
            block.height,
            self.latest_finalized_height + 1,
            "pipeline violated strict height monotonicity"
        );

        self.current_block_timestamp = block.timestamp;
        self.latest_finalized_height = block.height;
        self.buffer.insert(block);

        if self.latest_finalized_height - self.last_epoch_end_height == self.num_blocks_in_epoch {
            self.close_window().await;
        }
    }

    async fn close_window(&mut self) {
        let start_height = self.last_epoch_end_height + 1;
        let end_height = self.latest_finalized_height;

        let (epoch, monitor_vote) = aggregator::close_window(
            &self.buffer,
            self.next_epoch_number,
            start_height,
            end_height,
            self.start_height_for_cc,
        );
        self.next_epoch_number += 1;

        info!(
            start_height,
            end_height,
            nominations = epoch.nominations.len(),
            "closing epoch window"
        );

        if self.epoch_tx.send(epoch.clone()).await.is_err() {
            warn!("epoch channel closed; consumer gone");
        }

        if let Some(mv) = &monitor_vote {
            if self.monitor_vote_tx.send(mv.clone()).await.is_err() {
                warn!("monitor-vote channel closed; consumer gone");
            }
        }

        self.history.push(VoteInfoRecord {
            epoch,
            monitor_vote,
        });
        if self.history.len() > self.history_cap {
            let excess = self.history.len() - self.history_cap;
            self.history.drain(0..excess);
        }

        self.last_epoch_end_height = self.latest_finalized_height;

        let gc_window = 5 * self.num_blocks_in_epoch;
        if start_height > gc_window {
            self.buffer.gc_downward_from(start_height - gc_window);
        }
    }

    /// Used by the fast-sync primer (§4.5) to append already-known records
    /// without re-deriving them from mainchain blocks, and to advance the
    /// counters the pipeline will continue from. Forwards the primed epoch
    /// (and monitor-vote, if present) to the same output channels a
    /// regularly-closed window would use, so a consumer reading only the
    /// channels sees the primed history too.
    pub async fn absorb_primed_record(&mut self, record: VoteInfoRecord, blocks_covered: u64) {
        self.latest_finalized_height += blocks_covered;
        self.next_epoch_number = self.next_epoch_number.max(record.epoch.number + 1);

        if record.epoch.end_time != 0 && self.epoch_tx.send(record.epoch.clone()).await.is_err() {
            warn!("epoch channel closed; consumer gone");
        }
        if let Some(mv) = &record.monitor_vote {
            if self.monitor_vote_tx.send(mv.clone()).await.is_err() {
                warn!("monitor-vote channel closed; consumer gone");
            }
        }

        self.history.push(record);
        if self.history.len() > self.history_cap {
            let excess = self.history.len() - self.history_cap;
            self.history.drain(0..excess);
        }
    }

    pub fn finish_priming(&mut self) {
        self.last_epoch_end_height = self.latest_finalized_height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(height: u64, timestamp: i64) -> MainchainBlock {
        MainchainBlock {
            height,
            timestamp,
            nominations: vec![],
            cc_nominations: vec![],
        }
    }

    fn state(num_blocks_in_epoch: u64) -> (WatcherState, mpsc::Receiver<Epoch>, mpsc::Receiver<MonitorVoteInfo>) {
        let (epoch_tx, epoch_rx) = mpsc::channel(16);
        let (mv_tx, mv_rx) = mpsc::channel(16);
        (
            WatcherState::new(0, 0, num_blocks_in_epoch, 0, 5, epoch_tx, mv_tx),
            epoch_rx,
            mv_rx,
        )
    }

    #[tokio::test]
    async fn closes_window_and_emits_epoch() {
        let (mut st, mut epoch_rx, _mv_rx) = state(3);
        for h in 1..=3u64 {
            st.add_finalized_block(block(h, 100 + h as i64)).await;
        }

        let epoch = epoch_rx.try_recv().expect("epoch emitted");
        assert_eq!(epoch.start_height, 1);
        assert_eq!(epoch.end_height, 3);
        assert_eq!(st.latest_finalized_height(), 3);
    }

    #[tokio::test]
    #[should_panic(expected = "strict height monotonicity")]
    async fn rejects_height_gap() {
        let (mut st, _epoch_rx, _mv_rx) = state(3);
        st.add_finalized_block(block(2, 1)).await;
    }

    #[tokio::test]
    async fn history_is_capped() {
        let (mut st, mut epoch_rx, _mv_rx) = state(1);
        for h in 1..=7u64 {
            st.add_finalized_block(block(h, 1)).await;
            let _ = epoch_rx.try_recv();
        }
        assert!(st.history().len() <= 5);
    }

    #[tokio::test]
    async fn current_epoch_reflects_partial_window() {
        let (mut st, _epoch_rx, _mv_rx) = state(3);
        assert!(st.current_epoch().is_none(), "nothing finalized yet");

        st.add_finalized_block(block(1, 100)).await;
        st.add_finalized_block(block(2, 150)).await;

        let epoch = st.current_epoch().expect("two blocks landed in the window");
        assert_eq!(epoch.start_height, 1);
        assert_eq!(epoch.end_height, 2);
        assert_eq!(epoch.end_time, 150);

        let history = st.history_with_in_progress();
        assert_eq!(history.len(), 1, "only the in-progress epoch so far");
        assert_eq!(history[0].epoch.end_height, 2);
    }

    #[tokio::test]
    async fn current_epoch_is_none_right_after_a_close() {
        let (mut st, mut epoch_rx, _mv_rx) = state(2);
        st.add_finalized_block(block(1, 1)).await;
        st.add_finalized_block(block(2, 1)).await;
        let _ = epoch_rx.try_recv();

        assert!(st.current_epoch().is_none());
        assert_eq!(st.history_with_in_progress().len(), 1);
    }

    #[tokio::test]
    async fn gc_drops_blocks_past_five_epoch_lengths() {
        let (mut st, mut epoch_rx, _mv_rx) = state(10);
        for h in 1..=70u64 {
            st.add_finalized_block(block(h, 1)).await;
            let _ = epoch_rx.try_recv();
        }
        assert!(!st.buffer.contains(10), "height 10 should be gc'd by now");
        assert!(st.buffer.contains(70), "most recent heights stay buffered");
    }
}
