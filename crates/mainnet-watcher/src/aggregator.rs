//! Pure window-close logic for the epoch aggregator (§4.4). Kept free of any
//! channel/lock concerns so the fold itself is exhaustively unit-testable;
//! [`crate::state::WatcherState`] wires this to the buffer and the outbound
//! channels.

use mainnet_watcher_primitives::{
    sort::{merge_cc_nominations, merge_nominations},
    Epoch, MainchainBlock, MonitorVoteInfo,
};

use crate::buffer::FinalizationBuffer;

/// Folds the half-open-inclusive window `[start_height, end_height]` out of
/// `buffer` into an [`Epoch`] and, when `start_height >= start_height_for_cc`,
/// a [`MonitorVoteInfo`].
///
/// # Panics
///
/// Panics if any height in the window is missing from `buffer`. Per §7, a
/// missing finalized block at this point is a programming invariant
/// violation, not a recoverable runtime condition — the derived epoch would
/// otherwise be non-deterministic.
pub fn close_window(
    buffer: &FinalizationBuffer,
    epoch_number: u64,
    start_height: u64,
    end_height: u64,
    start_height_for_cc: u64,
) -> (Epoch, Option<MonitorVoteInfo>) {
    let window: Vec<&MainchainBlock> = (start_height..=end_height)
        .map(|h| {
            buffer.get(h).unwrap_or_else(|| {
                panic!("finalized block at height {h} missing from buffer during epoch close")
            })
        })
        .collect();

    let end_time = window
        .iter()
        .map(|blk| blk.timestamp)
        .max()
        .expect("window must be non-empty");

    let epoch = Epoch {
        number: epoch_number,
        start_height,
        end_height,
        end_time,
        nominations: merge_nominations(&window),
    };

    let monitor_vote = (start_height >= start_height_for_cc).then(|| MonitorVoteInfo {
        start_height,
        end_time,
        nominations: merge_cc_nominations(&window),
    });

    (epoch, monitor_vote)
}
