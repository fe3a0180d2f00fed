//! The finalization buffer (§4.2): a bare height-keyed map owned exclusively
//! by the watcher's state. No public contract beyond insert/get/remove — the
//! aggregator is the only reader that matters, since the collector path
//! re-fetches block info rather than reading through this buffer.

use std::collections::BTreeMap;

use mainnet_watcher_primitives::MainchainBlock;

#[derive(Debug, Default)]
pub struct FinalizationBuffer {
    blocks: BTreeMap<u64, MainchainBlock>,
}

impl FinalizationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, block: MainchainBlock) {
        self.blocks.insert(block.height, block);
    }

    pub fn get(&self, height: u64) -> Option<&MainchainBlock> {
        self.blocks.get(&height)
    }

    pub fn contains(&self, height: u64) -> bool {
        self.blocks.contains_key(&height)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Walks downward from `from`, deleting every height present
    /// contiguously. Stops at the first gap, matching the teacher-style GC
    /// sweep described in §4.4.
    pub fn gc_downward_from(&mut self, from: u64) {
        let mut height = from;
        loop {
            if self.blocks.remove(&height).is_none() {
                break;
            }
            match height.checked_sub(1) {
                Some(next) => height = next,
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(height: u64) -> MainchainBlock {
        MainchainBlock {
            height,
            timestamp: 0,
            nominations: vec![],
            cc_nominations: vec![],
        }
    }

    #[test]
    fn gc_stops_at_first_gap() {
        let mut buf = FinalizationBuffer::new();
        buf.insert(block(5));
        buf.insert(block(4));
        buf.insert(block(2));

        buf.gc_downward_from(5);

        assert!(!buf.contains(5));
        assert!(!buf.contains(4));
        assert!(buf.contains(2), "height 2 sits past the gap at 3");
    }

    #[test]
    fn gc_from_zero_does_not_underflow() {
        let mut buf = FinalizationBuffer::new();
        buf.insert(block(0));
        buf.gc_downward_from(0);
        assert!(buf.is_empty());
    }
}
