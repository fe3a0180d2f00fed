//! A deterministic, in-memory [`MainchainClient`] for tests — no network,
//! no timing flakiness. Blocks are seeded up front; `get_latest_height`
//! reports whatever tip was configured.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use bitcoin::hashes::Hash as _;
use mainnet_watcher_primitives::{BlockInfo, MainchainBlock};

use crate::traits::MainchainClient;

pub struct MockMainchainClient {
    blocks: Mutex<HashMap<u64, MainchainBlock>>,
    tip: Mutex<u64>,
}

impl MockMainchainClient {
    pub fn new(tip: u64) -> Self {
        Self {
            blocks: Mutex::new(HashMap::new()),
            tip: Mutex::new(tip),
        }
    }

    pub fn insert_block(&self, block: MainchainBlock) {
        self.blocks.lock().unwrap().insert(block.height, block);
    }

    pub fn set_tip(&self, tip: u64) {
        *self.tip.lock().unwrap() = tip;
    }
}

#[async_trait]
impl MainchainClient for MockMainchainClient {
    async fn get_latest_height(&self, _retry_forever: bool) -> Option<u64> {
        Some(*self.tip.lock().unwrap())
    }

    async fn get_block_by_height(
        &self,
        height: u64,
        _retry_forever: bool,
    ) -> Option<MainchainBlock> {
        self.blocks.lock().unwrap().get(&height).cloned()
    }

    async fn get_block_info_by_height(
        &self,
        height: u64,
        _retry_forever: bool,
    ) -> Option<BlockInfo> {
        let blocks = self.blocks.lock().unwrap();
        blocks.get(&height).map(|b| BlockInfo {
            height: b.height,
            block_hash: bitcoin::BlockHash::all_zeros(),
            transactions: vec![],
        })
    }
}
