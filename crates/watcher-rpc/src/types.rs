//! Wire types for the mainchain's JSON-RPC 1.0 envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Request<'a> {
    pub jsonrpc: &'static str,
    pub id: &'a str,
    pub method: &'a str,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcErrorBody {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Response<R> {
    pub result: Option<R>,
    pub error: Option<RpcErrorBody>,
}

/// Raw shape returned by `getnominationblock`: a mainchain block annotated
/// with the staking/monitor nominations the watcher folds into epochs.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawNominationBlock {
    pub height: u64,
    pub time: i64,
    #[serde(default)]
    pub nominations: Vec<RawNomination>,
    #[serde(default)]
    pub cc_nominations: Vec<RawCcNomination>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawNomination {
    pub pubkey: String,
    pub count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawCcNomination {
    pub pubkey: String,
    pub count: u64,
    #[serde(default)]
    pub metadata: String,
}

/// Raw shape returned by `getblockinfo`: height, hash, and raw transaction
/// hex, sufficient for the UTXO parser.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawBlockInfo {
    pub height: u64,
    pub hash: String,
    pub tx: Vec<String>,
}
