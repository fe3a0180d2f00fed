use std::str::FromStr;

use base64::Engine;
use bitcoin::{consensus::deserialize, hex::FromHex, BlockHash, Transaction};
use mainnet_watcher_primitives::{
    block::BlockInfo, nomination::CcNomination, nomination::Nomination, pubkey::Pubkey32,
    pubkey::Pubkey33, MainchainBlock,
};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::warn;

use crate::{
    error::ClientError,
    retry::{retry_forever as retry_until_some, Backoff},
    traits::MainchainClient,
    types::{RawBlockInfo, RawCcNomination, RawNomination, RawNominationBlock, Request, Response},
};

/// Thin JSON-RPC 1.0 client over HTTP, speaking the bitcoind-style envelope
/// (single `Authorization: Basic` header, `{jsonrpc, id, method, params}`
/// request bodies) that a BCH-derived mainchain node exposes.
#[derive(Debug, Clone)]
pub struct HttpMainchainClient {
    url: String,
    http: reqwest::Client,
    backoff: Backoff,
}

impl HttpMainchainClient {
    pub fn new(url: String, username: String, password: String) -> Result<Self, ClientError> {
        if username.is_empty() || password.is_empty() {
            return Err(ClientError::MissingCredentials);
        }

        let mut headers = HeaderMap::new();
        let creds = base64::engine::general_purpose::STANDARD
            .encode(format!("{username}:{password}"));
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Basic {creds}"))
                .map_err(|e| ClientError::MalformedResponse(e.to_string()))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        Ok(Self {
            url,
            http,
            backoff: Backoff::default(),
        })
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<R, ClientError> {
        let body = Request {
            jsonrpc: "1.0",
            id: method,
            method,
            params,
        };

        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status(status, text));
        }

        let parsed: Response<R> = resp
            .json()
            .await
            .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(ClientError::Server {
                code: err.code,
                message: err.message,
            });
        }

        parsed
            .result
            .ok_or_else(|| ClientError::MalformedResponse("missing result".into()))
    }

    async fn try_latest_height(&self) -> Option<u64> {
        match self.call::<u64>("getblockcount", vec![]).await {
            Ok(height) => Some(height),
            Err(e) => {
                warn!(error = %e, "getblockcount failed");
                None
            }
        }
    }

    async fn try_block_by_height(&self, height: u64) -> Option<MainchainBlock> {
        match self
            .call::<RawNominationBlock>("getnominationblock", vec![json!(height)])
            .await
        {
            Ok(raw) => decode_nomination_block(raw).ok(),
            Err(e) => {
                warn!(height, error = %e, "getnominationblock failed");
                None
            }
        }
    }

    async fn try_block_info_by_height(&self, height: u64) -> Option<BlockInfo> {
        match self
            .call::<RawBlockInfo>("getblockinfo", vec![json!(height)])
            .await
        {
            Ok(raw) => decode_block_info(raw).ok(),
            Err(e) => {
                warn!(height, error = %e, "getblockinfo failed");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl MainchainClient for HttpMainchainClient {
    async fn get_latest_height(&self, retry_forever: bool) -> Option<u64> {
        if retry_forever {
            Some(
                retry_until_some("getblockcount", self.backoff, || async {
                    self.try_latest_height().await.filter(|h| *h > 0)
                })
                .await,
            )
        } else {
            self.try_latest_height().await
        }
    }

    async fn get_block_by_height(
        &self,
        height: u64,
        retry_forever: bool,
    ) -> Option<MainchainBlock> {
        if retry_forever {
            Some(
                retry_until_some("getnominationblock", self.backoff, || async {
                    self.try_block_by_height(height).await
                })
                .await,
            )
        } else {
            self.try_block_by_height(height).await
        }
    }

    async fn get_block_info_by_height(
        &self,
        height: u64,
        retry_forever: bool,
    ) -> Option<BlockInfo> {
        if retry_forever {
            Some(
                retry_until_some("getblockinfo", self.backoff, || async {
                    self.try_block_info_by_height(height).await
                })
                .await,
            )
        } else {
            self.try_block_info_by_height(height).await
        }
    }
}

fn decode_pubkey32(s: &str) -> Result<Pubkey32, ClientError> {
    let bytes = hex::decode(s).map_err(|e| ClientError::MalformedResponse(e.to_string()))?;
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| ClientError::MalformedResponse("expected 32-byte pubkey".into()))?;
    Ok(Pubkey32(arr))
}

fn decode_pubkey33(s: &str) -> Result<Pubkey33, ClientError> {
    let bytes = hex::decode(s).map_err(|e| ClientError::MalformedResponse(e.to_string()))?;
    let arr: [u8; 33] = bytes
        .try_into()
        .map_err(|_| ClientError::MalformedResponse("expected 33-byte pubkey".into()))?;
    Ok(Pubkey33(arr))
}

fn decode_nomination_block(raw: RawNominationBlock) -> Result<MainchainBlock, ClientError> {
    let nominations = raw
        .nominations
        .into_iter()
        .map(|n: RawNomination| -> Result<Nomination, ClientError> {
            Ok(Nomination {
                pubkey: decode_pubkey32(&n.pubkey)?,
                count: n.count,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let cc_nominations = raw
        .cc_nominations
        .into_iter()
        .map(|n: RawCcNomination| -> Result<CcNomination, ClientError> {
            Ok(CcNomination {
                pubkey: decode_pubkey33(&n.pubkey)?,
                count: n.count,
                metadata: hex::decode(&n.metadata)
                    .map_err(|e| ClientError::MalformedResponse(e.to_string()))?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MainchainBlock {
        height: raw.height,
        timestamp: raw.time,
        nominations,
        cc_nominations,
    })
}

fn decode_block_info(raw: RawBlockInfo) -> Result<BlockInfo, ClientError> {
    let block_hash = BlockHash::from_str(&raw.hash)
        .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;

    let transactions = raw
        .tx
        .iter()
        .map(|hex_tx| -> Result<Transaction, ClientError> {
            let bytes =
                Vec::from_hex(hex_tx).map_err(|e| ClientError::MalformedResponse(e.to_string()))?;
            deserialize(&bytes).map_err(|e| ClientError::MalformedResponse(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BlockInfo {
        height: raw.height,
        block_hash,
        transactions,
    })
}
