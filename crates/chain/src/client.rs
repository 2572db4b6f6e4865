use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::trace;

use fsp_types::Address;

use crate::wire::{hex_serde, Block, BlockHeader, Log, RawBlock};

/// Errors from the JSON-RPC transport.
///
/// These always bubble out of the observer loop; a supervisor is expected
/// to restart the process.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("rpc transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("rpc response carried no result")]
    MissingResult,
    #[error("malformed rpc payload: {0}")]
    Decode(String),
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

/// Thin JSON-RPC 2.0 client over HTTP.
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request<R: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<R, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!(method, id, "rpc request");
        let body = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let response: RpcResponse<R> = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        response.result.ok_or(RpcError::MissingResult)
    }

    async fn quantity(&self, method: &str, params: serde_json::Value) -> Result<u64, RpcError> {
        let raw: String = self.request(method, params).await?;
        hex_serde::parse_u64(&raw).map_err(|e| RpcError::Decode(e.to_string()))
    }

    pub async fn chain_id(&self) -> Result<u64, RpcError> {
        self.quantity("eth_chainId", json!([])).await
    }

    pub async fn block_number(&self) -> Result<u64, RpcError> {
        self.quantity("eth_blockNumber", json!([])).await
    }

    /// Header fields only; the cheap variant used for alignment and the
    /// boundary search.
    pub async fn block_header(&self, number: u64) -> Result<BlockHeader, RpcError> {
        self.request(
            "eth_getBlockByNumber",
            json!([format!("0x{number:x}"), false]),
        )
        .await
    }

    /// Full block with transaction bodies; timestamps are attached to every
    /// transaction on the way out.
    pub async fn block_with_transactions(&self, number: u64) -> Result<Block, RpcError> {
        let raw: RawBlock = self
            .request(
                "eth_getBlockByNumber",
                json!([format!("0x{number:x}"), true]),
            )
            .await?;
        Ok(raw.into())
    }

    /// Logs emitted by `addresses` in the inclusive block range.
    pub async fn logs(
        &self,
        addresses: &[Address],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, RpcError> {
        self.request(
            "eth_getLogs",
            json!([{
                "address": addresses,
                "fromBlock": format!("0x{from_block:x}"),
                "toBlock": format!("0x{to_block:x}"),
            }]),
        )
        .await
    }

    /// `eth_call` against the latest block; returns the raw return data.
    pub async fn call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, RpcError> {
        let raw: String = self
            .request(
                "eth_call",
                json!([{
                    "to": to,
                    "data": format!("0x{}", hex::encode(data)),
                }, "latest"]),
            )
            .await?;
        hex::decode(hex_serde::strip(&raw)).map_err(|e| RpcError::Decode(e.to_string()))
    }
}
