//! CometBFT JSON-RPC backend for the Cosmos family.
//!
//! # Responsibilities
//! - Open a JSON-RPC transport to a CometBFT node
//! - Derive an ABCI query client from it
//! - Connect a typed client and verify the node's chain id against configuration

use alloy::primitives::hex;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::chain::NetworkConfig;
use crate::rpc::types::{RpcBackend, RpcError, RpcResult};

/// JSON-RPC envelope returned by CometBFT.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeStatus {
    pub node_info: NodeInfo,
    pub sync_info: SyncInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeInfo {
    /// The chain id.
    pub network: String,
    #[serde(default)]
    pub moniker: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncInfo {
    /// Decimal string, as CometBFT encodes 64-bit integers.
    pub latest_block_height: String,
    #[serde(default)]
    pub latest_block_hash: String,
    #[serde(default)]
    pub catching_up: bool,
}

impl SyncInfo {
    pub fn height(&self) -> RpcResult<u64> {
        parse_height(&self.latest_block_height)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AbciQueryResponse {
    pub code: u32,
    pub log: String,
    /// Base64-encoded value.
    pub value: Option<String>,
    pub height: String,
}

#[derive(Debug, Deserialize)]
struct AbciQueryResult {
    response: AbciQueryResponse,
}

#[derive(Debug, Deserialize)]
struct BlockResult {
    block_id: BlockId,
    block: Block,
}

#[derive(Debug, Deserialize)]
struct BlockId {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct Block {
    header: BlockHeader,
    #[serde(default)]
    data: BlockData,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    chain_id: String,
    height: String,
    time: String,
}

#[derive(Debug, Default, Deserialize)]
struct BlockData {
    #[serde(default)]
    txs: Option<Vec<String>>,
}

/// Header fields of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSummary {
    pub height: u64,
    pub chain_id: String,
    pub hash: String,
    pub time: String,
    pub tx_count: usize,
}

fn parse_height(raw: &str) -> RpcResult<u64> {
    raw.parse()
        .map_err(|_| RpcError::Unavailable(format!("Invalid block height '{raw}'")))
}

/// Low-level JSON-RPC transport.
#[derive(Clone)]
pub struct CometClient {
    http: reqwest::Client,
    endpoint: String,
    request_timeout: Duration,
    next_id: Arc<AtomicU64>,
}

impl CometClient {
    fn new(http: reqwest::Client, endpoint: &str, request_timeout: Duration) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
            request_timeout,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call `method` and deserialize its `result`.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> RpcResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Unavailable(format!(
                "{} returned HTTP {status} for {method}",
                self.endpoint
            )));
        }

        let envelope: JsonRpcResponse<T> = response.json().await.map_err(|e| self.transport_error(e))?;
        if let Some(error) = envelope.error {
            return Err(RpcError::Unavailable(format!(
                "{method} failed ({}): {}{}",
                error.code,
                error.message,
                error.data.map(|d| format!(" ({d})")).unwrap_or_default()
            )));
        }
        envelope
            .result
            .ok_or_else(|| RpcError::Unavailable(format!("{method} returned no result")))
    }

    fn transport_error(&self, e: reqwest::Error) -> RpcError {
        if e.is_timeout() {
            RpcError::Timeout(self.request_timeout.as_secs())
        } else {
            RpcError::Unavailable(format!("{}: {e}", self.endpoint))
        }
    }

    pub async fn status(&self) -> RpcResult<NodeStatus> {
        self.call("status", json!({})).await
    }
}

impl std::fmt::Debug for CometClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CometClient")
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.request_timeout.as_secs())
            .finish()
    }
}

/// ABCI query client sharing the transport.
#[derive(Debug, Clone)]
pub struct CosmosQueryClient {
    comet: CometClient,
}

impl CosmosQueryClient {
    /// Run an ABCI query. `height` of `None` queries the latest state.
    pub async fn abci_query(&self, path: &str, data: &[u8], height: Option<u64>) -> RpcResult<AbciQueryResponse> {
        let params = json!({
            "path": path,
            "data": hex::encode(data),
            "height": height.unwrap_or(0).to_string(),
            "prove": false,
        });
        let result: AbciQueryResult = self.comet.call("abci_query", params).await?;
        let response = result.response;
        if response.code != 0 {
            return Err(RpcError::Unavailable(format!(
                "ABCI query {path} failed with code {}: {}",
                response.code, response.log
            )));
        }
        Ok(response)
    }

    pub async fn latest_height(&self) -> RpcResult<u64> {
        self.comet.status().await?.sync_info.height()
    }
}

/// Typed client bound to a verified chain id.
#[derive(Debug, Clone)]
pub struct CosmosTypedClient {
    comet: CometClient,
    chain_id: String,
}

impl CosmosTypedClient {
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub async fn height(&self) -> RpcResult<u64> {
        self.comet.status().await?.sync_info.height()
    }

    /// Block at `height`, or the latest block.
    pub async fn block(&self, height: Option<u64>) -> RpcResult<BlockSummary> {
        let params = match height {
            Some(h) => json!({ "height": h.to_string() }),
            None => json!({}),
        };
        let result: BlockResult = self.comet.call("block", params).await?;
        Ok(BlockSummary {
            height: parse_height(&result.block.header.height)?,
            chain_id: result.block.header.chain_id,
            hash: result.block_id.hash,
            time: result.block.header.time,
            tx_count: result.block.data.txs.map_or(0, |txs| txs.len()),
        })
    }
}

/// [`RpcBackend`] speaking CometBFT JSON-RPC over HTTP.
#[derive(Debug, Clone)]
pub struct CosmosRpcBackend {
    http: reqwest::Client,
    expected_chain_id: String,
    request_timeout: Duration,
}

impl CosmosRpcBackend {
    pub fn new(expected_chain_id: impl Into<String>, request_timeout: Duration) -> RpcResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RpcError::Unavailable(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            expected_chain_id: expected_chain_id.into(),
            request_timeout,
        })
    }

    /// Backend expecting the chain id of `network`.
    pub fn for_network(network: &NetworkConfig, request_timeout: Duration) -> RpcResult<Self> {
        Self::new(network.network.as_str(), request_timeout)
    }

    pub fn expected_chain_id(&self) -> &str {
        &self.expected_chain_id
    }

    fn client(&self, endpoint: &str) -> RpcResult<CometClient> {
        url::Url::parse(endpoint)
            .map_err(|e| RpcError::Unavailable(format!("Invalid RPC URL '{endpoint}': {e}")))?;
        Ok(CometClient::new(self.http.clone(), endpoint, self.request_timeout))
    }
}

#[async_trait]
impl RpcBackend for CosmosRpcBackend {
    type Transport = CometClient;
    type Query = CosmosQueryClient;
    type Typed = CosmosTypedClient;

    async fn connect_transport(&self, endpoint: &str) -> RpcResult<CometClient> {
        let client = self.client(endpoint)?;
        let status = client.status().await?;
        tracing::debug!(
            endpoint,
            moniker = %status.node_info.moniker,
            height = %status.sync_info.latest_block_height,
            catching_up = status.sync_info.catching_up,
            "CometBFT transport connected"
        );
        Ok(client)
    }

    fn derive_query(&self, transport: &CometClient) -> RpcResult<CosmosQueryClient> {
        Ok(CosmosQueryClient {
            comet: transport.clone(),
        })
    }

    async fn connect_typed(&self, endpoint: &str) -> RpcResult<CosmosTypedClient> {
        let comet = self.client(endpoint)?;
        let chain_id = comet.status().await?.node_info.network;
        if chain_id != self.expected_chain_id {
            return Err(RpcError::ChainMismatch {
                expected: self.expected_chain_id.clone(),
                actual: chain_id,
            });
        }
        Ok(CosmosTypedClient { comet, chain_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_deserialization() {
        let raw = r#"{
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "node_info": { "network": "bbn-test-5", "moniker": "node0", "version": "0.38.12" },
                "sync_info": { "latest_block_height": "123456", "latest_block_hash": "ABCD", "catching_up": false }
            }
        }"#;
        let envelope: JsonRpcResponse<NodeStatus> = serde_json::from_str(raw).unwrap();
        let status = envelope.result.unwrap();
        assert_eq!(status.node_info.network, "bbn-test-5");
        assert_eq!(status.sync_info.height().unwrap(), 123_456);
    }

    #[test]
    fn test_error_envelope() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32603,"message":"Internal error","data":"height too high"}}"#;
        let envelope: JsonRpcResponse<NodeStatus> = serde_json::from_str(raw).unwrap();
        assert!(envelope.result.is_none());
        assert_eq!(envelope.error.unwrap().data.as_deref(), Some("height too high"));
    }

    #[test]
    fn test_block_without_txs() {
        let raw = r#"{
            "block_id": { "hash": "F00D" },
            "block": { "header": { "chain_id": "bbn-1", "height": "7", "time": "2024-01-01T00:00:00Z" }, "data": { "txs": null } }
        }"#;
        let block: BlockResult = serde_json::from_str(raw).unwrap();
        assert!(block.block.data.txs.is_none());
        assert_eq!(parse_height(&block.block.header.height).unwrap(), 7);
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let backend = CosmosRpcBackend::new("bbn-test-5", Duration::from_secs(5)).unwrap();
        assert!(matches!(backend.client("not a url"), Err(RpcError::Unavailable(_))));
        assert!(parse_height("abc").is_err());
    }
}
