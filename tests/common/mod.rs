//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chain_connect::capability::cosmos::{AccountData, AminoSignResponse, DirectSignResponse, SignDoc};
use chain_connect::capability::utxo::{MessageSigningKind, SignPsbtOptions};
use chain_connect::capability::{
    Capability, CapabilityError, CapabilityFactory, CapabilityResult, CosmosCapability, FactoryContext,
    UtxoCapability, WalletCapability,
};
use chain_connect::{ChainFamily, NetworkId, WalletMetadata};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Wallet double for the UTXO and Cosmos families.
pub struct TestWallet {
    pub address: String,
    disconnected: AtomicBool,
}

impl TestWallet {
    pub fn is_live(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletCapability for TestWallet {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn disconnect(&self) -> CapabilityResult<()> {
        self.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl UtxoCapability for TestWallet {
    async fn public_key_hex(&self) -> CapabilityResult<String> {
        Ok("02".repeat(33))
    }

    async fn network(&self) -> CapabilityResult<NetworkId> {
        Ok(NetworkId::new("regtest"))
    }

    async fn sign_psbt(&self, psbt_hex: &str, _options: &SignPsbtOptions) -> CapabilityResult<String> {
        Ok(format!("{psbt_hex}00"))
    }

    async fn sign_message(&self, message: &str, _kind: MessageSigningKind) -> CapabilityResult<String> {
        Ok(format!("sig({message})"))
    }
}

#[async_trait]
impl CosmosCapability for TestWallet {
    async fn accounts(&self) -> CapabilityResult<Vec<AccountData>> {
        Ok(vec![AccountData {
            address: self.address.clone(),
            algo: "secp256k1".into(),
            pubkey: vec![3; 33],
        }])
    }

    async fn sign_direct(&self, _signer: &str, _doc: SignDoc) -> CapabilityResult<DirectSignResponse> {
        Err(CapabilityError::Unsupported("direct signing".into()))
    }

    async fn sign_amino(&self, _signer: &str, _doc: Value) -> CapabilityResult<AminoSignResponse> {
        Err(CapabilityError::Unsupported("amino signing".into()))
    }
}

/// Factory producing [`TestWallet`]s after an optional delay.
pub struct TestConnector {
    family: ChainFamily,
    delay: Duration,
    calls: AtomicUsize,
    wallets: Mutex<Vec<Arc<TestWallet>>>,
}

impl TestConnector {
    pub fn new(family: ChainFamily, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            family,
            delay,
            calls: AtomicUsize::new(0),
            wallets: Mutex::new(Vec::new()),
        })
    }

    pub fn metadata(self: &Arc<Self>, id: &str, networks: &[&str]) -> WalletMetadata {
        WalletMetadata::new(id, id, self.clone()).with_networks(networks.iter().copied())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn live_wallets(&self) -> Vec<Arc<TestWallet>> {
        self.wallets.lock().unwrap().iter().filter(|w| w.is_live()).cloned().collect()
    }
}

#[async_trait]
impl CapabilityFactory for TestConnector {
    async fn create(&self, ctx: FactoryContext) -> CapabilityResult<Capability> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let wallet = Arc::new(TestWallet {
            address: format!("{}-{}-{n}", self.family, ctx.network.network),
            disconnected: AtomicBool::new(false),
        });
        self.wallets.lock().unwrap().push(wallet.clone());
        match self.family {
            ChainFamily::Utxo => Ok(Capability::Utxo(wallet)),
            ChainFamily::Cosmos => Ok(Capability::Cosmos(wallet)),
            ChainFamily::Evm => Err(CapabilityError::Unsupported("use LocalKeyConnector for EVM".into())),
        }
    }
}

/// Programmable CometBFT JSON-RPC node.
#[derive(Clone)]
pub struct MockCometNode {
    pub addr: SocketAddr,
    chain_id: Arc<Mutex<String>>,
    failures_left: Arc<AtomicUsize>,
    down: Arc<AtomicBool>,
    pub requests: Arc<AtomicUsize>,
}

impl MockCometNode {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer every request with HTTP 503 until `set_down(false)`.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Answer the next `n` requests with HTTP 503.
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn set_chain_id(&self, chain_id: &str) {
        *self.chain_id.lock().unwrap() = chain_id.to_string();
    }

    fn respond(&self, request: &Value) -> (u16, String) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst)
            || self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return (503, "unavailable".to_string());
        }

        let chain_id = self.chain_id.lock().unwrap().clone();
        let id = request.get("id").cloned().unwrap_or(json!(1));
        let result = match request.get("method").and_then(Value::as_str) {
            Some("status") => json!({
                "node_info": { "network": chain_id, "moniker": "mock", "version": "0.38.0" },
                "sync_info": { "latest_block_height": "42", "latest_block_hash": "ABCDEF", "catching_up": false }
            }),
            Some("block") => {
                let height = request["params"]["height"].as_str().unwrap_or("42").to_string();
                json!({
                    "block_id": { "hash": "ABCDEF" },
                    "block": {
                        "header": { "chain_id": chain_id, "height": height, "time": "2024-06-01T00:00:00Z" },
                        "data": { "txs": ["dHgx"] }
                    }
                })
            }
            Some("abci_query") => json!({
                "response": { "code": 0, "log": "", "value": "AQID", "height": "42" }
            }),
            other => {
                return (
                    200,
                    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": -32601, "message": format!("Method not found: {other:?}") } })
                        .to_string(),
                )
            }
        };
        (200, json!({ "jsonrpc": "2.0", "id": id, "result": result }).to_string())
    }
}

/// Start a mock CometBFT node on an ephemeral port.
pub async fn start_mock_comet(chain_id: &str) -> MockCometNode {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let node = MockCometNode {
        addr: listener.local_addr().unwrap(),
        chain_id: Arc::new(Mutex::new(chain_id.to_string())),
        failures_left: Arc::new(AtomicUsize::new(0)),
        down: Arc::new(AtomicBool::new(false)),
        requests: Arc::new(AtomicUsize::new(0)),
    };

    let server = node.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let server = server.clone();
                    tokio::spawn(async move {
                        let _ = serve_connection(socket, &server).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    node
}

async fn serve_connection(mut socket: TcpStream, node: &MockCometNode) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let request: Value = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);
    let (status, body) = node.respond(&request);
    let status_text = match status {
        200 => "200 OK",
        _ => "503 Service Unavailable",
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

/// A local address with nothing listening on it.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
