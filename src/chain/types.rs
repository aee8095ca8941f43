//! Chain family, network identifiers and per-family network configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A class of blockchain networks sharing one wallet-capability shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    Utxo,
    Cosmos,
    Evm,
}

impl ChainFamily {
    /// All families, in registry order.
    pub const ALL: [ChainFamily; 3] = [ChainFamily::Utxo, ChainFamily::Cosmos, ChainFamily::Evm];

    /// Stable lowercase label used in logs, metrics and session files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainFamily::Utxo => "utxo",
            ChainFamily::Cosmos => "cosmos",
            ChainFamily::Evm => "evm",
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a sub-network within a family (e.g. `signet`, `bbn-test-5`, `eip155:1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(pub String);

impl NetworkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NetworkId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static per-family network configuration.
///
/// Resolved once at startup from the selected [`NetworkProfile`] and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Family this configuration belongs to.
    pub family: ChainFamily,
    /// Sub-network identifier; connectors advertise support per id.
    pub network: NetworkId,
    /// Native coin symbol (e.g. "BTC", "BABY", "ETH").
    pub coin_symbol: String,
    /// RPC endpoint (CometBFT RPC for Cosmos, JSON-RPC for EVM, esplora-style for UTXO).
    pub rpc_url: String,
    /// REST endpoint for fee, UTXO and price lookups.
    pub api_url: Option<String>,
    /// EIP-155 chain id for EVM; 0 for families without a numeric id.
    pub numeric_id: u64,
}

/// Named network profile selecting one [`NetworkConfig`] per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkProfile {
    Mainnet,
    #[default]
    Testnet,
    Devnet,
}

impl NetworkProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkProfile::Mainnet => "mainnet",
            NetworkProfile::Testnet => "testnet",
            NetworkProfile::Devnet => "devnet",
        }
    }

    /// Built-in network configuration for `family` under this profile.
    pub fn preset(&self, family: ChainFamily) -> NetworkConfig {
        let (network, coin, rpc, api, numeric_id) = match (self, family) {
            (NetworkProfile::Mainnet, ChainFamily::Utxo) => (
                "mainnet",
                "BTC",
                "https://mempool.space/api",
                Some("https://mempool.space/api"),
                0,
            ),
            (NetworkProfile::Mainnet, ChainFamily::Cosmos) => (
                "bbn-1",
                "BABY",
                "https://babylon-rpc.polkachu.com",
                Some("https://babylon-api.polkachu.com"),
                0,
            ),
            (NetworkProfile::Mainnet, ChainFamily::Evm) => {
                ("eip155:1", "ETH", "https://ethereum-rpc.publicnode.com", None, 1)
            }
            (NetworkProfile::Testnet, ChainFamily::Utxo) => (
                "signet",
                "sBTC",
                "https://mempool.space/signet/api",
                Some("https://mempool.space/signet/api"),
                0,
            ),
            (NetworkProfile::Testnet, ChainFamily::Cosmos) => (
                "bbn-test-5",
                "tBABY",
                "https://babylon-testnet-rpc.polkachu.com",
                Some("https://babylon-testnet-api.polkachu.com"),
                0,
            ),
            (NetworkProfile::Testnet, ChainFamily::Evm) => (
                "eip155:11155111",
                "ETH",
                "https://ethereum-sepolia-rpc.publicnode.com",
                None,
                11_155_111,
            ),
            (NetworkProfile::Devnet, ChainFamily::Utxo) => (
                "regtest",
                "rBTC",
                "http://localhost:3002/api",
                Some("http://localhost:3002/api"),
                0,
            ),
            (NetworkProfile::Devnet, ChainFamily::Cosmos) => (
                "bbn-devnet",
                "BABY",
                "http://localhost:26657",
                Some("http://localhost:1317"),
                0,
            ),
            (NetworkProfile::Devnet, ChainFamily::Evm) => {
                ("eip155:31337", "ETH", "http://localhost:8545", None, 31_337)
            }
        };

        NetworkConfig {
            family,
            network: NetworkId::from(network),
            coin_symbol: coin.to_string(),
            rpc_url: rpc.to_string(),
            api_url: api.map(str::to_string),
            numeric_id,
        }
    }
}

impl std::str::FromStr for NetworkProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(NetworkProfile::Mainnet),
            "testnet" => Ok(NetworkProfile::Testnet),
            "devnet" => Ok(NetworkProfile::Devnet),
            other => Err(format!("unknown network profile '{other}'")),
        }
    }
}
