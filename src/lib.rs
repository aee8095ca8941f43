//! Multi-chain wallet connection core.
//!
//! Connects wallets for three chain families (UTXO, Cosmos, EVM), keeps one
//! canonical connection state per family, injects the host's shared
//! configuration into EVM connectors and manages the Cosmos RPC read path.

// Chain model and connector registry
pub mod chain;
pub mod registry;

// Connection lifecycle
pub mod capability;
pub mod connection;
pub mod connectors;
pub mod rpc;
pub mod session;
pub mod shared;
pub mod visibility;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

#[cfg(test)]
pub(crate) mod test_support;

pub use chain::{ChainFamily, NetworkConfig, NetworkId, NetworkProfile};
pub use config::AppConfig;
pub use connection::{ConnectError, ConnectionManager, ConnectionState, ConnectionStatus};
pub use lifecycle::{ConnectorHub, Shutdown};
pub use registry::{ChainConfigBuilder, ConnectorCatalog, ConnectorRegistry, WalletMetadata};
pub use shared::{SharedConfig, SharedConfigSlot};
