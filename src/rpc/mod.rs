//! RPC read-path subsystem.
//!
//! # Data Flow
//! ```text
//! connect(endpoint)
//!     → RpcBackend::connect_transport ─┐ (concurrently)
//!     → RpcBackend::connect_typed ─────┘
//!     → RpcBackend::derive_query(transport)
//!     → RpcClientPair published atomically, status Ready
//!
//! ConnectionEvent (wallet connected / lost / account changed)
//!     → manager.rs follow → RpcEvent::Invalidated
//! ```

pub mod cosmos;
pub mod manager;
pub mod types;

pub use cosmos::{CosmosQueryClient, CosmosRpcBackend, CosmosTypedClient};
pub use manager::RpcConnectionManager;
pub use types::{RpcBackend, RpcClientPair, RpcError, RpcEvent, RpcResult, RpcSnapshot, RpcStatus};
