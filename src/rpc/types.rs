//! RPC client types, errors and the backend seam.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::chain::ChainFamily;
use crate::connection::types::{ErrorClass, ErrorDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcStatus {
    Idle,
    Connecting,
    Ready,
    Error,
}

impl RpcStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcStatus::Idle => "idle",
            RpcStatus::Connecting => "connecting",
            RpcStatus::Ready => "ready",
            RpcStatus::Error => "error",
        }
    }
}

/// Errors that can occur while establishing RPC clients.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    /// Endpoint unreachable or returned an unusable response.
    #[error("RPC unavailable: {0}")]
    Unavailable(String),

    #[error("RPC connect timed out after {0} seconds")]
    Timeout(u64),

    /// The node serves a different chain than configured.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: String, actual: String },

    /// `reconnect` called before any `connect`.
    #[error("No RPC endpoint to reconnect to")]
    NoEndpoint,

    /// A newer connect replaced this one.
    #[error("RPC connect superseded")]
    Superseded,

    #[error("RPC manager torn down")]
    TornDown,
}

impl RpcError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RpcError::Timeout(_) => ErrorClass::Timeout,
            _ => ErrorClass::RpcUnavailable,
        }
    }

    pub fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor::new(self.class(), self.to_string())
    }

    /// Whether another attempt against the same endpoint may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RpcError::Unavailable(_) | RpcError::Timeout(_))
    }
}

pub type RpcResult<T> = Result<T, RpcError>;

/// Builds the three clients for one endpoint.
///
/// The query client is derived from the low-level transport; the typed client
/// is connected on its own.
#[async_trait]
pub trait RpcBackend: Send + Sync + 'static {
    type Transport: Send + Sync + 'static;
    type Query: Send + Sync + 'static;
    type Typed: Send + Sync + 'static;

    async fn connect_transport(&self, endpoint: &str) -> RpcResult<Self::Transport>;

    fn derive_query(&self, transport: &Self::Transport) -> RpcResult<Self::Query>;

    async fn connect_typed(&self, endpoint: &str) -> RpcResult<Self::Typed>;
}

/// The published client set. Either all three exist or none is published.
pub struct RpcClientPair<B: RpcBackend> {
    pub low_level: Arc<B::Transport>,
    pub query: Arc<B::Query>,
    pub typed: Arc<B::Typed>,
}

impl<B: RpcBackend> Clone for RpcClientPair<B> {
    fn clone(&self) -> Self {
        Self {
            low_level: self.low_level.clone(),
            query: self.query.clone(),
            typed: self.typed.clone(),
        }
    }
}

impl<B: RpcBackend> fmt::Debug for RpcClientPair<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcClientPair").finish_non_exhaustive()
    }
}

/// Point-in-time view of the RPC manager.
pub struct RpcSnapshot<B: RpcBackend> {
    pub status: RpcStatus,
    pub endpoint: Option<String>,
    pub clients: Option<Arc<RpcClientPair<B>>>,
    pub last_error: Option<ErrorDescriptor>,
}

impl<B: RpcBackend> Clone for RpcSnapshot<B> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            endpoint: self.endpoint.clone(),
            clients: self.clients.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

impl<B: RpcBackend> fmt::Debug for RpcSnapshot<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcSnapshot")
            .field("status", &self.status)
            .field("endpoint", &self.endpoint)
            .field("has_clients", &self.clients.is_some())
            .field("last_error", &self.last_error)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcEvent {
    Ready { endpoint: String },
    Failed { error: ErrorDescriptor },
    /// A wallet connection changed; drop read-path data keyed by the old address or network.
    Invalidated { family: ChainFamily, reason: String },
    TornDown,
}
