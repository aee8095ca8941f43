//! Connection state, error taxonomy and events.

use serde::Serialize;
use thiserror::Error;

use crate::capability::Capability;
use crate::chain::{ChainFamily, NetworkId};

/// Lifecycle status of one family's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        }
    }

    /// Connected or Connecting.
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionStatus::Connected | ConnectionStatus::Connecting)
    }
}

/// Cause class shown to users and used for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    UnknownConnector,
    ConnectFailed,
    ConfigNotInitialized,
    RpcUnavailable,
    Timeout,
    ConnectionLost,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::UnknownConnector => "unknown_connector",
            ErrorClass::ConnectFailed => "connect_failed",
            ErrorClass::ConfigNotInitialized => "config_not_initialized",
            ErrorClass::RpcUnavailable => "rpc_unavailable",
            ErrorClass::Timeout => "timeout",
            ErrorClass::ConnectionLost => "connection_lost",
        }
    }

    /// Whether repeating the same request can succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorClass::UnknownConnector)
    }
}

/// Captured failure stored in component state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDescriptor {
    pub class: ErrorClass,
    pub message: String,
    pub retryable: bool,
}

impl ErrorDescriptor {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            retryable: class.is_retryable(),
        }
    }
}

/// Errors returned by `ConnectionManager::connect`.
///
/// Clone so coalesced callers can all receive the same outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Unknown connector '{connector_id}' for {family}")]
    UnknownConnector {
        family: ChainFamily,
        connector_id: String,
    },

    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    #[error("Shared configuration not initialized")]
    ConfigNotInitialized,

    #[error("Connect timed out after {0} seconds")]
    Timeout(u64),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// A disconnect (or loss) arrived while the attempt was pending; its result was discarded.
    #[error("Connect attempt superseded")]
    Superseded,
}

impl ConnectError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ConnectError::UnknownConnector { .. } => ErrorClass::UnknownConnector,
            ConnectError::ConnectFailed(_) | ConnectError::Superseded => ErrorClass::ConnectFailed,
            ConnectError::ConfigNotInitialized => ErrorClass::ConfigNotInitialized,
            ConnectError::Timeout(_) => ErrorClass::Timeout,
            ConnectError::ConnectionLost(_) => ErrorClass::ConnectionLost,
        }
    }

    pub fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor::new(self.class(), self.to_string())
    }
}

/// Immutable snapshot of one family's connection.
///
/// May be stale as soon as it is returned.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    pub family: ChainFamily,
    pub status: ConnectionStatus,
    /// Connector of the current, pending or last failed attempt.
    pub active_connector_id: Option<String>,
    /// Set only while Connected.
    pub capability: Option<Capability>,
    pub last_error: Option<ErrorDescriptor>,
}

impl ConnectionState {
    pub fn disconnected(family: ChainFamily) -> Self {
        Self {
            family,
            status: ConnectionStatus::Disconnected,
            active_connector_id: None,
            capability: None,
            last_error: None,
        }
    }

    pub fn address(&self) -> Option<String> {
        self.capability.as_ref().map(Capability::address)
    }
}

/// Notifications for collaborators holding data keyed by address or network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected {
        family: ChainFamily,
        connector_id: String,
        address: String,
        network: NetworkId,
    },
    Disconnected {
        family: ChainFamily,
    },
    Failed {
        family: ChainFamily,
        error: ErrorDescriptor,
    },
    Lost {
        family: ChainFamily,
        reason: String,
    },
    AccountChanged {
        family: ChainFamily,
        address: String,
    },
}

impl ConnectionEvent {
    pub fn family(&self) -> ChainFamily {
        match self {
            ConnectionEvent::Connected { family, .. }
            | ConnectionEvent::Disconnected { family }
            | ConnectionEvent::Failed { family, .. }
            | ConnectionEvent::Lost { family, .. }
            | ConnectionEvent::AccountChanged { family, .. } => *family,
        }
    }

    /// Whether cached data keyed by the old address/network is now stale.
    pub fn invalidates_cache(&self) -> bool {
        !matches!(self, ConnectionEvent::Failed { .. })
    }
}

/// Events a live wallet backend reports back to its manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorEvent {
    Lost(String),
    AccountChanged(String),
}
