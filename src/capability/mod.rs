//! Wallet capability contract.
//!
//! Every connector's factory produces a [`Capability`]: a tagged variant per
//! chain family, each satisfying the common [`WalletCapability`] shape
//! (address + disconnect hook) plus family-specific signing operations.
//!
//! ```text
//! WalletMetadata.factory
//!     → CapabilityFactory::create(FactoryContext)
//!     → Capability::{Utxo, Cosmos, Evm}
//!     → held by ConnectionManager while Connected
//! ```

pub mod cosmos;
pub mod evm;
pub mod utxo;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::chain::{ChainFamily, NetworkConfig};
use crate::connection::manager::ConnectorEventSink;
use crate::shared::SharedConfig;

pub use cosmos::CosmosCapability;
pub use evm::EvmCapability;
pub use utxo::UtxoCapability;

/// Errors raised by wallet backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    /// The user or the wallet backend rejected the request.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The backend does not support the requested network or operation.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The factory needs the host-provided shared configuration.
    #[error("Shared configuration not available")]
    SharedConfigMissing,

    /// The capability was already disconnected.
    #[error("Wallet disconnected")]
    Disconnected,

    /// Any other backend failure.
    #[error("Wallet backend error: {0}")]
    Backend(String),
}

pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Shape shared by all capability objects.
#[async_trait]
pub trait WalletCapability: Send + Sync {
    /// Current account address, in the family's native encoding.
    fn address(&self) -> String;

    /// Release backend resources. Called by `ConnectionManager::disconnect`.
    async fn disconnect(&self) -> CapabilityResult<()>;
}

/// A connected wallet, tagged by chain family.
#[derive(Clone)]
pub enum Capability {
    Utxo(Arc<dyn UtxoCapability>),
    Cosmos(Arc<dyn CosmosCapability>),
    Evm(Arc<dyn EvmCapability>),
}

impl Capability {
    pub fn family(&self) -> ChainFamily {
        match self {
            Capability::Utxo(_) => ChainFamily::Utxo,
            Capability::Cosmos(_) => ChainFamily::Cosmos,
            Capability::Evm(_) => ChainFamily::Evm,
        }
    }

    pub fn address(&self) -> String {
        match self {
            Capability::Utxo(c) => c.address(),
            Capability::Cosmos(c) => c.address(),
            Capability::Evm(c) => c.address(),
        }
    }

    pub async fn disconnect(&self) -> CapabilityResult<()> {
        match self {
            Capability::Utxo(c) => c.disconnect().await,
            Capability::Cosmos(c) => c.disconnect().await,
            Capability::Evm(c) => c.disconnect().await,
        }
    }

    pub fn as_utxo(&self) -> Option<&Arc<dyn UtxoCapability>> {
        match self {
            Capability::Utxo(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_cosmos(&self) -> Option<&Arc<dyn CosmosCapability>> {
        match self {
            Capability::Cosmos(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_evm(&self) -> Option<&Arc<dyn EvmCapability>> {
        match self {
            Capability::Evm(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("family", &self.family())
            .field("address", &self.address())
            .finish()
    }
}

/// Everything a factory receives when a connection is requested.
#[derive(Debug, Clone)]
pub struct FactoryContext {
    /// Network configuration of the family being connected.
    pub network: NetworkConfig,
    /// Host-provided shared configuration, when the slot is populated.
    pub shared_config: Option<Arc<SharedConfig>>,
    /// Channel back to the manager for lost-connection and account-change events.
    pub events: ConnectorEventSink,
}

/// Turns a wallet backend into a [`Capability`].
///
/// Implementations own their raw wallet handle; the manager only supplies the
/// network context.
#[async_trait]
pub trait CapabilityFactory: Send + Sync {
    async fn create(&self, ctx: FactoryContext) -> CapabilityResult<Capability>;
}
