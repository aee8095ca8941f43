//! Wallet connection lifecycle.
//!
//! # Data Flow
//! ```text
//! connect(connector_id)
//!     → ConnectorRegistry::find_connector
//!     → manager.rs (coalesce / start attempt, generation += 1)
//!     → CapabilityFactory::create (bounded by connect_timeout)
//!     → state Connected | Error, ConnectionEvent broadcast
//! ```

pub mod manager;
pub mod types;

pub use manager::{
    ConnectResult, ConnectionManager, ConnectionSettings, ConnectorEventSink, LiveSettings, ManagerContext,
};
pub use types::{
    ConnectError, ConnectionEvent, ConnectionState, ConnectionStatus, ConnectorEvent, ErrorClass,
    ErrorDescriptor,
};
