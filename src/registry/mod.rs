//! Connector registry subsystem.
//!
//! # Data Flow
//! ```text
//! ConnectorCatalog (host registers every known connector)
//!     + ChainSelection (families, network configs, allow list)
//!     → builder.rs ChainConfigBuilder::build (pure)
//!     → Vec<ChainRegistryEntry>
//!     → connector_registry.rs ConnectorRegistry (immutable, Arc-shared)
//!     → one ConnectionManager per entry
//! ```

pub mod builder;
pub mod catalog;
pub mod connector_registry;
pub mod metadata;

pub use builder::{ChainConfigBuilder, ChainRegistryEntry, ChainSelection};
pub use catalog::{ConnectorCatalog, RegistryError};
pub use connector_registry::ConnectorRegistry;
pub use metadata::{IconRef, WalletMetadata};
