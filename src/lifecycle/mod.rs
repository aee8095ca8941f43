//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     AppConfig + ConnectorCatalog
//!     → ChainConfigBuilder → ConnectorRegistry
//!     → hub.rs ConnectorHub (managers, shared config slot, sessions, RPC)
//!
//! Running (hub.rs):
//!     resume_sessions, start_rpc, watch_visibility
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger → ConnectorHub::teardown
//! ```
//!
//! # Design Decisions
//! - Teardown keeps saved sessions so the next start can resume them

pub mod hub;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use hub::ConnectorHub;
pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{apply_config_update, build_hub, default_catalog, StartupError};
