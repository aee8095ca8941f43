//! Chain families and their network configuration.
//!
//! # Data Flow
//! ```text
//! NetworkProfile (mainnet / testnet / devnet)
//!     → preset per ChainFamily
//!     → config overrides (config/schema.rs)
//!     → NetworkConfig, immutable for the process lifetime
//! ```

pub mod types;

pub use types::{ChainFamily, NetworkConfig, NetworkId, NetworkProfile};
