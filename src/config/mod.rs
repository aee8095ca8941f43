//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, CHAIN_CONNECT_PROFILE override)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → network.selection() → ChainConfigBuilder
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → sent over an mpsc channel
//!     → lifecycle::apply_config_update: connection settings (LiveSettings)
//!       and log level live, everything else on restart
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{apply_env_overrides, load_config, parse_config, ConfigError};
pub use schema::{AppConfig, ConnectionConfig, NetworkOverride, NetworkSection, ObservabilityConfig, RpcConfig};
