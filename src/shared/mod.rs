//! Host-injected shared configuration.
//!
//! # Data Flow
//! ```text
//! host finishes its own async modal/adapter setup
//!     → SharedConfigSlot::set
//!     → EVM ConnectionManager reads it during connect
//!       (polling wait_ready when a connector requires it)
//! ```

pub mod slot;

pub use slot::{ExternalHandle, SharedConfig, SharedConfigSlot, SlotError};
