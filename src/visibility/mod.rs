//! Visibility-driven reconnection.
//!
//! # Data Flow
//! ```text
//! host: tab hidden / shown
//!     → VisibilitySource::set
//!     → each registered observer (watcher.rs)
//!     → after the configured delay, the reconnect callback
//! ```
//!
//! # Design Decisions
//! - One observer registration per `start`, removed by exactly that handle
//! - The callback is checked against an armed flag under a lock, so nothing fires after `stop`

pub mod source;
pub mod watcher;

pub use source::{Visibility, VisibilitySource};
pub use watcher::{VisibilityReconnectWatcher, WatchHandle};
