//! Saved wallet sessions.
//!
//! `ConnectionManager` records the connector on every successful connect and
//! forgets it on an explicit disconnect; `resume` reads it back at startup.

pub mod store;

pub use store::{SessionEntry, SessionStore};
