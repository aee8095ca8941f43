//! Built-in connectors.
//!
//! Browser-extension and modal wallets are registered by the host through
//! [`ConnectorCatalog`](crate::registry::ConnectorCatalog); this crate ships
//! only the local-key EVM connector used for devnets and tests.

pub mod local_key;

pub use local_key::{LocalKeyConnector, LocalKeyWallet, LOCAL_KEY_CONNECTOR_ID, PRIVATE_KEY_ENV_VAR};
