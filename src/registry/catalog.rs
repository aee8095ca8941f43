//! All connectors the host knows about, before network selection.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::chain::ChainFamily;
use crate::registry::metadata::WalletMetadata;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Connector '{id}' is already registered for {family}")]
    DuplicateConnector { family: ChainFamily, id: String },
}

/// Ordered connector list per family, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ConnectorCatalog {
    connectors: BTreeMap<ChainFamily, Vec<WalletMetadata>>,
}

impl ConnectorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        family: ChainFamily,
        metadata: WalletMetadata,
    ) -> Result<(), RegistryError> {
        let list = self.connectors.entry(family).or_default();
        if list.iter().any(|m| m.id == metadata.id) {
            return Err(RegistryError::DuplicateConnector {
                family,
                id: metadata.id,
            });
        }
        tracing::debug!(%family, connector = %metadata.id, "Connector registered");
        list.push(metadata);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, family: ChainFamily, metadata: WalletMetadata) -> Result<Self, RegistryError> {
        self.register(family, metadata)?;
        Ok(self)
    }

    pub fn connectors(&self, family: ChainFamily) -> &[WalletMetadata] {
        self.connectors.get(&family).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.connectors.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
