//! Read-only connector lookup, built once at composition time.

use std::collections::BTreeMap;

use crate::chain::{ChainFamily, NetworkConfig};
use crate::connection::types::ConnectError;
use crate::registry::builder::ChainRegistryEntry;
use crate::registry::metadata::WalletMetadata;

/// Immutable after construction; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ConnectorRegistry {
    entries: BTreeMap<ChainFamily, ChainRegistryEntry>,
}

impl ConnectorRegistry {
    /// Index builder output by family. A later entry for the same family replaces an earlier one.
    pub fn from_entries(entries: impl IntoIterator<Item = ChainRegistryEntry>) -> Self {
        let entries = entries.into_iter().map(|e| (e.family, e)).collect::<BTreeMap<_, _>>();
        for entry in entries.values() {
            tracing::info!(
                family = %entry.family,
                network = %entry.network.network,
                connectors = entry.connectors.len(),
                "Chain registered"
            );
        }
        Self { entries }
    }

    pub fn find_connector(
        &self,
        family: ChainFamily,
        connector_id: &str,
    ) -> Result<&WalletMetadata, ConnectError> {
        self.list_connectors(family)
            .iter()
            .find(|m| m.id == connector_id)
            .ok_or_else(|| ConnectError::UnknownConnector {
                family,
                connector_id: connector_id.to_string(),
            })
    }

    /// Connectors in registration order; empty for an unregistered family.
    pub fn list_connectors(&self, family: ChainFamily) -> &[WalletMetadata] {
        self.entries
            .get(&family)
            .map(|e| e.connectors.as_slice())
            .unwrap_or(&[])
    }

    pub fn network(&self, family: ChainFamily) -> Option<&NetworkConfig> {
        self.entries.get(&family).map(|e| &e.network)
    }

    pub fn families(&self) -> impl Iterator<Item = ChainFamily> + '_ {
        self.entries.keys().copied()
    }

    pub fn entry(&self, family: ChainFamily) -> Option<&ChainRegistryEntry> {
        self.entries.get(&family)
    }
}
