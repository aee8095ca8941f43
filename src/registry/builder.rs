//! Registry entries from a declarative chain selection.
//!
//! # Design Decisions
//! - Pure: no I/O, no global state; identical input gives equal output
//! - A family without network configuration is dropped, not an error
//! - So is a family whose configuration names another family
//! - Allow-list filtering may leave an entry with no connectors

use std::collections::{BTreeMap, BTreeSet};

use crate::chain::{ChainFamily, NetworkConfig};
use crate::registry::catalog::ConnectorCatalog;
use crate::registry::metadata::WalletMetadata;

/// What the application wants to connect to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainSelection {
    pub families: BTreeSet<ChainFamily>,
    pub network_configs: BTreeMap<ChainFamily, NetworkConfig>,
    /// When set, only connectors with these ids are kept.
    pub connector_allow_list: Option<BTreeSet<String>>,
}

/// One family's connectors plus its network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRegistryEntry {
    pub family: ChainFamily,
    pub connectors: Vec<WalletMetadata>,
    pub network: NetworkConfig,
}

pub struct ChainConfigBuilder<'a> {
    catalog: &'a ConnectorCatalog,
}

impl<'a> ChainConfigBuilder<'a> {
    pub fn new(catalog: &'a ConnectorCatalog) -> Self {
        Self { catalog }
    }

    /// Entries in family order, connectors in catalog order.
    pub fn build(&self, selection: &ChainSelection) -> Vec<ChainRegistryEntry> {
        selection
            .families
            .iter()
            .filter_map(|family| {
                let network = selection.network_configs.get(family)?;
                if network.family != *family {
                    tracing::warn!(
                        %family,
                        configured = %network.family,
                        network = %network.network,
                        "Network configuration belongs to another family, skipping"
                    );
                    return None;
                }
                let connectors = self
                    .catalog
                    .connectors(*family)
                    .iter()
                    .filter(|m| {
                        selection
                            .connector_allow_list
                            .as_ref()
                            .map_or(true, |allowed| allowed.contains(&m.id))
                    })
                    .cloned()
                    .collect();

                Some(ChainRegistryEntry {
                    family: *family,
                    connectors,
                    network: network.clone(),
                })
            })
            .collect()
    }
}
