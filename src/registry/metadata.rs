//! Connector descriptors.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::capability::CapabilityFactory;
use crate::chain::NetworkId;

/// Opaque reference to a connector icon (asset path, data URI, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IconRef(pub String);

/// Metadata and capability factory for one wallet backend.
#[derive(Clone)]
pub struct WalletMetadata {
    /// Unique per family.
    pub id: String,
    pub display_name: String,
    pub icon: IconRef,
    pub docs_url: Option<String>,
    pub supported_networks: BTreeSet<NetworkId>,
    /// Connect waits for the host's shared config before calling the factory.
    pub requires_shared_config: bool,
    pub factory: Arc<dyn CapabilityFactory>,
}

impl WalletMetadata {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        factory: Arc<dyn CapabilityFactory>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            icon: IconRef::default(),
            docs_url: None,
            supported_networks: BTreeSet::new(),
            requires_shared_config: false,
            factory,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = IconRef(icon.into());
        self
    }

    pub fn with_docs_url(mut self, url: impl Into<String>) -> Self {
        self.docs_url = Some(url.into());
        self
    }

    pub fn with_networks<I, N>(mut self, networks: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NetworkId>,
    {
        self.supported_networks.extend(networks.into_iter().map(Into::into));
        self
    }

    pub fn requiring_shared_config(mut self) -> Self {
        self.requires_shared_config = true;
        self
    }

    pub fn supports(&self, network: &NetworkId) -> bool {
        self.supported_networks.contains(network)
    }
}

impl PartialEq for WalletMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.display_name == other.display_name
            && self.icon == other.icon
            && self.docs_url == other.docs_url
            && self.supported_networks == other.supported_networks
            && self.requires_shared_config == other.requires_shared_config
            && std::ptr::addr_eq(Arc::as_ptr(&self.factory), Arc::as_ptr(&other.factory))
    }
}

impl Eq for WalletMetadata {}

impl fmt::Debug for WalletMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletMetadata")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("docs_url", &self.docs_url)
            .field("supported_networks", &self.supported_networks)
            .field("requires_shared_config", &self.requires_shared_config)
            .finish_non_exhaustive()
    }
}
