//! Startup orchestration.
//!
//! # Design Decisions
//! - Fail fast on RPC backend setup or an unreadable session path; a
//!   corrupt session file only loses the saved sessions
//! - Pure registry construction first, then managers, then the read path
//! - Connecting (sessions, RPC) is left to the caller

use std::sync::Arc;
use thiserror::Error;

use crate::chain::ChainFamily;
use crate::config::AppConfig;
use crate::connection::{LiveSettings, ManagerContext};
use crate::connectors::LocalKeyConnector;
use crate::lifecycle::hub::ConnectorHub;
use crate::observability::logging::LogLevelHandle;
use crate::observability::TracingRecorder;
use crate::registry::{ChainConfigBuilder, ConnectorCatalog, ConnectorRegistry};
use crate::rpc::{CosmosRpcBackend, RpcConnectionManager, RpcError};
use crate::session::SessionStore;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to load saved sessions: {0}")]
    Session(#[from] std::io::Error),

    #[error("Failed to set up RPC backend: {0}")]
    Rpc(#[from] RpcError),
}

/// Connectors this crate ships: the local-key EVM connector when
/// `CHAIN_CONNECT_EVM_PRIVATE_KEY` is set.
pub fn default_catalog() -> ConnectorCatalog {
    let mut catalog = ConnectorCatalog::new();
    match LocalKeyConnector::from_env() {
        Ok(connector) => {
            tracing::info!(address = %connector.address(), "Local key connector available");
            if let Err(e) = catalog.register(ChainFamily::Evm, connector.metadata()) {
                tracing::warn!(error = %e, "Local key connector not registered");
            }
        }
        Err(e) => tracing::debug!(error = %e, "Local key connector disabled"),
    }
    catalog
}

/// Build the registry, one manager per configured family and the Cosmos RPC
/// manager (when enabled and the Cosmos family is configured).
///
/// Must be called within a Tokio runtime.
pub fn build_hub(config: &AppConfig, catalog: &ConnectorCatalog) -> Result<ConnectorHub, StartupError> {
    let entries = ChainConfigBuilder::new(catalog).build(&config.network.selection());
    let registry = Arc::new(ConnectorRegistry::from_entries(entries));

    let session = match &config.session.path {
        Some(path) => SessionStore::load_from_file(path)?,
        None => SessionStore::default(),
    };

    let mut ctx = ManagerContext::new(registry.clone());
    ctx.settings = LiveSettings::new(config.connection.settings());
    ctx.session = Some(session);

    let hub = ConnectorHub::new(ctx, config.connection.reconnect_delay());

    let cosmos = registry.network(ChainFamily::Cosmos).filter(|_| config.rpc.enabled);
    let hub = match cosmos {
        Some(network) => {
            let backend = CosmosRpcBackend::for_network(network, config.rpc.request_timeout())?;
            let rpc = RpcConnectionManager::new(
                backend,
                ChainFamily::Cosmos,
                config.rpc.connect_timeout(),
                Arc::new(TracingRecorder),
            );
            hub.with_rpc(rpc)
        }
        None => hub,
    };

    tracing::info!(
        profile = config.network.profile.as_str(),
        families = ?registry.families().collect::<Vec<_>>(),
        rpc = hub.rpc().is_some(),
        "Connector hub ready"
    );
    Ok(hub)
}

/// Apply a reloaded configuration to a running process.
///
/// Connection settings and the log level take effect for work started
/// afterwards. Returns true when some other setting changed, which needs a
/// restart.
pub fn apply_config_update(
    settings: &LiveSettings,
    logging: Option<&LogLevelHandle>,
    current: &AppConfig,
    update: &AppConfig,
) -> bool {
    settings.store(update.connection.settings());

    if let Some(logging) = logging {
        if update.observability.log_level != current.observability.log_level {
            match logging.set_level(&update.observability.log_level) {
                Ok(()) => tracing::info!(level = %update.observability.log_level, "Log level changed"),
                Err(e) => tracing::warn!(error = %e, "Failed to change log level"),
            }
        }
    }

    let restart_required = update.network != current.network
        || update.rpc != current.rpc
        || update.session != current.session
        || update.connection.reconnect_delay_ms != current.connection.reconnect_delay_ms
        || update.observability.log_format != current.observability.log_format
        || update.observability.metrics_enabled != current.observability.metrics_enabled
        || update.observability.metrics_address != current.observability.metrics_address;

    if restart_required {
        tracing::warn!("Configuration reloaded; network, RPC, session and exporter settings apply on restart");
    } else {
        tracing::info!(
            connect_timeout_secs = update.connection.connect_timeout_secs,
            "Configuration reloaded"
        );
    }
    restart_required
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_build_hub_from_defaults() {
        let config = AppConfig::default();
        let hub = build_hub(&config, &ConnectorCatalog::new()).unwrap();

        assert_eq!(hub.managers().count(), 3);
        assert!(hub.rpc().is_some());
        assert!(hub.registry().list_connectors(ChainFamily::Evm).is_empty());
    }

    #[tokio::test]
    async fn test_rpc_disabled_or_cosmos_missing() {
        let mut config = AppConfig::default();
        config.rpc.enabled = false;
        assert!(build_hub(&config, &ConnectorCatalog::new()).unwrap().rpc().is_none());

        let mut config = AppConfig::default();
        config.network.families = [ChainFamily::Evm].into();
        let hub = build_hub(&config, &ConnectorCatalog::new()).unwrap();
        assert!(hub.rpc().is_none());
        assert!(hub.manager(ChainFamily::Cosmos).is_none());
    }

    #[tokio::test]
    async fn test_corrupt_session_file_does_not_block_startup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, "not json").unwrap();
        let mut config = AppConfig::default();
        config.session.path = Some(path);

        let hub = build_hub(&config, &ConnectorCatalog::new()).unwrap();

        assert!(hub.session().is_empty());
    }

    #[test]
    fn test_config_update_replaces_connection_settings() {
        let current = AppConfig::default();
        let settings = LiveSettings::new(current.connection.settings());

        let mut update = current.clone();
        update.connection.connect_timeout_secs = 5;
        update.connection.readiness_max_attempts = 3;

        assert!(!apply_config_update(&settings, None, &current, &update));
        let live = settings.load();
        assert_eq!(live.connect_timeout, Duration::from_secs(5));
        assert_eq!(live.readiness.max_attempts, 3);
    }

    #[test]
    fn test_config_update_flags_restart_only_settings() {
        let current = AppConfig::default();
        let settings = LiveSettings::new(current.connection.settings());

        let mut update = current.clone();
        update.network.profile = crate::chain::NetworkProfile::Devnet;
        assert!(apply_config_update(&settings, None, &current, &update));

        let mut update = current.clone();
        update.rpc.connect_timeout_secs = 10;
        assert!(apply_config_update(&settings, None, &current, &update));
        assert_eq!(settings.load(), current.connection.settings());
    }
}
