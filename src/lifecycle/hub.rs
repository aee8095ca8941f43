//! Composition root object tying the subsystems together.

use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::chain::ChainFamily;
use crate::connection::{ConnectResult, ConnectionManager, ConnectionStatus, LiveSettings, ManagerContext};
use crate::registry::ConnectorRegistry;
use crate::resilience::RetryPolicy;
use crate::rpc::{CosmosRpcBackend, RpcBackend, RpcClientPair, RpcConnectionManager, RpcResult, RpcStatus};
use crate::session::SessionStore;
use crate::shared::{SharedConfig, SharedConfigSlot};
use crate::visibility::{VisibilityReconnectWatcher, VisibilitySource, WatchHandle};

/// One [`ConnectionManager`] per registered family, the shared config slot,
/// the saved sessions and the optional Cosmos read path.
pub struct ConnectorHub<B: RpcBackend = CosmosRpcBackend> {
    registry: Arc<ConnectorRegistry>,
    managers: BTreeMap<ChainFamily, ConnectionManager>,
    shared_config: SharedConfigSlot,
    settings: LiveSettings,
    session: SessionStore,
    rpc: Option<RpcConnectionManager<B>>,
    reconnect_delay: Duration,
    watchers: Mutex<Vec<WatchHandle>>,
    followers: Mutex<Vec<JoinHandle<()>>>,
}

impl<B: RpcBackend> ConnectorHub<B> {
    /// Build managers for every family in `ctx.registry`. Without a session
    /// store in `ctx` an in-memory one is used.
    pub fn new(mut ctx: ManagerContext, reconnect_delay: Duration) -> Self {
        let session = ctx.session.get_or_insert_with(SessionStore::default).clone();
        let managers = ctx
            .registry
            .families()
            .filter_map(|family| {
                let network = ctx.registry.network(family)?.clone();
                Some((family, ConnectionManager::new(network, &ctx)))
            })
            .collect();

        Self {
            registry: ctx.registry.clone(),
            managers,
            shared_config: ctx.shared_config.clone(),
            settings: ctx.settings.clone(),
            session,
            rpc: None,
            reconnect_delay,
            watchers: Mutex::new(Vec::new()),
            followers: Mutex::new(Vec::new()),
        }
    }

    /// Attach the RPC manager and forward every family's connection events to it.
    ///
    /// Must be called within a Tokio runtime.
    pub fn with_rpc(mut self, rpc: RpcConnectionManager<B>) -> Self {
        let followers = self.managers.values().map(|m| rpc.follow(m.subscribe())).collect();
        *self.followers.get_mut().unwrap_or_else(PoisonError::into_inner) = followers;
        self.rpc = Some(rpc);
        self
    }

    pub fn registry(&self) -> &Arc<ConnectorRegistry> {
        &self.registry
    }

    pub fn manager(&self, family: ChainFamily) -> Option<&ConnectionManager> {
        self.managers.get(&family)
    }

    pub fn managers(&self) -> impl Iterator<Item = &ConnectionManager> {
        self.managers.values()
    }

    pub fn rpc(&self) -> Option<&RpcConnectionManager<B>> {
        self.rpc.as_ref()
    }

    pub fn shared_config(&self) -> &SharedConfigSlot {
        &self.shared_config
    }

    /// Connection settings read by every manager; store new ones to apply a reload.
    pub fn settings(&self) -> &LiveSettings {
        &self.settings
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Populate the shared config slot. Last write wins.
    ///
    /// An EVM wallet already connected stays bound to the configuration it
    /// was created with until it reconnects.
    pub fn set_shared_config(&self, config: SharedConfig) -> bool {
        if let Some(evm) = self.managers.get(&ChainFamily::Evm) {
            if evm.status() == ConnectionStatus::Connected {
                tracing::warn!(
                    network_label = %config.network_label,
                    "Shared configuration replaced while an EVM wallet is connected; it keeps the previous one until reconnect"
                );
            }
        }
        self.shared_config.set(config)
    }

    /// Resume every saved session concurrently.
    pub async fn resume_sessions(&self) -> Vec<(ChainFamily, ConnectResult)> {
        let attempts = self
            .managers
            .values()
            .map(|m| async move { m.resume().await.map(|result| (m.family(), result)) });
        join_all(attempts).await.into_iter().flatten().collect()
    }

    /// Connect the Cosmos read path against the configured endpoint, with retries.
    pub async fn start_rpc(&self, policy: RetryPolicy) -> Option<RpcResult<Arc<RpcClientPair<B>>>> {
        let rpc = self.rpc.as_ref()?;
        let endpoint = self.registry.network(rpc.family())?.rpc_url.clone();
        Some(rpc.connect_with_retry(&endpoint, policy).await)
    }

    /// On every Hidden → Visible transition of `source`, after the reconnect
    /// delay: retry wallets left in `Error` and reconnect the RPC clients if
    /// they are in `Error`.
    pub fn watch_visibility(&self, source: &VisibilitySource) {
        let managers: Vec<ConnectionManager> = self.managers.values().cloned().collect();
        let rpc = self.rpc.clone();

        let handle = VisibilityReconnectWatcher::start(source, self.reconnect_delay, move || {
            for manager in managers.iter().filter(|m| m.status() == ConnectionStatus::Error) {
                let manager = manager.clone();
                tokio::spawn(async move {
                    if let Some(Err(e)) = manager.retry().await {
                        tracing::debug!(family = %manager.family(), error = %e, "Visibility retry failed");
                    }
                });
            }
            if let Some(rpc) = rpc.as_ref().filter(|r| r.status() == RpcStatus::Error) {
                let rpc = rpc.clone();
                tokio::spawn(async move {
                    if let Err(e) = rpc.reconnect().await {
                        tracing::debug!(error = %e, "Visibility RPC reconnect failed");
                    }
                });
            }
        });

        self.watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Stop watchers, tear down the RPC clients and release every wallet.
    /// Saved sessions are kept.
    pub async fn teardown(&self) {
        let watchers = std::mem::take(&mut *self.watchers.lock().unwrap_or_else(PoisonError::into_inner));
        for mut watcher in watchers {
            watcher.stop();
        }
        let followers = std::mem::take(&mut *self.followers.lock().unwrap_or_else(PoisonError::into_inner));
        for follower in followers {
            follower.abort();
        }
        if let Some(rpc) = &self.rpc {
            rpc.teardown();
        }

        join_all(self.managers.values().map(|m| m.shutdown())).await;

        if let Err(e) = self.session.save() {
            tracing::warn!(error = %e, "Failed to save wallet sessions");
        }
        tracing::info!(families = self.managers.len(), "Connector hub torn down");
    }
}
