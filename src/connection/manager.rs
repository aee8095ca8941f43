//! Per-family connection state machine.
//!
//! # State Transitions
//! ```text
//! Disconnected --connect--> Connecting --success--> Connected
//! Disconnected --connect--> Connecting --failure--> Error
//! Connected    --disconnect--> Disconnected
//! Error        --connect--> Connecting (retry)
//! Connected/Connecting --connector lost--> Error
//! ```
//!
//! # Design Decisions
//! - Each attempt runs as a spawned task behind a shared future; concurrent
//!   `connect` calls attach to it instead of starting a second attempt
//! - Every attempt carries a generation; `disconnect` and losses bump it, so a
//!   late result is discarded and its capability released
//! - The state mutex is never held across an await

use arc_swap::ArcSwap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::capability::{Capability, CapabilityError, FactoryContext};
use crate::chain::{ChainFamily, NetworkConfig};
use crate::connection::types::{
    ConnectError, ConnectionEvent, ConnectionState, ConnectionStatus, ConnectorEvent,
};
use crate::observability::metrics;
use crate::observability::recorder::{ErrorRecorder, TracingRecorder};
use crate::registry::{ConnectorRegistry, WalletMetadata};
use crate::resilience::RetryPolicy;
use crate::session::SessionStore;
use crate::shared::SharedConfigSlot;

pub type ConnectResult = Result<ConnectionState, ConnectError>;

type SharedAttempt = Shared<BoxFuture<'static, ConnectResult>>;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Tunables for connect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Upper bound on one factory call.
    pub connect_timeout: Duration,
    /// How long to wait for the shared config when a connector requires it.
    pub readiness: RetryPolicy,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(60),
            readiness: RetryPolicy::default(),
        }
    }
}

/// [`ConnectionSettings`] shared by every manager of a hub and replaced on
/// config reload. Each attempt reads them once when it starts.
#[derive(Clone)]
pub struct LiveSettings {
    inner: Arc<ArcSwap<ConnectionSettings>>,
}

impl LiveSettings {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(settings)),
        }
    }

    pub fn load(&self) -> ConnectionSettings {
        **self.inner.load()
    }

    pub fn store(&self, settings: ConnectionSettings) {
        self.inner.store(Arc::new(settings));
    }
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self::new(ConnectionSettings::default())
    }
}

impl fmt::Debug for LiveSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LiveSettings").field(&self.load()).finish()
    }
}

/// Collaborators shared by every manager built at the composition root.
#[derive(Clone)]
pub struct ManagerContext {
    pub registry: Arc<ConnectorRegistry>,
    pub shared_config: SharedConfigSlot,
    pub settings: LiveSettings,
    pub recorder: Arc<dyn ErrorRecorder>,
    pub session: Option<SessionStore>,
}

impl ManagerContext {
    pub fn new(registry: Arc<ConnectorRegistry>) -> Self {
        Self {
            registry,
            shared_config: SharedConfigSlot::new(),
            settings: LiveSettings::default(),
            recorder: Arc::new(TracingRecorder),
            session: None,
        }
    }
}

/// Owns the single canonical connection of one chain family.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    network: NetworkConfig,
    registry: Arc<ConnectorRegistry>,
    shared_config: SharedConfigSlot,
    settings: LiveSettings,
    recorder: Arc<dyn ErrorRecorder>,
    session: Option<SessionStore>,
    events: broadcast::Sender<ConnectionEvent>,
    state: Mutex<ManagerState>,
}

struct ManagerState {
    current: ConnectionState,
    generation: u64,
    in_flight: Option<InFlight>,
}

struct InFlight {
    generation: u64,
    connector_id: String,
    attempt: SharedAttempt,
}

enum Plan {
    AlreadyConnected(ConnectionState),
    Join(SharedAttempt),
    Start(SharedAttempt),
}

impl ConnectionManager {
    /// Create a manager in `Disconnected` for `network.family`.
    pub fn new(network: NetworkConfig, ctx: &ManagerContext) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let family = network.family;
        Self {
            inner: Arc::new(ManagerInner {
                network,
                registry: ctx.registry.clone(),
                shared_config: ctx.shared_config.clone(),
                settings: ctx.settings.clone(),
                recorder: ctx.recorder.clone(),
                session: ctx.session.clone(),
                events,
                state: Mutex::new(ManagerState {
                    current: ConnectionState::disconnected(family),
                    generation: 0,
                    in_flight: None,
                }),
            }),
        }
    }

    pub fn family(&self) -> ChainFamily {
        self.inner.network.family
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.inner.network
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ConnectionState {
        self.lock().current.clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.lock().current.status
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.events.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ConnectionEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    /// Connect with `connector_id`.
    ///
    /// An unknown id fails immediately and leaves the state untouched. While an
    /// attempt is in flight every caller receives that attempt's result.
    /// Connecting the connector that is already connected returns the current state.
    pub async fn connect(&self, connector_id: &str) -> ConnectResult {
        let family = self.family();
        let metadata = self.inner.registry.find_connector(family, connector_id)?.clone();

        let plan = {
            let mut state = self.lock();
            if let Some(in_flight) = &state.in_flight {
                if in_flight.connector_id != connector_id {
                    tracing::debug!(
                        %family,
                        requested = connector_id,
                        in_flight = %in_flight.connector_id,
                        "Connect already in flight, joining it"
                    );
                }
                Plan::Join(in_flight.attempt.clone())
            } else if state.current.status == ConnectionStatus::Connected
                && state.current.active_connector_id.as_deref() == Some(connector_id)
            {
                Plan::AlreadyConnected(state.current.clone())
            } else {
                let replaced = state.current.capability.take();
                state.generation += 1;
                let generation = state.generation;
                state.current = ConnectionState {
                    family,
                    status: ConnectionStatus::Connecting,
                    active_connector_id: Some(connector_id.to_string()),
                    capability: None,
                    last_error: None,
                };
                // Published before the previous wallet is released so callers
                // arriving meanwhile join this attempt.
                let attempt = self.spawn_attempt(metadata, generation, replaced);
                state.in_flight = Some(InFlight {
                    generation,
                    connector_id: connector_id.to_string(),
                    attempt: attempt.clone(),
                });
                Plan::Start(attempt)
            }
        };

        match plan {
            Plan::AlreadyConnected(state) => Ok(state),
            Plan::Join(attempt) => attempt.await,
            Plan::Start(attempt) => {
                metrics::record_connection_status(family, ConnectionStatus::Connecting);
                attempt.await
            }
        }
    }

    /// Spawn one attempt. A wallet being replaced is released, and its
    /// `Disconnected` emitted, before the factory runs.
    fn spawn_attempt(
        &self,
        metadata: WalletMetadata,
        generation: u64,
        replaced: Option<Capability>,
    ) -> SharedAttempt {
        let manager = self.clone();
        let connector_id = metadata.id.clone();
        let task = tokio::spawn(async move {
            if let Some(previous) = replaced {
                let family = manager.family();
                tracing::info!(%family, "Switching connector, releasing previous wallet");
                manager.release(previous).await;
                manager.emit(ConnectionEvent::Disconnected { family });

                if manager.lock().generation != generation {
                    return manager
                        .finish(&metadata.id, generation, Err(ConnectError::Superseded))
                        .await;
                }
            }
            let outcome = manager.run_factory(&metadata, generation).await;
            manager.finish(&metadata.id, generation, outcome).await
        });

        let weak = Arc::downgrade(&self.inner);
        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => match weak.upgrade() {
                    Some(inner) => {
                        let outcome = Err(ConnectError::ConnectFailed(format!("connect task failed: {e}")));
                        ConnectionManager { inner }.finish(&connector_id, generation, outcome).await
                    }
                    None => Err(ConnectError::Superseded),
                },
            }
        }
        .boxed()
        .shared()
    }

    async fn run_factory(
        &self,
        metadata: &WalletMetadata,
        generation: u64,
    ) -> Result<Capability, ConnectError> {
        let inner = &self.inner;
        let family = inner.network.family;
        let settings = inner.settings.load();

        if !metadata.supports(&inner.network.network) {
            return Err(ConnectError::ConnectFailed(format!(
                "connector '{}' does not support network {}",
                metadata.id, inner.network.network
            )));
        }

        let shared_config = if metadata.requires_shared_config {
            match inner.shared_config.wait_ready(settings.readiness).await {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!(%family, connector = %metadata.id, error = %e, "Shared configuration never became available");
                    return Err(ConnectError::ConfigNotInitialized);
                }
            }
        } else if family == ChainFamily::Evm {
            inner.shared_config.get().ok()
        } else {
            None
        };

        let ctx = FactoryContext {
            network: inner.network.clone(),
            shared_config,
            events: ConnectorEventSink {
                manager: Arc::downgrade(&self.inner),
                generation,
            },
        };

        tracing::info!(%family, connector = %metadata.id, generation, "Connecting");
        metrics::record_connect_attempt(family, &metadata.id);

        let capability = match timeout(settings.connect_timeout, metadata.factory.create(ctx)).await {
            Ok(Ok(capability)) => capability,
            Ok(Err(CapabilityError::SharedConfigMissing)) => return Err(ConnectError::ConfigNotInitialized),
            Ok(Err(e)) => return Err(ConnectError::ConnectFailed(e.to_string())),
            Err(_) => return Err(ConnectError::Timeout(settings.connect_timeout.as_secs())),
        };

        if capability.family() != family {
            let produced = capability.family();
            self.release(capability).await;
            return Err(ConnectError::ConnectFailed(format!(
                "connector '{}' produced a {produced} capability for {family}",
                metadata.id
            )));
        }

        Ok(capability)
    }

    /// Apply an attempt's outcome unless a newer generation superseded it.
    async fn finish(
        &self,
        connector_id: &str,
        generation: u64,
        outcome: Result<Capability, ConnectError>,
    ) -> ConnectResult {
        let family = self.family();

        let (result, stale) = {
            let mut state = self.lock();
            if state.in_flight.as_ref().is_some_and(|f| f.generation == generation) {
                state.in_flight = None;
            }

            if state.generation != generation {
                (Err(ConnectError::Superseded), outcome.ok())
            } else {
                match outcome {
                    Ok(capability) => {
                        state.current = ConnectionState {
                            family,
                            status: ConnectionStatus::Connected,
                            active_connector_id: Some(connector_id.to_string()),
                            capability: Some(capability),
                            last_error: None,
                        };
                        (Ok(state.current.clone()), None)
                    }
                    Err(error) => {
                        state.current = ConnectionState {
                            family,
                            status: ConnectionStatus::Error,
                            active_connector_id: Some(connector_id.to_string()),
                            capability: None,
                            last_error: Some(error.descriptor()),
                        };
                        (Err(error), None)
                    }
                }
            }
        };

        match &result {
            Ok(state) => {
                let address = state.address().unwrap_or_default();
                tracing::info!(%family, connector = connector_id, %address, "Connected");
                metrics::record_connection_status(family, ConnectionStatus::Connected);
                if let Some(session) = &self.inner.session {
                    session.record(family, connector_id, &self.inner.network.network);
                }
                self.emit(ConnectionEvent::Connected {
                    family,
                    connector_id: connector_id.to_string(),
                    address,
                    network: self.inner.network.network.clone(),
                });
            }
            Err(ConnectError::Superseded) => {
                tracing::debug!(%family, connector = connector_id, generation, "Discarding superseded connect result");
                if let Some(capability) = stale {
                    self.release(capability).await;
                }
            }
            Err(error) => {
                let descriptor = error.descriptor();
                tracing::warn!(%family, connector = connector_id, error = %error, "Connect failed");
                metrics::record_connection_status(family, ConnectionStatus::Error);
                self.inner.recorder.record(family.as_str(), &descriptor);
                self.emit(ConnectionEvent::Failed {
                    family,
                    error: descriptor,
                });
            }
        }

        result
    }

    async fn release(&self, capability: Capability) {
        if let Err(e) = capability.disconnect().await {
            tracing::warn!(family = %self.family(), error = %e, "Wallet disconnect hook failed");
        }
    }

    /// End in `Disconnected` from any state and forget the saved session.
    ///
    /// Supersedes a pending connect. Idempotent.
    pub async fn disconnect(&self) {
        self.close(true).await;
    }

    /// Like [`disconnect`](Self::disconnect) but keeps the saved session so
    /// the next start can resume it.
    pub async fn shutdown(&self) {
        self.close(false).await;
    }

    async fn close(&self, forget_session: bool) {
        let family = self.family();
        let released = {
            let mut state = self.lock();
            if state.current.status == ConnectionStatus::Disconnected && state.in_flight.is_none() {
                None
            } else {
                state.generation += 1;
                state.in_flight = None;
                let capability = state.current.capability.take();
                state.current = ConnectionState::disconnected(family);
                Some(capability)
            }
        };

        if forget_session {
            if let Some(session) = &self.inner.session {
                session.clear(family);
            }
        }

        let Some(capability) = released else {
            tracing::debug!(%family, "Already disconnected");
            return;
        };
        if let Some(capability) = capability {
            self.release(capability).await;
        }

        tracing::info!(%family, "Disconnected");
        metrics::record_connection_status(family, ConnectionStatus::Disconnected);
        self.emit(ConnectionEvent::Disconnected { family });
    }

    /// Report an externally observed loss of the wallet connection.
    pub fn connection_lost(&self, reason: impl Into<String>) {
        self.mark_lost(None, reason.into());
    }

    fn on_connector_event(&self, generation: u64, event: ConnectorEvent) {
        let family = self.family();
        match event {
            ConnectorEvent::Lost(reason) => self.mark_lost(Some(generation), reason),
            ConnectorEvent::AccountChanged(address) => {
                let current = {
                    let state = self.lock();
                    state.generation == generation && state.current.status == ConnectionStatus::Connected
                };
                if current {
                    tracing::info!(%family, %address, "Account changed");
                    self.emit(ConnectionEvent::AccountChanged { family, address });
                }
            }
        }
    }

    fn mark_lost(&self, generation: Option<u64>, reason: String) {
        let family = self.family();
        let error = ConnectError::ConnectionLost(reason.clone());
        let lost = {
            let mut state = self.lock();
            let stale = generation.is_some_and(|g| g != state.generation);
            if stale || !state.current.status.is_active() {
                false
            } else {
                state.generation += 1;
                state.in_flight = None;
                state.current = ConnectionState {
                    family,
                    status: ConnectionStatus::Error,
                    active_connector_id: state.current.active_connector_id.take(),
                    capability: None,
                    last_error: Some(error.descriptor()),
                };
                true
            }
        };

        if !lost {
            tracing::debug!(%family, %reason, "Ignoring loss event for inactive or stale connection");
            return;
        }

        tracing::warn!(%family, %reason, "Connection lost");
        metrics::record_connection_status(family, ConnectionStatus::Error);
        self.inner.recorder.record(family.as_str(), &error.descriptor());
        self.emit(ConnectionEvent::Lost { family, reason });
    }

    /// Reconnect the last connector after an error. `None` when not in `Error`.
    pub async fn retry(&self) -> Option<ConnectResult> {
        let connector_id = {
            let state = self.lock();
            if state.current.status != ConnectionStatus::Error {
                return None;
            }
            state.current.active_connector_id.clone()?
        };
        tracing::info!(family = %self.family(), connector = %connector_id, "Retrying connection");
        Some(self.connect(&connector_id).await)
    }

    /// Reconnect the connector saved in the session store, if any.
    pub async fn resume(&self) -> Option<ConnectResult> {
        let family = self.family();
        let session = self.inner.session.as_ref()?;
        let entry = session.get(family)?;

        if entry.network != self.inner.network.network {
            tracing::info!(%family, saved = %entry.network, current = %self.inner.network.network, "Saved session belongs to another network, dropping it");
            session.clear(family);
            return None;
        }

        tracing::info!(%family, connector = %entry.connector_id, "Resuming saved session");
        let result = self.connect(&entry.connector_id).await;
        if matches!(result, Err(ConnectError::UnknownConnector { .. })) {
            session.clear(family);
        }
        Some(result)
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ConnectionManager")
            .field("family", &self.inner.network.family)
            .field("network", &self.inner.network.network)
            .field("status", &state.current.status)
            .field("generation", &state.generation)
            .finish()
    }
}

/// Handle given to a factory so its capability can report connector events.
///
/// Bound to the attempt's generation: events from a replaced connection are ignored.
#[derive(Clone)]
pub struct ConnectorEventSink {
    manager: Weak<ManagerInner>,
    generation: u64,
}

impl ConnectorEventSink {
    /// A sink not attached to any manager; events go nowhere.
    pub fn detached() -> Self {
        Self {
            manager: Weak::new(),
            generation: 0,
        }
    }

    pub fn send(&self, event: ConnectorEvent) {
        if let Some(inner) = self.manager.upgrade() {
            ConnectionManager { inner }.on_connector_event(self.generation, event);
        }
    }

    pub fn lost(&self, reason: impl Into<String>) {
        self.send(ConnectorEvent::Lost(reason.into()));
    }

    pub fn account_changed(&self, address: impl Into<String>) {
        self.send(ConnectorEvent::AccountChanged(address.into()));
    }
}

impl fmt::Debug for ConnectorEventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorEventSink")
            .field("generation", &self.generation)
            .field("attached", &(self.manager.strong_count() > 0))
            .finish()
    }
}
