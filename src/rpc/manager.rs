//! RPC client lifecycle for one chain family.
//!
//! # Design Decisions
//! - Clients are cleared when a connect starts, so `Ready` always means a
//!   complete client set is published
//! - A generation counter discards results of superseded connects
//! - After `teardown` every late result is discarded and new connects fail

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::chain::ChainFamily;
use crate::connection::types::{ConnectionEvent, ErrorDescriptor};
use crate::observability::metrics;
use crate::observability::recorder::ErrorRecorder;
use crate::resilience::{retry_with, RetryPolicy};
use crate::rpc::types::{RpcBackend, RpcClientPair, RpcError, RpcEvent, RpcResult, RpcSnapshot, RpcStatus};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Owns the RPC clients of one family's read path.
pub struct RpcConnectionManager<B: RpcBackend> {
    inner: Arc<RpcInner<B>>,
}

impl<B: RpcBackend> Clone for RpcConnectionManager<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct RpcInner<B: RpcBackend> {
    backend: B,
    family: ChainFamily,
    connect_timeout: Duration,
    recorder: Arc<dyn ErrorRecorder>,
    events: broadcast::Sender<RpcEvent>,
    state: Mutex<RpcState<B>>,
}

struct RpcState<B: RpcBackend> {
    status: RpcStatus,
    endpoint: Option<String>,
    clients: Option<Arc<RpcClientPair<B>>>,
    last_error: Option<ErrorDescriptor>,
    generation: u64,
    torn_down: bool,
}

impl<B: RpcBackend> RpcConnectionManager<B> {
    pub fn new(
        backend: B,
        family: ChainFamily,
        connect_timeout: Duration,
        recorder: Arc<dyn ErrorRecorder>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(RpcInner {
                backend,
                family,
                connect_timeout,
                recorder,
                events,
                state: Mutex::new(RpcState {
                    status: RpcStatus::Idle,
                    endpoint: None,
                    clients: None,
                    last_error: None,
                    generation: 0,
                    torn_down: false,
                }),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RpcState<B>> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn family(&self) -> ChainFamily {
        self.inner.family
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    pub fn status(&self) -> RpcStatus {
        self.lock().status
    }

    /// Published clients; `Some` exactly while `Ready`.
    pub fn clients(&self) -> Option<Arc<RpcClientPair<B>>> {
        self.lock().clients.clone()
    }

    pub fn snapshot(&self) -> RpcSnapshot<B> {
        let state = self.lock();
        RpcSnapshot {
            status: state.status,
            endpoint: state.endpoint.clone(),
            clients: state.clients.clone(),
            last_error: state.last_error.clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RpcEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: RpcEvent) {
        let _ = self.inner.events.send(event);
    }

    /// Build and publish the client set for `endpoint`.
    ///
    /// Any failing step fails the whole connect; nothing is published partially.
    pub async fn connect(&self, endpoint: &str) -> RpcResult<Arc<RpcClientPair<B>>> {
        let family = self.family();
        let generation = {
            let mut state = self.lock();
            if state.torn_down {
                return Err(RpcError::TornDown);
            }
            state.generation += 1;
            state.status = RpcStatus::Connecting;
            state.endpoint = Some(endpoint.to_string());
            state.clients = None;
            state.last_error = None;
            state.generation
        };

        tracing::info!(%family, endpoint, generation, "Connecting RPC clients");
        metrics::record_rpc_status(family, RpcStatus::Connecting);

        let result = match timeout(self.inner.connect_timeout, self.establish(endpoint)).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout(self.inner.connect_timeout.as_secs())),
        };

        self.settle(endpoint, generation, result)
    }

    async fn establish(&self, endpoint: &str) -> RpcResult<RpcClientPair<B>> {
        let backend = &self.inner.backend;
        let (transport, typed) =
            tokio::try_join!(backend.connect_transport(endpoint), backend.connect_typed(endpoint))?;
        let query = backend.derive_query(&transport)?;

        Ok(RpcClientPair {
            low_level: Arc::new(transport),
            query: Arc::new(query),
            typed: Arc::new(typed),
        })
    }

    fn settle(
        &self,
        endpoint: &str,
        generation: u64,
        result: RpcResult<RpcClientPair<B>>,
    ) -> RpcResult<Arc<RpcClientPair<B>>> {
        let family = self.family();

        let outcome = {
            let mut state = self.lock();
            if state.torn_down {
                Err(RpcError::TornDown)
            } else if state.generation != generation {
                Err(RpcError::Superseded)
            } else {
                match result {
                    Ok(pair) => {
                        let pair = Arc::new(pair);
                        state.status = RpcStatus::Ready;
                        state.clients = Some(pair.clone());
                        Ok(pair)
                    }
                    Err(error) => {
                        state.status = RpcStatus::Error;
                        state.last_error = Some(error.descriptor());
                        Err(error)
                    }
                }
            }
        };

        match &outcome {
            Ok(_) => {
                tracing::info!(%family, endpoint, "RPC clients ready");
                metrics::record_rpc_status(family, RpcStatus::Ready);
                self.emit(RpcEvent::Ready {
                    endpoint: endpoint.to_string(),
                });
            }
            Err(RpcError::TornDown) | Err(RpcError::Superseded) => {
                tracing::debug!(%family, endpoint, generation, "Discarding stale RPC connect result");
            }
            Err(error) => {
                let descriptor = error.descriptor();
                tracing::warn!(%family, endpoint, error = %error, "RPC connect failed");
                metrics::record_rpc_status(family, RpcStatus::Error);
                self.inner.recorder.record("rpc", &descriptor);
                self.emit(RpcEvent::Failed { error: descriptor });
            }
        }

        outcome
    }

    /// Re-run `connect` against the last endpoint. Repeatable.
    pub async fn reconnect(&self) -> RpcResult<Arc<RpcClientPair<B>>> {
        let endpoint = {
            let mut state = self.lock();
            if state.torn_down {
                return Err(RpcError::TornDown);
            }
            match state.endpoint.clone() {
                Some(endpoint) => endpoint,
                None => {
                    state.status = RpcStatus::Error;
                    state.last_error = Some(RpcError::NoEndpoint.descriptor());
                    return Err(RpcError::NoEndpoint);
                }
            }
        };
        tracing::info!(family = %self.family(), %endpoint, "Reconnecting RPC clients");
        self.connect(&endpoint).await
    }

    /// `connect` with retries on transient failures.
    pub async fn connect_with_retry(
        &self,
        endpoint: &str,
        policy: RetryPolicy,
    ) -> RpcResult<Arc<RpcClientPair<B>>> {
        retry_with(policy, || self.connect(endpoint), RpcError::is_transient).await
    }

    /// Drop the clients and refuse further connects. Late results are discarded.
    pub fn teardown(&self) {
        let was_active = {
            let mut state = self.lock();
            if state.torn_down {
                return;
            }
            state.torn_down = true;
            state.generation += 1;
            state.clients = None;
            let was_active = state.status != RpcStatus::Idle;
            state.status = RpcStatus::Idle;
            was_active
        };

        tracing::info!(family = %self.family(), was_active, "RPC manager torn down");
        metrics::record_rpc_status(self.family(), RpcStatus::Idle);
        self.emit(RpcEvent::TornDown);
    }

    /// Re-emit wallet connection changes as [`RpcEvent::Invalidated`].
    ///
    /// The task ends when the connection channel closes or the manager is
    /// dropped or torn down.
    pub fn follow(&self, mut connection_events: broadcast::Receiver<ConnectionEvent>) -> JoinHandle<()> {
        let weak: Weak<RpcInner<B>> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                let (family, reason) = match connection_events.recv().await {
                    Ok(event) if event.invalidates_cache() => (event.family(), invalidation_reason(&event)),
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Connection events lagged, invalidating everything");
                        let Some(inner) = weak.upgrade() else { break };
                        (inner.family, "lagged".to_string())
                    }
                    Err(RecvError::Closed) => break,
                };

                let Some(inner) = weak.upgrade() else { break };
                let manager = RpcConnectionManager { inner };
                if manager.lock().torn_down {
                    break;
                }
                tracing::debug!(%family, %reason, "Invalidating RPC read caches");
                manager.emit(RpcEvent::Invalidated { family, reason });
            }
        })
    }
}

fn invalidation_reason(event: &ConnectionEvent) -> String {
    match event {
        ConnectionEvent::Connected { address, .. } => format!("connected {address}"),
        ConnectionEvent::Disconnected { .. } => "disconnected".to_string(),
        ConnectionEvent::Lost { reason, .. } => format!("lost: {reason}"),
        ConnectionEvent::AccountChanged { address, .. } => format!("account changed to {address}"),
        ConnectionEvent::Failed { error, .. } => error.message.clone(),
    }
}
