//! Process-wide slot for the host-owned shared configuration.

use arc_swap::ArcSwapOption;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::resilience::retries::{poll_until, RetryError, RetryPolicy};

/// Opaque handle to an object owned by the hosting application.
pub type ExternalHandle = Arc<dyn Any + Send + Sync>;

/// Configuration produced by the host's external modal/adapter initialization.
#[derive(Clone)]
pub struct SharedConfig {
    pub modal: ExternalHandle,
    pub adapter: ExternalHandle,
    pub network_label: String,
}

impl SharedConfig {
    pub fn new<M, A>(modal: M, adapter: A, network_label: impl Into<String>) -> Self
    where
        M: Any + Send + Sync,
        A: Any + Send + Sync,
    {
        Self {
            modal: Arc::new(modal),
            adapter: Arc::new(adapter),
            network_label: network_label.into(),
        }
    }

    /// Borrow the modal handle as its concrete type.
    pub fn modal<T: Any>(&self) -> Option<&T> {
        self.modal.downcast_ref()
    }

    /// Borrow the adapter handle as its concrete type.
    pub fn adapter<T: Any>(&self) -> Option<&T> {
        self.adapter.downcast_ref()
    }
}

impl fmt::Debug for SharedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedConfig")
            .field("network_label", &self.network_label)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SlotError {
    /// Accessed before the host called `set`.
    #[error("Shared configuration not initialized")]
    ConfigNotInitialized,
}

/// Holder for at most one [`SharedConfig`].
///
/// Cloning the slot shares the same storage; the composition root creates one
/// and hands clones to whoever needs it. Last write wins.
#[derive(Clone)]
pub struct SharedConfigSlot {
    inner: Arc<ArcSwapOption<SharedConfig>>,
}

impl SharedConfigSlot {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwapOption::empty()),
        }
    }

    /// Store `config`, replacing any earlier one. Returns true if a config was replaced.
    pub fn set(&self, config: SharedConfig) -> bool {
        let label = config.network_label.clone();
        let replaced = self.inner.swap(Some(Arc::new(config))).is_some();
        if replaced {
            tracing::info!(network_label = %label, "Shared configuration replaced");
        } else {
            tracing::info!(network_label = %label, "Shared configuration initialized");
        }
        replaced
    }

    pub fn get(&self) -> Result<Arc<SharedConfig>, SlotError> {
        self.inner.load_full().ok_or(SlotError::ConfigNotInitialized)
    }

    pub fn has(&self) -> bool {
        self.inner.load().is_some()
    }

    /// Poll `has()` per `policy` until the host has set the config.
    pub async fn wait_ready(&self, policy: RetryPolicy) -> Result<Arc<SharedConfig>, RetryError> {
        poll_until(policy, || self.get().ok()).await
    }
}

impl Default for SharedConfigSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedConfigSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedConfigSlot")
            .field("initialized", &self.has())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_get_before_set_fails() {
        let slot = SharedConfigSlot::new();
        assert!(!slot.has());
        assert_eq!(slot.get().unwrap_err(), SlotError::ConfigNotInitialized);
    }

    #[test]
    fn test_last_write_wins() {
        let slot = SharedConfigSlot::new();
        let first = SharedConfig::new("modal-1", "adapter-1", "testnet");
        let first_modal = first.modal.clone();
        assert!(!slot.set(first));

        let got = slot.get().unwrap();
        assert!(Arc::ptr_eq(&got.modal, &first_modal));
        assert_eq!(got.modal::<&str>(), Some(&"modal-1"));

        assert!(slot.set(SharedConfig::new("modal-2", "adapter-2", "mainnet")));
        let got = slot.get().unwrap();
        assert_eq!(got.network_label, "mainnet");
        assert_eq!(got.adapter::<&str>(), Some(&"adapter-2"));
    }

    #[test]
    fn test_clones_share_storage() {
        let slot = SharedConfigSlot::new();
        let clone = slot.clone();
        slot.set(SharedConfig::new((), (), "devnet"));
        assert!(clone.has());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_ready_sees_late_set() {
        let slot = SharedConfigSlot::new();
        let setter = slot.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            setter.set(SharedConfig::new((), (), "late"));
        });

        let config = slot.wait_ready(RetryPolicy::default()).await.unwrap();
        assert_eq!(config.network_label, "late");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_ready_gives_up() {
        let slot = SharedConfigSlot::new();
        let err = slot.wait_ready(RetryPolicy::default()).await.unwrap_err();
        assert_eq!(err, RetryError::Exhausted { attempts: 10 });
    }
}
