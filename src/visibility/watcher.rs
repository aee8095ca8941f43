//! Delayed reconnect callback on Hidden → Visible transitions.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::visibility::source::{Visibility, VisibilitySource};

/// Starts visibility observers. See [`VisibilityReconnectWatcher::start`].
pub struct VisibilityReconnectWatcher;

impl VisibilityReconnectWatcher {
    /// Register one observer on `source`. Each Hidden → Visible transition
    /// invokes `on_visible` once, `delay` after the transition.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start<F>(source: &VisibilitySource, delay: Duration, on_visible: F) -> WatchHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (id, mut rx, initial) = source.register();
        let armed = Arc::new(Mutex::new(true));
        let task_armed = armed.clone();

        let task = tokio::spawn(async move {
            let mut last = initial;
            while let Some(next) = rx.recv().await {
                let became_visible = last == Visibility::Hidden && next == Visibility::Visible;
                last = next;
                if !became_visible {
                    continue;
                }

                tokio::time::sleep(delay).await;

                // Checked and invoked under the lock so stop() cannot interleave.
                let fired = {
                    let armed = task_armed.lock().unwrap_or_else(PoisonError::into_inner);
                    if *armed {
                        tracing::debug!(
                            delay_ms = delay.as_millis() as u64,
                            "Document visible, running reconnect callback"
                        );
                        on_visible();
                    }
                    *armed
                };
                if !fired {
                    break;
                }
            }
        });

        tracing::debug!(observer = id, "Visibility watcher started");
        WatchHandle {
            id,
            source: source.clone(),
            armed,
            task: Some(task),
        }
    }
}

/// Cancellation handle for one observer registration. Dropping it stops the watcher.
pub struct WatchHandle {
    id: u64,
    source: VisibilitySource,
    armed: Arc<Mutex<bool>>,
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Remove the observer and cancel any pending callback.
    ///
    /// Once this returns the callback never runs again. Calling it twice is a no-op.
    pub fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        *self.armed.lock().unwrap_or_else(PoisonError::into_inner) = false;
        self.source.unregister(self.id);
        task.abort();
        tracing::debug!(observer = self.id, "Visibility watcher stopped");
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
