//! Host document visibility, pushed in by the embedding application.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

struct SourceState {
    current: Visibility,
    next_id: u64,
    observers: HashMap<u64, mpsc::UnboundedSender<Visibility>>,
}

/// Fan-out of visibility transitions to registered observers.
#[derive(Clone)]
pub struct VisibilitySource {
    state: Arc<Mutex<SourceState>>,
}

impl VisibilitySource {
    pub fn new(initial: Visibility) -> Self {
        Self {
            state: Arc::new(Mutex::new(SourceState {
                current: initial,
                next_id: 0,
                observers: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SourceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the document's new visibility. Repeated values are not transitions.
    pub fn set(&self, visibility: Visibility) {
        let mut state = self.lock();
        if state.current == visibility {
            return;
        }
        state.current = visibility;
        tracing::debug!(?visibility, observers = state.observers.len(), "Visibility changed");
        for tx in state.observers.values() {
            let _ = tx.send(visibility);
        }
    }

    pub fn current(&self) -> Visibility {
        self.lock().current
    }

    /// Number of live observer registrations.
    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    /// Register an observer; returns its id, its receiver and the visibility at
    /// registration time.
    pub(crate) fn register(&self) -> (u64, mpsc::UnboundedReceiver<Visibility>, Visibility) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.observers.insert(id, tx);
        (id, rx, state.current)
    }

    pub(crate) fn unregister(&self, id: u64) -> bool {
        self.lock().observers.remove(&id).is_some()
    }
}

impl Default for VisibilitySource {
    fn default() -> Self {
        Self::new(Visibility::Visible)
    }
}
