//! Named-event listener registry.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use serde_json::Value;

/// Callback invoked with an event's payload.
pub type Handler = Arc<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

/// Stable handle returned by [`ListenerRegistry::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    by_event: HashMap<String, Vec<(ListenerId, Handler)>>,
}

/// Maps event names to handlers, invoked in registration order.
///
/// Clones share the same registry.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.lock();
        let counts: HashMap<&str, usize> = registry
            .by_event
            .iter()
            .map(|(event, handlers)| (event.as_str(), handlers.len()))
            .collect();
        f.debug_struct("ListenerRegistry").field("listeners", &counts).finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a handler for `event`.
    pub fn on<F>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut registry = self.lock();
        registry.next_id += 1;
        let id = ListenerId(registry.next_id);
        registry
            .by_event
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` if it was not registered.
    ///
    /// Dispatches already under way still reach it; later ones do not.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut registry = self.lock();
        let Some(handlers) = registry.by_event.get_mut(event) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            registry.by_event.remove(event);
        }
        removed
    }

    pub fn clear(&self) {
        self.lock().by_event.clear();
    }

    pub fn count(&self, event: &str) -> usize {
        self.lock().by_event.get(event).map_or(0, Vec::len)
    }

    /// Invoke every handler for `event` with `payload`.
    ///
    /// A handler that fails or panics is logged and skipped; the rest still
    /// run. Returns how many handlers completed successfully.
    pub fn dispatch(&self, event: &str, payload: &Value) -> usize {
        let handlers: Vec<(ListenerId, Handler)> = match self.lock().by_event.get(event) {
            Some(handlers) => handlers.clone(),
            None => return 0,
        };

        let mut completed = 0;
        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(Ok(())) => completed += 1,
                Ok(Err(e)) => {
                    tracing::error!("listener {:?} for '{}' failed: {:#}", id, event, e);
                }
                Err(panic) => {
                    tracing::error!(
                        "listener {:?} for '{}' panicked: {}",
                        id,
                        event,
                        panic_message(panic.as_ref())
                    );
                }
            }
        }
        completed
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
