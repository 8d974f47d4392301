//! Reference-counted registry of live push bindings, one per category.
//!
//! However many feeds observe a category, the transport carries exactly one handler for it.
//! The handler is bound when the first consumer arrives, re-bound on every reconnect and
//! removed when the last consumer goes away.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::store::NotificationStore;
use super::traits::{EventHandler, HandlerId, IdentityProvider, Transport};
use super::types::{CacheKey, Notification, NotificationCategory};

#[derive(Debug, Default)]
struct Binding {
    consumers: usize,
    handler: Option<HandlerId>,
}

pub struct LiveRegistry {
    transport: Arc<dyn Transport>,
    store: Arc<NotificationStore>,
    identity: Arc<dyn IdentityProvider>,
    bindings: Mutex<HashMap<NotificationCategory, Binding>>,
    connect_hook: Mutex<Option<HandlerId>>,
}

impl LiveRegistry {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<NotificationStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            store,
            identity,
            bindings: Mutex::new(HashMap::new()),
            connect_hook: Mutex::new(None),
        })
    }

    fn bindings(&self) -> MutexGuard<'_, HashMap<NotificationCategory, Binding>> {
        self.bindings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the reconnect hook. Idempotent.
    pub fn start(self: &Arc<Self>) {
        let mut hook = self
            .connect_hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if hook.is_some() {
            return;
        }

        let registry: Weak<Self> = Arc::downgrade(self);
        *hook = Some(self.transport.on_connect(Arc::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.rebind_all();
            }
        })));
        debug!("Registered reconnect hook for live notifications");
    }

    /// Take one reference on a category's binding, binding the handler if this is the first.
    pub fn acquire(self: &Arc<Self>, category: NotificationCategory) -> LiveSubscription {
        let mut bindings = self.bindings();
        let binding = bindings.entry(category).or_default();
        binding.consumers += 1;

        if binding.handler.is_none() {
            binding.handler = Some(self.bind(category));
            info!(%category, "Bound live notification handler");
        } else {
            debug!(%category, consumers = binding.consumers, "Reusing live notification handler");
        }

        LiveSubscription {
            registry: Arc::clone(self),
            category,
        }
    }

    fn release(&self, category: NotificationCategory) {
        let mut bindings = self.bindings();
        let Some(binding) = bindings.get_mut(&category) else {
            return;
        };

        binding.consumers = binding.consumers.saturating_sub(1);
        if binding.consumers > 0 {
            return;
        }

        if let Some(handler) = binding.handler.take() {
            self.transport.unsubscribe(handler);
        }
        bindings.remove(&category);
        info!(%category, "Released live notification handler");
    }

    fn bind(&self, category: NotificationCategory) -> HandlerId {
        let store = Arc::clone(&self.store);
        let identity = Arc::clone(&self.identity);
        let handler: EventHandler = Arc::new(move |payload: &Value| {
            handle_push(&store, identity.as_ref(), category, payload);
        });
        self.transport.subscribe(&category.event_name(), handler)
    }

    /// Replace every active handler. Runs on each transport (re)connect.
    pub fn rebind_all(&self) {
        let mut bindings = self.bindings();
        for (category, binding) in bindings.iter_mut() {
            if binding.consumers == 0 {
                continue;
            }
            if let Some(old) = binding.handler.take() {
                self.transport.unsubscribe(old);
            }
            binding.handler = Some(self.bind(*category));
            info!(%category, "Re-bound live notification handler after reconnect");
        }
    }

    /// Remove every handler and the reconnect hook.
    pub fn shutdown(&self) {
        let mut bindings = self.bindings();
        for (category, binding) in bindings.drain() {
            if let Some(handler) = binding.handler {
                self.transport.unsubscribe(handler);
                debug!(%category, "Unbound live notification handler on shutdown");
            }
        }

        if let Some(hook) = self
            .connect_hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            self.transport.unsubscribe(hook);
        }
    }

    pub fn consumers(&self, category: NotificationCategory) -> usize {
        self.bindings()
            .get(&category)
            .map(|b| b.consumers)
            .unwrap_or(0)
    }

    pub fn is_bound(&self, category: NotificationCategory) -> bool {
        self.bindings()
            .get(&category)
            .is_some_and(|b| b.handler.is_some())
    }
}

/// Merge one push payload into the current identity's cache for `category`.
///
/// A payload that cannot be read is logged and dropped.
fn handle_push(
    store: &NotificationStore,
    identity: &dyn IdentityProvider,
    category: NotificationCategory,
    payload: &Value,
) {
    let Some(scope) = identity.current_identity() else {
        warn!(%category, "Dropping notification push without identity");
        return;
    };

    match serde_json::from_value::<Notification>(payload.clone()) {
        Ok(item) => {
            store.merge_live(&CacheKey::new(scope, category), item);
        }
        Err(e) => {
            warn!(%category, error = %e, "Dropping malformed notification push");
        }
    }
}

/// One consumer's hold on a category binding. Dropping it releases the hold.
pub struct LiveSubscription {
    registry: Arc<LiveRegistry>,
    category: NotificationCategory,
}

impl LiveSubscription {
    pub fn category(&self) -> NotificationCategory {
        self.category
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        self.registry.release(self.category);
    }
}

impl std::fmt::Debug for LiveSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSubscription")
            .field("category", &self.category)
            .finish()
    }
}
