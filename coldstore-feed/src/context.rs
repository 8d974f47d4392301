//! Process-wide owner of the notification caches and their live bindings.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::{info, trace};

use crate::config::Settings;
use crate::domain::notifications::{
    CacheKey, HandlerId, HttpNotificationClient, IdentityProvider, LiveRegistry,
    NotificationCategory, NotificationError, NotificationFeed, NotificationFetcher,
    NotificationStore, Result, Transport,
};
use crate::domain::search::{DomainAggregator, FilterSink, SearchController};

/// Created once at startup and torn down at shutdown (or on drop).
///
/// Every [`NotificationFeed`] handed out shares this context's store and registry, so any
/// number of screens can observe a category while the transport carries one handler for it.
pub struct FeedContext {
    settings: Settings,
    store: Arc<NotificationStore>,
    registry: Arc<LiveRegistry>,
    transport: Arc<dyn Transport>,
    identity: Arc<dyn IdentityProvider>,
    event_tap: Mutex<Option<HandlerId>>,
}

impl FeedContext {
    pub fn init(
        settings: Settings,
        fetcher: Arc<dyn NotificationFetcher>,
        transport: Arc<dyn Transport>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let store = Arc::new(NotificationStore::new(
            fetcher,
            settings.notifications.page_size,
        ));
        let registry = LiveRegistry::new(
            Arc::clone(&transport),
            Arc::clone(&store),
            Arc::clone(&identity),
        );
        registry.start();

        let event_tap = settings.notifications.log_transport_events.then(|| {
            transport.on_any(Arc::new(|event: &str, payload: &Value| {
                trace!(event, %payload, "Transport event");
            }))
        });

        info!(
            page_size = settings.notifications.page_size,
            connected = transport.is_connected(),
            "Initialized feed context"
        );

        Self {
            settings,
            store,
            registry,
            transport,
            identity,
            event_tap: Mutex::new(event_tap),
        }
    }

    /// Same as [`init`](Self::init) with the HTTP fetcher pointed at the configured API.
    pub fn with_http(
        settings: Settings,
        transport: Arc<dyn Transport>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self> {
        let fetcher = HttpNotificationClient::new(&settings.notifications.api_url)?;
        Ok(Self::init(settings, Arc::new(fetcher), transport, identity))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<LiveRegistry> {
        &self.registry
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// A feed over `category` for the current identity. Load it with
    /// [`NotificationFeed::load`].
    pub fn notifications(&self, category: NotificationCategory) -> Result<NotificationFeed> {
        let scope = self
            .identity
            .current_identity()
            .ok_or(NotificationError::NoIdentity)?;
        let live = self.registry.acquire(category);
        Ok(NotificationFeed::new(
            Arc::clone(&self.store),
            CacheKey::new(scope, category),
            live,
        ))
    }

    /// Drop every cache of `scope`, e.g. after sign-out.
    pub fn forget(&self, scope: &str) {
        self.store.clear_scope(scope);
    }

    pub fn search_controller(&self, aggregator: DomainAggregator) -> SearchController {
        SearchController::new(Arc::new(aggregator), self.settings.feed.debounce())
    }

    pub fn search_controller_with_sink(
        &self,
        aggregator: DomainAggregator,
        sink: Arc<dyn FilterSink>,
    ) -> SearchController {
        SearchController::with_sink(Arc::new(aggregator), self.settings.feed.debounce(), sink)
    }

    /// Remove every live handler, the reconnect hook and the event tap. Idempotent.
    pub fn teardown(&self) {
        self.registry.shutdown();
        if let Some(tap) = self
            .event_tap
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            self.transport.off_any(tap);
        }
        info!("Tore down feed context");
    }
}

impl Drop for FeedContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for FeedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedContext")
            .field("settings", &self.settings)
            .field("store", &self.store)
            .finish()
    }
}
