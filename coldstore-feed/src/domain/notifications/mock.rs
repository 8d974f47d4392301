//! In-memory fetcher and transport for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tokio::sync::watch;

use super::traits::{
    AnyEventHandler, ConnectHandler, EventHandler, HandlerId, NotificationError,
    NotificationFetcher, Result, Transport,
};
use super::types::{
    Notification, NotificationCategory, NotificationDetails, NotificationUpdate, PageRequest,
};

/// Build a notification whose timestamp is derived from its id, for fixtures.
pub fn notification(id: &str, read: bool) -> Notification {
    let offset = id.bytes().map(i64::from).sum::<i64>();
    Notification {
        id: id.to_string(),
        title: format!("Notification {}", id),
        message: String::new(),
        created_at: OffsetDateTime::UNIX_EPOCH + Duration::minutes(offset),
        read,
        kind: "info".to_string(),
        details: NotificationDetails::default(),
    }
}

/// Fetcher serving offset pages out of per-category vectors.
///
/// # Examples
///
/// ```
/// use coldstore_feed::domain::notifications::{mock::{notification, MockNotificationFetcher}, NotificationCategory};
///
/// let fetcher = MockNotificationFetcher::new()
///     .with_rows(NotificationCategory::Today, vec![notification("n1", false)]);
/// assert_eq!(fetcher.fetch_count(), 0);
/// ```
#[derive(Clone)]
pub struct MockNotificationFetcher {
    rows: Arc<RwLock<HashMap<NotificationCategory, Vec<Notification>>>>,
    fail_fetch: Arc<AtomicBool>,
    fail_update: Arc<AtomicBool>,
    fetch_calls: Arc<Mutex<Vec<(NotificationCategory, PageRequest)>>>,
    update_calls: Arc<AtomicUsize>,
    paused: Arc<watch::Sender<bool>>,
    updates_paused: Arc<watch::Sender<bool>>,
}

impl Default for MockNotificationFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNotificationFetcher {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
            fail_fetch: Arc::new(AtomicBool::new(false)),
            fail_update: Arc::new(AtomicBool::new(false)),
            fetch_calls: Arc::new(Mutex::new(Vec::new())),
            update_calls: Arc::new(AtomicUsize::new(0)),
            paused: Arc::new(watch::channel(false).0),
            updates_paused: Arc::new(watch::channel(false).0),
        }
    }

    /// Set the backend rows for one category, newest first.
    pub fn with_rows(self, category: NotificationCategory, rows: Vec<Notification>) -> Self {
        self.set_rows(category, rows);
        self
    }

    pub fn set_rows(&self, category: NotificationCategory, rows: Vec<Notification>) {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(category, rows);
    }

    /// Insert a row at the head of a category, as the backend would for a new event.
    pub fn prepend_row(&self, category: NotificationCategory, row: Notification) {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(category)
            .or_default()
            .insert(0, row);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    /// Block every fetch until [`resume`](Self::resume) is called.
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Block every update until [`resume_updates`](Self::resume_updates) is called.
    pub fn pause_updates(&self) {
        self.updates_paused.send_replace(true);
    }

    pub fn resume_updates(&self) {
        self.updates_paused.send_replace(false);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn fetch_calls(&self) -> Vec<(NotificationCategory, PageRequest)> {
        self.fetch_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn row(&self, category: NotificationCategory, id: &str) -> Option<Notification> {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&category)
            .and_then(|rows| rows.iter().find(|n| n.id == id).cloned())
    }
}

#[async_trait]
impl NotificationFetcher for MockNotificationFetcher {
    async fn fetch_category(
        &self,
        category: NotificationCategory,
        request: PageRequest,
    ) -> Result<Vec<Notification>> {
        self.fetch_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((category, request));

        let mut paused = self.paused.subscribe();
        let _ = paused.wait_for(|paused| !*paused).await;

        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(NotificationError::Fetch("mock fetch failure".to_string()));
        }

        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rows
            .get(&category)
            .map(|rows| {
                rows.iter()
                    .skip(request.offset)
                    .take(request.limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_notification(&self, id: &str, update: NotificationUpdate) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        let mut paused = self.updates_paused.subscribe();
        let _ = paused.wait_for(|paused| !*paused).await;

        if self.fail_update.load(Ordering::SeqCst) {
            return Err(NotificationError::Update("mock update failure".to_string()));
        }

        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        for row in rows.values_mut().flat_map(|rows| rows.iter_mut()) {
            if row.id == id {
                row.read = update.read;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct TransportState {
    next_id: u64,
    connected: bool,
    subscribe_calls: usize,
    events: HashMap<HandlerId, (String, EventHandler)>,
    any: HashMap<HandlerId, AnyEventHandler>,
    connect: HashMap<HandlerId, ConnectHandler>,
}

impl TransportState {
    fn allocate(&mut self) -> HandlerId {
        self.next_id += 1;
        HandlerId(self.next_id)
    }
}

/// Transport that records registrations and delivers events synchronously.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<TransportState>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// A connected transport with no handlers.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TransportState {
                connected: true,
                ..Default::default()
            })),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, TransportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver an event to every matching handler and every catch-all handler.
    pub fn emit(&self, event: &str, payload: Value) {
        let (handlers, any): (Vec<EventHandler>, Vec<AnyEventHandler>) = {
            let state = self.state();
            (
                state
                    .events
                    .values()
                    .filter(|(name, _)| name == event)
                    .map(|(_, handler)| handler.clone())
                    .collect(),
                state.any.values().cloned().collect(),
            )
        };

        for handler in any {
            handler(event, &payload);
        }
        for handler in handlers {
            handler(&payload);
        }
    }

    pub fn disconnect(&self) {
        self.state().connected = false;
    }

    /// Simulate a reconnect: the transport drops every event handler, then fires connect hooks.
    pub fn reconnect(&self) {
        let hooks: Vec<ConnectHandler> = {
            let mut state = self.state();
            state.connected = true;
            state.events.clear();
            state.connect.values().cloned().collect()
        };

        for hook in hooks {
            hook();
        }
    }

    /// Number of handlers currently bound to `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        self.state()
            .events
            .values()
            .filter(|(name, _)| name == event)
            .count()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.state().subscribe_calls
    }

    pub fn any_handler_count(&self) -> usize {
        self.state().any.len()
    }

    pub fn connect_hook_count(&self) -> usize {
        self.state().connect.len()
    }
}

impl Transport for MockTransport {
    fn subscribe(&self, event: &str, handler: EventHandler) -> HandlerId {
        let mut state = self.state();
        let id = state.allocate();
        state.subscribe_calls += 1;
        state.events.insert(id, (event.to_string(), handler));
        id
    }

    fn unsubscribe(&self, id: HandlerId) {
        let mut state = self.state();
        state.events.remove(&id);
        state.connect.remove(&id);
    }

    fn on_any(&self, handler: AnyEventHandler) -> HandlerId {
        let mut state = self.state();
        let id = state.allocate();
        state.any.insert(id, handler);
        id
    }

    fn off_any(&self, id: HandlerId) {
        self.state().any.remove(&id);
    }

    fn on_connect(&self, handler: ConnectHandler) -> HandlerId {
        let mut state = self.state();
        let id = state.allocate();
        state.connect.insert(id, handler);
        id
    }

    fn is_connected(&self) -> bool {
        self.state().connected
    }
}
