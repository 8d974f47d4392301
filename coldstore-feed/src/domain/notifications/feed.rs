//! Consumer handle over one category cache.

use std::sync::Arc;

use tracing::warn;

use super::live::LiveSubscription;
use super::store::NotificationStore;
use super::traits::Result;
use super::types::{CacheKey, CacheStatus, Notification, NotificationCategory};
use crate::domain::search::{QuerySnapshot, ResourceQuery};

/// What a screen binds to: the flattened rows of one category plus pagination controls.
///
/// Holding a feed keeps the category's live handler bound.
#[derive(Debug)]
pub struct NotificationFeed {
    store: Arc<NotificationStore>,
    key: CacheKey,
    _live: LiveSubscription,
}

impl NotificationFeed {
    pub fn new(store: Arc<NotificationStore>, key: CacheKey, live: LiveSubscription) -> Self {
        Self {
            store,
            key,
            _live: live,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn category(&self) -> NotificationCategory {
        self.key.category
    }

    /// Load the first page if nothing is cached yet.
    pub async fn load(&self) -> Result<()> {
        self.store.ensure_loaded(&self.key).await
    }

    /// Flattened rows, newest first, each id once.
    pub fn items(&self) -> Vec<Notification> {
        self.store.items(&self.key)
    }

    pub fn status(&self) -> CacheStatus {
        self.store.status(&self.key)
    }

    pub async fn fetch_next_page(&self) -> Result<bool> {
        self.store.fetch_next_page(&self.key).await
    }

    pub fn has_next_page(&self) -> bool {
        self.store.has_next_page(&self.key)
    }

    pub fn is_fetching_next_page(&self) -> bool {
        self.store.is_fetching_next_page(&self.key)
    }

    pub async fn refetch(&self) -> Result<()> {
        self.store.refetch(&self.key).await
    }

    pub fn unread_count(&self) -> usize {
        self.items().iter().filter(|n| !n.read).count()
    }

    /// Mark one notification read across every category of this identity.
    pub async fn mark_read(&self, id: &str) -> Result<()> {
        self.store.mark_read(&self.key.scope, id).await
    }

    pub async fn mark_all_read(&self) -> Result<()> {
        self.store.mark_all_read(&self.key).await
    }
}

/// Exposes the feed to the search side as one more resource query.
impl ResourceQuery for NotificationFeed {
    fn snapshot(&self) -> QuerySnapshot {
        let is_loading = self.status() == CacheStatus::Loading;
        match serde_json::to_value(self.items()) {
            Ok(data) => QuerySnapshot {
                data: Some(data),
                is_loading,
                error: None,
            },
            Err(e) => {
                warn!(cache = %self.key, error = %e, "Could not expose notifications to search");
                QuerySnapshot {
                    data: None,
                    is_loading,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
