//! Process-wide store of notification page caches.
//!
//! Every mutation goes through [`NotificationStore::update`], which reads the entry, computes
//! the new state and writes it back under one short lock. No lock is ever held across a fetch,
//! so pushes, page fetches and mutations interleave freely between suspension points.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use futures::future;
use tracing::{debug, info, warn};

use super::cache::PagedCache;
use super::traits::{NotificationFetcher, Result};
use super::types::{
    CacheKey, CacheStatus, MergeOutcome, Notification, NotificationUpdate, NotificationsPage,
    PageRequest,
};

#[derive(Debug, Clone, Default)]
struct Entry {
    cache: Option<PagedCache>,
    status: CacheStatus,
    fetching_next: bool,
    stale: bool,
    /// Ids merged by push since page 0 was last fetched
    pushed: HashSet<String>,
    refetches_in_flight: usize,
}

impl Entry {
    /// Offsets to refetch, recorded under the same lock that counts the refetch as in flight.
    fn begin_refetch(&mut self) -> Vec<usize> {
        self.refetches_in_flight += 1;
        self.cache
            .as_ref()
            .map(|cache| cache.page_params().to_vec())
            .filter(|offsets| !offsets.is_empty())
            .unwrap_or_else(|| vec![0])
    }

    /// Swap in freshly fetched pages, keeping push-delivered rows the fetch did not return.
    fn install(&mut self, mut fresh: PagedCache) -> usize {
        let carried = match self.cache.as_ref() {
            Some(previous) => fresh.carry_pushed(previous, &self.pushed),
            None => 0,
        };
        // A refetch still in flight may have started before these pushes.
        if self.refetches_in_flight == 0 {
            self.pushed.clear();
        }
        self.cache = Some(fresh);
        self.status = CacheStatus::Ready;
        self.stale = false;
        carried
    }
}

/// Snapshot of one cache taken before an optimistic mutation.
#[derive(Debug, Clone)]
struct Snapshot {
    key: CacheKey,
    cache: PagedCache,
}

pub struct NotificationStore {
    fetcher: Arc<dyn NotificationFetcher>,
    page_size: usize,
    entries: RwLock<HashMap<CacheKey, Entry>>,
}

impl std::fmt::Debug for NotificationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationStore")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl NotificationStore {
    pub fn new(fetcher: Arc<dyn NotificationFetcher>, page_size: usize) -> Self {
        Self {
            fetcher,
            page_size: page_size.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The single read-compute-write primitive over one entry.
    fn update<R>(&self, key: &CacheKey, f: impl FnOnce(&mut Entry) -> R) -> R {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        f(entries.entry(key.clone()).or_default())
    }

    fn read<R>(&self, key: &CacheKey, f: impl FnOnce(Option<&Entry>) -> R) -> R {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f(entries.get(key))
    }

    pub fn status(&self, key: &CacheKey) -> CacheStatus {
        self.read(key, |entry| entry.map(|e| e.status).unwrap_or_default())
    }

    /// Clone of the paged cache, if one exists.
    pub fn data(&self, key: &CacheKey) -> Option<PagedCache> {
        self.read(key, |entry| entry.and_then(|e| e.cache.clone()))
    }

    /// Flattened, de-duplicated rows of one cache.
    pub fn items(&self, key: &CacheKey) -> Vec<Notification> {
        self.read(key, |entry| {
            entry
                .and_then(|e| e.cache.as_ref())
                .map(PagedCache::flatten)
                .unwrap_or_default()
        })
    }

    pub fn has_next_page(&self, key: &CacheKey) -> bool {
        self.read(key, |entry| {
            entry
                .and_then(|e| e.cache.as_ref())
                .is_some_and(PagedCache::has_next_page)
        })
    }

    pub fn is_fetching_next_page(&self, key: &CacheKey) -> bool {
        self.read(key, |entry| entry.is_some_and(|e| e.fetching_next))
    }

    pub fn is_stale(&self, key: &CacheKey) -> bool {
        self.read(key, |entry| entry.is_some_and(|e| e.stale))
    }

    async fn fetch_page(&self, key: &CacheKey, offset: usize) -> Result<NotificationsPage> {
        let request = PageRequest::new(self.page_size, offset);
        let rows = self.fetcher.fetch_category(key.category, request).await?;
        debug!(cache = %key, offset, rows = rows.len(), "Fetched notification page");
        Ok(NotificationsPage::from_fetch(rows, request))
    }

    /// Load the cache unless it is already loaded, loading or being refetched.
    ///
    /// An unloaded cache fetches page 0. A stale cache is refetched at its recorded offsets,
    /// so a reload never collapses later pages. Rows pushed before the fetch resolves stay in
    /// front of page 0.
    pub async fn ensure_loaded(&self, key: &CacheKey) -> Result<()> {
        let offsets = self.update(key, |entry| {
            let current = entry.status == CacheStatus::Loading
                || entry.refetches_in_flight > 0
                || (entry.status == CacheStatus::Ready && !entry.stale);
            if current {
                return None;
            }
            if entry.cache.is_none() {
                entry.status = CacheStatus::Loading;
            }
            Some(entry.begin_refetch())
        });
        let Some(offsets) = offsets else {
            return Ok(());
        };

        let result = self.refetch_at(key, offsets).await;
        if result.is_err() {
            self.update(key, |entry| {
                if entry.status == CacheStatus::Loading {
                    entry.status = if entry.cache.is_some() {
                        CacheStatus::Ready
                    } else {
                        CacheStatus::Unloaded
                    };
                }
            });
        }
        result
    }

    /// Fetch the page after the last cached one.
    ///
    /// Returns `Ok(false)` when there is nothing to fetch or a fetch is already in flight.
    pub async fn fetch_next_page(&self, key: &CacheKey) -> Result<bool> {
        let offset = self.update(key, |entry| {
            if entry.status != CacheStatus::Ready || entry.fetching_next {
                return None;
            }
            let offset = entry.cache.as_ref().and_then(PagedCache::next_offset)?;
            entry.fetching_next = true;
            Some(offset)
        });
        let Some(offset) = offset else {
            return Ok(false);
        };

        let fetched = self.fetch_page(key, offset).await;

        self.update(key, |entry| {
            entry.fetching_next = false;
            let page = fetched?;
            match entry.cache.as_mut() {
                Some(cache) if cache.next_offset() == Some(offset) => {
                    cache.push_page(offset, page);
                    Ok(true)
                }
                _ => {
                    debug!(cache = %key, offset, "Discarding page fetched against replaced cache");
                    Ok(false)
                }
            }
        })
    }

    /// Re-request every cached page at its recorded offset and replace the pages wholesale.
    ///
    /// The old pages stay visible until the refetch resolves; on failure they are kept. Rows
    /// pushed while the refetch was in flight are carried into the new page 0.
    pub async fn refetch(&self, key: &CacheKey) -> Result<()> {
        let offsets = self.update(key, Entry::begin_refetch);
        self.refetch_at(key, offsets).await
    }

    async fn refetch_at(&self, key: &CacheKey, offsets: Vec<usize>) -> Result<()> {
        let fetched = self.fetch_pages(key, &offsets).await;

        self.update(key, |entry| {
            entry.refetches_in_flight = entry.refetches_in_flight.saturating_sub(1);
            let carried = entry.install(fetched?);
            if carried > 0 {
                debug!(cache = %key, carried, "Kept pushed rows across refetch");
            }
            Ok(())
        })
    }

    /// Fetch `offsets` in order, stopping after the last page the server has.
    async fn fetch_pages(&self, key: &CacheKey, offsets: &[usize]) -> Result<PagedCache> {
        let mut refreshed = PagedCache::default();
        for &offset in offsets {
            let page = self.fetch_page(key, offset).await?;
            let last = page.next_offset.is_none();
            refreshed.push_page(offset, page);
            if last {
                break;
            }
        }
        Ok(refreshed)
    }

    /// Merge a push-delivered item into page 0 of one cache.
    pub fn merge_live(&self, key: &CacheKey, item: Notification) -> MergeOutcome {
        let id = item.id.clone();
        let outcome = self.update(key, |entry| {
            let outcome = match entry.cache.as_mut() {
                Some(cache) => cache.merge_live(item),
                None => {
                    // Seeded rows are visible at once; the first load still has to run.
                    entry.cache = Some(PagedCache::seeded(item));
                    if entry.status != CacheStatus::Loading {
                        entry.status = CacheStatus::Ready;
                    }
                    entry.stale = true;
                    MergeOutcome::Seeded
                }
            };
            if outcome != MergeOutcome::Duplicate {
                entry.pushed.insert(id.clone());
            }
            outcome
        });

        match outcome {
            MergeOutcome::Duplicate => debug!(cache = %key, id = %id, "Ignoring duplicate push"),
            _ => debug!(cache = %key, id = %id, ?outcome, "Merged live notification"),
        }
        outcome
    }

    /// Set `read` on `ids` in every cache of `scope` that holds one of them, returning snapshots.
    fn apply_optimistic(&self, scope: &str, ids: &[String], read: bool) -> Vec<Snapshot> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut snapshots = Vec::new();

        for (key, entry) in entries.iter_mut().filter(|(key, _)| key.scope == scope) {
            let Some(cache) = entry.cache.as_mut() else {
                continue;
            };
            if !ids.iter().any(|id| cache.contains(id)) {
                continue;
            }
            snapshots.push(Snapshot {
                key: key.clone(),
                cache: cache.clone(),
            });
            for id in ids {
                cache.set_read(id, read);
            }
        }

        snapshots
    }

    /// Put snapshots back. Rows pushed after the snapshot was taken are kept.
    fn restore(&self, snapshots: &[Snapshot]) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for snapshot in snapshots {
            let entry = entries.entry(snapshot.key.clone()).or_default();
            let mut cache = snapshot.cache.clone();
            if let Some(current) = entry.cache.as_ref() {
                cache.carry_pushed(current, &entry.pushed);
            }
            entry.cache = Some(cache);
        }
    }

    /// Optimistically mark `id` read in every cache of `scope`.
    ///
    /// On failure every touched cache is restored verbatim and the error is returned. Either
    /// way the touched caches are invalidated and refetched.
    pub async fn mark_read(&self, scope: &str, id: &str) -> Result<()> {
        let ids = vec![id.to_string()];
        self.mutate_read(scope, &ids).await
    }

    /// Optimistically mark every unread row of one cache read.
    pub async fn mark_all_read(&self, key: &CacheKey) -> Result<()> {
        let ids = self.read(key, |entry| {
            entry
                .and_then(|e| e.cache.as_ref())
                .map(PagedCache::unread_ids)
                .unwrap_or_default()
        });
        if ids.is_empty() {
            return Ok(());
        }
        self.mutate_read(&key.scope, &ids).await
    }

    async fn mutate_read(&self, scope: &str, ids: &[String]) -> Result<()> {
        let snapshots = self.apply_optimistic(scope, ids, true);

        let update = NotificationUpdate { read: true };
        let results = future::join_all(
            ids.iter()
                .map(|id| self.fetcher.update_notification(id, update)),
        )
        .await;
        let outcome = results.into_iter().collect::<Result<Vec<()>>>().map(|_| ());

        if let Err(e) = &outcome {
            warn!(scope, ids = ?ids, error = %e, "Mark read failed, rolling back");
            self.restore(&snapshots);
        }

        let keys: Vec<CacheKey> = snapshots.into_iter().map(|s| s.key).collect();
        self.invalidate(&keys).await;

        outcome
    }

    /// Mark caches stale and refetch them. Failures are logged; stale data stays visible.
    pub async fn invalidate(&self, keys: &[CacheKey]) {
        for key in keys {
            self.update(key, |entry| entry.stale = true);
        }

        let results = future::join_all(keys.iter().map(|key| self.refetch(key))).await;
        for (key, result) in keys.iter().zip(results) {
            if let Err(e) = result {
                warn!(cache = %key, error = %e, "Reconciliation refetch failed");
            }
        }
    }

    /// Drop every cache belonging to `scope`.
    pub fn clear_scope(&self, scope: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|key, _| key.scope != scope);
        info!(scope, removed = before - entries.len(), "Cleared notification caches");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notifications::mock::{notification, MockNotificationFetcher};
    use crate::domain::notifications::types::NotificationCategory;

    fn rows(prefix: &str, count: usize) -> Vec<Notification> {
        (0..count)
            .map(|i| notification(&format!("{}{}", prefix, i), false))
            .collect()
    }

    fn store_with(fetcher: &MockNotificationFetcher, page_size: usize) -> NotificationStore {
        NotificationStore::new(Arc::new(fetcher.clone()), page_size)
    }

    fn key(category: NotificationCategory) -> CacheKey {
        CacheKey::new("user-1", category)
    }

    fn ids(items: &[Notification]) -> Vec<String> {
        items.iter().map(|n| n.id.clone()).collect()
    }

    #[tokio::test]
    async fn ensure_loaded_fetches_first_page_once() {
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Informative, rows("n", 3));
        let store = store_with(&fetcher, 2);
        let key = key(NotificationCategory::Informative);

        assert_eq!(store.status(&key), CacheStatus::Unloaded);
        store.ensure_loaded(&key).await.unwrap();
        store.ensure_loaded(&key).await.unwrap();

        assert_eq!(store.status(&key), CacheStatus::Ready);
        assert_eq!(fetcher.fetch_count(), 1);
        assert_eq!(ids(&store.items(&key)), vec!["n0", "n1"]);
        assert!(store.has_next_page(&key));
    }

    #[tokio::test]
    async fn failed_first_load_returns_to_unloaded() {
        let fetcher = MockNotificationFetcher::new();
        fetcher.fail_fetches(true);
        let store = store_with(&fetcher, 2);
        let key = key(NotificationCategory::Today);

        assert!(store.ensure_loaded(&key).await.is_err());
        assert_eq!(store.status(&key), CacheStatus::Unloaded);
    }

    #[tokio::test]
    async fn offsets_survive_fetches_and_pushes() {
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Actionable, rows("n", 7));
        let store = store_with(&fetcher, 2);
        let key = key(NotificationCategory::Actionable);

        store.ensure_loaded(&key).await.unwrap();
        assert!(store.fetch_next_page(&key).await.unwrap());
        assert!(store.fetch_next_page(&key).await.unwrap());

        for id in ["p0", "p1", "p2"] {
            store.merge_live(&key, notification(id, false));
        }

        let cache = store.data(&key).unwrap();
        assert_eq!(cache.page_params(), &[0, 2, 4]);
        assert_eq!(cache.pages()[0].data.len(), 5);
        assert_eq!(cache.pages()[1].data.len(), 2);
        assert_eq!(cache.pages()[2].data.len(), 2);

        // Next page still uses the offset recorded before the pushes.
        assert!(store.fetch_next_page(&key).await.unwrap());
        let (_, last_request) = *fetcher.fetch_calls().last().unwrap();
        assert_eq!(last_request, PageRequest::new(2, 6));
        assert!(!store.has_next_page(&key));
        assert!(!store.fetch_next_page(&key).await.unwrap());
    }

    #[tokio::test]
    async fn push_during_fetch_more_lands_in_page_zero() {
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Informative, rows("n", 4));
        let store = Arc::new(store_with(&fetcher, 2));
        let key = key(NotificationCategory::Informative);
        store.ensure_loaded(&key).await.unwrap();

        fetcher.pause();
        let in_flight = tokio::spawn({
            let store = store.clone();
            let key = key.clone();
            async move { store.fetch_next_page(&key).await }
        });
        tokio::task::yield_now().await;
        assert!(store.is_fetching_next_page(&key));
        assert!(!store.fetch_next_page(&key).await.unwrap());

        store.merge_live(&key, notification("live", false));
        fetcher.resume();
        assert!(in_flight.await.unwrap().unwrap());

        assert_eq!(
            ids(&store.items(&key)),
            vec!["live", "n0", "n1", "n2", "n3"]
        );
        assert_eq!(store.data(&key).unwrap().page_params(), &[0, 2]);
        assert!(!store.is_fetching_next_page(&key));
    }

    #[tokio::test]
    async fn push_before_first_fetch_seeds_cache() {
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Today, vec![notification("n0", false)]);
        let store = store_with(&fetcher, 10);
        let key = key(NotificationCategory::Today);

        assert_eq!(
            store.merge_live(&key, notification("n1", false)),
            MergeOutcome::Seeded
        );
        assert_eq!(store.status(&key), CacheStatus::Ready);
        assert!(store.is_stale(&key));
        let cache = store.data(&key).unwrap();
        assert_eq!(cache.page_params(), &[0]);
        assert_eq!(cache.pages()[0].next_offset, None);

        store.ensure_loaded(&key).await.unwrap();
        assert_eq!(fetcher.fetch_count(), 1);
        assert_eq!(ids(&store.items(&key)), vec!["n1", "n0"]);
        assert!(!store.is_stale(&key));
    }

    #[tokio::test]
    async fn stale_reload_refetches_recorded_offsets() {
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Informative, rows("n", 4));
        let store = store_with(&fetcher, 2);
        let key = key(NotificationCategory::Informative);
        store.ensure_loaded(&key).await.unwrap();
        store.fetch_next_page(&key).await.unwrap();

        // The update lands but the reconciliation refetch fails, leaving the cache stale.
        fetcher.fail_fetches(true);
        store.mark_read("user-1", "n0").await.unwrap();
        assert!(store.is_stale(&key));
        assert!(fetcher.row(NotificationCategory::Informative, "n0").unwrap().read);

        fetcher.fail_fetches(false);
        fetcher.prepend_row(NotificationCategory::Informative, notification("x", false));
        store.ensure_loaded(&key).await.unwrap();

        let cache = store.data(&key).unwrap();
        assert_eq!(cache.page_params(), &[0, 2]);
        assert_eq!(ids(&cache.flatten()), vec!["x", "n0", "n1", "n2"]);
        assert!(cache.flatten()[1].read);
        assert!(!store.is_stale(&key));

        assert!(store.fetch_next_page(&key).await.unwrap());
        assert_eq!(ids(&store.items(&key)), vec!["x", "n0", "n1", "n2", "n3"]);
    }

    #[tokio::test]
    async fn push_during_refetch_survives_it() {
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Today, rows("n", 2));
        let store = Arc::new(store_with(&fetcher, 10));
        let key = key(NotificationCategory::Today);
        store.ensure_loaded(&key).await.unwrap();

        fetcher.pause();
        let in_flight = tokio::spawn({
            let store = store.clone();
            let key = key.clone();
            async move { store.refetch(&key).await }
        });
        tokio::task::yield_now().await;

        store.merge_live(&key, notification("live", false));
        assert_eq!(ids(&store.items(&key)), vec!["live", "n0", "n1"]);

        fetcher.resume();
        in_flight.await.unwrap().unwrap();

        assert_eq!(ids(&store.items(&key)), vec!["live", "n0", "n1"]);
        assert_eq!(store.data(&key).unwrap().page_params(), &[0]);

        // Once the server has it, the row is no longer carried separately.
        fetcher.prepend_row(NotificationCategory::Today, notification("live", false));
        store.refetch(&key).await.unwrap();
        assert_eq!(ids(&store.items(&key)), vec!["live", "n0", "n1"]);
        assert_eq!(store.data(&key).unwrap().pages()[0].data.len(), 3);
    }

    #[tokio::test]
    async fn push_during_mark_read_keeps_optimistic_flag() {
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Actionable, vec![notification("n1", false)]);
        let store = Arc::new(store_with(&fetcher, 10));
        let key = key(NotificationCategory::Actionable);
        store.ensure_loaded(&key).await.unwrap();

        fetcher.pause_updates();
        let in_flight = tokio::spawn({
            let store = store.clone();
            async move { store.mark_read("user-1", "n1").await }
        });
        tokio::task::yield_now().await;
        assert!(store.items(&key)[0].read);

        assert_eq!(
            store.merge_live(&key, notification("n1", false)),
            MergeOutcome::Duplicate
        );
        assert!(store.items(&key)[0].read);

        fetcher.resume_updates();
        in_flight.await.unwrap().unwrap();

        let items = store.items(&key);
        assert_eq!(ids(&items), vec!["n1"]);
        assert!(items[0].read);
    }

    #[tokio::test]
    async fn push_during_failed_mark_read_survives_rollback() {
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Informative, vec![notification("x", false)]);
        let store = Arc::new(store_with(&fetcher, 10));
        let key = key(NotificationCategory::Informative);
        store.ensure_loaded(&key).await.unwrap();

        fetcher.fail_updates(true);
        fetcher.pause_updates();
        let in_flight = tokio::spawn({
            let store = store.clone();
            async move { store.mark_read("user-1", "x").await }
        });
        tokio::task::yield_now().await;
        store.merge_live(&key, notification("live", false));

        fetcher.resume_updates();
        assert!(in_flight.await.unwrap().is_err());

        let items = store.items(&key);
        assert_eq!(ids(&items), vec!["live", "x"]);
        assert!(!items[1].read);
    }

    #[tokio::test]
    async fn push_reaches_only_its_category() {
        let seed = vec![notification("n1", false)];
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Informative, seed.clone())
            .with_rows(NotificationCategory::Today, seed);
        let store = store_with(&fetcher, 10);
        let informative = key(NotificationCategory::Informative);
        let today = key(NotificationCategory::Today);
        store.ensure_loaded(&informative).await.unwrap();
        store.ensure_loaded(&today).await.unwrap();

        store.merge_live(&informative, notification("n2", false));

        assert_eq!(ids(&store.items(&informative)), vec!["n2", "n1"]);
        assert_eq!(ids(&store.items(&today)), vec!["n1"]);
    }

    #[tokio::test]
    async fn failed_mark_read_restores_every_cache() {
        let shared = vec![notification("x", false), notification("y", false)];
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Informative, shared.clone())
            .with_rows(NotificationCategory::Today, shared);
        let store = store_with(&fetcher, 10);
        let a = key(NotificationCategory::Informative);
        let b = key(NotificationCategory::Today);
        store.ensure_loaded(&a).await.unwrap();
        store.ensure_loaded(&b).await.unwrap();
        let before_a = store.data(&a).unwrap();
        let before_b = store.data(&b).unwrap();

        fetcher.fail_updates(true);
        let result = store.mark_read("user-1", "x").await;

        assert!(result.is_err());
        assert_eq!(store.data(&a).unwrap(), before_a);
        assert_eq!(store.data(&b).unwrap(), before_b);
    }

    #[tokio::test]
    async fn failed_mark_read_restores_even_when_refetch_fails() {
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Actionable, vec![notification("x", false)]);
        let store = store_with(&fetcher, 10);
        let key = key(NotificationCategory::Actionable);
        store.ensure_loaded(&key).await.unwrap();
        let before = store.data(&key).unwrap();

        fetcher.fail_updates(true);
        fetcher.fail_fetches(true);
        assert!(store.mark_read("user-1", "x").await.is_err());

        assert_eq!(store.data(&key).unwrap(), before);
        assert!(store.is_stale(&key));
    }

    #[tokio::test]
    async fn mark_read_applies_to_all_matching_caches_and_reconciles() {
        let shared = vec![notification("x", false)];
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Informative, shared.clone())
            .with_rows(NotificationCategory::Today, shared);
        let store = store_with(&fetcher, 10);
        let a = key(NotificationCategory::Informative);
        let b = key(NotificationCategory::Today);
        store.ensure_loaded(&a).await.unwrap();
        store.ensure_loaded(&b).await.unwrap();
        let fetches_before = fetcher.fetch_count();

        store.mark_read("user-1", "x").await.unwrap();

        assert!(store.items(&a)[0].read);
        assert!(store.items(&b)[0].read);
        assert_eq!(fetcher.fetch_count(), fetches_before + 2);
        assert!(!store.is_stale(&a));
    }

    #[tokio::test]
    async fn mark_read_ignores_other_scopes() {
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Today, vec![notification("x", false)]);
        let store = store_with(&fetcher, 10);
        let mine = key(NotificationCategory::Today);
        let theirs = CacheKey::new("user-2", NotificationCategory::Today);
        store.ensure_loaded(&mine).await.unwrap();
        store.ensure_loaded(&theirs).await.unwrap();

        fetcher.fail_updates(true);
        let _ = store.mark_read("user-1", "x").await;
        fetcher.fail_updates(false);
        store.mark_read("user-1", "x").await.unwrap();

        assert_eq!(fetcher.update_count(), 2);
        assert!(store.items(&mine)[0].read);
        assert!(!store.items(&theirs)[0].read);
        assert!(!store.is_stale(&theirs));
    }

    #[tokio::test]
    async fn duplicate_push_after_mark_read_keeps_flag() {
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Informative, vec![notification("x", false)]);
        let store = store_with(&fetcher, 10);
        let key = key(NotificationCategory::Informative);
        store.ensure_loaded(&key).await.unwrap();
        store.mark_read("user-1", "x").await.unwrap();

        assert_eq!(
            store.merge_live(&key, notification("x", false)),
            MergeOutcome::Duplicate
        );
        assert!(store.items(&key)[0].read);
    }

    #[tokio::test]
    async fn mark_all_read_marks_every_unread_row() {
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Actionable, rows("n", 3));
        let store = store_with(&fetcher, 10);
        let key = key(NotificationCategory::Actionable);
        store.ensure_loaded(&key).await.unwrap();

        store.mark_all_read(&key).await.unwrap();

        assert_eq!(fetcher.update_count(), 3);
        assert!(store.items(&key).iter().all(|n| n.read));
    }

    #[tokio::test]
    async fn refetch_replaces_pages_at_recorded_offsets() {
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Informative, rows("n", 4));
        let store = store_with(&fetcher, 2);
        let key = key(NotificationCategory::Informative);
        store.ensure_loaded(&key).await.unwrap();
        store.fetch_next_page(&key).await.unwrap();

        fetcher.prepend_row(NotificationCategory::Informative, notification("fresh", false));
        store.refetch(&key).await.unwrap();

        let cache = store.data(&key).unwrap();
        assert_eq!(cache.page_params(), &[0, 2]);
        assert_eq!(ids(&cache.flatten()), vec!["fresh", "n0", "n1", "n2"]);
    }

    #[tokio::test]
    async fn failed_refetch_keeps_stale_data() {
        let fetcher = MockNotificationFetcher::new()
            .with_rows(NotificationCategory::Today, rows("n", 2));
        let store = store_with(&fetcher, 10);
        let key = key(NotificationCategory::Today);
        store.ensure_loaded(&key).await.unwrap();

        fetcher.fail_fetches(true);
        assert!(store.refetch(&key).await.is_err());
        assert_eq!(ids(&store.items(&key)), vec!["n0", "n1"]);
    }

    #[tokio::test]
    async fn clear_scope_drops_only_that_scope() {
        let fetcher = MockNotificationFetcher::new();
        let store = store_with(&fetcher, 10);
        store.merge_live(&key(NotificationCategory::Today), notification("a", false));
        let other = CacheKey::new("user-2", NotificationCategory::Today);
        store.merge_live(&other, notification("b", false));

        store.clear_scope("user-1");

        assert_eq!(store.status(&key(NotificationCategory::Today)), CacheStatus::Unloaded);
        assert_eq!(store.items(&other).len(), 1);
    }
}
