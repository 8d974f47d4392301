//! Paged notification cache for one category.
//!
//! `pages[i]` was produced by a fetch at offset `page_params[i]`. Live pushes only ever
//! touch `pages[0].data`, so the offsets recorded for later pages stay valid no matter how
//! many pushes arrive between fetches.

use std::collections::HashSet;

use serde::Serialize;

use super::types::{MergeOutcome, Notification, NotificationsPage};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedCache {
    pages: Vec<NotificationsPage>,
    page_params: Vec<usize>,
}

impl PagedCache {
    /// Cache holding a single fetched page.
    pub fn with_first_page(offset: usize, page: NotificationsPage) -> Self {
        Self {
            pages: vec![page],
            page_params: vec![offset],
        }
    }

    /// Cache created by a push that arrived before any fetch.
    pub fn seeded(item: Notification) -> Self {
        Self::with_first_page(
            0,
            NotificationsPage {
                data: vec![item],
                next_offset: None,
            },
        )
    }

    pub fn pages(&self) -> &[NotificationsPage] {
        &self.pages
    }

    pub fn page_params(&self) -> &[usize] {
        &self.page_params
    }

    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|page| page.data.is_empty())
    }

    /// Offset to request the page after the last cached one.
    pub fn next_offset(&self) -> Option<usize> {
        self.pages.last().and_then(|page| page.next_offset)
    }

    pub fn has_next_page(&self) -> bool {
        self.next_offset().is_some()
    }

    /// Merge a live item into page 0.
    ///
    /// Only page 0 is scanned for the id. An existing row is left untouched so flags set
    /// locally (an optimistic `read`) survive a re-delivery.
    pub fn merge_live(&mut self, item: Notification) -> MergeOutcome {
        let Some(first) = self.pages.first_mut() else {
            *self = Self::seeded(item);
            return MergeOutcome::Seeded;
        };

        if first.data.iter().any(|existing| existing.id == item.id) {
            return MergeOutcome::Duplicate;
        }

        first.data.insert(0, item);
        MergeOutcome::Inserted
    }

    /// Append a page fetched at `offset`. Existing pages are not touched.
    pub fn push_page(&mut self, offset: usize, page: NotificationsPage) {
        self.pages.push(page);
        self.page_params.push(offset);
    }

    /// Put rows of `previous` page 0 whose ids are in `pushed` in front of this cache's page 0,
    /// skipping ids this cache already holds. Other rows of `previous` are dropped.
    ///
    /// Returns how many rows were carried.
    pub fn carry_pushed(&mut self, previous: &PagedCache, pushed: &HashSet<String>) -> usize {
        if pushed.is_empty() {
            return 0;
        }
        let Some(source) = previous.pages.first() else {
            return 0;
        };
        let carried: Vec<Notification> = source
            .data
            .iter()
            .filter(|n| pushed.contains(&n.id) && !self.contains(&n.id))
            .cloned()
            .collect();
        let count = carried.len();
        if count == 0 {
            return 0;
        }

        match self.pages.first_mut() {
            Some(first) => {
                first.data.splice(0..0, carried);
            }
            None => {
                self.pages.push(NotificationsPage {
                    data: carried,
                    next_offset: None,
                });
                self.page_params.push(0);
            }
        }
        count
    }

    /// All rows, newest page first, with duplicate ids collapsed to their first occurrence.
    ///
    /// A push can land in page 0 while a later page already holds the same row; the
    /// flattened view still shows it once.
    pub fn flatten(&self) -> Vec<Notification> {
        let mut seen = HashSet::new();
        self.pages
            .iter()
            .flat_map(|page| page.data.iter())
            .filter(|n| seen.insert(n.id.as_str()))
            .cloned()
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.pages
            .iter()
            .any(|page| page.data.iter().any(|n| n.id == id))
    }

    /// Set the `read` flag on every copy of `id` in every page.
    ///
    /// Returns whether any row changed.
    pub fn set_read(&mut self, id: &str, read: bool) -> bool {
        let mut changed = false;
        for row in self
            .pages
            .iter_mut()
            .flat_map(|page| page.data.iter_mut())
            .filter(|n| n.id == id)
        {
            if row.read != read {
                row.read = read;
                changed = true;
            }
        }
        changed
    }

    /// Ids of distinct unread rows.
    pub fn unread_ids(&self) -> Vec<String> {
        self.flatten()
            .into_iter()
            .filter(|n| !n.read)
            .map(|n| n.id)
            .collect()
    }

    pub fn unread_count(&self) -> usize {
        self.flatten().iter().filter(|n| !n.read).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notifications::mock::notification;
    use crate::domain::notifications::types::PageRequest;

    fn page(ids: &[&str], request: PageRequest) -> NotificationsPage {
        NotificationsPage::from_fetch(
            ids.iter().map(|id| notification(id, false)).collect(),
            request,
        )
    }

    fn ids(items: &[Notification]) -> Vec<&str> {
        items.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn merging_same_item_twice_equals_merging_once() {
        let mut once = PagedCache::with_first_page(0, page(&["n1"], PageRequest::new(10, 0)));
        once.merge_live(notification("n2", false));

        let mut twice = once.clone();
        assert_eq!(
            twice.merge_live(notification("n2", false)),
            MergeOutcome::Duplicate
        );
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_into_empty_cache_seeds_first_page() {
        let mut cache = PagedCache::default();
        assert_eq!(
            cache.merge_live(notification("n1", false)),
            MergeOutcome::Seeded
        );
        assert_eq!(cache.page_params(), &[0]);
        assert_eq!(cache.pages()[0].next_offset, None);
        assert_eq!(ids(&cache.flatten()), vec!["n1"]);
    }

    #[test]
    fn pushes_leave_offsets_and_later_pages_alone() {
        let mut cache = PagedCache::with_first_page(0, page(&["a", "b"], PageRequest::new(2, 0)));
        cache.push_page(2, page(&["c", "d"], PageRequest::new(2, 2)));
        cache.push_page(4, page(&["e"], PageRequest::new(2, 4)));
        let later_pages = cache.pages()[1..].to_vec();

        for id in ["p1", "p2", "p3"] {
            cache.merge_live(notification(id, false));
        }

        assert_eq!(cache.page_params(), &[0, 2, 4]);
        assert_eq!(cache.pages()[0].data.len(), 5);
        assert_eq!(cache.pages()[0].next_offset, Some(2));
        assert_eq!(&cache.pages()[1..], later_pages.as_slice());
        assert!(!cache.has_next_page());
    }

    #[test]
    fn flatten_collapses_push_that_exists_in_later_page() {
        let mut cache = PagedCache::with_first_page(0, page(&["a", "b"], PageRequest::new(2, 0)));
        cache.push_page(2, page(&["c", "d"], PageRequest::new(2, 2)));

        cache.merge_live(notification("d", false));

        let flat = cache.flatten();
        assert_eq!(ids(&flat), vec!["d", "a", "b", "c"]);
        assert_eq!(flat.iter().filter(|n| n.id == "d").count(), 1);
    }

    #[test]
    fn duplicate_push_keeps_local_read_flag() {
        let mut cache = PagedCache::with_first_page(0, page(&["a"], PageRequest::new(10, 0)));
        cache.set_read("a", true);

        cache.merge_live(notification("a", false));

        assert!(cache.flatten()[0].read);
    }

    #[test]
    fn set_read_touches_every_page() {
        let mut cache = PagedCache::with_first_page(0, page(&["a", "b"], PageRequest::new(2, 0)));
        cache.push_page(2, page(&["c"], PageRequest::new(2, 2)));
        cache.merge_live(notification("c", false));

        assert!(cache.set_read("c", true));
        assert!(!cache.set_read("c", true));
        assert!(cache
            .pages()
            .iter()
            .flat_map(|p| p.data.iter())
            .filter(|n| n.id == "c")
            .all(|n| n.read));
        assert_eq!(cache.unread_count(), 2);
    }

    fn id_set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn carry_pushed_keeps_rows_pushed_before_load() {
        let previous = PagedCache::seeded(notification("pushed", false));
        let mut fresh = PagedCache::with_first_page(0, page(&["a", "b"], PageRequest::new(2, 0)));

        assert_eq!(fresh.carry_pushed(&previous, &id_set(&["pushed"])), 1);

        assert_eq!(ids(&fresh.flatten()), vec!["pushed", "a", "b"]);
        assert_eq!(fresh.page_params(), &[0]);
        assert_eq!(fresh.next_offset(), Some(2));
    }

    #[test]
    fn carry_pushed_leaves_fetched_rows_behind() {
        let mut previous = PagedCache::with_first_page(0, page(&["n0", "n1"], PageRequest::new(2, 0)));
        previous.push_page(2, page(&["n2", "n3"], PageRequest::new(2, 2)));
        previous.merge_live(notification("live", false));
        previous.merge_live(notification("n0", false));

        let mut fresh = PagedCache::with_first_page(0, page(&["x", "n0"], PageRequest::new(2, 0)));
        fresh.push_page(2, page(&["n1", "n2"], PageRequest::new(2, 2)));

        assert_eq!(fresh.carry_pushed(&previous, &id_set(&["live", "n0"])), 1);

        assert_eq!(ids(&fresh.flatten()), vec!["live", "x", "n0", "n1", "n2"]);
        assert_eq!(fresh.page_params(), &[0, 2]);
        assert_eq!(fresh.pages()[0].next_offset, Some(2));
    }

    #[test]
    fn carry_pushed_keeps_local_read_flag() {
        let mut previous = PagedCache::seeded(notification("live", false));
        previous.set_read("live", true);
        let mut fresh = PagedCache::with_first_page(0, page(&["a"], PageRequest::new(10, 0)));

        fresh.carry_pushed(&previous, &id_set(&["live"]));

        assert!(fresh.flatten()[0].read);
    }
}
