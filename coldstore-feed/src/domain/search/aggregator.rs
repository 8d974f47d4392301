//! Merges every adapter's activities into one document index.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::indexer::index_activities;
use super::source::DomainSourceAdapter;
use super::types::{DomainActivity, DomainId, SearchDocument};

/// Aggregate view over all adapters.
#[derive(Debug, Clone)]
pub struct AggregateSnapshot {
    pub documents: Arc<Vec<SearchDocument>>,
    pub is_loading: bool,
    pub failed_domains: Vec<DomainId>,
    /// Bumped whenever the set of activity ids changes
    pub generation: u64,
}

#[derive(Debug, Default)]
struct Memo {
    key: String,
    documents: Arc<Vec<SearchDocument>>,
    generation: u64,
}

/// Flattens adapter output and memoizes the document index by activity identity.
///
/// The index is rebuilt only when the concatenated `domain:id` key changes, so reads
/// that see the same records reuse the previous documents.
#[derive(Debug, Default)]
pub struct DomainAggregator {
    adapters: Vec<DomainSourceAdapter>,
    memo: Mutex<Memo>,
}

impl DomainAggregator {
    pub fn new(adapters: Vec<DomainSourceAdapter>) -> Self {
        Self {
            adapters,
            memo: Mutex::new(Memo::default()),
        }
    }

    pub fn push(&mut self, adapter: DomainSourceAdapter) {
        self.adapters.push(adapter);
    }

    pub fn extend(&mut self, adapters: impl IntoIterator<Item = DomainSourceAdapter>) {
        self.adapters.extend(adapters);
    }

    pub fn domains(&self) -> Vec<DomainId> {
        self.adapters.iter().map(DomainSourceAdapter::domain).collect()
    }

    pub fn snapshot(&self) -> AggregateSnapshot {
        let mut activities: Vec<DomainActivity> = Vec::new();
        let mut is_loading = false;
        let mut failed_domains = Vec::new();

        for feed in self.adapters.iter().map(DomainSourceAdapter::feed) {
            is_loading |= feed.is_loading;
            if feed.error.is_some() {
                failed_domains.push(feed.domain);
            }
            activities.extend(feed.activities);
        }

        let key = identity_key(&activities);
        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        if memo.generation == 0 || memo.key != key {
            memo.documents = Arc::new(index_activities(&activities));
            memo.key = key;
            memo.generation += 1;
            debug!(
                documents = memo.documents.len(),
                generation = memo.generation,
                "Rebuilt search index"
            );
        }

        AggregateSnapshot {
            documents: Arc::clone(&memo.documents),
            is_loading,
            failed_domains,
            generation: memo.generation,
        }
    }
}

fn identity_key(activities: &[DomainActivity]) -> String {
    activities
        .iter()
        .map(|a| format!("{}:{}", a.domain, a.id))
        .collect::<Vec<_>>()
        .join("|")
}
