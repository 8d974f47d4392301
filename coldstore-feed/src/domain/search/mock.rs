//! In-memory collaborators for tests.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde_json::Value;

use super::traits::{FilterSink, QuerySnapshot, ResourceQuery};
use super::types::DomainId;

/// Resource query whose state is set directly by the test.
#[derive(Debug, Clone, Default)]
pub struct MockResourceQuery {
    state: Arc<RwLock<QuerySnapshot>>,
    reads: Arc<AtomicUsize>,
}

impl MockResourceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: Value) -> Self {
        let query = Self::new();
        query.set_data(data);
        query
    }

    pub fn set_data(&self, data: Value) {
        self.write(|state| state.data = Some(data));
    }

    pub fn set_loading(&self, is_loading: bool) {
        self.write(|state| state.is_loading = is_loading);
    }

    pub fn set_error(&self, error: Option<&str>) {
        self.write(|state| state.error = error.map(str::to_string));
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn write(&self, f: impl FnOnce(&mut QuerySnapshot)) {
        f(&mut self.state.write().unwrap_or_else(PoisonError::into_inner));
    }
}

impl ResourceQuery for MockResourceQuery {
    fn snapshot(&self) -> QuerySnapshot {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Records every settled query and filter set.
#[derive(Debug, Clone, Default)]
pub struct MockFilterSink {
    queries: Arc<Mutex<Vec<String>>>,
    filters: Arc<Mutex<Vec<BTreeSet<DomainId>>>>,
}

impl MockFilterSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn filters(&self) -> Vec<BTreeSet<DomainId>> {
        self.filters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FilterSink for MockFilterSink {
    fn query_settled(&self, query: &str) {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_string());
    }

    fn filters_settled(&self, filters: &BTreeSet<DomainId>) {
        self.filters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(filters.clone());
    }
}
