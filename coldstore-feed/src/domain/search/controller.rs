//! Search controller: draft and submitted query, filter chips, results and phase.
//!
//! Nothing here suspends. Results are computed from whatever the adapters currently hold,
//! and the phase is derived on every read.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use super::aggregator::DomainAggregator;
use super::debounce::Debouncer;
use super::indexer::tokenize;
use super::phase::{derive_phase, PhaseInputs, SearchPhase};
use super::traits::FilterSink;
use super::types::{DomainId, SearchDocument};

/// Everything a search screen renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchView {
    /// Draft text as typed
    pub query: String,
    pub submitted_query: String,
    pub filters: BTreeSet<DomainId>,
    pub results: Vec<SearchDocument>,
    pub is_loading: bool,
    pub phase: SearchPhase,
    pub failed_domains: Vec<DomainId>,
}

pub struct SearchController {
    aggregator: Arc<DomainAggregator>,
    draft: String,
    submitted: String,
    filters: BTreeSet<DomainId>,
    debounced_query: Debouncer<String>,
    debounced_filters: Debouncer<BTreeSet<DomainId>>,
}

impl SearchController {
    pub fn new(aggregator: Arc<DomainAggregator>, debounce: Duration) -> Self {
        Self::build(aggregator, debounce, None)
    }

    /// Also forward the debounced query and filter set to `sink`.
    pub fn with_sink(
        aggregator: Arc<DomainAggregator>,
        debounce: Duration,
        sink: Arc<dyn FilterSink>,
    ) -> Self {
        Self::build(aggregator, debounce, Some(sink))
    }

    fn build(
        aggregator: Arc<DomainAggregator>,
        debounce: Duration,
        sink: Option<Arc<dyn FilterSink>>,
    ) -> Self {
        let mut debounced_query = Debouncer::new(String::new(), debounce);
        let mut debounced_filters = Debouncer::new(BTreeSet::new(), debounce);

        if let Some(sink) = sink {
            let query_sink = Arc::clone(&sink);
            debounced_query = debounced_query.on_settle(move |query: &String| {
                debug!(query = %query, "Search query settled");
                query_sink.query_settled(query);
            });
            debounced_filters = debounced_filters.on_settle(move |filters: &BTreeSet<DomainId>| {
                debug!(count = filters.len(), "Search filters settled");
                sink.filters_settled(filters);
            });
        }

        Self {
            aggregator,
            draft: String::new(),
            submitted: String::new(),
            filters: BTreeSet::new(),
            debounced_query,
            debounced_filters,
        }
    }

    /// Edit the draft. Results do not change until [`submit_search`](Self::submit_search).
    pub fn update_query(&mut self, text: impl Into<String>) {
        self.draft = text.into();
        self.debounced_query.push(self.draft.clone());
    }

    /// Promote the draft to the query that filters results.
    pub fn submit_search(&mut self) {
        self.submitted = self.draft.trim().to_string();
        debug!(query = %self.submitted, "Search submitted");
    }

    /// Select or deselect one filter chip.
    pub fn toggle_filter(&mut self, domain: DomainId) {
        if !self.filters.remove(&domain) {
            self.filters.insert(domain);
        }
        self.debounced_filters.push(self.filters.clone());
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.debounced_filters.push(BTreeSet::new());
    }

    pub fn query(&self) -> &str {
        &self.draft
    }

    pub fn submitted_query(&self) -> &str {
        &self.submitted
    }

    pub fn filters(&self) -> &BTreeSet<DomainId> {
        &self.filters
    }

    /// Last query text that outlasted the debounce window.
    pub fn debounced_query(&self) -> String {
        self.debounced_query.settled()
    }

    pub fn debounced_filters(&self) -> BTreeSet<DomainId> {
        self.debounced_filters.settled()
    }

    /// Matching documents, newest first.
    pub fn results(&self) -> Vec<SearchDocument> {
        self.snapshot().results
    }

    pub fn is_loading(&self) -> bool {
        self.aggregator.snapshot().is_loading
    }

    pub fn phase(&self) -> SearchPhase {
        self.snapshot().phase
    }

    pub fn snapshot(&self) -> SearchView {
        let aggregate = self.aggregator.snapshot();
        let tokens = tokenize(&self.submitted);

        let mut results: Vec<SearchDocument> = aggregate
            .documents
            .iter()
            .filter(|doc| matches_query(doc, &tokens) && matches_filters(doc, &self.filters))
            .cloned()
            .collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let phase = derive_phase(PhaseInputs {
            draft: &self.draft,
            submitted: &self.submitted,
            filters_active: !self.filters.is_empty(),
            is_loading: aggregate.is_loading,
            result_count: results.len(),
        });

        SearchView {
            query: self.draft.clone(),
            submitted_query: self.submitted.clone(),
            filters: self.filters.clone(),
            results,
            is_loading: aggregate.is_loading,
            phase,
            failed_domains: aggregate.failed_domains,
        }
    }
}

impl std::fmt::Debug for SearchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchController")
            .field("draft", &self.draft)
            .field("submitted", &self.submitted)
            .field("filters", &self.filters)
            .finish()
    }
}

/// Every query token is a substring of at least one keyword. No tokens matches everything.
pub fn matches_query(doc: &SearchDocument, tokens: &[String]) -> bool {
    tokens
        .iter()
        .all(|token| doc.keywords.iter().any(|keyword| keyword.contains(token.as_str())))
}

/// An empty filter set matches everything.
pub fn matches_filters(doc: &SearchDocument, filters: &BTreeSet<DomainId>) -> bool {
    filters.is_empty() || filters.contains(&doc.identifier)
}
