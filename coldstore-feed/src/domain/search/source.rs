//! Domain source adapters: one backend query seen through one domain's status predicate.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use super::records::{normalize, RawRecord};
use super::traits::ResourceQuery;
use super::types::{DomainFeed, DomainId, ResourceKind};

/// Exposes the records of one [`ResourceQuery`] that belong to one [`DomainId`].
///
/// Several adapters may share a query; their predicates keep the domains disjoint.
pub struct DomainSourceAdapter {
    domain: DomainId,
    query: Arc<dyn ResourceQuery>,
    last_error: Mutex<Option<String>>,
}

impl DomainSourceAdapter {
    pub fn new(domain: DomainId, query: Arc<dyn ResourceQuery>) -> Self {
        Self {
            domain,
            query,
            last_error: Mutex::new(None),
        }
    }

    /// One adapter per domain partitioning `kind`, all reading the same query.
    pub fn for_resource(kind: ResourceKind, query: Arc<dyn ResourceQuery>) -> Vec<Self> {
        DomainId::for_resource(kind)
            .into_iter()
            .map(|domain| Self::new(domain, Arc::clone(&query)))
            .collect()
    }

    pub fn domain(&self) -> DomainId {
        self.domain
    }

    /// Current activities of this domain.
    ///
    /// A failed query yields no activities and carries the error; loading is then false.
    pub fn feed(&self) -> DomainFeed {
        let snapshot = self.query.snapshot();

        let records = match snapshot.records() {
            Ok(records) => {
                self.note_error(None);
                records
            }
            Err(e) => {
                let message = e.to_string();
                self.note_error(Some(&message));
                return DomainFeed {
                    domain: self.domain,
                    activities: Vec::new(),
                    is_loading: false,
                    error: Some(message),
                };
            }
        };

        let activities: Vec<_> = records
            .iter()
            .enumerate()
            .filter(|(_, raw)| self.domain.accepts_status(&RawRecord::new(raw).status()))
            .map(|(index, raw)| normalize(self.domain, index, raw))
            .collect();

        debug!(
            domain = %self.domain,
            fetched = records.len(),
            kept = activities.len(),
            "Normalized domain records"
        );

        DomainFeed {
            domain: self.domain,
            activities,
            is_loading: snapshot.is_loading,
            error: None,
        }
    }

    /// Warn once per distinct failure instead of on every read.
    fn note_error(&self, error: Option<&str>) {
        let mut last = self
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if last.as_deref() == error {
            return;
        }
        if let Some(error) = error {
            warn!(domain = %self.domain, error, "Domain query failed");
        }
        *last = error.map(str::to_string);
    }
}

impl std::fmt::Debug for DomainSourceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainSourceAdapter")
            .field("domain", &self.domain)
            .finish()
    }
}
