//! Cross-domain search over the facility's backend resources.
//!
//! # Architecture
//!
//! - [`DomainSourceAdapter`] - one backend query filtered by one domain's status predicate
//! - [`DomainAggregator`] - every adapter flattened, index memoized by activity identity
//! - [`index_activities`] - pure mapping from activities to keyworded documents
//! - [`SearchController`] - draft/submitted query, filter chips, sorted results and phase
//!
//! Backend queries are reached through [`ResourceQuery`], so adapters can be tested against
//! [`mock::MockResourceQuery`].
//!
//! # Example
//!
//! ```ignore
//! let mut aggregator = DomainAggregator::default();
//! aggregator.extend(DomainSourceAdapter::for_resource(ResourceKind::RawMaterialOrder, orders));
//! aggregator.push(DomainSourceAdapter::new(DomainId::Truck, trucks));
//!
//! let mut search = SearchController::new(Arc::new(aggregator), Duration::from_millis(300));
//! search.update_query("acme peas");
//! search.submit_search();
//! let view = search.snapshot();
//! ```
//!
//! # Matching
//!
//! The submitted query is tokenized like the documents. Every query token must be a
//! substring of some keyword; `"acme mat"` matches a document with keywords
//! `["raw", "material", "ordered", "acme"]`.

mod aggregator;
mod controller;
mod debounce;
mod indexer;
mod phase;
mod records;
mod source;
mod traits;
mod types;

pub mod mock;

pub use aggregator::{AggregateSnapshot, DomainAggregator};
pub use controller::{matches_filters, matches_query, SearchController, SearchView};
pub use debounce::Debouncer;
pub use indexer::{index_activities, index_activity, tokenize};
pub use phase::{derive_phase, PhaseInputs, SearchPhase};
pub use records::{
    normalize, ActivityRecord, DispatchOrder, NotificationRecord, PackageStock, PackingEvent,
    ProductionBatch, RawMaterialOrder, RawRecord, Truck, Vendor, UNKNOWN,
};
pub use source::DomainSourceAdapter;
pub use traits::{FilterSink, QuerySnapshot, ResourceQuery, Result, SearchError};
pub use types::{DomainActivity, DomainFeed, DomainId, ResourceKind, SearchDocument};
