//! Core types for the search domain.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use time::OffsetDateTime;

use super::records::ActivityRecord;

/// Backend resource a record was fetched from. Becomes a document's `source_domain`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ResourceKind {
    RawMaterialOrder,
    ProductionBatch,
    DispatchOrder,
    Vendor,
    Truck,
    PackingEvent,
    PackageStock,
    Notification,
}

/// Logical search domain, the unit a filter chip selects.
///
/// Several domains may partition one resource by status, so a chip can narrow results
/// without another fetch.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DomainId {
    RawMaterialOrdered,
    RawMaterialReached,
    ProductionInProgress,
    ProductionCompleted,
    DispatchPending,
    DispatchShipped,
    Vendor,
    Truck,
    PackingEvent,
    PackageInventory,
    Notification,
}

const FINISHED: &[&str] = &["completed", "done"];

impl DomainId {
    pub fn resource(self) -> ResourceKind {
        match self {
            DomainId::RawMaterialOrdered | DomainId::RawMaterialReached => {
                ResourceKind::RawMaterialOrder
            }
            DomainId::ProductionInProgress | DomainId::ProductionCompleted => {
                ResourceKind::ProductionBatch
            }
            DomainId::DispatchPending | DomainId::DispatchShipped => ResourceKind::DispatchOrder,
            DomainId::Vendor => ResourceKind::Vendor,
            DomainId::Truck => ResourceKind::Truck,
            DomainId::PackingEvent => ResourceKind::PackingEvent,
            DomainId::PackageInventory => ResourceKind::PackageStock,
            DomainId::Notification => ResourceKind::Notification,
        }
    }

    /// Human label, also indexed as keywords.
    pub fn label(self) -> &'static str {
        match self {
            DomainId::RawMaterialOrdered => "Raw material ordered",
            DomainId::RawMaterialReached => "Raw material reached",
            DomainId::ProductionInProgress => "Production in progress",
            DomainId::ProductionCompleted => "Production completed",
            DomainId::DispatchPending => "Dispatch pending",
            DomainId::DispatchShipped => "Dispatch shipped",
            DomainId::Vendor => "Vendor",
            DomainId::Truck => "Truck",
            DomainId::PackingEvent => "Packing",
            DomainId::PackageInventory => "Package inventory",
            DomainId::Notification => "Notification",
        }
    }

    /// Whether a record with this status belongs to the domain.
    pub fn accepts_status(self, status: &str) -> bool {
        let status = status.trim().to_lowercase();
        match self {
            DomainId::RawMaterialOrdered => status == "pending",
            DomainId::RawMaterialReached | DomainId::ProductionCompleted => {
                FINISHED.contains(&status.as_str())
            }
            DomainId::ProductionInProgress => !FINISHED.contains(&status.as_str()),
            DomainId::DispatchPending => matches!(status.as_str(), "pending" | "ready"),
            DomainId::DispatchShipped => {
                matches!(status.as_str(), "dispatched" | "delivered" | "shipped")
            }
            DomainId::Vendor
            | DomainId::Truck
            | DomainId::PackingEvent
            | DomainId::PackageInventory
            | DomainId::Notification => true,
        }
    }

    /// Every domain partitioning `kind`.
    pub fn for_resource(kind: ResourceKind) -> Vec<DomainId> {
        DomainId::iter().filter(|d| d.resource() == kind).collect()
    }
}

/// One normalized backend record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainActivity {
    pub id: String,
    pub domain: DomainId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub record: ActivityRecord,
}

/// Searchable form of a [`DomainActivity`].
///
/// Two documents are equal when their `id` and `source_domain` match.
#[derive(Debug, Clone, Serialize)]
pub struct SearchDocument {
    pub id: String,
    /// Lower-cased tokens of every human-visible field
    pub keywords: Vec<String>,
    /// Domain the document is filtered by
    pub identifier: DomainId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub source_domain: ResourceKind,
    pub payload: ActivityRecord,
}

impl PartialEq for SearchDocument {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.source_domain == other.source_domain
    }
}

impl Eq for SearchDocument {}

impl Hash for SearchDocument {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.source_domain.hash(state);
    }
}

/// What one adapter exposes for the current render.
#[derive(Debug, Clone)]
pub struct DomainFeed {
    pub domain: DomainId,
    pub activities: Vec<DomainActivity>,
    pub is_loading: bool,
    /// Set when the backing query failed; activities are empty then.
    pub error: Option<String>,
}
