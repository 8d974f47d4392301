//! Core types for the notification domain.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString};
use time::OffsetDateTime;

/// Notification category. Every category owns an independent paged cache.
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
    StrumDisplay,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NotificationCategory {
    Informative,
    Actionable,
    Today,
}

impl NotificationCategory {
    /// Transport event carrying live pushes for this category.
    pub fn event_name(&self) -> String {
        format!("notification:{}", self)
    }
}

/// A single notification row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub read: bool,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub details: NotificationDetails,
}

/// Resource the notification points at, plus whatever else the backend sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One fetched page. `next_offset == None` marks the last page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsPage {
    pub data: Vec<Notification>,
    pub next_offset: Option<usize>,
}

impl NotificationsPage {
    /// Build a page from a fetch made with `{ limit, offset }`.
    ///
    /// A full page means more rows may follow at `offset + len`; a short page is the last one.
    pub fn from_fetch(data: Vec<Notification>, request: PageRequest) -> Self {
        let next_offset = if request.limit > 0 && data.len() >= request.limit {
            Some(request.offset + data.len())
        } else {
            None
        };
        Self { data, next_offset }
    }
}

/// Pagination request sent to the fetch layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

impl PageRequest {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }
}

/// Partial update sent with a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotificationUpdate {
    pub read: bool,
}

/// Cache key: one per (identity, category).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub scope: String,
    pub category: NotificationCategory,
}

impl CacheKey {
    pub fn new(scope: impl Into<String>, category: NotificationCategory) -> Self {
        Self {
            scope: scope.into(),
            category,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "notifications/{}/{}", self.scope, self.category)
    }
}

/// Lifecycle of one category cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStatus {
    #[default]
    Unloaded,
    Loading,
    Ready,
}

/// Result of merging a live push into a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No cache existed; it was seeded with the pushed item.
    Seeded,
    /// The item was prepended to page 0.
    Inserted,
    /// Page 0 already held the id; nothing changed.
    Duplicate,
}
