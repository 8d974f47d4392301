//! Trait definitions for the collaborators the search side depends on.
//!
//! Resource queries and filter sinks are owned by the embedding application; these traits
//! let the adapters and the controller be tested against in-memory mocks.

use std::collections::BTreeSet;

use serde_json::Value;

use super::types::DomainId;

/// Error type for search operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    #[error("Resource query failed: {0}")]
    Query(String),

    #[error("Unexpected payload shape: {0}")]
    Payload(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// Current state of a backend resource query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySnapshot {
    /// Either an array of records or `{ "items": [...] }`.
    pub data: Option<Value>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// A backend query owned by an external collaborator.
///
/// The query drives its own fetching; the search side only reads its latest snapshot.
pub trait ResourceQuery: Send + Sync {
    fn snapshot(&self) -> QuerySnapshot;
}

/// Receives the debounced query and filter set, for call sites that re-query a backend
/// per change.
pub trait FilterSink: Send + Sync {
    fn query_settled(&self, query: &str);

    fn filters_settled(&self, filters: &BTreeSet<DomainId>);
}

impl QuerySnapshot {
    /// Records carried by the snapshot. A failed query or an unknown payload shape is an error.
    pub fn records(&self) -> Result<Vec<Value>> {
        if let Some(error) = &self.error {
            return Err(SearchError::Query(error.clone()));
        }
        match &self.data {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(Value::Object(map)) => match map.get("items") {
                Some(Value::Array(items)) => Ok(items.clone()),
                Some(Value::Null) | None => Err(SearchError::Payload(
                    "object without an items array".to_string(),
                )),
                Some(other) => Err(SearchError::Payload(format!(
                    "items is {}, expected an array",
                    json_kind(other)
                ))),
            },
            Some(other) => Err(SearchError::Payload(format!(
                "{}, expected an array",
                json_kind(other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
