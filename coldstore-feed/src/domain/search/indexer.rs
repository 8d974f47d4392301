//! Pure mapping from normalized activities to searchable documents.

use itertools::Itertools;

use super::records::UNKNOWN;
use super::types::{DomainActivity, SearchDocument};

/// Split on whitespace, lower-case, drop empty tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(str::to_lowercase)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Build the document for one activity.
///
/// Keywords are the tokens of the title, the domain label and every detail field, first
/// occurrence kept. Sentinel values for missing fields are not indexed.
pub fn index_activity(activity: &DomainActivity) -> SearchDocument {
    let record = &activity.record;
    let keywords = std::iter::once(record.title())
        .chain(std::iter::once(activity.domain.label()))
        .chain(record.details())
        .filter(|field| *field != UNKNOWN)
        .flat_map(tokenize)
        .unique()
        .collect();

    SearchDocument {
        id: activity.id.clone(),
        keywords,
        identifier: activity.domain,
        created_at: activity.created_at,
        source_domain: activity.domain.resource(),
        payload: record.clone(),
    }
}

/// Index every activity, preserving input order.
pub fn index_activities(activities: &[DomainActivity]) -> Vec<SearchDocument> {
    activities.iter().map(index_activity).collect()
}
