//! Seams to the fetch layer, the push transport and the session.
//!
//! These traits enable dependency injection and easy testing through mocking.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::types::{Notification, NotificationCategory, NotificationUpdate, PageRequest};

/// Error type for notification operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Update failed: {0}")]
    Update(String),

    #[error("Malformed notification payload: {0}")]
    MalformedPayload(String),

    #[error("No identity available for notification cache")]
    NoIdentity,
}

impl From<reqwest::Error> for NotificationError {
    fn from(e: reqwest::Error) -> Self {
        NotificationError::Fetch(e.to_string())
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(e: serde_json::Error) -> Self {
        NotificationError::MalformedPayload(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NotificationError>;

/// Backend access for notification pages and updates.
#[async_trait]
pub trait NotificationFetcher: Send + Sync {
    /// Fetch one page of a category.
    async fn fetch_category(
        &self,
        category: NotificationCategory,
        request: PageRequest,
    ) -> Result<Vec<Notification>>;

    /// Persist a partial update of one notification.
    async fn update_notification(&self, id: &str, update: NotificationUpdate) -> Result<()>;
}

/// Handle returned by every transport registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub u64);

pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;
pub type AnyEventHandler = Arc<dyn Fn(&str, &Value) + Send + Sync>;
pub type ConnectHandler = Arc<dyn Fn() + Send + Sync>;

/// Push transport (a socket connection in production).
///
/// Implementations must not hold internal locks while invoking handlers.
pub trait Transport: Send + Sync {
    fn subscribe(&self, event: &str, handler: EventHandler) -> HandlerId;

    /// Remove an event or connect handler.
    fn unsubscribe(&self, id: HandlerId);

    fn on_any(&self, handler: AnyEventHandler) -> HandlerId;

    fn off_any(&self, id: HandlerId);

    /// Called on every (re)connect.
    fn on_connect(&self, handler: ConnectHandler) -> HandlerId;

    fn is_connected(&self) -> bool;
}

/// Supplies the identity that scopes cache keys (the signed-in user).
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<String>;
}

/// Identity fixed for the lifetime of the provider.
#[derive(Debug, Clone)]
pub struct StaticIdentity(pub String);

impl IdentityProvider for StaticIdentity {
    fn current_identity(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_fetcher_object_safe(_: &dyn NotificationFetcher) {}
    fn _assert_transport_object_safe(_: &dyn Transport) {}
    fn _assert_identity_object_safe(_: &dyn IdentityProvider) {}

    #[test]
    fn error_from_serde() {
        let err = serde_json::from_str::<Notification>("{").unwrap_err();
        let err: NotificationError = err.into();
        assert!(matches!(err, NotificationError::MalformedPayload(_)));
    }

    #[test]
    fn static_identity_returns_scope() {
        let identity = StaticIdentity("user-1".to_string());
        assert_eq!(identity.current_identity().as_deref(), Some("user-1"));
    }
}
