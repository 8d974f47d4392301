//! Notification Live Cache - paginated per-category caches kept current by pushes.
//!
//! # Architecture
//!
//! - [`PagedCache`] - pages plus the offsets that produced them; pushes prepend to page 0 only
//! - [`NotificationStore`] - every cache of the process behind one read-compute-write primitive
//! - [`LiveRegistry`] - at most one transport handler per category, reference counted
//! - [`NotificationFeed`] - what a screen holds: flattened rows and pagination controls
//!
//! The fetch layer and the push transport are reached through [`NotificationFetcher`] and
//! [`Transport`], so both can be swapped for the in-memory versions in [`mock`].
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(NotificationStore::new(Arc::new(fetcher), 20));
//! let registry = LiveRegistry::new(transport, store.clone(), identity);
//! registry.start();
//!
//! let key = CacheKey::new("user-7", NotificationCategory::Today);
//! let feed = NotificationFeed::new(store, key, registry.acquire(NotificationCategory::Today));
//! feed.load().await?;
//! ```

mod cache;
mod feed;
mod http;
mod live;
mod store;
mod traits;
mod types;

pub mod mock;

pub use cache::PagedCache;
pub use feed::NotificationFeed;
pub use http::HttpNotificationClient;
pub use live::{LiveRegistry, LiveSubscription};
pub use store::NotificationStore;
pub use traits::{
    AnyEventHandler, ConnectHandler, EventHandler, HandlerId, IdentityProvider,
    NotificationError, NotificationFetcher, Result, StaticIdentity, Transport,
};
pub use types::{
    CacheKey, CacheStatus, MergeOutcome, Notification, NotificationCategory, NotificationDetails,
    NotificationUpdate, NotificationsPage, PageRequest,
};
