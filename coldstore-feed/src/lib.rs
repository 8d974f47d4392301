//! Client-side data layer for the cold-storage facility app: live notification caches and
//! cross-domain search over the facility's backend resources.

pub mod config;
pub mod context;
pub mod domain;
pub mod telemetry;

pub use context::FeedContext;
