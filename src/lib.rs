//! TTL LRU Cache - A bounded in-process cache
//!
//! Combines least-recently-used eviction with per-entry time-to-live
//! expiration, and ships a small HTTP service that fronts one shared
//! instance.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{SharedCache, TtlLruCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
