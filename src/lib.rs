//! Cacheproxy - A caching forward HTTP proxy
//!
//! Relays GET requests to origin servers and keeps small responses in a
//! fixed-size in-memory cache with LRU eviction.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod proxy;
pub mod tasks;

pub use api::AppState;
pub use cache::ResponseCache;
pub use config::Config;
pub use proxy::{Acceptor, ConnectionPolicy};
pub use tasks::spawn_stats_reporter;
