//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the proxy is up.
//!
//! # Tasks
//! - Stats reporter: logs cache statistics at a configured interval

mod stats_reporter;

pub use stats_reporter::spawn_stats_reporter;
