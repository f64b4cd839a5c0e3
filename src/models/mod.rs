//! Response models for the admin API
//!
//! This module defines the DTOs serialized into admin API response bodies.

pub mod responses;

// Re-export commonly used types
pub use responses::{EntriesResponse, EntryResponse, ErrorResponse, HealthResponse, StatsResponse};
