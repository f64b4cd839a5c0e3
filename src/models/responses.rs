//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, EntrySnapshot};

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub evictions: u64,
    pub rejected: u64,
    /// Occupied slots
    pub total_entries: usize,
    /// Slot count
    pub capacity: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: &CacheStats, capacity: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            stores: stats.stores,
            evictions: stats.evictions,
            rejected: stats.rejected,
            total_entries: stats.total_entries,
            capacity,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// One cached entry (GET /cache, GET /cache/lookup)
#[derive(Debug, Clone, Serialize)]
pub struct EntryResponse {
    pub url: String,
    pub slot: usize,
    /// Payload length in bytes
    pub size: usize,
    /// Logical time of the last store or hit
    pub recency: u64,
}

impl From<EntrySnapshot> for EntryResponse {
    fn from(entry: EntrySnapshot) -> Self {
        Self {
            url: entry.url,
            slot: entry.index,
            size: entry.size,
            recency: entry.recency,
        }
    }
}

/// Response body for GET /cache
#[derive(Debug, Clone, Serialize)]
pub struct EntriesResponse {
    pub count: usize,
    /// Most recently used first
    pub entries: Vec<EntryResponse>,
}

impl EntriesResponse {
    pub fn new(entries: Vec<EntrySnapshot>) -> Self {
        let entries: Vec<EntryResponse> = entries.into_iter().map(EntryResponse::from).collect();
        Self {
            count: entries.len(),
            entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_response_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            stores: 20,
            evictions: 5,
            rejected: 1,
            total_entries: 10,
        };
        let resp = StatsResponse::new(&stats, 10);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.capacity, 10);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::new(&CacheStats::new(), 10);
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_entries_response_count() {
        let resp = EntriesResponse::new(vec![EntrySnapshot {
            index: 3,
            url: "http://a/".to_string(),
            size: 12,
            recency: 9,
        }]);
        assert_eq!(resp.count, 1);
        assert_eq!(resp.entries[0].slot, 3);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["entries"][0]["url"], "http://a/");
        assert_eq!(json["entries"][0]["size"], 12);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
