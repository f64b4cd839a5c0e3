//! Admin API Handlers
//!
//! Read-only views of the response cache.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::cache::ResponseCache;
use crate::error::CacheError;
use crate::models::{EntriesResponse, EntryResponse, HealthResponse, StatsResponse};

/// Application state shared across all handlers.
///
/// Holds the same cache instance the proxy connections use.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ResponseCache>,
}

impl AppState {
    pub fn new(cache: Arc<ResponseCache>) -> Self {
        Self { cache }
    }
}

/// Query string of GET /cache/lookup
#[derive(Debug, Clone, Deserialize)]
pub struct LookupQuery {
    /// Request target the entry was cached under
    pub url: String,
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();
    Json(StatsResponse::new(&stats, state.cache.capacity()))
}

/// Handler for GET /cache
///
/// Lists occupied slots, most recently used first.
pub async fn entries_handler(State(state): State<AppState>) -> Json<EntriesResponse> {
    Json(EntriesResponse::new(state.cache.entries()))
}

/// Handler for GET /cache/lookup?url=...
///
/// Reports the entry's metadata without counting as a hit or refreshing
/// its recency.
pub async fn lookup_handler(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<EntryResponse>, CacheError> {
    let entry = state.cache.entry(&query.url)?;
    Ok(Json(entry.into()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
