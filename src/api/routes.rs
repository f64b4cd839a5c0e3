//! Admin API Routes
//!
//! Configures the Axum router for the admin endpoints.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{entries_handler, health_handler, lookup_handler, stats_handler, AppState};

/// Creates the admin router.
///
/// # Endpoints
/// - `GET /health` - Health check
/// - `GET /stats` - Cache statistics
/// - `GET /cache` - Cached entries, most recently used first
/// - `GET /cache/lookup?url=<url>` - One cached entry
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/cache", get(entries_handler))
        .route("/cache/lookup", get(lookup_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        create_router(AppState::new(Arc::new(ResponseCache::default())))
    }

    async fn status_of(uri: &str) -> StatusCode {
        create_test_app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        assert_eq!(status_of("/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        assert_eq!(status_of("/stats").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cache_endpoint() {
        assert_eq!(status_of("/cache").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        assert_eq!(
            status_of("/cache/lookup?url=http%3A%2F%2Fnope%2F").await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_lookup_missing_query() {
        assert_eq!(status_of("/cache/lookup").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_is_read_only() {
        let response = create_test_app()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/cache")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
