//! Admin API Module
//!
//! Read-only HTTP endpoints exposing cache state, served on a separate port.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache statistics
//! - `GET /cache` - Cached entries
//! - `GET /cache/lookup?url=<url>` - One cached entry

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
