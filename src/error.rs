//! Error types for the proxy
//!
//! Provides unified error handling using thiserror.

use std::io;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Proxy Error Enum ==
/// Errors that end a single client connection.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Request line could not be split into method, target and version
    #[error("Malformed request: {0}")]
    BadRequest(String),

    /// Anything other than GET
    #[error("Method not implemented: {0}")]
    MethodNotImplemented(String),

    /// A request or header line reached the line bound without a terminator
    #[error("Line exceeds {0} bytes")]
    LineTooLong(usize),

    /// The origin server could not be reached
    #[error("Failed to connect to origin {host}:{port}: {source}")]
    OriginConnect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Socket failure on either side of the relay
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ProxyError {
    /// Status line sent to the client before closing, if any.
    ///
    /// Plain I/O errors get nothing: by then the client is usually gone or
    /// has already received part of a response.
    pub fn status_line(&self) -> Option<&'static str> {
        match self {
            ProxyError::BadRequest(_) | ProxyError::LineTooLong(_) => {
                Some("HTTP/1.0 400 Bad Request")
            }
            ProxyError::MethodNotImplemented(_) => Some("HTTP/1.0 501 Not Implemented"),
            ProxyError::OriginConnect { .. } => Some("HTTP/1.0 502 Bad Gateway"),
            ProxyError::Io(_) => None,
        }
    }
}

// == Cache Error Enum ==
/// Errors raised by the response cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Payload larger than the per-object limit
    #[error("Object of {size} bytes exceeds limit of {limit} bytes")]
    ObjectTooLarge { size: usize, limit: usize },

    /// Slot index outside the fixed slot array
    #[error("Slot index {0} out of range")]
    SlotOutOfRange(usize),

    /// URL not present in the cache
    #[error("Not cached: {0}")]
    NotFound(String),

    /// A slot's write gate was closed
    #[error("Cache slot gate closed")]
    Closed,
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::ObjectTooLarge { .. } | CacheError::SlotOutOfRange(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::Closed => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Aliases ==
/// Convenience Result type for connection handling.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Convenience Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lines() {
        assert_eq!(
            ProxyError::MethodNotImplemented("POST".into()).status_line(),
            Some("HTTP/1.0 501 Not Implemented")
        );
        assert_eq!(
            ProxyError::LineTooLong(8192).status_line(),
            Some("HTTP/1.0 400 Bad Request")
        );
        let err = ProxyError::OriginConnect {
            host: "nowhere".into(),
            port: 80,
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(err.status_line(), Some("HTTP/1.0 502 Bad Gateway"));
        assert!(ProxyError::Io(io::ErrorKind::BrokenPipe.into())
            .status_line()
            .is_none());
    }

    #[test]
    fn test_cache_error_not_found_is_404() {
        let response = CacheError::NotFound("http://a/".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_object_too_large_message() {
        let err = CacheError::ObjectTooLarge {
            size: 11,
            limit: 10,
        };
        assert_eq!(
            err.to_string(),
            "Object of 11 bytes exceeds limit of 10 bytes"
        );
    }
}
