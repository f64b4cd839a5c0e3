//! HTTP Module
//!
//! The small slice of HTTP/1.0 the proxy speaks: request line, header
//! block and request target parsing, plus the forwarding request builder.

pub mod header;
pub mod request;
pub mod uri;

pub use header::{build_forward_request, read_header_lines, USER_AGENT};
pub use request::{read_line, RequestLine, MAX_LINE};
pub use uri::{parse, RequestTarget};
