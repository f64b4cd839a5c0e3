//! Proxy Module
//!
//! Connection acceptance and the per-connection forwarding pipeline.

mod acceptor;
mod capture;
mod handler;

pub use acceptor::{Acceptor, ConnectionPolicy};
pub use capture::ResponseCapture;
pub use handler::{handle_connection, Served};
