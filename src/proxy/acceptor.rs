//! Connection acceptor.
//!
//! Waits for client connections and hands each one to its own task. The
//! accept loop never waits on a handler; under [`ConnectionPolicy::Bounded`]
//! it waits for a free slot before accepting the next connection.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn, Instrument};

use crate::cache::ResponseCache;
use crate::proxy::handler::{handle_connection, Served};

/// Pause after a failed accept, e.g. when out of file descriptors
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

// == Connection Policy ==
/// Limit on concurrently handled connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPolicy {
    /// One task per connection, no limit
    #[default]
    Unbounded,
    /// At most this many connections handled at once
    Bounded(usize),
}

impl ConnectionPolicy {
    /// `None` or `Some(0)` means unbounded.
    pub fn from_limit(limit: Option<usize>) -> Self {
        match limit {
            Some(n) if n > 0 => ConnectionPolicy::Bounded(n),
            _ => ConnectionPolicy::Unbounded,
        }
    }
}

// == Acceptor ==
pub struct Acceptor {
    listener: TcpListener,
    cache: Arc<ResponseCache>,
    limit: Option<Arc<Semaphore>>,
}

impl Acceptor {
    /// Binds the listening socket.
    pub async fn bind<A: ToSocketAddrs>(
        addr: A,
        cache: Arc<ResponseCache>,
        policy: ConnectionPolicy,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, cache, policy))
    }

    pub fn from_listener(
        listener: TcpListener,
        cache: Arc<ResponseCache>,
        policy: ConnectionPolicy,
    ) -> Self {
        let limit = match policy {
            ConnectionPolicy::Unbounded => None,
            ConnectionPolicy::Bounded(n) => Some(Arc::new(Semaphore::new(n))),
        };
        Self {
            listener,
            cache,
            limit,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    // == Run ==
    /// Accepts connections forever.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// Connections already dispatched keep running after this returns.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        if let Ok(addr) = self.local_addr() {
            info!(address = %addr, "Proxy listening");
        }

        tokio::pin!(shutdown);

        loop {
            let permit = match &self.limit {
                Some(limit) => tokio::select! {
                    biased;
                    () = &mut shutdown => break,
                    permit = limit.clone().acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    },
                },
                None => None,
            };

            let accepted = tokio::select! {
                biased;
                () = &mut shutdown => break,
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    error!(error = %err, "Accept failed");
                    if back_off(shutdown.as_mut()).await {
                        continue;
                    }
                    break;
                }
            };

            debug!(peer = %peer, "Accepted connection");

            let cache = self.cache.clone();
            tokio::spawn(
                async move {
                    let _permit = permit;
                    match handle_connection(stream, &cache).await {
                        Ok(Served::Closed) => debug!("Client closed without a request"),
                        Ok(_) => {}
                        Err(err) => warn!(error = %err, "Connection aborted"),
                    }
                }
                .instrument(tracing::info_span!("connection", peer = %peer)),
            );
        }

        info!("Proxy stopped accepting connections");
    }
}

/// Waits out [`ACCEPT_BACKOFF`]. Returns false if `shutdown` fired first.
async fn back_off<F>(shutdown: Pin<&mut F>) -> bool
where
    F: Future<Output = ()>,
{
    tokio::select! {
        biased;
        () = shutdown => false,
        () = tokio::time::sleep(ACCEPT_BACKOFF) => true,
    }
}
