//! Per-connection request handling.
//!
//! Reads one request, answers it from the cache when possible, otherwise
//! fetches it from the origin while streaming the bytes straight through to
//! the client and keeping a bounded copy for the cache.

use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::error::{ProxyError, Result};
use crate::http::{build_forward_request, parse, read_header_lines, read_line, RequestLine};
use crate::proxy::capture::ResponseCapture;

/// Size of each read from the origin
const RELAY_CHUNK: usize = 8192;

// == Served ==
/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// Client closed before sending a request line
    Closed,
    /// Answered from the cache
    Cache { bytes: usize },
    /// Relayed from the origin
    Origin { bytes: usize, cached: bool },
}

// == Handle Connection ==
/// Runs the full request/response cycle for one client connection.
///
/// Errors that happen before anything was relayed are answered with a
/// header-only status response; the error is still returned to the caller.
pub async fn handle_connection<S>(stream: S, cache: &ResponseCache) -> Result<Served>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    let result = serve(&mut reader, &mut writer, cache).await;

    if let Err(err) = &result {
        if let Some(status) = err.status_line() {
            let response = format!("{}\r\nConnection: close\r\nContent-Length: 0\r\n\r\n", status);
            // The client may already be gone.
            let _ = writer.write_all(response.as_bytes()).await;
        }
    }
    let _ = writer.shutdown().await;

    result
}

async fn serve<R, W>(reader: &mut R, writer: &mut W, cache: &ResponseCache) -> Result<Served>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = Vec::new();
    if read_line(reader, &mut line).await? == 0 {
        return Ok(Served::Closed);
    }

    // The header block is always drained first so that closing early never
    // resets the client with unread request bytes.
    let request = RequestLine::parse(&line);
    let headers = read_header_lines(reader).await?;

    let request = request?;
    debug!(
        method = %request.method,
        uri = %request.uri,
        version = %request.version,
        headers = headers.len(),
        "Request received"
    );
    if !request.is_get() {
        return Err(ProxyError::MethodNotImplemented(request.method));
    }

    if let Some(access) = cache.lookup(&request.uri).await {
        let bytes = access.payload().len();
        writer.write_all(access.payload()).await?;
        writer.flush().await?;
        cache.release_read(access);
        debug!(uri = %request.uri, bytes, "Served from cache");
        return Ok(Served::Cache { bytes });
    }

    let target = parse(&request.uri);
    let forward = build_forward_request(&target, &headers);

    let mut origin = TcpStream::connect((target.hostname.as_str(), target.port))
        .await
        .map_err(|source| ProxyError::OriginConnect {
            host: target.hostname.clone(),
            port: target.port,
            source,
        })?;
    origin.write_all(&forward).await?;

    let capture = relay(&mut origin, writer, cache.max_object_size()).await?;
    let bytes = capture.total();

    let cached = match capture.finish() {
        Some(payload) if !payload.is_empty() => match cache.store(request.uri.as_str(), payload).await {
            Ok(_) => true,
            Err(err) => {
                warn!(uri = %request.uri, error = %err, "Failed to cache response");
                false
            }
        },
        _ => false,
    };

    info!(
        uri = %request.uri,
        origin = %target.authority(),
        bytes,
        cached,
        "Relayed from origin"
    );

    Ok(Served::Origin { bytes, cached })
}

// == Relay ==
/// Copies the origin response to the client chunk by chunk until the origin
/// closes, keeping a bounded copy of what was sent.
async fn relay<O, W>(origin: &mut O, client: &mut W, limit: usize) -> Result<ResponseCapture>
where
    O: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut capture = ResponseCapture::new(limit);
    let mut chunk = vec![0u8; RELAY_CHUNK];

    loop {
        let n = origin.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        client.write_all(&chunk[..n]).await?;
        capture.push(&chunk[..n]);
    }
    client.flush().await?;

    Ok(capture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::duplex;
    use tokio::net::TcpListener;

    /// Origin that records each request and answers with `body`.
    async fn spawn_origin(body: Vec<u8>) -> (u16, Arc<AtomicUsize>, tokio::sync::mpsc::UnboundedReceiver<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let hits = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = listener.accept().await.unwrap();
                counter.fetch_add(1, Ordering::SeqCst);
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.ends_with(b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                let _ = tx.send(request);
                socket.write_all(&body).await.unwrap();
            }
        });

        (port, hits, rx)
    }

    async fn roundtrip(cache: Arc<ResponseCache>, request: &[u8]) -> (Result<Served>, Vec<u8>) {
        let (mut client, server) = duplex(1 << 20);
        let handler = tokio::spawn(async move { handle_connection(server, &cache).await });

        client.write_all(request).await.unwrap();
        client.shutdown().await.unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();

        (handler.await.unwrap(), response)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let body = b"HTTP/1.0 200 OK\r\nContent-Length: 5\r\n\r\nhello".to_vec();
        let (port, hits, mut requests) = spawn_origin(body.clone()).await;
        let cache = Arc::new(ResponseCache::new(10, 1024));
        let request = format!("GET http://127.0.0.1:{}/index.html HTTP/1.1\r\nAccept: */*\r\n\r\n", port);

        let (served, first) = roundtrip(cache.clone(), request.as_bytes()).await;
        assert_eq!(
            served.unwrap(),
            Served::Origin {
                bytes: body.len(),
                cached: true
            }
        );
        assert_eq!(first, body);

        let forwarded = String::from_utf8(requests.recv().await.unwrap()).unwrap();
        assert!(forwarded.starts_with("GET /index.html HTTP/1.0\r\nHost: 127.0.0.1\r\n"));
        assert!(forwarded.contains("Accept: */*\r\n"));

        let (served, second) = roundtrip(cache.clone(), request.as_bytes()).await;
        assert_eq!(served.unwrap(), Served::Cache { bytes: body.len() });
        assert_eq!(second, first);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_oversized_response_relayed_not_cached() {
        let mut body = b"HTTP/1.0 200 OK\r\n\r\n".to_vec();
        body.extend(std::iter::repeat(b'z').take(4096));
        let (port, hits, _requests) = spawn_origin(body.clone()).await;
        let cache = Arc::new(ResponseCache::new(10, 1024));
        let request = format!("GET http://127.0.0.1:{}/big HTTP/1.0\r\n\r\n", port);

        let (served, response) = roundtrip(cache.clone(), request.as_bytes()).await;
        assert_eq!(
            served.unwrap(),
            Served::Origin {
                bytes: body.len(),
                cached: false
            }
        );
        assert_eq!(response, body);
        assert!(cache.is_empty());

        roundtrip(cache.clone(), request.as_bytes()).await.0.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_get_answered_501() {
        let cache = Arc::new(ResponseCache::default());

        let (served, response) = roundtrip(cache.clone(), b"POST http://h/ HTTP/1.0\r\n\r\n").await;
        assert!(matches!(served, Err(ProxyError::MethodNotImplemented(m)) if m == "POST"));
        assert!(response.starts_with(b"HTTP/1.0 501 Not Implemented\r\n"));
        assert!(response.ends_with(b"\r\n\r\n"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_request_answered_400() {
        let cache = Arc::new(ResponseCache::default());

        let (served, response) = roundtrip(cache, b"NONSENSE\r\n\r\n").await;
        assert!(matches!(served, Err(ProxyError::BadRequest(_))));
        assert!(response.starts_with(b"HTTP/1.0 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn test_non_utf8_target_answered_400() {
        let cache = Arc::new(ResponseCache::default());

        let (served, response) = roundtrip(cache.clone(), b"GET http://h/\xff HTTP/1.0\r\n\r\n").await;
        assert!(matches!(served, Err(ProxyError::BadRequest(_))));
        assert!(response.starts_with(b"HTTP/1.0 400 Bad Request\r\n"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_origin_answered_502() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let cache = Arc::new(ResponseCache::default());
        let request = format!("GET http://127.0.0.1:{}/ HTTP/1.0\r\n\r\n", port);

        let (served, response) = roundtrip(cache.clone(), request.as_bytes()).await;
        assert!(matches!(served, Err(ProxyError::OriginConnect { .. })));
        assert!(response.starts_with(b"HTTP/1.0 502 Bad Gateway\r\n"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_immediate_eof_is_closed() {
        let cache = Arc::new(ResponseCache::default());
        let (served, response) = roundtrip(cache, b"").await;
        assert_eq!(served.unwrap(), Served::Closed);
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_relay_keeps_binary_bytes() {
        let body: Vec<u8> = (0..=255u8).cycle().take(3 * RELAY_CHUNK + 7).collect();
        let mut origin = &body[..];
        let mut client = Vec::new();

        let capture = relay(&mut origin, &mut client, body.len()).await.unwrap();
        assert_eq!(client, body);
        assert_eq!(capture.finish().unwrap().as_ref(), body.as_slice());
    }
}
