//! Forwarding request construction.
//!
//! The origin always sees an HTTP/1.0 GET with exactly one `Host` line,
//! fixed `Connection`, `Proxy-Connection` and `User-Agent` lines, and every
//! other client header passed through untouched.

use tokio::io::AsyncBufRead;

use crate::error::{ProxyError, Result};
use crate::http::request::{is_blank_line, read_line};
use crate::http::uri::RequestTarget;

// == Fixed Header Lines ==
pub const USER_AGENT: &str =
    "User-Agent: Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3\r\n";
pub const CONNECTION: &str = "Connection: close\r\n";
pub const PROXY_CONNECTION: &str = "Proxy-Connection: close\r\n";

/// Most header lines accepted from one client request
pub const MAX_HEADER_LINES: usize = 128;

// == Read Header Lines ==
/// Reads client header lines up to the blank terminator.
///
/// The terminator itself is consumed but not returned. EOF before the
/// terminator ends the block with whatever was read; a last line cut off
/// by EOF gets a `\r\n` so it cannot run into the next forwarded line.
pub async fn read_header_lines<R>(reader: &mut R) -> Result<Vec<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    loop {
        if read_line(reader, &mut buf).await? == 0 || is_blank_line(&buf) {
            return Ok(lines);
        }
        if lines.len() == MAX_HEADER_LINES {
            return Err(ProxyError::BadRequest(format!(
                "more than {} header lines",
                MAX_HEADER_LINES
            )));
        }
        let mut line = std::mem::take(&mut buf);
        terminate(&mut line);
        lines.push(line);
    }
}

fn terminate(line: &mut Vec<u8>) {
    if !line.ends_with(b"\n") {
        line.extend_from_slice(b"\r\n");
    }
}

// == Header Name ==
/// Name of a `Name: value` line, without surrounding whitespace.
fn header_name(line: &[u8]) -> Option<&[u8]> {
    let colon = line.iter().position(|&b| b == b':')?;
    Some(line[..colon].trim_ascii())
}

fn is_named(line: &[u8], name: &str) -> bool {
    header_name(line).is_some_and(|n| n.eq_ignore_ascii_case(name.as_bytes()))
}

// == Build Forward Request ==
/// Builds the request sent to the origin.
///
/// A client `Host` line is forwarded verbatim, otherwise one is made from
/// the target hostname. Client `Connection`, `Proxy-Connection` and
/// `User-Agent` lines are replaced by the fixed ones.
pub fn build_forward_request(target: &RequestTarget, client_headers: &[Vec<u8>]) -> Vec<u8> {
    let mut host_line: Option<&[u8]> = None;
    let mut other_lines: Vec<&[u8]> = Vec::new();

    for line in client_headers {
        if is_named(line, "Host") {
            host_line.get_or_insert(line.as_slice());
        } else if !["Connection", "Proxy-Connection", "User-Agent"]
            .iter()
            .any(|name| is_named(line, name))
        {
            other_lines.push(line);
        }
    }

    let mut request = format!("GET {} HTTP/1.0\r\n", target.path).into_bytes();
    match host_line {
        Some(line) => push_line(&mut request, line),
        None => request.extend_from_slice(format!("Host: {}\r\n", target.hostname).as_bytes()),
    }
    request.extend_from_slice(CONNECTION.as_bytes());
    request.extend_from_slice(PROXY_CONNECTION.as_bytes());
    request.extend_from_slice(USER_AGENT.as_bytes());
    for line in other_lines {
        push_line(&mut request, line);
    }
    request.extend_from_slice(b"\r\n");
    request
}

fn push_line(request: &mut Vec<u8>, line: &[u8]) {
    request.extend_from_slice(line);
    if !line.ends_with(b"\n") {
        request.extend_from_slice(b"\r\n");
    }
}
