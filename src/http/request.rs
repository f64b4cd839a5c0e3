//! Client request line and bounded line reading.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::{ProxyError, Result};

// == Constants ==
/// Longest request or header line accepted, terminator included
pub const MAX_LINE: usize = 8192;

// == Read Line ==
/// Reads one line, terminator included, into `buf`.
///
/// `buf` is cleared first. Returns the number of bytes read; 0 means EOF.
/// A line that reaches [`MAX_LINE`] bytes without a `\n` is rejected.
pub async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let n = (&mut *reader)
        .take(MAX_LINE as u64)
        .read_until(b'\n', buf)
        .await?;

    if n == MAX_LINE && buf.last() != Some(&b'\n') {
        return Err(ProxyError::LineTooLong(MAX_LINE));
    }
    Ok(n)
}

/// Returns true for the empty line that ends a header block.
pub fn is_blank_line(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}

// == Request Line ==
/// The first line of a client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    /// Request target exactly as sent; also the cache key
    pub uri: String,
    pub version: String,
}

impl RequestLine {
    /// Splits `method target [version]` on whitespace.
    ///
    /// The line must be valid UTF-8: the target is used as the cache key and
    /// forwarded, so it is never rewritten.
    pub fn parse(line: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(line)
            .map_err(|_| ProxyError::BadRequest("request line is not valid UTF-8".into()))?;
        let mut parts = text.split_whitespace();

        let (method, uri) = match (parts.next(), parts.next()) {
            (Some(method), Some(uri)) => (method, uri),
            _ => return Err(ProxyError::BadRequest(text.trim_end().to_string())),
        };
        let version = parts.next().unwrap_or("HTTP/1.0");

        Ok(Self {
            method: method.to_string(),
            uri: uri.to_string(),
            version: version.to_string(),
        })
    }

    /// Method names are matched case-insensitively.
    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}
