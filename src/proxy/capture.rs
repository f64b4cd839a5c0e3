//! Bounded copy of a relayed response.

use bytes::{Bytes, BytesMut};

// == Response Capture ==
/// Accumulates a copy of the bytes relayed to the client, up to a limit.
///
/// Once the running total passes the limit the copy is dropped and only the
/// count keeps growing. Each request starts from a fresh capture.
#[derive(Debug)]
pub struct ResponseCapture {
    buf: BytesMut,
    limit: usize,
    total: usize,
    overflowed: bool,
}

impl ResponseCapture {
    pub fn new(limit: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            limit,
            total: 0,
            overflowed: false,
        }
    }

    /// Records one chunk received from the origin.
    pub fn push(&mut self, chunk: &[u8]) {
        self.total += chunk.len();
        if self.overflowed {
            return;
        }
        if self.total > self.limit {
            self.overflowed = true;
            self.buf = BytesMut::new();
        } else {
            self.buf.extend_from_slice(chunk);
        }
    }

    /// Bytes seen so far, kept or not.
    pub fn total(&self) -> usize {
        self.total
    }

    #[cfg(test)]
    fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    /// The captured response, if it stayed within the limit.
    pub fn finish(self) -> Option<Bytes> {
        (!self.overflowed).then(|| self.buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_within_limit() {
        let mut capture = ResponseCapture::new(10);
        capture.push(b"abc");
        capture.push(b"\0\0");
        capture.push(b"defgh");

        assert_eq!(capture.total(), 10);
        assert!(!capture.is_overflowed());
        assert_eq!(capture.finish().unwrap().as_ref(), b"abc\0\0defgh");
    }

    #[test]
    fn test_capture_overflow_discards() {
        let mut capture = ResponseCapture::new(4);
        capture.push(b"abc");
        capture.push(b"de");
        capture.push(b"f");

        assert_eq!(capture.total(), 6);
        assert!(capture.is_overflowed());
        assert!(capture.finish().is_none());
    }

    #[test]
    fn test_capture_empty() {
        let capture = ResponseCapture::new(4);
        assert_eq!(capture.total(), 0);
        assert_eq!(capture.finish().unwrap().len(), 0);
    }
}
