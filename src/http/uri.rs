//! Request target parsing.

// == Constants ==
/// Port used when the target names none
pub const DEFAULT_PORT: u16 = 80;

/// Path used when the target names none
pub const DEFAULT_PATH: &str = "/";

// == Request Target ==
/// Origin coordinates taken from an absolute request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub hostname: String,
    pub path: String,
    pub port: u16,
}

impl RequestTarget {
    /// `host:port` form used to open the origin connection.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

// == Parse ==
/// Splits a request target into hostname, path and port.
///
/// Never fails. A leading `scheme://` is dropped. A `:` before the first
/// `/` separates the hostname from the port; a port that does not parse
/// falls back to 80. Missing pieces default to port 80 and path `/`.
pub fn parse(uri: &str) -> RequestTarget {
    let rest = match uri.find("//") {
        Some(pos) => &uri[pos + 2..],
        None => uri,
    };

    let (authority, path) = match rest.find('/') {
        Some(slash) => (&rest[..slash], &rest[slash..]),
        None => (rest, DEFAULT_PATH),
    };

    let (hostname, port) = match authority.find(':') {
        Some(colon) => (&authority[..colon], parse_port(&authority[colon + 1..])),
        None => (authority, DEFAULT_PORT),
    };

    RequestTarget {
        hostname: hostname.to_string(),
        path: path.to_string(),
        port,
    }
}

/// Reads the leading decimal digits of `digits`, like `atoi`.
fn parse_port(digits: &str) -> u16 {
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().unwrap_or(DEFAULT_PORT)
}
