//! Configuration Module
//!
//! Command-line configuration for the proxy.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;

use crate::cache::{CACHE_SLOTS, MAX_OBJECT_SIZE};
use crate::proxy::ConnectionPolicy;

/// Proxy configuration parameters.
///
/// Everything except the listening port has a default.
#[derive(Debug, Clone, Parser)]
#[command(name = "cacheproxy")]
#[command(about = "Caching forward HTTP proxy", long_about = None)]
pub struct Config {
    /// Port to accept proxy clients on
    pub port: u16,

    /// Address to bind the proxy and admin listeners to
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Port for the read-only admin API; disabled when absent
    #[arg(long)]
    pub admin_port: Option<u16>,

    /// Number of cache slots
    #[arg(long, default_value_t = CACHE_SLOTS)]
    pub cache_slots: usize,

    /// Largest response cached, in bytes
    #[arg(long, default_value_t = MAX_OBJECT_SIZE)]
    pub max_object_size: usize,

    /// Most connections handled at once; unbounded when absent or 0
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Seconds between cache statistics log lines; 0 disables
    #[arg(long, default_value_t = 0)]
    pub stats_interval: u64,
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn admin_addr(&self) -> Option<SocketAddr> {
        self.admin_port.map(|port| SocketAddr::new(self.bind, port))
    }

    pub fn connection_policy(&self) -> ConnectionPolicy {
        ConnectionPolicy::from_limit(self.max_connections)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 15213,
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            admin_port: None,
            cache_slots: CACHE_SLOTS,
            max_object_size: MAX_OBJECT_SIZE,
            max_connections: None,
            stats_interval: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_slots, 10);
        assert_eq!(config.max_object_size, 102400);
        assert!(config.admin_addr().is_none());
        assert_eq!(config.connection_policy(), ConnectionPolicy::Unbounded);
    }

    #[test]
    fn test_config_port_only() {
        let config = Config::try_parse_from(["cacheproxy", "8080"]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.listen_addr(), "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.cache_slots, CACHE_SLOTS);
        assert_eq!(config.max_object_size, MAX_OBJECT_SIZE);
        assert_eq!(config.stats_interval, 0);
    }

    #[test]
    fn test_config_all_flags() {
        let config = Config::try_parse_from([
            "cacheproxy",
            "8080",
            "--bind",
            "127.0.0.1",
            "--admin-port",
            "9090",
            "--cache-slots",
            "32",
            "--max-object-size",
            "2048",
            "--max-connections",
            "64",
            "--stats-interval",
            "30",
        ])
        .unwrap();

        assert_eq!(config.admin_addr(), Some("127.0.0.1:9090".parse().unwrap()));
        assert_eq!(config.cache_slots, 32);
        assert_eq!(config.max_object_size, 2048);
        assert_eq!(config.connection_policy(), ConnectionPolicy::Bounded(64));
        assert_eq!(config.stats_interval, 30);
    }

    #[test]
    fn test_config_requires_port() {
        assert!(Config::try_parse_from(["cacheproxy"]).is_err());
        assert!(Config::try_parse_from(["cacheproxy", "notaport"]).is_err());
    }
}
