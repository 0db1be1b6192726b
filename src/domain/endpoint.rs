//! `NodeEndpoint`: the address identity shared by every observation and plan.

use std::fmt;
use std::net::Ipv4Addr;

/// A single MongoDB instance address: `(ip, port)`. Identity equals this pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeEndpoint {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl NodeEndpoint {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    /// `"ip:port"`, the host form used inside a `ReplicaSetConfig`.
    pub fn host(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Parses a `"ip:port"` host string back into an endpoint.
    pub fn parse_host(host: &str) -> Option<Self> {
        let (ip_part, port_part) = host.rsplit_once(':')?;
        let ip: Ipv4Addr = ip_part.parse().ok()?;
        let port: u16 = port_part.parse().ok()?;
        Some(Self::new(ip, port))
    }
}

impl fmt::Display for NodeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.host())
    }
}
