//! Strong type definitions shared across the workspace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::Blake3Hash;
use crate::error::CoreError;

/// A peer's network address (`host:port`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerAddr {
    pub host: String,
    pub port: u16,
}

impl PeerAddr {
    /// Create a new address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The routing identity of the node bound at this address.
    ///
    /// Derived from the address so that a receiver can recompute it
    /// instead of trusting a self-reported id.
    pub fn node_id(&self) -> Blake3Hash {
        Blake3Hash::hash(self.to_string().as_bytes())
    }
}

impl fmt::Debug for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerAddr({}:{})", self.host, self.port)
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for PeerAddr {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| CoreError::InvalidAddress(s.to_string()))?;
        if host.is_empty() {
            return Err(CoreError::InvalidAddress(s.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| CoreError::InvalidAddress(s.to_string()))?;
        Ok(Self::new(host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_addr_display_parse() {
        let addr = PeerAddr::new("127.0.0.1", 49737);
        assert_eq!(addr.to_string(), "127.0.0.1:49737");
        assert_eq!("127.0.0.1:49737".parse::<PeerAddr>().unwrap(), addr);
    }

    #[test]
    fn test_peer_addr_rejects_garbage() {
        assert!("no-port".parse::<PeerAddr>().is_err());
        assert!(":80".parse::<PeerAddr>().is_err());
        assert!("host:99999".parse::<PeerAddr>().is_err());
    }

    #[test]
    fn test_node_id_depends_on_port() {
        let a = PeerAddr::new("127.0.0.1", 1);
        let b = PeerAddr::new("127.0.0.1", 2);
        assert_ne!(a.node_id(), b.node_id());
        assert_eq!(a.node_id(), PeerAddr::new("127.0.0.1", 1).node_id());
    }
}
