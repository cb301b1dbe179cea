//! Node configuration.

use std::path::PathBuf;
use std::time::Duration;

use mutable_dht_core::{PeerAddr, SchemeId};
use mutable_dht_rpc::{LookupConfig, DEFAULT_K};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Where a node keeps its mutable records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StoreConfig {
    /// In-memory, lost on destroy.
    #[default]
    Memory,
    /// SQLite database at the given path.
    Sqlite(PathBuf),
}

/// Routing and lookup tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingConfig {
    /// Bucket size and lookup result size.
    pub k: usize,
    /// Concurrent lookup requests.
    pub alpha: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            alpha: 3,
        }
    }
}

impl From<RoutingConfig> for LookupConfig {
    fn from(config: RoutingConfig) -> Self {
        LookupConfig {
            k: config.k,
            alpha: config.alpha,
        }
    }
}

/// Configuration for a [`DhtNode`](crate::DhtNode).
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind. 0 picks a free port.
    pub port: u16,
    /// Contacts pinged at startup.
    pub bootstrap: Vec<PeerAddr>,
    /// Ephemeral nodes are not added to other nodes' routing tables.
    pub ephemeral: bool,
    /// Firewalled nodes cannot be reached unsolicited, so they advertise
    /// themselves as ephemeral.
    pub firewalled: bool,
    /// Backend used to sign puts and verify records.
    pub scheme: SchemeId,
    /// Record storage.
    pub store: StoreConfig,
    /// Routing and lookup tuning.
    pub routing: RoutingConfig,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            bootstrap: Vec::new(),
            ephemeral: true,
            firewalled: false,
            scheme: SchemeId::default(),
            store: StoreConfig::default(),
            routing: RoutingConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl NodeConfig {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn bootstrap(mut self, bootstrap: Vec<PeerAddr>) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    pub fn firewalled(mut self, firewalled: bool) -> Self {
        self.firewalled = firewalled;
        self
    }

    pub fn scheme(mut self, scheme: SchemeId) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn routing(mut self, routing: RoutingConfig) -> Self {
        self.routing = routing;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Whether the node advertises itself as ephemeral to peers.
    pub fn advertises_ephemeral(&self) -> bool {
        self.ephemeral || self.firewalled
    }
}
